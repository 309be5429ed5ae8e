#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawner placement along the island perimeter.
//!
//! Candidates recorded by the classifier face inward from the shoreline. A
//! spawner occupies the tile one step inward and its spawn point sits two
//! steps inward. Each tentative spawner is validated against every spawn
//! point registered so far and rolled back when it would split them apart.

use island_defence_core::{
    Direction, SpawnCandidates, SpawnerDescriptor, TileCoord, TileHandle, TileKind,
};
use island_defence_system_pathfinding::Pathfinder;
use island_defence_world::{Grid, Tile};
use rand::Rng;

/// Order in which candidate queues are visited.
pub const ROTATION: [Direction; 4] = [
    Direction::West,
    Direction::East,
    Direction::North,
    Direction::South,
];

/// Coordinates enemies appear on once they leave a spawner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpawnRegistry {
    points: Vec<TileCoord>,
}

impl SpawnRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Registers a spawn point.
    pub fn register(&mut self, coord: TileCoord) {
        self.points.push(coord);
    }

    /// Removes the most recently registered occurrence of `coord`.
    pub fn remove(&mut self, coord: TileCoord) -> bool {
        match self.points.iter().rposition(|point| *point == coord) {
            Some(index) => {
                let _ = self.points.remove(index);
                true
            }
            None => false,
        }
    }

    /// Registered spawn points in registration order.
    #[must_use]
    pub fn points(&self) -> &[TileCoord] {
        &self.points
    }

    /// Reports whether `coord` is a registered spawn point.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        self.points.contains(&coord)
    }

    /// Number of registered spawn points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Reports whether no spawn point is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Forgets every spawn point.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Reports whether every spawn point can reach the first one registered.
///
/// Holds trivially for zero or one spawn point.
pub fn spawn_points_linked(
    grid: &Grid,
    registry: &SpawnRegistry,
    pathfinder: &mut Pathfinder,
) -> bool {
    let Some((first, rest)) = registry.points().split_first() else {
        return true;
    };
    let Some(origin) = grid.handle_at(*first) else {
        return false;
    };
    rest.iter().all(|point| {
        grid.handle_at(*point)
            .is_some_and(|target| pathfinder.solve(grid, origin, target).is_some())
    })
}

/// Reports whether every spawn point can reach `objective`.
///
/// Always `false` when no objective exists or the objective tile cannot be
/// walked on.
pub fn objective_accessible(
    grid: &Grid,
    registry: &SpawnRegistry,
    objective: Option<TileCoord>,
    pathfinder: &mut Pathfinder,
) -> bool {
    let Some(goal) = objective.and_then(|coord| grid.tile(coord)) else {
        return false;
    };
    if !goal.is_walkable() {
        return false;
    }
    let goal = goal.handle();
    registry.points().iter().all(|point| {
        grid.handle_at(*point)
            .is_some_and(|begin| pathfinder.solve(grid, begin, goal).is_some())
    })
}

/// Places up to `requested` spawners and returns the committed descriptors.
///
/// The queues are visited in [`ROTATION`] order, advancing after every
/// attempt. Each attempt draws one candidate uniformly at random from the
/// current queue. Placement stops once `requested` spawners exist or every
/// queue is drained, so fewer descriptors than requested is a normal outcome.
pub fn place_spawners<R>(
    grid: &mut Grid,
    candidates: &mut SpawnCandidates,
    registry: &mut SpawnRegistry,
    pathfinder: &mut Pathfinder,
    rng: &mut R,
    spawner_kind: TileKind,
    requested: usize,
) -> Vec<SpawnerDescriptor>
where
    R: Rng + ?Sized,
{
    let mut placed = Vec::with_capacity(requested);
    let mut exhausted_sides = 0_usize;
    let mut turn = 0_usize;

    // Counting drained sides alone cannot end the loop: a side may run dry
    // before the request is met, after which the rotation would spin forever.
    // Stopping once every queue is empty keeps partial placement terminating.
    while placed.len() < requested {
        if candidates.is_exhausted() {
            tracing::warn!(
                requested,
                placed = placed.len(),
                exhausted_sides,
                "spawn candidates exhausted before reaching requested count"
            );
            break;
        }

        let direction = ROTATION[turn % ROTATION.len()];
        turn += 1;

        let remaining = candidates.len(direction);
        if remaining == 0 {
            continue;
        }
        let Some(candidate) = candidates.take(direction, rng.gen_range(0..remaining)) else {
            continue;
        };
        if candidates.len(direction) == 0 {
            exhausted_sides += 1;
            tracing::debug!(?direction, exhausted_sides, "spawn candidate side exhausted");
        }

        if let Some(descriptor) = try_place(
            grid,
            registry,
            pathfinder,
            spawner_kind,
            candidate,
            direction,
        ) {
            placed.push(descriptor);
        }
    }

    tracing::info!(requested, placed = placed.len(), "placed spawners");
    placed
}

fn try_place(
    grid: &mut Grid,
    registry: &mut SpawnRegistry,
    pathfinder: &mut Pathfinder,
    spawner_kind: TileKind,
    candidate: TileCoord,
    direction: Direction,
) -> Option<SpawnerDescriptor> {
    let (Some(entry_coord), Some(exit_coord)) =
        (candidate.step(direction, 1), candidate.step(direction, 2))
    else {
        return None;
    };
    if registry.contains(entry_coord) {
        return None;
    }
    let (Some(entry), Some(exit)) = (
        walkable_handle(grid, entry_coord),
        walkable_handle(grid, exit_coord),
    ) else {
        tracing::trace!(?candidate, ?direction, "spawner corridor is blocked");
        return None;
    };

    registry.register(exit_coord);
    let entry = match grid.swap(entry, spawner_kind, false, false) {
        Ok(entry) => entry,
        Err(error) => {
            let _ = registry.remove(exit_coord);
            tracing::warn!(%error, "failed to install spawner");
            return None;
        }
    };

    if !spawn_points_linked(grid, registry, pathfinder) {
        let _ = registry.remove(exit_coord);
        if let Err(error) = grid.clear(entry) {
            tracing::warn!(%error, "failed to roll back rejected spawner");
        }
        tracing::debug!(
            ?candidate,
            ?direction,
            "spawner rejected, spawn points would be disconnected"
        );
        return None;
    }

    if let Err(error) = grid.set_destructible(exit, false) {
        tracing::warn!(%error, "failed to protect spawn exit");
    }
    tracing::debug!(entry = ?entry_coord, exit = ?exit_coord, ?direction, "placed spawner");

    Some(SpawnerDescriptor {
        entry,
        exit,
        route: None,
    })
}

fn walkable_handle(grid: &Grid, coord: TileCoord) -> Option<TileHandle> {
    grid.tile(coord)
        .filter(|tile| tile.is_walkable())
        .map(Tile::handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_removes_latest_occurrence() {
        let mut registry = SpawnRegistry::new();
        registry.register(TileCoord::new(1, 1));
        registry.register(TileCoord::new(2, 2));
        registry.register(TileCoord::new(1, 1));

        assert!(registry.remove(TileCoord::new(1, 1)));
        assert_eq!(
            registry.points(),
            &[TileCoord::new(1, 1), TileCoord::new(2, 2)]
        );
        assert!(!registry.remove(TileCoord::new(9, 9)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_clear_forgets_points() {
        let mut registry = SpawnRegistry::new();
        registry.register(TileCoord::new(0, 3));
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains(TileCoord::new(0, 3)));
    }

    #[test]
    fn rotation_visits_each_direction_once() {
        for direction in Direction::ALL {
            assert_eq!(
                ROTATION.iter().filter(|entry| **entry == direction).count(),
                1
            );
        }
    }
}
