#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Best-first route search over the tile adjacency graph.
//!
//! Every adjacency edge costs one tile length and the heuristic is the
//! straight-line world distance between tile centres. The heuristic is only
//! admissible because edge costs are uniform; weighting edges differently
//! requires revisiting it.
//!
//! Search state lives in a side table allocated per call and indexed by the
//! grid's scan order, so tiles carry no search fields and concurrent
//! read-only searches over the same grid cannot interfere.

use std::{cmp::Ordering, collections::BinaryHeap};

use island_defence_core::{Route, TileCoord, TileHandle};
use island_defence_world::{Grid, Tile};

/// Search entry point that remembers its most recent result.
///
/// The cache exists for diagnostics and visualisation only; nothing reads it
/// to make decisions.
#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    last_solution: Option<Route>,
}

impl Pathfinder {
    /// Creates a pathfinder with an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_solution: None,
        }
    }

    /// Solves a route and records the outcome, failures included.
    pub fn solve(
        &mut self,
        grid: &Grid,
        begin: TileHandle,
        destination: TileHandle,
    ) -> Option<Route> {
        let route = solve(grid, begin, destination);
        self.last_solution = route.clone();
        route
    }

    /// Result of the most recent [`Pathfinder::solve`] call.
    #[must_use]
    pub fn last_solution(&self) -> Option<&Route> {
        self.last_solution.as_ref()
    }

    /// Drops the cached result.
    pub fn forget(&mut self) {
        self.last_solution = None;
    }
}

/// Finds a shortest route from `begin` to `destination`.
///
/// Returns the two-tile route immediately when the tiles are adjacent,
/// without inspecting walkability. Otherwise only walkable tiles are entered.
/// Returns `None` when either handle is stale, when `begin` equals
/// `destination`, or when no route exists.
#[must_use]
pub fn solve(grid: &Grid, begin: TileHandle, destination: TileHandle) -> Option<Route> {
    let (Some(start), Some(goal)) = (grid.resolve(begin), grid.resolve(destination)) else {
        tracing::warn!(?begin, ?destination, "cannot find path for invalid tiles");
        return None;
    };

    if start.neighbors().contains(&destination) {
        tracing::debug!(
            from = ?begin.coord(),
            to = ?destination.coord(),
            length = grid.tile_length(),
            "direct connection"
        );
        return Some(Route::from_tiles(vec![begin, destination]));
    }

    // The search only stops on a popped destination other than the start.
    let route = if begin == destination {
        None
    } else {
        Search::new(grid, goal).run(start)
    };
    if route.is_none() {
        tracing::warn!(
            from = ?begin.coord(),
            to = ?destination.coord(),
            "path not found"
        );
    }
    route
}

#[derive(Clone, Copy, Debug)]
struct Scratch {
    visited: bool,
    cost: f32,
    predecessor: Option<TileCoord>,
}

impl Scratch {
    const UNSEEN: Self = Self {
        visited: false,
        cost: f32::INFINITY,
        predecessor: None,
    };
}

#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    estimate: f32,
    sequence: u64,
    coord: TileCoord,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest estimate, oldest first.
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct Search<'grid> {
    grid: &'grid Grid,
    goal: &'grid Tile,
    scratch: Vec<Scratch>,
    open: BinaryHeap<OpenEntry>,
    sequence: u64,
}

impl<'grid> Search<'grid> {
    fn new(grid: &'grid Grid, goal: &'grid Tile) -> Self {
        Self {
            grid,
            goal,
            scratch: vec![Scratch::UNSEEN; grid.len()],
            open: BinaryHeap::new(),
            sequence: 0,
        }
    }

    fn run(mut self, start: &Tile) -> Option<Route> {
        let grid = self.grid;
        let start_index = grid.scan_index(start.coord())?;
        let start_estimate = self.heuristic(start);
        self.scratch[start_index].cost = 0.0;
        self.enqueue(start.coord(), start_estimate);

        let step = grid.tile_length();
        while let Some(entry) = self.open.pop() {
            let Some(index) = grid.scan_index(entry.coord) else {
                continue;
            };
            if self.scratch[index].visited {
                continue;
            }
            self.scratch[index].visited = true;

            if entry.coord == self.goal.coord() {
                return self.reconstruct(start.coord());
            }

            let Some(current) = grid.tile(entry.coord) else {
                continue;
            };
            let reached = self.scratch[index].cost;

            for neighbor in current.neighbors() {
                let Some(tile) = grid.resolve(*neighbor) else {
                    continue;
                };
                if !tile.is_walkable() {
                    continue;
                }
                let Some(neighbor_index) = grid.scan_index(tile.coord()) else {
                    continue;
                };
                if self.scratch[neighbor_index].visited {
                    continue;
                }

                let candidate = reached + step;
                if candidate < self.scratch[neighbor_index].cost {
                    let estimate = candidate + self.heuristic(tile);
                    let slot = &mut self.scratch[neighbor_index];
                    slot.predecessor = Some(entry.coord);
                    slot.cost = candidate;
                    self.enqueue(tile.coord(), estimate);
                }
            }
        }

        None
    }

    fn enqueue(&mut self, coord: TileCoord, estimate: f32) {
        self.open.push(OpenEntry {
            estimate,
            sequence: self.sequence,
            coord,
        });
        self.sequence += 1;
    }

    fn heuristic(&self, tile: &Tile) -> f32 {
        tile.position().distance(self.goal.position())
    }

    fn reconstruct(&self, start: TileCoord) -> Option<Route> {
        let mut tiles = Vec::new();
        let mut cursor = self.goal.coord();
        loop {
            tiles.push(self.grid.handle_at(cursor)?);
            if cursor == start {
                break;
            }
            let index = self.grid.scan_index(cursor)?;
            cursor = self.scratch[index].predecessor?;
        }
        tiles.reverse();
        Some(Route::from_tiles(tiles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(estimate: f32, sequence: u64) -> OpenEntry {
        OpenEntry {
            estimate,
            sequence,
            coord: TileCoord::new(0, 0),
        }
    }

    #[test]
    fn open_set_pops_lowest_estimate_first() {
        let mut open = BinaryHeap::new();
        open.push(entry(5.0, 0));
        open.push(entry(1.0, 1));
        open.push(entry(3.0, 2));

        let order: Vec<_> = std::iter::from_fn(|| open.pop())
            .map(|entry| entry.estimate)
            .collect();
        assert_eq!(order, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn open_set_breaks_ties_by_insertion_order() {
        let mut open = BinaryHeap::new();
        open.push(entry(2.0, 7));
        open.push(entry(2.0, 3));

        assert_eq!(open.pop().map(|entry| entry.sequence), Some(3));
    }

    #[test]
    fn unseen_scratch_is_unreached() {
        let scratch = Scratch::UNSEEN;
        assert!(!scratch.visited);
        assert!(scratch.cost.is_infinite());
        assert!(scratch.predecessor.is_none());
    }
}
