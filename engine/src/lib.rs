#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Public facade over world generation, search, edits, and spawner placement.
//!
//! An [`Engine`] owns at most one world at a time and walks it through the
//! [`WorldPhase`] lifecycle: generation synthesises terrain, classification
//! creates the grid, graph building links adjacency, and only then does the
//! world accept searches and edits. Calls made before a world is ready are
//! rejected without touching any state.

use island_defence_core::{
    CatalogError, ConfigError, Direction, PlacementError, RemovalError, Route, SpawnCandidates,
    SpawnerDescriptor, TileCatalog, TileCoord, TileHandle, TileKind, WorldConfig, WorldPhase,
};
use island_defence_system_classifier::{classify, ClassifierParams};
use island_defence_system_pathfinding::Pathfinder;
use island_defence_system_spawning::{self as spawning, SpawnRegistry};
use island_defence_system_terrain::{self as terrain, TerrainParams};
use island_defence_world::{query, Grid, GridError, HeadlessTiles, MutationError, TileFactory};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Errors surfaced by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation requires a ready world.
    #[error("no world is ready")]
    NotReady,
    /// The world configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The tile catalog cannot drive classification.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The classified tiles could not populate a grid.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// A tile mutation was rejected.
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// Outcome of a successful demolition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Demolition {
    /// Cleared tile now occupying the coordinate.
    pub tile: TileHandle,
    /// Removal cost recorded on the demolished tile, if any.
    pub removal_cost: Option<u32>,
}

#[derive(Clone, Copy, Debug)]
struct Objective {
    site: TileCoord,
    entrance: TileCoord,
    entrance_was_destructible: bool,
}

#[derive(Debug)]
struct ReadyWorld {
    grid: Grid,
    rng: ChaCha8Rng,
    seed: String,
    start: Option<TileHandle>,
    candidates: SpawnCandidates,
    registry: SpawnRegistry,
    objective: Option<Objective>,
    spawners: Vec<SpawnerDescriptor>,
}

impl ReadyWorld {
    fn objective_accessible(&self, pathfinder: &mut Pathfinder) -> bool {
        spawning::objective_accessible(
            &self.grid,
            &self.registry,
            self.objective.map(|objective| objective.entrance),
            pathfinder,
        )
    }

    fn refresh_spawner_routes(&mut self, pathfinder: &mut Pathfinder) {
        let entrance = self
            .objective
            .and_then(|objective| self.grid.handle_at(objective.entrance));
        for spawner in &mut self.spawners {
            spawner.route = entrance.and_then(|entrance| {
                let exit = self.grid.handle_at(spawner.exit.coord())?;
                pathfinder.solve(&self.grid, exit, entrance)
            });
        }
    }
}

/// Owner of the generated world and the single entry point for collaborators.
#[derive(Debug)]
pub struct Engine {
    catalog: TileCatalog,
    phase: WorldPhase,
    pathfinder: Pathfinder,
    world: Option<ReadyWorld>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            catalog: TileCatalog::default(),
            phase: WorldPhase::Empty,
            pathfinder: Pathfinder::new(),
            world: None,
        }
    }
}

impl Engine {
    /// Creates an engine that classifies tiles using `catalog`.
    pub fn new(catalog: TileCatalog) -> Result<Self, EngineError> {
        catalog.validate()?;
        Ok(Self {
            catalog,
            ..Self::default()
        })
    }

    /// Tile catalog supplied at construction.
    #[must_use]
    pub const fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> WorldPhase {
        self.phase
    }

    /// Generates a world whose tiles are not mirrored by any host objects.
    pub fn generate_world(&mut self, config: &WorldConfig) -> Result<(), EngineError> {
        self.generate_world_with(config, Box::new(HeadlessTiles))
    }

    /// Generates a world, reporting every tile instance to `factory`.
    ///
    /// Any previous world is torn down first. An empty seed string draws a
    /// fresh seed, retrievable afterwards through [`Engine::seed`]. On error
    /// the engine is left without a world.
    pub fn generate_world_with(
        &mut self,
        config: &WorldConfig,
        factory: Box<dyn TileFactory>,
    ) -> Result<(), EngineError> {
        self.cleanup_world();
        let result = self.build_world(config, factory);
        if result.is_err() {
            self.transition(WorldPhase::Empty);
        }
        result
    }

    fn build_world(
        &mut self,
        config: &WorldConfig,
        factory: Box<dyn TileFactory>,
    ) -> Result<(), EngineError> {
        config.validate()?;
        let seed = if config.seed.is_empty() {
            terrain::fresh_seed()
        } else {
            config.seed.clone()
        };

        self.transition(WorldPhase::Generating);
        let mut rng = terrain::rng_for_seed(&seed);
        let mask = terrain::generate(&TerrainParams::from(config), &mut rng);

        let classification = classify(
            &mask,
            &self.catalog,
            ClassifierParams::from(config),
            &mut rng,
        )?;
        let mut grid = Grid::from_specs(
            classification.width,
            classification.height,
            config.tile_length,
            self.catalog.clear_kind(),
            classification.specs,
            factory,
        )?;
        self.transition(WorldPhase::Classified);

        grid.build_adjacency();
        self.transition(WorldPhase::GraphBuilt);

        let start = query::first_walkable(&grid);
        if start.is_none() {
            tracing::warn!(%seed, "generated world has no walkable tiles");
        }
        tracing::info!(
            %seed,
            width = grid.width(),
            height = grid.height(),
            walkable = query::walkable_count(&grid),
            spawn_candidates = classification.candidates.total(),
            "generated world"
        );

        self.world = Some(ReadyWorld {
            grid,
            rng,
            seed,
            start,
            candidates: classification.candidates,
            registry: SpawnRegistry::new(),
            objective: None,
            spawners: Vec::new(),
        });
        self.transition(WorldPhase::Ready);
        Ok(())
    }

    /// Discards the current world, if any, and returns to [`WorldPhase::Empty`].
    ///
    /// Every tile of the discarded grid is retired through its factory.
    pub fn cleanup_world(&mut self) {
        if self.world.take().is_some() {
            tracing::debug!("cleaned up world");
        }
        self.pathfinder.forget();
        self.transition(WorldPhase::Empty);
    }

    /// Read-only view of the grid while a world is ready.
    #[must_use]
    pub fn grid(&self) -> Option<&Grid> {
        self.world.as_ref().map(|world| &world.grid)
    }

    /// Seed string the current world was generated from.
    #[must_use]
    pub fn seed(&self) -> Option<&str> {
        self.world.as_ref().map(|world| world.seed.as_str())
    }

    /// First walkable tile in scan order, captured at generation time.
    #[must_use]
    pub fn start(&self) -> Option<TileHandle> {
        self.world.as_ref().and_then(|world| world.start)
    }

    /// Spawners committed so far.
    #[must_use]
    pub fn spawners(&self) -> &[SpawnerDescriptor] {
        self.world
            .as_ref()
            .map(|world| world.spawners.as_slice())
            .unwrap_or(&[])
    }

    /// Registered spawn points.
    #[must_use]
    pub fn spawn_points(&self) -> &[TileCoord] {
        self.world
            .as_ref()
            .map(|world| world.registry.points())
            .unwrap_or(&[])
    }

    /// Tile currently holding the objective structure.
    #[must_use]
    pub fn objective(&self) -> Option<TileHandle> {
        let world = self.world.as_ref()?;
        world
            .objective
            .and_then(|objective| world.grid.handle_at(objective.site))
    }

    /// Walkable tile enemies must reach to attack the objective.
    #[must_use]
    pub fn objective_entrance(&self) -> Option<TileHandle> {
        let world = self.world.as_ref()?;
        world
            .objective
            .and_then(|objective| world.grid.handle_at(objective.entrance))
    }

    /// Finds a shortest route, remembering the outcome for [`Engine::last_solution`].
    pub fn solve(&mut self, begin: TileHandle, destination: TileHandle) -> Option<Route> {
        let Some(world) = self.world.as_ref() else {
            tracing::warn!("cannot solve routes without a ready world");
            return None;
        };
        self.pathfinder.solve(&world.grid, begin, destination)
    }

    /// Result of the most recent search, failures included.
    #[must_use]
    pub fn last_solution(&self) -> Option<&Route> {
        self.pathfinder.last_solution()
    }

    /// Replaces `tile` with a fresh instance carrying the given attributes.
    pub fn swap_tile(
        &mut self,
        tile: TileHandle,
        kind: TileKind,
        destructible: bool,
        walkable: bool,
    ) -> Result<TileHandle, EngineError> {
        let world = self.world.as_mut().ok_or(EngineError::NotReady)?;
        Ok(world.grid.swap(tile, kind, destructible, walkable)?)
    }

    /// Replaces `tile` with the canonical open, walkable kind.
    pub fn clear_tile(&mut self, tile: TileHandle) -> Result<TileHandle, EngineError> {
        let world = self.world.as_mut().ok_or(EngineError::NotReady)?;
        Ok(world.grid.clear(tile)?)
    }

    /// Places up to `count` additional spawners and returns those committed.
    ///
    /// Returning fewer than `count` descriptors is a normal outcome. When an
    /// objective exists the returned descriptors carry their routes.
    pub fn place_spawners(&mut self, count: usize) -> Result<Vec<SpawnerDescriptor>, EngineError> {
        let spawner_kind = self.catalog.spawner;
        let world = self.world.as_mut().ok_or(EngineError::NotReady)?;
        let placed = spawning::place_spawners(
            &mut world.grid,
            &mut world.candidates,
            &mut world.registry,
            &mut self.pathfinder,
            &mut world.rng,
            spawner_kind,
            count,
        );

        let first_new = world.spawners.len();
        world.spawners.extend(placed);
        world.refresh_spawner_routes(&mut self.pathfinder);
        Ok(world.spawners[first_new..].to_vec())
    }

    /// Reports whether every spawn point can reach the objective entrance.
    ///
    /// `false` without a ready world, without an objective, or when the
    /// entrance has become non-walkable.
    pub fn check_objective_accessible(&mut self) -> bool {
        self.world
            .as_ref()
            .is_some_and(|world| world.objective_accessible(&mut self.pathfinder))
    }

    /// Places the objective on `at`, entered from the tile one step toward `facing`.
    ///
    /// The target must be walkable and destructible and the entrance walkable.
    /// The placement is undone when a spawn point could no longer reach the
    /// entrance. A previous objective is removed once the new one is
    /// committed.
    pub fn place_objective(
        &mut self,
        at: TileHandle,
        facing: Direction,
        kind: TileKind,
    ) -> Result<TileHandle, PlacementError> {
        let world = self.world.as_mut().ok_or(PlacementError::NotReady)?;
        let target = world.grid.resolve(at).ok_or(PlacementError::StaleTile)?;
        if !target.is_walkable() {
            return Err(PlacementError::NotWalkable);
        }
        if !target.is_destructible() {
            return Err(PlacementError::NotDestructible);
        }
        let entrance_coord = at
            .coord()
            .step(facing, 1)
            .ok_or(PlacementError::OutOfBounds)?;
        let entrance = world
            .grid
            .tile(entrance_coord)
            .ok_or(PlacementError::OutOfBounds)?;
        if !entrance.is_walkable() {
            return Err(PlacementError::NotWalkable);
        }
        let entrance_handle = entrance.handle();
        // A shared entrance keeps the state recorded before it was first protected.
        let entrance_was_destructible = match world.objective {
            Some(previous) if previous.entrance == entrance_coord => {
                previous.entrance_was_destructible
            }
            _ => entrance.is_destructible(),
        };

        let site = world
            .grid
            .swap(at, kind, false, false)
            .map_err(placement_error)?;
        let previous = world.objective.replace(Objective {
            site: at.coord(),
            entrance: entrance_coord,
            entrance_was_destructible,
        });

        if !world.objective_accessible(&mut self.pathfinder) {
            world.objective = previous;
            if let Err(error) = world.grid.clear(site) {
                tracing::warn!(%error, "failed to roll back rejected objective");
            }
            world.refresh_spawner_routes(&mut self.pathfinder);
            tracing::debug!(site = ?at.coord(), "objective would be unreachable");
            return Err(PlacementError::BlocksObjective);
        }

        world
            .grid
            .set_destructible(entrance_handle, false)
            .map_err(placement_error)?;
        if let Some(previous) = previous {
            remove_objective(&mut world.grid, previous, entrance_coord);
        }
        world.refresh_spawner_routes(&mut self.pathfinder);
        tracing::info!(site = ?at.coord(), entrance = ?entrance_coord, "placed objective");
        Ok(site)
    }

    /// Builds a destructible, non-walkable structure of `kind` on `tile`.
    ///
    /// Rejected when the structure would cut any spawn point off from the
    /// objective; the tile is cleared again in that case.
    pub fn build_structure(
        &mut self,
        tile: TileHandle,
        kind: TileKind,
    ) -> Result<TileHandle, PlacementError> {
        let world = self.world.as_mut().ok_or(PlacementError::NotReady)?;
        if world.objective.is_none() {
            return Err(PlacementError::ObjectiveMissing);
        }
        let target = world.grid.resolve(tile).ok_or(PlacementError::StaleTile)?;
        if !target.is_walkable() {
            return Err(PlacementError::NotWalkable);
        }
        if !target.is_destructible() {
            return Err(PlacementError::NotDestructible);
        }

        let structure = world
            .grid
            .swap(tile, kind, true, false)
            .map_err(placement_error)?;
        if !world.objective_accessible(&mut self.pathfinder) {
            if let Err(error) = world.grid.clear(structure) {
                tracing::warn!(%error, "failed to roll back rejected structure");
            }
            world.refresh_spawner_routes(&mut self.pathfinder);
            tracing::debug!(tile = ?tile.coord(), "structure would block the objective");
            return Err(PlacementError::BlocksObjective);
        }

        world.refresh_spawner_routes(&mut self.pathfinder);
        Ok(structure)
    }

    /// Clears a destructible obstacle or structure.
    pub fn demolish(&mut self, tile: TileHandle) -> Result<Demolition, RemovalError> {
        let world = self.world.as_mut().ok_or(RemovalError::NotReady)?;
        let target = world.grid.resolve(tile).ok_or(RemovalError::StaleTile)?;
        if target.is_walkable() || !target.is_destructible() {
            return Err(RemovalError::NotRemovable);
        }
        let removal_cost = target.removal_cost();

        let cleared = world.grid.clear(tile).map_err(|error| {
            tracing::warn!(%error, "failed to demolish tile");
            RemovalError::StaleTile
        })?;
        world.refresh_spawner_routes(&mut self.pathfinder);
        Ok(Demolition {
            tile: cleared,
            removal_cost,
        })
    }

    /// Recomputes every spawner's route from its exit to the objective entrance.
    ///
    /// Routes are reset to `None` while no objective exists.
    pub fn refresh_spawner_routes(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.refresh_spawner_routes(&mut self.pathfinder);
        }
    }

    fn transition(&mut self, phase: WorldPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "world phase changed");
            self.phase = phase;
        }
    }
}

fn remove_objective(grid: &mut Grid, objective: Objective, live_entrance: TileCoord) {
    if let Some(site) = grid.handle_at(objective.site) {
        if let Err(error) = grid.clear(site) {
            tracing::warn!(%error, "failed to remove previous objective");
        }
    }
    if objective.entrance_was_destructible && objective.entrance != live_entrance {
        if let Some(entrance) = grid.handle_at(objective.entrance) {
            if let Err(error) = grid.set_destructible(entrance, true) {
                tracing::warn!(%error, "failed to release previous objective entrance");
            }
        }
    }
}

const fn placement_error(error: MutationError) -> PlacementError {
    match error {
        MutationError::OutOfBounds(_) => PlacementError::OutOfBounds,
        MutationError::StaleHandle(_) => PlacementError::StaleTile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_engine_is_empty() {
        let mut engine = Engine::default();
        assert_eq!(engine.phase(), WorldPhase::Empty);
        assert!(engine.grid().is_none());
        assert!(engine.seed().is_none());
        assert!(!engine.check_objective_accessible());
        assert!(engine.spawners().is_empty());
    }

    #[test]
    fn invalid_catalog_is_rejected() {
        let catalog = TileCatalog {
            obstacles: Vec::new(),
            ..TileCatalog::default()
        };
        assert!(matches!(
            Engine::new(catalog),
            Err(EngineError::Catalog(CatalogError::NoObstacleKinds))
        ));
    }

    #[test]
    fn operations_before_generation_are_rejected() {
        let mut engine = Engine::default();
        let handle = TileHandle::new(
            TileCoord::new(0, 0),
            island_defence_core::InstanceId::new(0),
        );

        assert!(matches!(engine.place_spawners(2), Err(EngineError::NotReady)));
        assert!(matches!(engine.clear_tile(handle), Err(EngineError::NotReady)));
        assert!(engine.solve(handle, handle).is_none());
        assert_eq!(
            engine.build_structure(handle, TileKind::new(30)),
            Err(PlacementError::NotReady)
        );
        assert_eq!(engine.demolish(handle), Err(RemovalError::NotReady));
    }

    #[test]
    fn mutation_errors_map_to_placement_rejections() {
        let coord = TileCoord::new(3, 4);
        let handle = TileHandle::new(coord, island_defence_core::InstanceId::new(9));
        assert_eq!(
            placement_error(MutationError::StaleHandle(handle)),
            PlacementError::StaleTile
        );
        assert_eq!(
            placement_error(MutationError::OutOfBounds(coord)),
            PlacementError::OutOfBounds
        );
    }
}
