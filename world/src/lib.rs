#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative tile grid for Island Defence.
//!
//! The [`Grid`] exclusively owns every [`Tile`] instance. Tiles refer to their
//! neighbours through non-owning [`TileHandle`] values, and the grid keeps
//! those references symmetric: after [`Grid::build_adjacency`] runs once,
//! [`Grid::swap`] and [`Grid::clear`] patch adjacency in place so no full
//! rebuild is ever required.

mod graph;
mod tile;

use glam::Vec2;
use island_defence_core::{InstanceId, TileCoord, TileHandle, TileKind, TileSpec};
use thiserror::Error;

pub use tile::{HeadlessTiles, Tile, TileFactory};

/// Errors raised while constructing a grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The number of tile specs does not match the grid area.
    #[error("expected {expected} tile specs for the grid, got {actual}")]
    SpecCount {
        /// Tiles required by the grid dimensions.
        expected: usize,
        /// Specs supplied by the caller.
        actual: usize,
    },
}

/// Errors raised by tile mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The coordinate lies outside the grid.
    #[error("tile {0:?} lies outside the grid")]
    OutOfBounds(TileCoord),
    /// The handle refers to an instance that has already been replaced.
    #[error("tile handle {0:?} no longer refers to a live instance")]
    StaleHandle(TileHandle),
}

/// Two-dimensional collection of tiles plus the adjacency graph over them.
#[derive(Debug)]
pub struct Grid {
    width: u32,
    height: u32,
    tile_length: f32,
    origin: Vec2,
    clear_kind: TileKind,
    tiles: Vec<Tile>,
    next_instance: u64,
    factory: Box<dyn TileFactory>,
}

impl Grid {
    /// Creates a grid from tile specs supplied in scan order.
    ///
    /// Scan order visits columns outermost and rows innermost, so the `TileSpec`
    /// for `(x, y)` lives at `x * height + y`. The grid is centred on the
    /// world origin. Adjacency is left empty until [`Grid::build_adjacency`]
    /// runs.
    pub fn from_specs(
        width: u32,
        height: u32,
        tile_length: f32,
        clear_kind: TileKind,
        specs: Vec<TileSpec>,
        factory: Box<dyn TileFactory>,
    ) -> Result<Self, GridError> {
        let expected = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(usize::MAX);
        if specs.len() != expected {
            return Err(GridError::SpecCount {
                expected,
                actual: specs.len(),
            });
        }

        let origin = Vec2::new(
            -((width / 2) as f32 * tile_length),
            -((height / 2) as f32 * tile_length),
        );
        let mut grid = Self {
            width,
            height,
            tile_length,
            origin,
            clear_kind,
            tiles: Vec::with_capacity(expected),
            next_instance: 0,
            factory,
        };

        let coords = (0..width).flat_map(|x| (0..height).map(move |y| TileCoord::new(x, y)));
        for (coord, spec) in coords.zip(specs) {
            let handle = TileHandle::new(coord, grid.allocate_instance());
            let tile = Tile::new(handle, grid.center_of(coord), &spec);
            grid.factory.instantiate(&tile);
            grid.tiles.push(tile);
        }

        Ok(grid)
    }

    /// Links every tile to its up to four orthogonal in-bounds neighbours.
    ///
    /// Needs to run once after construction; mutations keep the graph
    /// consistent afterwards.
    pub fn build_adjacency(&mut self) {
        let (width, height) = (self.width, self.height);
        for index in 0..self.tiles.len() {
            let coord = self.tiles[index].coord();
            let neighbors = graph::orthogonal_neighbors(coord, width, height)
                .filter_map(|neighbor| self.handle_at(neighbor))
                .collect();
            self.tiles[index].set_neighbors(neighbors);
        }
        tracing::debug!(
            width,
            height,
            tiles = self.tiles.len(),
            "built tile adjacency"
        );
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Edge length of a tile, which is also the cost of every adjacency edge.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Kind installed by [`Grid::clear`].
    #[must_use]
    pub const fn clear_kind(&self) -> TileKind {
        self.clear_kind
    }

    /// Total number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the grid holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Reports whether `coord` lies inside the grid.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x() < self.width && coord.y() < self.height
    }

    /// Dense scan-order index of `coord`, suitable for per-tile side tables.
    #[must_use]
    pub fn scan_index(&self, coord: TileCoord) -> Option<usize> {
        graph::scan_index(self.width, self.height, coord)
    }

    /// Tile currently occupying `coord`.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.scan_index(coord).and_then(|index| self.tiles.get(index))
    }

    /// Tile referenced by `handle`, or `None` once that instance was retired.
    #[must_use]
    pub fn resolve(&self, handle: TileHandle) -> Option<&Tile> {
        self.tile(handle.coord())
            .filter(|tile| tile.instance() == handle.instance())
    }

    /// Handle of the instance currently occupying `coord`.
    #[must_use]
    pub fn handle_at(&self, coord: TileCoord) -> Option<TileHandle> {
        self.tile(coord).map(Tile::handle)
    }

    /// Iterates every tile in scan order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Tile whose footprint covers the world-space `point`.
    #[must_use]
    pub fn tile_at_position(&self, point: Vec2) -> Option<&Tile> {
        let local = (point - self.origin) / self.tile_length;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let coord = TileCoord::new(local.x.floor() as u32, local.y.floor() as u32);
        self.tile(coord)
    }

    /// Replaces the tile referenced by `handle` with a fresh instance.
    ///
    /// The new instance keeps the coordinate, world position, and adjacency
    /// list of the old one; every neighbour's back-reference is redirected
    /// before the old instance is retired. Cost is proportional to the
    /// neighbour count, never to grid size.
    pub fn swap(
        &mut self,
        handle: TileHandle,
        kind: TileKind,
        destructible: bool,
        walkable: bool,
    ) -> Result<TileHandle, MutationError> {
        let index = self.live_index(handle)?;
        let replacement = TileHandle::new(handle.coord(), self.allocate_instance());
        let spec = TileSpec {
            kind,
            walkable,
            destructible,
            removal_cost: None,
        };

        let mut tile = Tile::new(replacement, self.tiles[index].position(), &spec);
        tile.set_neighbors(self.tiles[index].take_neighbors());

        for neighbor in tile.neighbors() {
            if let Some(neighbor_index) = self.scan_index(neighbor.coord()) {
                self.tiles[neighbor_index].redirect_neighbor(handle, replacement);
            }
        }

        let retired = std::mem::replace(&mut self.tiles[index], tile);
        self.factory.instantiate(&self.tiles[index]);
        self.factory.retire(&retired);

        tracing::trace!(
            coord = ?handle.coord(),
            kind = kind.get(),
            walkable,
            destructible,
            "swapped tile"
        );
        Ok(replacement)
    }

    /// Swaps the tile for the canonical open, walkable, destructible kind.
    pub fn clear(&mut self, handle: TileHandle) -> Result<TileHandle, MutationError> {
        self.swap(handle, self.clear_kind, true, true)
    }

    /// Protects or unprotects a tile from player edits in place.
    pub fn set_destructible(
        &mut self,
        handle: TileHandle,
        destructible: bool,
    ) -> Result<(), MutationError> {
        let index = self.live_index(handle)?;
        self.tiles[index].set_destructible(destructible);
        Ok(())
    }

    fn live_index(&self, handle: TileHandle) -> Result<usize, MutationError> {
        let index = self
            .scan_index(handle.coord())
            .ok_or(MutationError::OutOfBounds(handle.coord()))?;
        if self.tiles[index].instance() != handle.instance() {
            return Err(MutationError::StaleHandle(handle));
        }
        Ok(index)
    }

    fn allocate_instance(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_instance);
        self.next_instance += 1;
        id
    }

    fn center_of(&self, coord: TileCoord) -> Vec2 {
        let half = self.tile_length / 2.0;
        self.origin
            + Vec2::new(
                coord.x() as f32 * self.tile_length + half,
                coord.y() as f32 * self.tile_length + half,
            )
    }
}

impl Drop for Grid {
    fn drop(&mut self) {
        for tile in &self.tiles {
            self.factory.retire(tile);
        }
        tracing::trace!(tiles = self.tiles.len(), "retired grid");
    }
}

/// Query functions that provide read-only access to grid state.
pub mod query {
    use island_defence_core::{InstanceId, TileHandle};

    use super::Grid;

    /// First walkable tile in scan order, used as the world's start tile.
    #[must_use]
    pub fn first_walkable(grid: &Grid) -> Option<TileHandle> {
        grid.tiles()
            .find(|tile| tile.is_walkable())
            .map(|tile| tile.handle())
    }

    /// Number of walkable tiles in the grid.
    #[must_use]
    pub fn walkable_count(grid: &Grid) -> usize {
        grid.tiles().filter(|tile| tile.is_walkable()).count()
    }

    /// Verifies that every adjacency entry is live and mirrored.
    #[must_use]
    pub fn adjacency_is_symmetric(grid: &Grid) -> bool {
        grid.tiles().all(|tile| {
            tile.neighbors().iter().all(|neighbor| {
                grid.resolve(*neighbor)
                    .is_some_and(|other| other.neighbors().contains(&tile.handle()))
            })
        })
    }

    /// Reports whether any adjacency entry still points at `instance`.
    #[must_use]
    pub fn is_referenced(grid: &Grid, instance: InstanceId) -> bool {
        grid.tiles().any(|tile| {
            tile.neighbors()
                .iter()
                .any(|neighbor| neighbor.instance() == instance)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_spec() -> TileSpec {
        TileSpec {
            kind: TileKind::new(15),
            walkable: true,
            destructible: true,
            removal_cost: None,
        }
    }

    fn open_grid(width: u32, height: u32) -> Grid {
        let specs = vec![open_spec(); (width * height) as usize];
        let mut grid = Grid::from_specs(
            width,
            height,
            10.0,
            TileKind::new(15),
            specs,
            Box::new(HeadlessTiles),
        )
        .expect("grid builds");
        grid.build_adjacency();
        grid
    }

    #[test]
    fn from_specs_rejects_wrong_spec_count() {
        let error = Grid::from_specs(
            2,
            2,
            10.0,
            TileKind::new(15),
            vec![open_spec(); 3],
            Box::new(HeadlessTiles),
        )
        .expect_err("spec count mismatch");
        assert_eq!(
            error,
            GridError::SpecCount {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn adjacency_links_orthogonal_neighbours_only() {
        let grid = open_grid(3, 3);
        let center = grid.tile(TileCoord::new(1, 1)).expect("center tile");
        assert_eq!(center.neighbors().len(), 4);
        assert!(!center.is_adjacent_to(TileCoord::new(0, 0)));
        assert_eq!(
            grid.tile(TileCoord::new(0, 0))
                .expect("corner tile")
                .neighbors()
                .len(),
            2
        );
        assert!(query::adjacency_is_symmetric(&grid));
    }

    #[test]
    fn tiles_are_centred_on_world_origin() {
        let grid = open_grid(4, 4);
        let tile = grid.tile(TileCoord::new(2, 2)).expect("tile");
        assert_eq!(tile.position(), Vec2::new(5.0, 5.0));
        let first = grid.tile(TileCoord::new(0, 0)).expect("tile");
        assert_eq!(first.position(), Vec2::new(-15.0, -15.0));
    }

    #[test]
    fn tile_at_position_maps_world_points_back_to_tiles() {
        let grid = open_grid(4, 4);
        let tile = grid
            .tile_at_position(Vec2::new(7.5, -12.0))
            .expect("point inside grid");
        assert_eq!(tile.coord(), TileCoord::new(2, 0));
        assert!(grid.tile_at_position(Vec2::new(-25.0, 0.0)).is_none());
        assert!(grid.tile_at_position(Vec2::new(0.0, 25.0)).is_none());
    }

    #[test]
    fn swap_redirects_every_back_reference() {
        let mut grid = open_grid(3, 3);
        let old = grid.handle_at(TileCoord::new(1, 1)).expect("handle");

        let new = grid
            .swap(old, TileKind::new(23), false, false)
            .expect("swap succeeds");

        assert_eq!(new.coord(), old.coord());
        assert_ne!(new.instance(), old.instance());
        assert!(grid.resolve(old).is_none());
        assert!(!query::is_referenced(&grid, old.instance()));
        assert!(query::adjacency_is_symmetric(&grid));

        let tile = grid.resolve(new).expect("new instance is live");
        assert_eq!(tile.kind(), TileKind::new(23));
        assert!(!tile.is_walkable());
        assert!(!tile.is_destructible());
        assert_eq!(tile.neighbors().len(), 4);
    }

    #[test]
    fn swap_with_stale_handle_is_rejected() {
        let mut grid = open_grid(2, 2);
        let old = grid.handle_at(TileCoord::new(0, 0)).expect("handle");
        let _ = grid.clear(old).expect("first clear");

        assert_eq!(
            grid.clear(old),
            Err(MutationError::StaleHandle(old)),
            "retired handles must not mutate the grid"
        );
    }

    #[test]
    fn clear_installs_open_walkable_tile() {
        let mut grid = open_grid(2, 2);
        let old = grid.handle_at(TileCoord::new(1, 0)).expect("handle");
        let blocked = grid
            .swap(old, TileKind::new(20), true, false)
            .expect("swap");
        let cleared = grid.clear(blocked).expect("clear");

        let tile = grid.resolve(cleared).expect("live");
        assert_eq!(tile.kind(), grid.clear_kind());
        assert!(tile.is_walkable());
        assert!(tile.is_destructible());
    }

    #[test]
    fn first_walkable_follows_scan_order() {
        let mut specs = vec![TileSpec::boundary(TileKind::new(0)); 9];
        specs[4] = open_spec();
        specs[7] = open_spec();
        let grid = Grid::from_specs(
            3,
            3,
            10.0,
            TileKind::new(15),
            specs,
            Box::new(HeadlessTiles),
        )
        .expect("grid builds");

        let start = query::first_walkable(&grid).expect("walkable tile exists");
        assert_eq!(start.coord(), TileCoord::new(1, 1));
        assert_eq!(query::walkable_count(&grid), 2);
    }
}
