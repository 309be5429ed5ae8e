//! Tile records owned by the grid and the host instancing hook.

use std::fmt;

use glam::Vec2;
use island_defence_core::{InstanceId, TileCoord, TileHandle, TileKind, TileSpec};

/// A single tile instance occupying one grid coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    handle: TileHandle,
    kind: TileKind,
    position: Vec2,
    walkable: bool,
    destructible: bool,
    removal_cost: Option<u32>,
    neighbors: Vec<TileHandle>,
}

impl Tile {
    pub(crate) fn new(handle: TileHandle, position: Vec2, spec: &TileSpec) -> Self {
        Self {
            handle,
            kind: spec.kind,
            position,
            walkable: spec.walkable,
            destructible: spec.destructible,
            removal_cost: spec.removal_cost,
            neighbors: Vec::new(),
        }
    }

    /// Handle identifying this exact instance.
    #[must_use]
    pub const fn handle(&self) -> TileHandle {
        self.handle
    }

    /// Grid coordinate of the tile.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.handle.coord()
    }

    /// Instance identifier of the tile.
    #[must_use]
    pub const fn instance(&self) -> InstanceId {
        self.handle.instance()
    }

    /// Catalog kind the tile was created from.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.kind
    }

    /// Centre of the tile in world units.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether entities may traverse the tile.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Whether player edits may replace the tile.
    #[must_use]
    pub const fn is_destructible(&self) -> bool {
        self.destructible
    }

    /// Removal cost recorded for open-ground obstacles.
    #[must_use]
    pub const fn removal_cost(&self) -> Option<u32> {
        self.removal_cost
    }

    /// Adjacent tile instances. Order carries no meaning.
    #[must_use]
    pub fn neighbors(&self) -> &[TileHandle] {
        &self.neighbors
    }

    /// Reports whether the tile at `coord` is a direct neighbour.
    #[must_use]
    pub fn is_adjacent_to(&self, coord: TileCoord) -> bool {
        self.neighbors.iter().any(|neighbor| neighbor.coord() == coord)
    }

    pub(crate) fn set_neighbors(&mut self, neighbors: Vec<TileHandle>) {
        self.neighbors = neighbors;
    }

    pub(crate) fn take_neighbors(&mut self) -> Vec<TileHandle> {
        std::mem::take(&mut self.neighbors)
    }

    pub(crate) fn redirect_neighbor(&mut self, from: TileHandle, to: TileHandle) {
        for entry in self.neighbors.iter_mut().filter(|entry| **entry == from) {
            *entry = to;
        }
    }

    pub(crate) fn set_destructible(&mut self, destructible: bool) {
        self.destructible = destructible;
    }
}

/// Host capability notified whenever the grid creates or retires a tile.
///
/// Engines that attach visuals to tiles implement this to instantiate and
/// destroy their presentation objects. The grid remains the sole owner of
/// tile state either way.
pub trait TileFactory: fmt::Debug {
    /// Called after `tile` has been created and stored in the grid.
    fn instantiate(&mut self, tile: &Tile) {
        let _ = tile;
    }

    /// Called once `tile` has been detached and no neighbour references it,
    /// and for every remaining tile when the grid is dropped.
    fn retire(&mut self, tile: &Tile) {
        let _ = tile;
    }
}

/// Factory for headless use; performs no host-side work.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessTiles;

impl TileFactory for HeadlessTiles {}
