#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Island Defence engine.
//!
//! This crate defines the vocabulary that connects the terrain generator,
//! the tile classifier, the authoritative tile grid, and the search and
//! placement systems built on top of it. Collaborators outside the engine
//! (renderers, input handling, wave logic) only ever see the types declared
//! here together with the read-only grid view exposed by the world crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of shapes produced by the four-corner contour lookup.
pub const CONTOUR_SHAPE_COUNT: usize = 16;

/// Contour index describing a cell whose four corners are all filled.
pub const OPEN_GROUND_CONTOUR: u8 = 15;

/// Lifecycle of a generated world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorldPhase {
    /// No world exists; only generation is permitted.
    Empty,
    /// The occupancy mask is being synthesised.
    Generating,
    /// Tiles exist but carry no adjacency yet.
    Classified,
    /// Adjacency has been derived for every tile.
    GraphBuilt,
    /// The world accepts searches, mutations, and spawner placement.
    Ready,
}

/// Cardinal directions on the tile grid.
///
/// The grid's `y` axis points north, so `North` increases `y` and `South`
/// decreases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward increasing `y`.
    North,
    /// Toward increasing `x`.
    East,
    /// Toward decreasing `y`.
    South,
    /// Toward decreasing `x`.
    West,
}

impl Direction {
    /// Every direction in a stable order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Signed `(dx, dy)` offset of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Dense index in `0..4`, matching the position in [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }
}

/// Immutable grid coordinate of a tile.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the tile, growing northward.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Coordinate `distance` steps away in `direction`.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant.
    /// Upper bounds are the grid's concern.
    #[must_use]
    pub fn step(self, direction: Direction, distance: u32) -> Option<TileCoord> {
        let (dx, dy) = direction.delta();
        let x = i64::from(self.x) + dx * i64::from(distance);
        let y = i64::from(self.y) + dy * i64::from(distance);
        Some(TileCoord::new(
            u32::try_from(x).ok()?,
            u32::try_from(y).ok()?,
        ))
    }
}

/// Identifier distinguishing successive tile instances at one coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Creates a new instance identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Non-owning reference to a specific tile instance.
///
/// A handle goes stale as soon as the tile at its coordinate is swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileHandle {
    coord: TileCoord,
    instance: InstanceId,
}

impl TileHandle {
    /// Creates a handle for the provided coordinate and instance.
    #[must_use]
    pub const fn new(coord: TileCoord, instance: InstanceId) -> Self {
        Self { coord, instance }
    }

    /// Coordinate occupied by the referenced instance.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Instance the handle was issued for.
    #[must_use]
    pub const fn instance(&self) -> InstanceId {
        self.instance
    }
}

/// Catalog identifier for a renderable tile kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileKind(u32);

impl TileKind {
    /// Creates a new tile kind identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the kind.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Attributes a tile is created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileSpec {
    /// Catalog kind the host instantiates.
    pub kind: TileKind,
    /// Whether entities may traverse the tile.
    pub walkable: bool,
    /// Whether player edits may replace the tile.
    pub destructible: bool,
    /// Cost of removing the tile, present only on obstacles.
    pub removal_cost: Option<u32>,
}

impl TileSpec {
    /// Fixed boundary shape: never walkable, never destructible.
    #[must_use]
    pub const fn boundary(kind: TileKind) -> Self {
        Self {
            kind,
            walkable: false,
            destructible: false,
            removal_cost: None,
        }
    }
}

/// Tile kinds supplied by the host when configuring generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCatalog {
    /// Open-ground kinds that entities may traverse.
    pub walkable: Vec<TileKind>,
    /// Open-ground obstacle kinds that block traversal but may be removed.
    pub obstacles: Vec<TileKind>,
    /// Boundary shapes indexed by contour index.
    pub contours: [TileKind; CONTOUR_SHAPE_COUNT],
    /// Structure placed in front of every enemy entry point.
    pub spawner: TileKind,
    /// Structure representing the player's objective.
    pub objective: TileKind,
}

impl TileCatalog {
    /// Shape for the provided contour index.
    ///
    /// # Panics
    ///
    /// Panics when `index` is not a four-bit value.
    #[must_use]
    pub fn contour(&self, index: u8) -> TileKind {
        self.contours[usize::from(index)]
    }

    /// Canonical fully open, walkable kind used when a tile is cleared.
    #[must_use]
    pub fn clear_kind(&self) -> TileKind {
        self.contour(OPEN_GROUND_CONTOUR)
    }

    /// Checks that every pool the classifier samples from is populated.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.walkable.is_empty() {
            return Err(CatalogError::NoWalkableKinds);
        }
        if self.obstacles.is_empty() {
            return Err(CatalogError::NoObstacleKinds);
        }
        Ok(())
    }
}

impl Default for TileCatalog {
    fn default() -> Self {
        let mut contours = [TileKind::new(0); CONTOUR_SHAPE_COUNT];
        for (index, slot) in contours.iter_mut().enumerate() {
            *slot = TileKind::new(index as u32);
        }

        Self {
            walkable: vec![TileKind::new(16), TileKind::new(17), TileKind::new(18)],
            obstacles: vec![
                TileKind::new(19),
                TileKind::new(20),
                TileKind::new(21),
                TileKind::new(22),
            ],
            contours,
            spawner: TileKind::new(23),
            objective: TileKind::new(24),
        }
    }
}

/// Reasons a [`TileCatalog`] cannot drive classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No walkable open-ground kinds were provided.
    #[error("tile catalog contains no walkable kinds")]
    NoWalkableKinds,
    /// No obstacle open-ground kinds were provided.
    #[error("tile catalog contains no obstacle kinds")]
    NoObstacleKinds,
}

/// Parameters driving terrain synthesis and classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed string; empty means a fresh seed is drawn per generation.
    pub seed: String,
    /// Width of the base-resolution occupancy mask.
    pub base_width: u32,
    /// Height of the base-resolution occupancy mask.
    pub base_height: u32,
    /// Cells from each edge forced empty before random fill.
    pub border_thickness: u32,
    /// Probability that an interior base cell starts filled.
    pub fill_ratio: f32,
    /// Probability that an open-ground tile is walkable rather than an obstacle.
    pub accessible_ratio: f32,
    /// Majority-rule rounds applied at base resolution.
    pub smooth_iterations: u32,
    /// Nearest-neighbour replication factor applied after base smoothing.
    pub upscale_factor: u32,
    /// Majority-rule rounds applied after upscaling.
    pub post_upscale_smooth_iterations: u32,
    /// Edge length of a tile in world units.
    pub tile_length: f32,
    /// Cost recorded on every open-ground obstacle.
    pub obstacle_removal_cost: u32,
}

impl WorldConfig {
    /// Returns a copy of the configuration pinned to `seed`.
    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Size of the upscaled occupancy mask.
    #[must_use]
    pub fn mask_dimensions(&self) -> (u32, u32) {
        (
            self.base_width.saturating_mul(self.upscale_factor),
            self.base_height.saturating_mul(self.upscale_factor),
        )
    }

    /// Size of the classified tile grid, one less than the mask per axis.
    #[must_use]
    pub fn grid_dimensions(&self) -> (u32, u32) {
        let (width, height) = self.mask_dimensions();
        (width.saturating_sub(1), height.saturating_sub(1))
    }

    /// Rejects parameter combinations that cannot produce a grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fill_ratio) {
            return Err(ConfigError::RatioOutOfRange {
                field: "fill_ratio",
                value: self.fill_ratio,
            });
        }
        if !(0.0..=1.0).contains(&self.accessible_ratio) {
            return Err(ConfigError::RatioOutOfRange {
                field: "accessible_ratio",
                value: self.accessible_ratio,
            });
        }
        if self.upscale_factor == 0 {
            return Err(ConfigError::ZeroUpscaleFactor);
        }
        if !self.tile_length.is_finite() || self.tile_length <= 0.0 {
            return Err(ConfigError::InvalidTileLength(self.tile_length));
        }
        let (width, height) = self.grid_dimensions();
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid {
                base_width: self.base_width,
                base_height: self.base_height,
                upscale_factor: self.upscale_factor,
            });
        }
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: String::new(),
            base_width: 20,
            base_height: 20,
            border_thickness: 2,
            fill_ratio: 0.45,
            accessible_ratio: 0.8,
            smooth_iterations: 5,
            upscale_factor: 3,
            post_upscale_smooth_iterations: 2,
            tile_length: 10.0,
            obstacle_removal_cost: 10,
        }
    }
}

/// Reasons a [`WorldConfig`] is rejected before generation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A probability lies outside `[0, 1]`.
    #[error("{field} must lie within [0, 1], got {value}")]
    RatioOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// The upscale factor was zero.
    #[error("upscale_factor must be at least 1")]
    ZeroUpscaleFactor,
    /// The tile edge length was not a positive finite number.
    #[error("tile_length must be positive and finite, got {0}")]
    InvalidTileLength(f32),
    /// The configured sizes leave no tiles after trimming.
    #[error(
        "a {base_width}x{base_height} base mask upscaled by {upscale_factor} produces no tiles"
    )]
    EmptyGrid {
        /// Configured base width.
        base_width: u32,
        /// Configured base height.
        base_height: u32,
        /// Configured upscale factor.
        upscale_factor: u32,
    },
}

/// Ordered sequence of tiles from a start to a destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    tiles: Vec<TileHandle>,
}

impl Route {
    /// Creates a route from tiles ordered start first.
    #[must_use]
    pub fn from_tiles(tiles: Vec<TileHandle>) -> Self {
        Self { tiles }
    }

    /// Tiles composing the route, start first.
    #[must_use]
    pub fn tiles(&self) -> &[TileHandle] {
        &self.tiles
    }

    /// Number of tiles on the route, both endpoints included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the route holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// First tile of the route.
    #[must_use]
    pub fn start(&self) -> Option<TileHandle> {
        self.tiles.first().copied()
    }

    /// Last tile of the route.
    #[must_use]
    pub fn destination(&self) -> Option<TileHandle> {
        self.tiles.last().copied()
    }

    /// Reports whether the route passes through `coord`.
    #[must_use]
    pub fn visits(&self, coord: TileCoord) -> bool {
        self.tiles.iter().any(|tile| tile.coord() == coord)
    }
}

/// Enemy entry point committed by spawner placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnerDescriptor {
    /// Spawner structure tile enemies appear on.
    pub entry: TileHandle,
    /// Walkable tile just inside the entry.
    pub exit: TileHandle,
    /// Route from `exit` to the objective, once one is known.
    pub route: Option<Route>,
}

/// Edge-facing tiles eligible for spawner placement, one queue per face.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpawnCandidates {
    queues: [Vec<TileCoord>; 4],
}

impl SpawnCandidates {
    /// Appends a candidate facing `direction`.
    pub fn push(&mut self, direction: Direction, coord: TileCoord) {
        self.queues[direction.index()].push(coord);
    }

    /// Removes and returns the candidate at `index` in the `direction` queue.
    pub fn take(&mut self, direction: Direction, index: usize) -> Option<TileCoord> {
        let queue = &mut self.queues[direction.index()];
        if index < queue.len() {
            Some(queue.swap_remove(index))
        } else {
            None
        }
    }

    /// Candidates remaining for `direction`.
    #[must_use]
    pub fn queue(&self, direction: Direction) -> &[TileCoord] {
        &self.queues[direction.index()]
    }

    /// Number of candidates remaining for `direction`.
    #[must_use]
    pub fn len(&self, direction: Direction) -> usize {
        self.queues[direction.index()].len()
    }

    /// Total number of candidates across every face.
    #[must_use]
    pub fn total(&self) -> usize {
        self.queues.iter().map(Vec::len).sum()
    }

    /// Reports whether every queue has been drained.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.queues.iter().all(Vec::is_empty)
    }
}

/// Reasons a structure placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// No world is ready for edits.
    NotReady,
    /// The handle refers to a tile that has since been replaced.
    StaleTile,
    /// The requested tile or its entrance lies outside the grid.
    OutOfBounds,
    /// The requested tile (or objective entrance) is not walkable.
    NotWalkable,
    /// The requested tile is protected from edits.
    NotDestructible,
    /// Structures require an objective to validate against.
    ObjectiveMissing,
    /// The placement would cut a spawn point off from the objective.
    BlocksObjective,
}

/// Reasons a removal request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No world is ready for edits.
    NotReady,
    /// The handle refers to a tile that has since been replaced.
    StaleTile,
    /// Only destructible, non-walkable tiles can be removed.
    NotRemovable,
}
