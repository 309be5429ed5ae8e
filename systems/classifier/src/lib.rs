#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Contour classification turning an occupancy mask into typed tiles.
//!
//! Every tile samples the four mask corners surrounding it and derives a
//! four-bit contour index. Fully enclosed tiles become open ground, sampled
//! as walkable floor or removable obstacle; every other index maps to a
//! fixed, impassable boundary shape. Boundary tiles with a single open face
//! are queued as spawn candidates for that face.

use island_defence_core::{
    CatalogError, Direction, SpawnCandidates, TileCatalog, TileCoord, TileSpec, WorldConfig,
    OPEN_GROUND_CONTOUR,
};
use island_defence_system_terrain::OccupancyMask;
use rand::Rng;

/// Weights of the four corners, in `(x, y)`, `(x+1, y)`, `(x+1, y+1)`, `(x, y+1)` order.
const CORNER_WEIGHTS: [(u32, u32, u8); 4] = [(0, 0, 1), (1, 0, 2), (1, 1, 4), (0, 1, 8)];

/// Parameters sampled while classifying open ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifierParams {
    /// Probability that an open-ground tile is walkable.
    pub accessible_ratio: f32,
    /// Cost recorded on open-ground obstacles.
    pub obstacle_removal_cost: u32,
}

impl From<&WorldConfig> for ClassifierParams {
    fn from(config: &WorldConfig) -> Self {
        Self {
            accessible_ratio: config.accessible_ratio,
            obstacle_removal_cost: config.obstacle_removal_cost,
        }
    }
}

/// Typed tiles derived from a mask, ready to populate a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// Number of tile columns, one less than the mask width.
    pub width: u32,
    /// Number of tile rows, one less than the mask height.
    pub height: u32,
    /// Tile specs in scan order (columns outermost).
    pub specs: Vec<TileSpec>,
    /// Edge-facing tiles eligible for spawner placement.
    pub candidates: SpawnCandidates,
}

/// Computes the contour index of the tile whose lower-left corner is `(x, y)`.
#[must_use]
pub fn contour_index(mask: &OccupancyMask, x: u32, y: u32) -> u8 {
    CORNER_WEIGHTS
        .iter()
        .filter(|(dx, dy, _)| mask.is_filled(x + dx, y + dy))
        .map(|(_, _, weight)| weight)
        .sum()
}

/// Face a contour shape opens toward, for shapes with exactly one open face.
#[must_use]
pub const fn spawn_face(index: u8) -> Option<Direction> {
    match index {
        3 => Some(Direction::South),
        6 => Some(Direction::East),
        9 => Some(Direction::West),
        12 => Some(Direction::North),
        _ => None,
    }
}

/// Classifies every tile of `mask`.
///
/// Tiles are visited in scan order so the generator is consumed
/// deterministically. Open-ground tiles draw walkability and then a kind from
/// the matching catalog pool.
pub fn classify<R>(
    mask: &OccupancyMask,
    catalog: &TileCatalog,
    params: ClassifierParams,
    rng: &mut R,
) -> Result<Classification, CatalogError>
where
    R: Rng + ?Sized,
{
    catalog.validate()?;

    let width = mask.width().saturating_sub(1);
    let height = mask.height().saturating_sub(1);
    let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
    let mut specs = Vec::with_capacity(capacity);
    let mut candidates = SpawnCandidates::default();
    let accessible = f64::from(params.accessible_ratio);

    for x in 0..width {
        for y in 0..height {
            let index = contour_index(mask, x, y);
            if index == OPEN_GROUND_CONTOUR {
                let walkable = rng.gen::<f64>() < accessible;
                let pool = if walkable {
                    &catalog.walkable
                } else {
                    &catalog.obstacles
                };
                let kind = pool[rng.gen_range(0..pool.len())];
                specs.push(TileSpec {
                    kind,
                    walkable,
                    destructible: true,
                    removal_cost: (!walkable).then_some(params.obstacle_removal_cost),
                });
                continue;
            }

            if let Some(face) = spawn_face(index) {
                candidates.push(face, TileCoord::new(x, y));
            }
            specs.push(TileSpec::boundary(catalog.contour(index)));
        }
    }

    tracing::debug!(
        width,
        height,
        spawn_candidates = candidates.total(),
        "classified occupancy mask"
    );

    Ok(Classification {
        width,
        height,
        specs,
        candidates,
    })
}
