#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic terrain synthesis producing island-like occupancy masks.
//!
//! Generation runs in four stages: a seeded random fill with an empty
//! border, majority-rule smoothing at base resolution, nearest-neighbour
//! upscaling, and further smoothing at full resolution. Given the same seed
//! string and parameters the resulting mask is bit-identical.

use island_defence_core::WorldConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Number of filled neighbours at which a cell keeps its current state.
const MAJORITY_PIVOT: u8 = 4;

/// Parameters controlling terrain synthesis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainParams {
    /// Width of the base-resolution mask.
    pub base_width: u32,
    /// Height of the base-resolution mask.
    pub base_height: u32,
    /// Cells from each edge forced empty during random fill.
    pub border_thickness: u32,
    /// Probability that an interior cell starts filled.
    pub fill_ratio: f32,
    /// Smoothing rounds at base resolution.
    pub smooth_iterations: u32,
    /// Replication factor applied in both axes.
    pub upscale_factor: u32,
    /// Smoothing rounds at full resolution.
    pub post_upscale_smooth_iterations: u32,
}

impl From<&WorldConfig> for TerrainParams {
    fn from(config: &WorldConfig) -> Self {
        Self {
            base_width: config.base_width,
            base_height: config.base_height,
            border_thickness: config.border_thickness,
            fill_ratio: config.fill_ratio,
            smooth_iterations: config.smooth_iterations,
            upscale_factor: config.upscale_factor,
            post_upscale_smooth_iterations: config.post_upscale_smooth_iterations,
        }
    }
}

/// Binary occupancy grid sampled at tile corners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl OccupancyMask {
    /// Creates an all-empty mask.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; cell_count(width, height)],
        }
    }

    /// Creates a mask whose cell `(x, y)` is `filled(x, y)`.
    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, mut filled: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut mask = Self::empty(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.set(x, y, filled(x, y));
            }
        }
        mask
    }

    /// Number of columns in the mask.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the mask.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether `(x, y)` is filled. Out-of-bounds cells read as empty.
    #[must_use]
    pub fn is_filled(&self, x: u32, y: u32) -> bool {
        self.index(x, y)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    /// Number of filled cells.
    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    fn set(&mut self, x: u32, y: u32, filled: bool) {
        if let Some(index) = self.index(x, y) {
            self.cells[index] = filled;
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(y * width + x)
    }
}

/// Hashes a seed string into the 64-bit seed driving generation.
#[must_use]
pub fn seed_from_str(seed: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Creates the generator owned by one world's generation and placement.
#[must_use]
pub fn rng_for_seed(seed: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed_from_str(seed))
}

/// Draws a fresh seed string for worlds configured without one.
#[must_use]
pub fn fresh_seed() -> String {
    rand::thread_rng().gen::<u64>().to_string()
}

/// Runs the full synthesis pipeline and returns the upscaled mask.
///
/// The mask measures `base * upscale_factor` cells per axis.
pub fn generate<R>(params: &TerrainParams, rng: &mut R) -> OccupancyMask
where
    R: Rng + ?Sized,
{
    let mut mask = random_fill(
        params.base_width,
        params.base_height,
        params.border_thickness,
        params.fill_ratio,
        rng,
    );
    for _ in 0..params.smooth_iterations {
        mask = smooth(&mask);
    }

    mask = upscale(&mask, params.upscale_factor);
    for _ in 0..params.post_upscale_smooth_iterations {
        mask = smooth(&mask);
    }

    tracing::debug!(
        width = mask.width(),
        height = mask.height(),
        filled = mask.filled_count(),
        "synthesised occupancy mask"
    );
    mask
}

/// Fills interior cells with probability `fill_ratio`, leaving the border empty.
///
/// A cell belongs to the border when its distance to the nearest edge is at
/// most `border_thickness`. Cells are sampled column by column so the
/// generator is consumed in a fixed order.
pub fn random_fill<R>(
    width: u32,
    height: u32,
    border_thickness: u32,
    fill_ratio: f32,
    rng: &mut R,
) -> OccupancyMask
where
    R: Rng + ?Sized,
{
    let mut mask = OccupancyMask::empty(width, height);
    let threshold = f64::from(fill_ratio);
    for x in 0..width {
        for y in 0..height {
            if in_border(x, width, border_thickness) || in_border(y, height, border_thickness) {
                continue;
            }
            let filled = rng.gen::<f64>() < threshold;
            mask.set(x, y, filled);
        }
    }
    mask
}

/// Applies one round of the majority rule.
///
/// A cell with more than four filled neighbours (of eight, in bounds only)
/// becomes filled, one with fewer than four becomes empty, and exactly four
/// leaves it unchanged.
#[must_use]
pub fn smooth(mask: &OccupancyMask) -> OccupancyMask {
    OccupancyMask::from_fn(mask.width(), mask.height(), |x, y| {
        let neighbours = filled_neighbour_count(mask, x, y);
        match neighbours.cmp(&MAJORITY_PIVOT) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => mask.is_filled(x, y),
        }
    })
}

/// Replicates every cell into a `factor` x `factor` block.
#[must_use]
pub fn upscale(mask: &OccupancyMask, factor: u32) -> OccupancyMask {
    let width = mask.width().saturating_mul(factor);
    let height = mask.height().saturating_mul(factor);
    OccupancyMask::from_fn(width, height, |x, y| mask.is_filled(x / factor, y / factor))
}

fn filled_neighbour_count(mask: &OccupancyMask, x: u32, y: u32) -> u8 {
    let mut count = 0;
    for dx in -1_i64..=1 {
        for dy in -1_i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (Ok(nx), Ok(ny)) = (
                u32::try_from(i64::from(x) + dx),
                u32::try_from(i64::from(y) + dy),
            ) else {
                continue;
            };
            if mask.is_filled(nx, ny) {
                count += 1;
            }
        }
    }
    count
}

fn in_border(position: u32, extent: u32, thickness: u32) -> bool {
    position <= thickness || u64::from(position) + 1 + u64::from(thickness) >= u64::from(extent)
}

fn cell_count(width: u32, height: u32) -> usize {
    usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_params() -> TerrainParams {
        TerrainParams {
            base_width: 20,
            base_height: 20,
            border_thickness: 2,
            fill_ratio: 0.45,
            smooth_iterations: 5,
            upscale_factor: 3,
            post_upscale_smooth_iterations: 2,
        }
    }

    #[test]
    fn seed_hash_is_stable_and_distinguishes_strings() {
        assert_eq!(seed_from_str("abc"), seed_from_str("abc"));
        assert_ne!(seed_from_str("abc"), seed_from_str("abd"));
    }

    #[test]
    fn identical_seeds_generate_identical_masks() {
        let params = reference_params();
        let first = generate(&params, &mut rng_for_seed("abc"));
        let second = generate(&params, &mut rng_for_seed("abc"));
        assert_eq!(first, second);
        assert_eq!((first.width(), first.height()), (60, 60));
    }

    #[test]
    fn different_seeds_diverge() {
        let params = reference_params();
        let first = generate(&params, &mut rng_for_seed("abc"));
        let second = generate(&params, &mut rng_for_seed("xyz"));
        assert_ne!(first, second);
    }

    #[test]
    fn random_fill_keeps_border_empty() {
        let mask = random_fill(10, 8, 2, 1.0, &mut rng_for_seed("border"));
        for x in 0..10 {
            for y in 0..8 {
                let border = x <= 2 || x >= 7 || y <= 2 || y >= 5;
                assert_eq!(mask.is_filled(x, y), !border, "cell ({x}, {y})");
            }
        }
    }

    #[test]
    fn zero_fill_ratio_yields_empty_mask() {
        let mask = random_fill(12, 12, 0, 0.0, &mut rng_for_seed("empty"));
        assert_eq!(mask.filled_count(), 0);
    }

    #[test]
    fn smoothing_applies_majority_rule() {
        // Centre cell of a 3x3 block sees 8 filled neighbours, the corners
        // see 3, the edge midpoints see 5.
        let block = OccupancyMask::from_fn(3, 3, |_, _| true);
        let smoothed = smooth(&block);
        assert!(smoothed.is_filled(1, 1));
        assert!(smoothed.is_filled(1, 0));
        assert!(!smoothed.is_filled(0, 0));
    }

    #[test]
    fn smoothing_keeps_cells_with_exactly_four_neighbours() {
        // (1, 1) has exactly four filled neighbours: the left column plus (1, 0).
        let mask = OccupancyMask::from_fn(3, 3, |x, y| x == 0 || (x == 1 && y == 0));
        let smoothed = smooth(&mask);
        assert!(!smoothed.is_filled(1, 1));

        let filled_centre =
            OccupancyMask::from_fn(3, 3, |x, y| x == 0 || (x == 1 && y == 0) || (x, y) == (1, 1));
        assert!(smooth(&filled_centre).is_filled(1, 1));
    }

    #[test]
    fn upscale_replicates_blocks() {
        let mask = OccupancyMask::from_fn(2, 2, |x, y| x == 1 && y == 0);
        let scaled = upscale(&mask, 3);
        assert_eq!((scaled.width(), scaled.height()), (6, 6));
        assert_eq!(scaled.filled_count(), 9);
        assert!(scaled.is_filled(3, 0));
        assert!(scaled.is_filled(5, 2));
        assert!(!scaled.is_filled(2, 2));
        assert!(!scaled.is_filled(3, 3));
    }

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let mask = OccupancyMask::from_fn(2, 2, |_, _| true);
        assert!(!mask.is_filled(2, 0));
        assert!(!mask.is_filled(0, 5));
    }
}
