//! Orthogonal adjacency helpers used by the graph builder.

use island_defence_core::TileCoord;

/// Enumerates the up to four in-bounds orthogonal neighbours of `coord`.
///
/// Order is west, east, south, north. Diagonals are never produced.
pub(crate) fn orthogonal_neighbors(
    coord: TileCoord,
    width: u32,
    height: u32,
) -> impl Iterator<Item = TileCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(x) = coord.x().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(x, coord.y()));
        count += 1;
    }

    if let Some(x) = coord.x().checked_add(1) {
        if x < width {
            candidates[count] = Some(TileCoord::new(x, coord.y()));
            count += 1;
        }
    }

    if let Some(y) = coord.y().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(coord.x(), y));
        count += 1;
    }

    if let Some(y) = coord.y().checked_add(1) {
        if y < height {
            candidates[count] = Some(TileCoord::new(coord.x(), y));
            count += 1;
        }
    }

    candidates.into_iter().take(count).flatten()
}

/// Dense scan-order index of `coord`: columns outermost, rows innermost.
pub(crate) fn scan_index(width: u32, height: u32, coord: TileCoord) -> Option<usize> {
    if coord.x() >= width || coord.y() >= height {
        return None;
    }

    let x = usize::try_from(coord.x()).ok()?;
    let y = usize::try_from(coord.y()).ok()?;
    let height = usize::try_from(height).ok()?;
    x.checked_mul(height)?.checked_add(y)
}
