use std::collections::HashMap;

use island_defence_core::{TileCoord, TileKind};
use island_defence_engine::Engine;
use island_defence_world::Tile;

const WATER_CONTOUR: u8 = 0;

/// Glyphs drawn for each kind of tile, in increasing precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Glyph {
    Water,
    Shore,
    Obstacle,
    Structure,
    Ground,
    Route,
    SpawnPoint,
    Spawner,
    Entrance,
    Objective,
}

impl Glyph {
    const fn symbol(self) -> char {
        match self {
            Self::Water => '~',
            Self::Shore => '%',
            Self::Obstacle => '#',
            Self::Structure => 'T',
            Self::Ground => '.',
            Self::Route => '*',
            Self::SpawnPoint => 's',
            Self::Spawner => 'S',
            Self::Entrance => 'e',
            Self::Objective => 'H',
        }
    }
}

/// Draws the current world with north at the top.
///
/// Returns an empty string when no world is ready.
pub(crate) fn render(engine: &Engine) -> String {
    let Some(grid) = engine.grid() else {
        return String::new();
    };

    let mut overlay = HashMap::new();
    for spawner in engine.spawners() {
        if let Some(route) = &spawner.route {
            for tile in route.tiles() {
                let _ = overlay.insert(tile.coord(), Glyph::Route);
            }
        }
    }
    for point in engine.spawn_points() {
        let _ = overlay.insert(*point, Glyph::SpawnPoint);
    }
    for spawner in engine.spawners() {
        let _ = overlay.insert(spawner.entry.coord(), Glyph::Spawner);
    }
    if let Some(entrance) = engine.objective_entrance() {
        let _ = overlay.insert(entrance.coord(), Glyph::Entrance);
    }
    if let Some(objective) = engine.objective() {
        let _ = overlay.insert(objective.coord(), Glyph::Objective);
    }

    let water = engine.catalog().contour(WATER_CONTOUR);
    let obstacles = &engine.catalog().obstacles;
    let mut out = String::with_capacity((grid.width() as usize + 1) * grid.height() as usize);
    for y in (0..grid.height()).rev() {
        for x in 0..grid.width() {
            let coord = TileCoord::new(x, y);
            let glyph = overlay.get(&coord).copied().or_else(|| {
                grid.tile(coord)
                    .map(|tile| terrain_glyph(tile, water, obstacles))
            });
            out.push(glyph.map_or(' ', Glyph::symbol));
        }
        out.push('\n');
    }
    out
}

fn terrain_glyph(tile: &Tile, water: TileKind, obstacles: &[TileKind]) -> Glyph {
    match (tile.is_walkable(), tile.is_destructible()) {
        (true, _) => Glyph::Ground,
        (false, true) if obstacles.contains(&tile.kind()) => Glyph::Obstacle,
        (false, true) => Glyph::Structure,
        (false, false) if tile.kind() == water => Glyph::Water,
        (false, false) => Glyph::Shore,
    }
}
