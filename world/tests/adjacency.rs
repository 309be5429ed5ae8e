use island_defence_core::{TileCoord, TileKind, TileSpec};
use island_defence_world::{query, Grid, HeadlessTiles, Tile, TileFactory};
use proptest::prelude::*;
use std::{cell::RefCell, rc::Rc};

const CLEAR: TileKind = TileKind::new(15);
const STRUCTURE: TileKind = TileKind::new(23);

fn open_grid(width: u32, height: u32) -> Grid {
    let spec = TileSpec {
        kind: CLEAR,
        walkable: true,
        destructible: true,
        removal_cost: None,
    };
    let mut grid = Grid::from_specs(
        width,
        height,
        10.0,
        CLEAR,
        vec![spec; (width * height) as usize],
        Box::new(HeadlessTiles),
    )
    .expect("grid builds");
    grid.build_adjacency();
    grid
}

#[derive(Debug, Default)]
struct Journal {
    created: usize,
    retired: Vec<Tile>,
}

#[derive(Debug)]
struct RecordingTiles(Rc<RefCell<Journal>>);

impl TileFactory for RecordingTiles {
    fn instantiate(&mut self, _tile: &Tile) {
        self.0.borrow_mut().created += 1;
    }

    fn retire(&mut self, tile: &Tile) {
        self.0.borrow_mut().retired.push(tile.clone());
    }
}

#[test]
fn factory_sees_every_instantiation_and_retirement() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let spec = TileSpec::boundary(TileKind::new(0));
    let mut grid = Grid::from_specs(
        3,
        2,
        4.0,
        CLEAR,
        vec![spec; 6],
        Box::new(RecordingTiles(Rc::clone(&journal))),
    )
    .expect("grid builds");
    grid.build_adjacency();
    assert_eq!(journal.borrow().created, 6);

    let old = grid.handle_at(TileCoord::new(1, 1)).expect("handle");
    let new = grid.clear(old).expect("clear");

    let journal = journal.borrow();
    assert_eq!(journal.created, 7);
    assert_eq!(journal.retired.len(), 1);
    let retired = &journal.retired[0];
    assert_eq!(retired.handle(), old);
    assert!(
        retired.neighbors().is_empty(),
        "adjacency list moves to the replacement"
    );
    assert_eq!(grid.resolve(new).expect("live").neighbors().len(), 3);
}

#[test]
fn dropping_the_grid_retires_every_live_tile() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let mut grid = Grid::from_specs(
        3,
        3,
        4.0,
        CLEAR,
        vec![TileSpec::boundary(TileKind::new(0)); 9],
        Box::new(RecordingTiles(Rc::clone(&journal))),
    )
    .expect("grid builds");
    grid.build_adjacency();
    let replaced = grid.handle_at(TileCoord::new(1, 1)).expect("handle");
    let current = grid.clear(replaced).expect("clear");
    assert_eq!(journal.borrow().retired.len(), 1);

    drop(grid);

    let journal = journal.borrow();
    assert_eq!(journal.created, 10);
    assert_eq!(journal.retired.len(), journal.created);
    assert_eq!(
        journal
            .retired
            .iter()
            .filter(|tile| tile.handle() == current)
            .count(),
        1
    );
}

#[test]
fn repeated_swaps_at_one_coordinate_keep_single_instance() {
    let mut grid = open_grid(4, 4);
    let coord = TileCoord::new(2, 1);
    let mut handle = grid.handle_at(coord).expect("handle");
    let mut seen = vec![handle.instance()];

    for round in 0..5 {
        handle = if round % 2 == 0 {
            grid.swap(handle, STRUCTURE, true, false).expect("swap")
        } else {
            grid.clear(handle).expect("clear")
        };
        seen.push(handle.instance());
    }

    assert_eq!(grid.len(), 16);
    assert_eq!(grid.handle_at(coord), Some(handle));
    for retired in &seen[..seen.len() - 1] {
        assert!(!query::is_referenced(&grid, *retired));
    }
    assert!(query::adjacency_is_symmetric(&grid));
}

proptest! {
    #[test]
    fn adjacency_stays_symmetric_under_random_edits(
        width in 1u32..8,
        height in 1u32..8,
        edits in prop::collection::vec((0u32..8, 0u32..8, any::<bool>()), 0..40),
    ) {
        let mut grid = open_grid(width, height);
        for (x, y, block) in edits {
            let coord = TileCoord::new(x % width, y % height);
            let handle = grid.handle_at(coord).expect("coordinate in bounds");
            let _ = if block {
                grid.swap(handle, STRUCTURE, true, false)
            } else {
                grid.clear(handle)
            }
            .expect("live handle swaps");
        }

        prop_assert!(query::adjacency_is_symmetric(&grid));
        for tile in grid.tiles() {
            let expected = [tile.coord().x() > 0, tile.coord().x() + 1 < width, tile.coord().y() > 0, tile.coord().y() + 1 < height]
                .into_iter()
                .filter(|inside| *inside)
                .count();
            prop_assert_eq!(tile.neighbors().len(), expected);
        }
    }
}
