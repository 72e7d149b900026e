//! A* and JPS must agree on reachability and cost on arbitrary maps.
//!
//! Where several optimal routes exist the two solvers may pick different
//! ones, so random maps compare cost, endpoints and step legality. Maps with
//! a single shortest route, and weighted maps where JPS runs A*, compare the
//! tile sequence itself.

use colonysim_logic::grid::{path_cost, Coord, GridMap};
use colonysim_logic::pathfinding::{PathAlgo, Pathfinder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_map(rng: &mut ChaCha8Rng, w: i32, h: i32, density: f64) -> GridMap {
    let mut grid = GridMap::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if rng.gen_bool(density) {
                grid.set_walkable(x, y, false);
            }
        }
    }
    grid
}

fn assert_legal(grid: &GridMap, path: &[Coord]) {
    for pair in path.windows(2) {
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        assert!(dx.abs() <= 1 && dy.abs() <= 1, "non-adjacent step {:?}", pair);
        assert!(grid.can_step(pair[0].x, pair[0].y, dx, dy), "illegal step {:?}", pair);
    }
}

#[test]
fn test_random_maps_same_cost_and_reachability() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xC0105);
    let mut pf = Pathfinder::new();

    for _ in 0..200 {
        let w = rng.gen_range(4..24);
        let h = rng.gen_range(4..24);
        let grid = random_map(&mut rng, w, h, 0.3);
        let start = Coord::new(rng.gen_range(0..w), rng.gen_range(0..h));
        let goal = Coord::new(rng.gen_range(0..w), rng.gen_range(0..h));

        let a = pf.find_path(&grid, PathAlgo::AStar, start, goal);
        let j = pf.find_path(&grid, PathAlgo::Jps, start, goal);

        assert_eq!(a.is_empty(), j.is_empty(), "reachability differs {start:?} -> {goal:?}");
        if a.is_empty() {
            continue;
        }
        assert_eq!(a.first(), Some(&start));
        assert_eq!(a.last(), Some(&goal));
        assert_eq!(j.first(), Some(&start));
        assert_eq!(j.last(), Some(&goal));
        assert_legal(&grid, &a);
        assert_legal(&grid, &j);

        let ca = path_cost(&grid, &a).unwrap();
        let cj = path_cost(&grid, &j).unwrap();
        assert!((ca - cj).abs() < 1e-3, "cost differs: astar {ca} jps {cj}");
    }
}

#[test]
fn test_diagonal_pinch_blocks_both_solvers() {
    // Two diagonal wall segments meeting at a corner seal the map.
    let mut grid = GridMap::new(6, 6);
    for i in 0..6 {
        grid.set_walkable(i, 5 - i, false);
    }
    let mut pf = Pathfinder::new();
    for algo in [PathAlgo::AStar, PathAlgo::Jps] {
        assert!(pf.find_path(&grid, algo, Coord::new(0, 0), Coord::new(5, 5)).is_empty());
    }
}

#[test]
fn test_weighted_maps_same_cost() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut pf = Pathfinder::new();
    for _ in 0..50 {
        let mut grid = random_map(&mut rng, 16, 16, 0.15);
        for _ in 0..20 {
            let (x, y) = (rng.gen_range(0..16), rng.gen_range(0..16));
            grid.set_cost_multiplier(x, y, 1.25);
        }
        let start = Coord::new(0, 0);
        let goal = Coord::new(15, 15);
        let a = pf.find_path(&grid, PathAlgo::AStar, start, goal);
        let j = pf.find_path(&grid, PathAlgo::Jps, start, goal);
        assert_eq!(a, j);
    }
}

#[test]
fn test_serpentine_single_route_paths_identical() {
    // Walls on odd rows, each with one gap at alternating ends.
    let mut grid = GridMap::new(9, 9);
    for (i, y) in [1, 3, 5, 7].into_iter().enumerate() {
        let gap = if i % 2 == 0 { 8 } else { 0 };
        for x in 0..9 {
            if x != gap {
                grid.set_walkable(x, y, false);
            }
        }
    }
    let mut pf = Pathfinder::new();
    let start = Coord::new(0, 0);
    let goal = Coord::new(0, 8);
    let a = pf.find_path(&grid, PathAlgo::AStar, start, goal);
    let j = pf.find_path(&grid, PathAlgo::Jps, start, goal);
    assert!(!a.is_empty());
    assert_eq!(a, j);
    assert_legal(&grid, &a);
    // Four full row sweeps plus eight single steps through the gaps.
    assert!((path_cost(&grid, &a).unwrap() - 40.0).abs() < 1e-3);
}
