use colonysim_logic::grid::{Coord, GridMap};
use colonysim_logic::pathfinding::Pathfinder;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn cluttered_map(size: i32, density: f64, seed: u64) -> GridMap {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut grid = GridMap::new(size, size);
    for y in 0..size {
        for x in 0..size {
            if rng.gen_bool(density) {
                grid.set_walkable(x, y, false);
            }
        }
    }
    grid.set_walkable(0, 0, true);
    grid.set_walkable(size - 1, size - 1, true);
    grid
}

fn bench_open(c: &mut Criterion) {
    let grid = GridMap::new(256, 256);
    let start = Coord::new(0, 0);
    let goal = Coord::new(255, 200);
    let mut pf = Pathfinder::new();

    c.bench_function("astar_open_256", |b| {
        b.iter(|| black_box(pf.astar(&grid, start, goal)))
    });
    c.bench_function("jps_open_256", |b| {
        b.iter(|| black_box(pf.jps(&grid, start, goal)))
    });
}

fn bench_cluttered(c: &mut Criterion) {
    let grid = cluttered_map(256, 0.2, 7);
    let start = Coord::new(0, 0);
    let goal = Coord::new(255, 255);
    let mut pf = Pathfinder::new();

    c.bench_function("astar_cluttered_256", |b| {
        b.iter(|| black_box(pf.astar(&grid, start, goal)))
    });
    c.bench_function("jps_cluttered_256", |b| {
        b.iter(|| black_box(pf.jps(&grid, start, goal)))
    });
}

criterion_group!(benches, bench_open, bench_cluttered);
criterion_main!(benches);
