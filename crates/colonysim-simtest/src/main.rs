//! ColonySim Headless Simulation Harness
//!
//! Runs deterministic scenarios against the simulation core in-process:
//! no rendering, no input, no wall clock.
//!
//! Usage:
//!   cargo run -p colonysim-simtest
//!   cargo run -p colonysim-simtest -- --verbose
//!   cargo run -p colonysim-simtest -- --json
//!
//! Core log output goes to stderr. `RUST_LOG` overrides the level, which
//! is otherwise `debug` with `--verbose` and `warn` without.

use colonysim_core::prelude::*;
use colonysim_logic::grid::{path_cost, GridMap};
use colonysim_logic::pathfinding::Pathfinder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Serialize)]
struct Report<'a> {
    passed: usize,
    failed: usize,
    results: &'a [TestResult],
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

/// Console switches shared by every scenario group.
#[derive(Clone, Copy)]
struct Opts {
    verbose: bool,
    json: bool,
}

impl Opts {
    fn section(self, title: &str) {
        if !self.json {
            println!("--- {} ---", title);
        }
    }

    fn detail(self) -> bool {
        self.verbose && !self.json
    }
}

fn run(world: &mut World, ticks: usize, dt: f32) {
    for _ in 0..ticks {
        world.tick(dt);
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let json = std::env::args().any(|a| a == "--json");
    init_logging(verbose);
    let opts = Opts { verbose, json };
    if !json {
        println!("=== ColonySim Simulation Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Point-to-point pathfinding
    results.extend(validate_pathfinding(opts));

    // 2. Construction
    results.extend(validate_construction(opts));

    // 3. Job routing
    results.extend(validate_job_routing(opts));

    // 4. Plan history
    results.extend(validate_plan_history(opts));

    // 5. Rooms
    results.extend(validate_rooms(opts));

    // 6. Persistence and determinism
    results.extend(validate_persistence(opts));

    // ── Summary ──
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    if json {
        let report = Report {
            passed,
            failed,
            results: &results,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("failed to encode report: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        println!();
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }

        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed, total, failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(opts: Opts) -> Vec<TestResult> {
    opts.section("Pathfinding");
    let mut results = Vec::new();
    let mut pf = Pathfinder::new();

    // Straight corridor: both solvers must produce the same tiles
    let mut corridor = GridMap::new(20, 3);
    for x in 0..20 {
        corridor.set_walkable(x, 0, false);
        corridor.set_walkable(x, 2, false);
    }
    let start = Coord::new(0, 1);
    let goal = Coord::new(19, 1);
    let a = pf.find_path(&corridor, PathAlgo::AStar, start, goal);
    let j = pf.find_path(&corridor, PathAlgo::Jps, start, goal);
    results.push(check(
        "corridor_astar_jps_equal",
        a.len() == 20 && a == j,
        format!("astar {} tiles, jps {} tiles", a.len(), j.len()),
    ));

    // Random maps: same reachability and cost
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
    let mut mismatches = 0;
    let mut reachable = 0;
    let maps = 100;
    for _ in 0..maps {
        let w = rng.gen_range(6..32);
        let h = rng.gen_range(6..32);
        let mut grid = GridMap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                if rng.gen_bool(0.25) {
                    grid.set_walkable(x, y, false);
                }
            }
        }
        let s = Coord::new(rng.gen_range(0..w), rng.gen_range(0..h));
        let g = Coord::new(rng.gen_range(0..w), rng.gen_range(0..h));
        let a = pf.find_path(&grid, PathAlgo::AStar, s, g);
        let j = pf.find_path(&grid, PathAlgo::Jps, s, g);
        let same = match (path_cost(&grid, &a), path_cost(&grid, &j)) {
            _ if a.is_empty() || j.is_empty() => a.is_empty() == j.is_empty(),
            (Some(ca), Some(cj)) => (ca - cj).abs() < 1e-3,
            _ => false,
        };
        if !a.is_empty() {
            reachable += 1;
        }
        if !same {
            mismatches += 1;
        }
    }
    results.push(check(
        "random_map_cost_parity",
        mismatches == 0,
        format!("{} maps, {} reachable, {} mismatches", maps, reachable, mismatches),
    ));

    // Walled-off goal
    let mut sealed = GridMap::new(5, 5);
    for y in 0..5 {
        sealed.set_walkable(2, y, false);
    }
    let none = pf.find_path(&sealed, PathAlgo::AStar, Coord::new(0, 0), Coord::new(4, 4));
    results.push(check("unreachable_is_empty", none.is_empty(), "sealed map → empty path"));

    // Repeat queries are answered from the path cache until the grid changes
    pf.set_cache_capacity(64);
    let first = pf.find_path(&sealed, PathAlgo::AStar, Coord::new(0, 0), Coord::new(0, 4));
    let again = pf.find_path(&sealed, PathAlgo::AStar, Coord::new(0, 0), Coord::new(0, 4));
    let hits = pf.stats().cache_hits;
    sealed.set_walkable(0, 2, false);
    sealed.set_walkable(1, 2, false);
    let blocked = pf.find_path(&sealed, PathAlgo::AStar, Coord::new(0, 0), Coord::new(0, 4));
    results.push(check(
        "path_cache_hit_and_invalidate",
        !first.is_empty() && first == again && hits == 1 && blocked.is_empty(),
        format!("{} hits, {} misses", pf.stats().cache_hits, pf.stats().cache_misses),
    ));

    if opts.detail() {
        let stats = pf.stats();
        println!(
            "  Searches: {} A*, {} JPS",
            stats.astar_searches, stats.jps_searches
        );
    }

    results
}

// ── 2. Construction ─────────────────────────────────────────────────────

fn validate_construction(opts: Opts) -> Vec<TestResult> {
    opts.section("Construction");
    let mut results = Vec::new();

    let mut world = World::new(12, 12);
    world.spawn_colonist(0.5, 0.5);
    world.spawn_colonist(11.5, 11.5);
    let mut placed = 0;
    for y in 3..=7 {
        for x in 3..=7 {
            if !(x == 3 || x == 7 || y == 3 || y == 7) {
                continue;
            }
            let corner = (x == 3 || x == 7) && (y == 3 || y == 7);
            let priority = if corner { 3 } else { 0 };
            if world.place_plan(x, y, TileType::Wall, priority) == PlacePlanResult::Ok {
                placed += 1;
            }
        }
    }
    results.push(check(
        "wall_ring_planned",
        placed == 16 && world.planned_count() == 16,
        format!("{} wall plans, {} wood left", placed, world.inventory().wood),
    ));

    let mut ticks = 0;
    while world.planned_count() > 0 && ticks < 4000 {
        world.tick(0.05);
        ticks += 1;
    }
    results.push(check(
        "wall_ring_built",
        world.built_count(TileType::Wall) == 16 && world.planned_count() == 0,
        format!(
            "{} walls after {:.1}s",
            world.built_count(TileType::Wall),
            world.sim_time()
        ),
    ));
    results.push(check(
        "wall_ring_encloses",
        world.tile_indoors(5, 5) && !world.tile_indoors(0, 0),
        format!("{} indoor tiles", world.indoors_tile_count()),
    ));

    if opts.detail() {
        let stats = world.path_stats();
        println!(
            "  Build field: {} computed, {} assigned, {} fallback",
            stats.build.computed, stats.build.assigned, stats.build.fallback
        );
    }

    results
}

// ── 3. Job Routing ──────────────────────────────────────────────────────

fn validate_job_routing(opts: Opts) -> Vec<TestResult> {
    opts.section("Job Routing");
    let mut results = Vec::new();

    // Eat field
    let mut world = World::new(7, 7);
    world.debug_set_built_tile(3, 3, TileType::Stockpile);
    let id = world.spawn_colonist(2.5, 3.5);
    world.set_colonist_food(id, 1.0);
    world.tick(0.01);
    let eat = world.colonist(id);
    results.push(check(
        "eat_field_assignment",
        eat.as_ref()
            .map_or(false, |c| c.job == JobKind::Eat && c.target == Coord::new(3, 3)),
        format!("eat assigned {}", world.path_stats().eat.assigned),
    ));

    // Harvest field
    let config = WorldConfig {
        farm_grow_duration_seconds: 0.0,
        ..WorldConfig::default()
    };
    let mut world = World::with_config(9, 9, config);
    world.debug_set_built_tile(6, 4, TileType::Farm);
    let id = world.spawn_colonist(1.5, 4.5);
    world.tick(0.01);
    let assigned = world
        .colonist(id)
        .map_or(false, |c| c.job == JobKind::Harvest && c.target == Coord::new(6, 4));
    let food_before = world.inventory().food;
    run(&mut world, 100, 0.05);
    results.push(check(
        "harvest_field_assignment",
        assigned && world.inventory().food > food_before,
        format!("food {:.1} → {:.1}", food_before, world.inventory().food),
    ));

    // Two colonists race for the same pile
    let mut world = World::new(5, 5);
    world.debug_set_built_tile(2, 4, TileType::Stockpile);
    world.debug_set_loose_wood(4, 2, 5);
    world.debug_set_loose_wood(0, 0, 5);
    let a = world.spawn_colonist(2.5, 2.5);
    let b = world.spawn_colonist(2.5, 2.5);
    world.tick(0.01);
    let targets: Vec<Coord> = [a, b]
        .iter()
        .filter_map(|id| world.colonist(*id))
        .filter(|c| c.job == JobKind::HaulWood)
        .map(|c| c.target)
        .collect();
    let stats = world.path_stats();
    results.push(check(
        "haul_race_distinct_piles",
        targets.len() == 2 && targets[0] != targets[1],
        format!("targets {:?}", targets),
    ));
    results.push(check(
        "haul_race_fallback_counted",
        stats.haul.fallback >= 1,
        format!("haul assigned {}, fallback {}", stats.haul.assigned, stats.haul.fallback),
    ));
    let wood_before = world.inventory().wood;
    run(&mut world, 300, 0.05);
    results.push(check(
        "haul_delivers_wood",
        world.inventory().wood == wood_before + 10,
        format!("wood {} → {}", wood_before, world.inventory().wood),
    ));

    // Roles: only the hauler picks up the pile, the builder takes the plan
    let mut world = World::new(8, 8);
    world.debug_set_built_tile(7, 7, TileType::Stockpile);
    world.debug_set_loose_wood(1, 6, 5);
    world.place_plan(6, 1, TileType::Floor, 0);
    let builder = world.spawn_colonist(0.5, 7.5);
    let hauler = world.spawn_colonist(7.5, 0.5);
    world.set_colonist_role(builder, RoleKind::Builder);
    world.set_colonist_role(hauler, RoleKind::Hauler);
    world.tick(0.01);
    let jobs: Vec<JobKind> = [builder, hauler]
        .iter()
        .filter_map(|id| world.colonist(*id))
        .map(|c| c.job)
        .collect();
    results.push(check(
        "roles_gate_work",
        jobs == [JobKind::BuildPlan, JobKind::HaulWood],
        format!("builder/hauler jobs {:?}", jobs),
    ));

    if opts.detail() {
        println!("  Haul counters: {:?}", stats.haul);
    }

    results
}

// ── 4. Plan History ─────────────────────────────────────────────────────

fn validate_plan_history(opts: Opts) -> Vec<TestResult> {
    opts.section("Plan History");
    let mut results = Vec::new();

    let mut world = World::new(8, 8);
    world.inventory_mut().wood = 100;
    let mut history = PlanHistory::new(8);

    let wood0 = world.inventory().wood;
    let before = world.snapshot_tile(2, 2);
    history.begin_command(wood0);
    history.place_plan(&mut world, 2, 2, TileType::Floor, 0);
    history.place_plan(&mut world, 2, 2, TileType::Wall, 3);
    history.place_plan(&mut world, 3, 2, TileType::Farm, 1);
    let after = world.snapshot_tile(2, 2);
    let wood1 = world.inventory().wood;
    let committed = history.commit_command(wood1);

    let undone = history.undo(&mut world);
    let undo_ok = undone
        && world.snapshot_tile(2, 2) == before
        && world.inventory().wood == wood0
        && world.planned_count() == 0;
    results.push(check(
        "undo_restores_plans_and_wood",
        committed && undo_ok,
        format!("wood {} → {} → {}", wood0, wood1, world.inventory().wood),
    ));

    let redone = history.redo(&mut world);
    results.push(check(
        "redo_reapplies_final_state",
        redone
            && world.snapshot_tile(2, 2) == after
            && world.inventory().wood == wood1
            && world.planned_count() == 2,
        format!("{} plans after redo", world.planned_count()),
    ));

    history.undo(&mut world);
    history.set_max_commands(1);
    history.redo(&mut world);
    results.push(check(
        "redo_respects_lowered_cap",
        history.undo_count() == 1 && history.redo_count() == 0,
        format!("undo {}, redo {}", history.undo_count(), history.redo_count()),
    ));

    results
}

// ── 5. Rooms ────────────────────────────────────────────────────────────

fn validate_rooms(opts: Opts) -> Vec<TestResult> {
    opts.section("Rooms");
    let mut results = Vec::new();

    let mut world = World::new(8, 8);
    for y in 1..=6 {
        for x in 1..=6 {
            if x == 1 || x == 6 || y == 1 || y == 6 {
                world.debug_set_built_tile(x, y, TileType::Wall);
            }
        }
    }
    world.debug_set_built_tile(1, 3, TileType::Door);
    world.debug_rebuild_rooms_now();

    let room = world.room_id_at(3, 3).and_then(|id| world.room_info(id));
    let detail = match room {
        Some(r) => format!(
            "area {}, perimeter {}, doors {}, indoors {}",
            r.area, r.perimeter, r.door_count, r.indoors
        ),
        None => "no room at (3, 3)".into(),
    };
    results.push(check(
        "room_stats_4x4_with_door",
        room.map_or(false, |r| {
            r.area == 16 && r.perimeter == 16 && r.door_count == 1 && r.indoors
        }),
        detail,
    ));
    results.push(check(
        "room_outside_not_indoors",
        world.room_count() == 2 && world.indoors_room_count() == 1,
        format!("{} rooms, {} indoors", world.room_count(), world.indoors_room_count()),
    ));

    if opts.detail() {
        println!("  Indoor tiles: {}", world.indoors_tile_count());
    }

    results
}

// ── 6. Persistence & Determinism ────────────────────────────────────────

fn validate_persistence(opts: Opts) -> Vec<TestResult> {
    opts.section("Persistence & Determinism");
    let mut results = Vec::new();

    let mut world = World::new(1, 1);
    world.reset(48, 32, 11);
    world.place_plan(27, 16, TileType::Wall, 2);
    run(&mut world, 60, 0.05);

    let saved = world.to_bytes();
    let mut loaded = World::new(1, 1);
    let roundtrip = match &saved {
        Ok(bytes) => loaded.load(&bytes[..]).is_ok() && loaded.to_bytes().ok() == saved.as_ref().ok().cloned(),
        Err(_) => false,
    };
    results.push(check(
        "snapshot_roundtrip",
        roundtrip,
        format!(
            "{} bytes, {} colonists",
            saved.as_ref().map_or(0, |b| b.len()),
            loaded.colonist_count()
        ),
    ));

    let mut a = World::new(1, 1);
    let mut b = World::new(1, 1);
    a.reset(64, 64, 42);
    b.reset(64, 64, 42);
    for w in [&mut a, &mut b] {
        w.place_plan(35, 32, TileType::Wall, 1);
        w.place_plan(28, 30, TileType::Farm, 0);
        run(w, 600, 1.0 / 30.0);
    }
    let same = match (a.to_bytes(), b.to_bytes()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    };
    results.push(check(
        "same_seed_same_snapshot",
        same,
        format!("{} ticks, {} trees", a.tick_count(), a.built_count(TileType::Tree)),
    ));

    results
}
