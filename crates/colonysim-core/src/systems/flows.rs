//! Passive flows applied at the start of every tick.

use colonysim_logic::grid::{Coord, DIRS4};
use colonysim_logic::tiles::TileType;
use hecs::World;
use rand::Rng;

use crate::components::{Colonist, Needs, Position};
use crate::config::WorldConfig;
use crate::world_grid::WorldGrid;

/// Cap on spread attempts in one tick, however large `dt` is.
pub const MAX_SPREAD_ATTEMPTS: usize = 256;

/// Grow every planless farm toward ripeness.
pub fn farm_growth_system(grid: &mut WorldGrid, config: &WorldConfig, dt: f32) {
    let step = if config.farm_grow_duration_seconds <= 0.0 {
        1.0
    } else {
        dt / config.farm_grow_duration_seconds
    };
    grid.grow_farms(step);
}

/// Trees seed onto neighbouring empty ground.
///
/// `accum` carries fractional attempts between ticks. Returns how many new
/// trees appeared.
pub fn tree_spread_system<R: Rng>(
    grid: &mut WorldGrid,
    rng: &mut R,
    occupied: &[Coord],
    config: &WorldConfig,
    accum: &mut f32,
    dt: f32,
) -> usize {
    *accum += config.tree_spread_attempts_per_second.max(0.0) * dt;
    if !accum.is_finite() {
        *accum = 0.0;
    }
    let attempts = (accum.floor().max(0.0) as usize).min(MAX_SPREAD_ATTEMPTS);
    *accum -= accum.floor();
    if attempts == 0 || grid.built_count(TileType::Tree) == 0 {
        return 0;
    }

    let mut trees: Vec<Coord> = Vec::with_capacity(grid.built_count(TileType::Tree));
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let at = Coord::new(x, y);
            if grid.cell(at).map_or(false, |c| c.built == TileType::Tree) {
                trees.push(at);
            }
        }
    }

    let cap = (grid.width() * grid.height() / 5).max(0) as usize;
    // NaN survives clamp and would panic in gen_bool.
    let chance = match config.tree_spread_chance_per_attempt {
        c if c.is_finite() => c.clamp(0.0, 1.0) as f64,
        _ => 0.0,
    };
    let mut grown = 0;
    for _ in 0..attempts {
        let tree = trees[rng.gen_range(0..trees.len())];
        let (dx, dy) = DIRS4[rng.gen_range(0..DIRS4.len())];
        let to = tree.offset(dx, dy);
        let open = grid.cell(to).map_or(false, |c| {
            c.built == TileType::Empty && c.planned == TileType::Empty && c.loose_wood == 0
        });
        if !open || occupied.binary_search(&to).is_ok() || grid.built_count(TileType::Tree) >= cap {
            continue;
        }
        if rng.gen_bool(chance) {
            grid.grow_tree(to);
            trees.push(to);
            grown += 1;
        }
    }
    grown
}

/// Colonists get hungry.
pub fn hunger_system(world: &mut World, config: &WorldConfig, dt: f32) {
    let drain = config.food_per_colonist_per_second * dt;
    for (_, (_, needs)) in world.query_mut::<(&Colonist, &mut Needs)>() {
        needs.personal_food = (needs.personal_food - drain).max(0.0);
    }
}

/// Sorted, deduplicated tiles that have a colonist on them.
pub fn occupied_tiles(world: &World) -> Vec<Coord> {
    let mut tiles: Vec<Coord> = world.query::<&Position>().iter().map(|(_, p)| p.tile()).collect();
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}
