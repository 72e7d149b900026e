//! Colonist task state machine: walking, working and haul hand-offs.
//!
//! `Seeking` walks the stored path, `Working` spends work time. Effects of a
//! finished job are not applied here; the task is left `Completed` (or
//! `Cancelled`) and resolved at the end of the tick.

use colonysim_logic::grid::Coord;
use colonysim_logic::tiles::TileType;
use hecs::World;

use super::{colonists_in_order, path_to_work_tile, TickContext};
use crate::components::{Aptitude, Claim, ColonistId, HaulStage, JobKind, Position, Role, Task, TaskPhase};
use crate::world_grid::WorldGrid;

/// Advance every colonist's task by `dt` seconds.
pub fn step_colonists(world: &mut World, ctx: &mut TickContext, dt: f32) {
    for (id, entity) in colonists_in_order(world) {
        let Ok((role, pos, task)) = world.query_one_mut::<(&Role, &mut Position, &mut Task)>(entity) else {
            continue;
        };
        step_task(ctx, id, role.aptitude(), pos, task, dt);
    }
}

/// Advance one task. Seeking time left over after arrival is spent working.
///
/// `aptitude` scales walk speed, work rate and carry capacity.
pub fn step_task(
    ctx: &mut TickContext,
    id: ColonistId,
    aptitude: Aptitude,
    pos: &mut Position,
    task: &mut Task,
    dt: f32,
) {
    match task.phase {
        TaskPhase::Idle | TaskPhase::Completed | TaskPhase::Cancelled => {}
        TaskPhase::Seeking => {
            if !target_valid(ctx.grid, id, task) && !reroute_dropoff(ctx, pos, task) {
                task.phase = TaskPhase::Cancelled;
                return;
            }
            if task.path.is_empty() {
                let from = pos.tile();
                match path_to_work_tile(ctx, task.kind, from, task.target) {
                    Some(path) => {
                        task.path_cursor = if path.len() > 1 { 1 } else { path.len() };
                        task.path = path;
                    }
                    None => {
                        log::debug!("{} lost its route to ({}, {})", id, task.target.x, task.target.y);
                        task.phase = TaskPhase::Cancelled;
                        return;
                    }
                }
            }
            if task.remaining_path().iter().any(|t| !ctx.grid.passable(*t)) {
                // Recomputed on the next tick.
                task.path.clear();
                task.path_cursor = 0;
                return;
            }

            let speed = ctx.config.colonist_walk_speed * aptitude.move_mult;
            let left = walk(ctx.grid, speed, pos, task, dt);
            if task.path_done() {
                arrive(ctx, id, pos, task);
                if task.phase == TaskPhase::Working && left > 0.0 {
                    work(ctx, id, aptitude, pos, task, left);
                }
            }
        }
        TaskPhase::Working => {
            if !target_valid(ctx.grid, id, task) {
                task.phase = TaskPhase::Cancelled;
                return;
            }
            work(ctx, id, aptitude, pos, task, dt);
        }
    }
}

/// Whether the job's target still exists and is still ours.
fn target_valid(grid: &WorldGrid, id: ColonistId, task: &Task) -> bool {
    let Some(cell) = grid.cell(task.target) else {
        return false;
    };
    match task.kind {
        JobKind::None => false,
        JobKind::BuildPlan => cell.has_active_plan() && cell.reserved_by == Some(id),
        JobKind::Harvest => {
            cell.built == TileType::Farm && !cell.has_active_plan() && cell.harvest_reserved_by == Some(id)
        }
        // Eating in place (no stockpile reachable) is already working.
        JobKind::Eat => cell.built == TileType::Stockpile || task.phase == TaskPhase::Working,
        JobKind::HaulWood => match task.haul_stage {
            HaulStage::Pickup => cell.loose_wood > 0 && cell.loose_wood_reserved_by == Some(id),
            HaulStage::Dropoff => cell.built == TileType::Stockpile,
        },
        JobKind::ManualMove => grid.passable(task.target),
    }
}

/// A hauler whose stockpile vanished heads for another one.
fn reroute_dropoff(ctx: &mut TickContext, pos: &Position, task: &mut Task) -> bool {
    if task.kind != JobKind::HaulWood || task.haul_stage != HaulStage::Dropoff {
        return false;
    }
    match ctx.router.route_to_stockpile(ctx.grid, pos.tile()) {
        Some(a) => {
            task.target = a.target;
            task.path_cursor = if a.path.len() > 1 { 1 } else { a.path.len() };
            task.path = a.path;
            true
        }
        None => false,
    }
}

/// Walk toward the next path tiles. Returns unspent time.
fn walk(grid: &WorldGrid, walk_speed: f32, pos: &mut Position, task: &mut Task, dt: f32) -> f32 {
    let mut budget = dt;
    while budget > 0.0 && !task.path_done() {
        let next = task.path[task.path_cursor];
        let speed = walk_speed / grid.nav().cost_multiplier(next.x, next.y);
        if speed <= 0.0 || !speed.is_finite() {
            return 0.0;
        }
        let (tx, ty) = next.center();
        let (dx, dy) = (tx - pos.x, ty - pos.y);
        let dist = (dx * dx + dy * dy).sqrt();
        let reach = speed * budget;
        if reach >= dist {
            pos.x = tx;
            pos.y = ty;
            budget -= dist / speed;
            task.path_cursor += 1;
        } else {
            pos.x += dx / dist * reach;
            pos.y += dy / dist * reach;
            budget = 0.0;
        }
    }
    budget.max(0.0)
}

/// Reached the work tile: start the work timer for the job.
fn arrive(ctx: &mut TickContext, id: ColonistId, pos: &mut Position, task: &mut Task) {
    if let Some(last) = task.path.last() {
        *pos = Position::center_of(*last);
    }
    let cfg = ctx.config;
    task.phase = TaskPhase::Working;
    task.work_remaining = match task.kind {
        JobKind::BuildPlan | JobKind::None => 0.0,
        JobKind::Harvest => cfg.farm_harvest_duration_seconds,
        JobKind::Eat => cfg.colonist_eat_duration_seconds,
        JobKind::HaulWood => match task.haul_stage {
            HaulStage::Pickup => cfg.haul_pickup_duration_seconds,
            HaulStage::Dropoff => cfg.haul_dropoff_duration_seconds,
        },
        JobKind::ManualMove => {
            task.phase = TaskPhase::Completed;
            0.0
        }
    };
    log::trace!("{} arrived for {} at ({}, {})", id, task.kind.name(), task.target.x, task.target.y);
}

fn work(ctx: &mut TickContext, id: ColonistId, aptitude: Aptitude, pos: &Position, task: &mut Task, dt: f32) {
    let dt = dt * aptitude.work_mult;
    match task.kind {
        JobKind::None => task.phase = TaskPhase::Cancelled,
        JobKind::ManualMove => task.phase = TaskPhase::Completed,
        JobKind::BuildPlan => {
            let left = ctx.grid.progress_plan(task.target, ctx.config.build_work_per_second * dt);
            if left <= 0.0 {
                task.phase = TaskPhase::Completed;
            }
        }
        JobKind::Harvest => {
            let ripe = ctx.grid.cell(task.target).map_or(false, |c| c.farm_growth >= 1.0);
            if ripe && tick_timer(task, dt) {
                task.phase = TaskPhase::Completed;
            }
        }
        JobKind::Eat => {
            if tick_timer(task, dt) {
                task.phase = TaskPhase::Completed;
            }
        }
        JobKind::HaulWood => {
            if !tick_timer(task, dt) {
                return;
            }
            match task.haul_stage {
                HaulStage::Dropoff => task.phase = TaskPhase::Completed,
                HaulStage::Pickup => pick_up(ctx, id, aptitude.carry_bonus, pos, task),
            }
        }
    }
}

/// Count the work timer down. True once it runs out.
fn tick_timer(task: &mut Task, dt: f32) -> bool {
    task.work_remaining -= dt;
    task.work_remaining <= 0.0
}

/// Load wood from the pile and head for the nearest stockpile.
fn pick_up(ctx: &mut TickContext, id: ColonistId, carry_bonus: i32, pos: &Position, task: &mut Task) {
    let pile = task.target;
    let capacity = ctx.config.haul_carry_capacity.saturating_add(carry_bonus).max(1);
    let room = (capacity - task.carrying_wood).max(0);
    let taken = ctx.grid.take_loose_wood(pile, room);
    ctx.grid.release(Claim::Pile, pile, id);
    task.carrying_wood += taken;
    if task.carrying_wood <= 0 {
        task.phase = TaskPhase::Cancelled;
        return;
    }

    let here = pos.tile();
    match ctx.router.route_to_stockpile(ctx.grid, here) {
        Some(a) => {
            task.haul_stage = HaulStage::Dropoff;
            task.target = a.target;
            task.path_cursor = if a.path.len() > 1 { 1 } else { a.path.len() };
            task.path = a.path;
            task.phase = TaskPhase::Seeking;
            task.work_remaining = 0.0;
        }
        None => {
            // Nowhere to take it; the cancel puts the wood back down.
            log::debug!("{} found no stockpile for {} wood", id, task.carrying_wood);
            task.haul_stage = HaulStage::Dropoff;
            task.phase = TaskPhase::Cancelled;
        }
    }
}

/// Nearest passable tile to `at`, searching outward ring by ring.
pub fn nearest_passable(grid: &WorldGrid, at: Coord) -> Option<Coord> {
    if grid.passable(at) {
        return Some(at);
    }
    let max_r = grid.width().max(grid.height());
    for r in 1..=max_r {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() != r && dy.abs() != r {
                    continue;
                }
                let t = at.offset(dx, dy);
                if grid.passable(t) {
                    return Some(t);
                }
            }
        }
    }
    None
}
