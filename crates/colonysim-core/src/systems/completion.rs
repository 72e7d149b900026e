//! End-of-tick resolution of finished and cancelled jobs.

use hecs::World;

use super::tasks::nearest_passable;
use super::{cancel_task, colonists_in_order, TickContext};
use crate::components::{xp_for_harvest, xp_for_plan, Claim, ColonistId, JobKind, Needs, Position, Role, Task, TaskPhase};

/// Apply the effects of every `Completed` task and clean up every
/// `Cancelled` one. Both end `Idle` with their claims released.
pub fn resolve_tasks(world: &mut World, ctx: &mut TickContext) {
    let mut blocked = false;
    for (id, entity) in colonists_in_order(world) {
        let Ok((role, pos, needs, task)) =
            world.query_one_mut::<(&mut Role, &Position, &mut Needs, &mut Task)>(entity)
        else {
            continue;
        };
        match task.phase {
            TaskPhase::Completed => {
                blocked |= complete(ctx, id, role, needs, task);
                task.clear();
            }
            TaskPhase::Cancelled => cancel_task(ctx.grid, ctx.inventory, id, pos, task),
            _ => {}
        }
    }
    if blocked {
        nudge_off_blocked_tiles(world, ctx);
    }
}

/// Returns true when the job made a tile unwalkable. Builds and harvests
/// earn experience.
fn complete(ctx: &mut TickContext, id: ColonistId, role: &mut Role, needs: &mut Needs, task: &mut Task) -> bool {
    let cfg = ctx.config;
    let at = task.target;
    log::debug!("{} finished {} at ({}, {})", id, task.kind.name(), at.x, at.y);
    match task.kind {
        JobKind::None | JobKind::ManualMove => false,
        JobKind::BuildPlan => match ctx.grid.complete_plan(at, cfg.tree_chop_yield_wood, ctx.inventory) {
            Some(done) => {
                earn(id, role, xp_for_plan(done.plan));
                done.blocked()
            }
            None => false,
        },
        JobKind::Harvest => {
            ctx.inventory.food += cfg.farm_harvest_yield_food;
            earn(id, role, xp_for_harvest(cfg.farm_harvest_yield_food));
            ctx.grid.reset_farm(at);
            ctx.grid.release(Claim::Harvest, at, id);
            false
        }
        JobKind::Eat => {
            let room = (cfg.colonist_max_personal_food - needs.personal_food).max(0.0);
            let eaten = room.min(ctx.inventory.food.max(0.0));
            needs.personal_food += eaten;
            ctx.inventory.food -= eaten;
            false
        }
        JobKind::HaulWood => {
            ctx.inventory.wood += task.carrying_wood;
            task.carrying_wood = 0;
            false
        }
    }
}

fn earn(id: ColonistId, role: &mut Role, xp: u32) {
    if role.grant_xp(xp) > 0 {
        log::info!("{} reached {} level {}", id, role.kind.name(), role.level);
    }
}

/// Move colonists standing on impassable tiles to the nearest open tile.
pub fn nudge_off_blocked_tiles(world: &mut World, ctx: &mut TickContext) {
    for (_, (pos, task)) in world.query_mut::<(&mut Position, &mut Task)>() {
        let tile = pos.tile();
        if ctx.grid.passable(tile) {
            continue;
        }
        if let Some(free) = nearest_passable(ctx.grid, tile) {
            *pos = Position::center_of(free);
            if task.is_active() {
                // Old path started from the wrong tile.
                task.path.clear();
                task.path_cursor = 0;
                task.phase = TaskPhase::Seeking;
            }
        }
    }
}
