//! Drafting and player orders.
//!
//! A drafted colonist ignores the job router and only follows orders. An
//! order either replaces the current job or is queued behind it; queued
//! orders start once the colonist is idle. Role changes live here too,
//! since they can drop the current job the same way drafting does.

use colonysim_logic::tiles::TileType;
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use super::{cancel_task, colonists_in_order, find_colonist, path_to_work_tile, TickContext};
use crate::components::{
    Claim, Colonist, ColonistId, JobKind, ManualOrder, OrderQueue, Position, Role, RoleKind, Task, WorkType,
};

/// Outcome of a player order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderResult {
    Ok,
    InvalidColonist,
    NotDrafted,
    OutOfBounds,
    /// Nothing to do at the target (no plan, not a farm, not walkable).
    InvalidTarget,
    NoPath,
}

impl OrderResult {
    pub fn is_ok(self) -> bool {
        self == OrderResult::Ok
    }
}

impl std::fmt::Display for OrderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderResult::Ok => "ok",
            OrderResult::InvalidColonist => "no such colonist",
            OrderResult::NotDrafted => "colonist is not drafted",
            OrderResult::OutOfBounds => "target out of bounds",
            OrderResult::InvalidTarget => "nothing to do at target",
            OrderResult::NoPath => "target unreachable",
        };
        f.write_str(s)
    }
}

fn order_job(order: ManualOrder) -> JobKind {
    match order {
        ManualOrder::Move(_) => JobKind::ManualMove,
        ManualOrder::Build(_) => JobKind::BuildPlan,
        ManualOrder::Harvest(_) => JobKind::Harvest,
    }
}

fn order_claim(order: ManualOrder) -> Option<Claim> {
    match order {
        ManualOrder::Move(_) => None,
        ManualOrder::Build(_) => Some(Claim::Plan),
        ManualOrder::Harvest(_) => Some(Claim::Harvest),
    }
}

/// Check an order's target against the current grid.
pub fn validate_order(ctx: &TickContext, order: ManualOrder) -> OrderResult {
    let at = order.target();
    let Some(cell) = ctx.grid.cell(at) else {
        return OrderResult::OutOfBounds;
    };
    let valid = match order {
        ManualOrder::Move(_) => ctx.grid.passable(at),
        ManualOrder::Build(_) => cell.has_active_plan(),
        ManualOrder::Harvest(_) => cell.built == TileType::Farm && !cell.has_active_plan(),
    };
    if valid {
        OrderResult::Ok
    } else {
        OrderResult::InvalidTarget
    }
}

/// Draft or undraft. Drafting drops any autonomous job; undrafting drops
/// the manual job and the order queue.
pub fn set_drafted(world: &mut World, ctx: &mut TickContext, id: ColonistId, drafted: bool) -> bool {
    let Some(entity) = find_colonist(world, id) else {
        return false;
    };
    let Ok((colonist, pos, task, orders)) =
        world.query_one_mut::<(&mut Colonist, &Position, &mut Task, &mut OrderQueue)>(entity)
    else {
        return false;
    };
    if colonist.drafted == drafted {
        return true;
    }
    colonist.drafted = drafted;
    if drafted {
        if !task.is_idle() && !task.manual {
            cancel_task(ctx.grid, ctx.inventory, id, pos, task);
        }
    } else {
        orders.orders.clear();
        if task.manual {
            cancel_task(ctx.grid, ctx.inventory, id, pos, task);
        }
    }
    log::debug!("{} {}", id, if drafted { "drafted" } else { "undrafted" });
    true
}

/// Switch a colonist's role, keeping its level and experience. An
/// autonomous job the new role cannot do is dropped; drafted colonists keep
/// whatever they were ordered to do.
pub fn set_role(world: &mut World, ctx: &mut TickContext, id: ColonistId, kind: RoleKind) -> bool {
    let Some(entity) = find_colonist(world, id) else {
        return false;
    };
    let Ok((colonist, pos, task, role)) = world.query_one_mut::<(&Colonist, &Position, &mut Task, &mut Role)>(entity)
    else {
        return false;
    };
    role.kind = kind;
    role.level = role.level.max(1);
    let allowed = WorkType::of_job(task.kind).map_or(true, |work| kind.can(work));
    if !colonist.drafted && !task.manual && !allowed {
        cancel_task(ctx.grid, ctx.inventory, id, pos, task);
    }
    log::debug!("{} is now a {}", id, kind.name());
    true
}

/// Give a drafted colonist an order, replacing its job or queueing behind it.
pub fn issue_order(world: &mut World, ctx: &mut TickContext, id: ColonistId, order: ManualOrder, queue: bool) -> OrderResult {
    let Some(entity) = find_colonist(world, id) else {
        return OrderResult::InvalidColonist;
    };
    let Ok((colonist, pos, task, orders)) =
        world.query_one_mut::<(&Colonist, &Position, &mut Task, &mut OrderQueue)>(entity)
    else {
        return OrderResult::InvalidColonist;
    };
    if !colonist.drafted {
        return OrderResult::NotDrafted;
    }
    let valid = validate_order(ctx, order);
    if !valid.is_ok() {
        return valid;
    }

    if queue {
        if !task.is_idle() || !orders.orders.is_empty() {
            orders.orders.push_back(order);
            return OrderResult::Ok;
        }
    } else {
        orders.orders.clear();
        cancel_task(ctx.grid, ctx.inventory, id, pos, task);
    }
    start_order(world, ctx, entity, id, order)
}

/// Claim the target and start walking. The colonist must be idle.
fn start_order(world: &mut World, ctx: &mut TickContext, entity: Entity, id: ColonistId, order: ManualOrder) -> OrderResult {
    let valid = validate_order(ctx, order);
    if !valid.is_ok() {
        return valid;
    }
    let target = order.target();
    let claim = order_claim(order);

    if let Some(claim) = claim {
        match ctx.grid.steal(claim, target, id) {
            Ok(Some(previous)) => cancel_colonist_task(world, ctx, previous),
            Ok(None) => {}
            Err(_) => return OrderResult::InvalidTarget,
        }
    }

    let Ok((pos, task)) = world.query_one_mut::<(&Position, &mut Task)>(entity) else {
        return OrderResult::InvalidColonist;
    };
    let kind = order_job(order);
    let Some(path) = path_to_work_tile(ctx, kind, pos.tile(), target) else {
        if let Some(claim) = claim {
            ctx.grid.release(claim, target, id);
        }
        return OrderResult::NoPath;
    };
    task.start(kind, target, path, true);
    log::debug!("{} ordered to {} at ({}, {})", id, kind.name(), target.x, target.y);
    OrderResult::Ok
}

/// Start the next queued order of every idle drafted colonist. Orders that
/// can no longer start are dropped.
pub fn start_queued_orders(world: &mut World, ctx: &mut TickContext) {
    for (id, entity) in colonists_in_order(world) {
        loop {
            let next = match world.query_one_mut::<(&Colonist, &Task, &mut OrderQueue)>(entity) {
                Ok((c, task, orders)) if c.drafted && task.is_idle() => orders.orders.pop_front(),
                _ => None,
            };
            let Some(order) = next else {
                break;
            };
            let result = start_order(world, ctx, entity, id, order);
            if result.is_ok() {
                break;
            }
            log::debug!("{} dropped queued order: {}", id, result);
        }
    }
}

/// Cancel one colonist's job and clear its queue.
pub fn cancel_colonist_job(world: &mut World, ctx: &mut TickContext, id: ColonistId) -> bool {
    let Some(entity) = find_colonist(world, id) else {
        return false;
    };
    if let Ok(orders) = world.query_one_mut::<&mut OrderQueue>(entity) {
        orders.orders.clear();
    }
    cancel_colonist_task(world, ctx, id);
    true
}

fn cancel_colonist_task(world: &mut World, ctx: &mut TickContext, id: ColonistId) {
    let Some(entity) = find_colonist(world, id) else {
        return;
    };
    if let Ok((pos, task)) = world.query_one_mut::<(&Position, &mut Task)>(entity) {
        cancel_task(ctx.grid, ctx.inventory, id, pos, task);
    }
}

/// Cancel every job, clear every queue and wipe every reservation.
pub fn cancel_all_jobs(world: &mut World, ctx: &mut TickContext) {
    for (id, entity) in colonists_in_order(world) {
        if let Ok((pos, task, orders)) = world.query_one_mut::<(&Position, &mut Task, &mut OrderQueue)>(entity) {
            orders.orders.clear();
            cancel_task(ctx.grid, ctx.inventory, id, pos, task);
        }
    }
    ctx.grid.clear_all_reservations();
}
