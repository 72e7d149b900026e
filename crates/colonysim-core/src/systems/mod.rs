//! Systems - logic that operates on colonist components and the grid
//!
//! Each system is a free function over `&mut hecs::World` plus a
//! [`TickContext`] holding the rest of the simulation state. Colonists are
//! always visited in ascending `ColonistId` order.

mod assignment;
mod completion;
pub mod fields;
mod flows;
mod orders;
pub mod router;
mod tasks;

pub use assignment::*;
pub use completion::*;
pub use flows::*;
pub use orders::*;
pub use router::{Assignment, FieldCounters, JobRouter, PathStats};
pub use tasks::*;

use colonysim_logic::grid::{path_cost, Coord, DIRS4};
use colonysim_logic::pathfinding::Pathfinder;
use hecs::Entity;

use crate::components::{Claim, Colonist, ColonistId, HaulStage, Inventory, JobKind, Position, Task};
use crate::config::WorldConfig;
use crate::world_grid::WorldGrid;

/// Borrowed simulation state shared by the tick systems.
pub struct TickContext<'a> {
    pub grid: &'a mut WorldGrid,
    pub inventory: &'a mut Inventory,
    pub router: &'a mut JobRouter,
    pub pathfinder: &'a mut Pathfinder,
    pub config: &'a WorldConfig,
}

/// Every colonist entity, sorted by id.
pub fn colonists_in_order(world: &hecs::World) -> Vec<(ColonistId, Entity)> {
    let mut out: Vec<(ColonistId, Entity)> = world
        .query::<&Colonist>()
        .iter()
        .map(|(e, c)| (c.id, e))
        .collect();
    out.sort_unstable_by_key(|(id, _)| *id);
    out
}

pub fn find_colonist(world: &hecs::World, id: ColonistId) -> Option<Entity> {
    world
        .query::<&Colonist>()
        .iter()
        .find(|(_, c)| c.id == id)
        .map(|(e, _)| e)
}

/// Whether the job's work tile is next to its target rather than on it.
pub fn works_adjacent(kind: JobKind) -> bool {
    matches!(kind, JobKind::BuildPlan | JobKind::Harvest)
}

/// Path from `from` to where a colonist stands to work `target`.
///
/// Adjacent jobs try every passable orthogonal neighbour of the target and
/// keep the cheapest route, breaking ties on the shorter path. `None` when
/// no work tile is reachable.
pub fn path_to_work_tile(ctx: &mut TickContext, kind: JobKind, from: Coord, target: Coord) -> Option<Vec<Coord>> {
    let algo = ctx.config.path_algo;
    if !works_adjacent(kind) {
        if from == target {
            return ctx.grid.passable(from).then(|| vec![from]);
        }
        let path = ctx.pathfinder.find_path(ctx.grid.nav(), algo, from, target);
        return (!path.is_empty()).then_some(path);
    }

    let mut best: Option<(f32, Vec<Coord>)> = None;
    for &(dx, dy) in &DIRS4 {
        let work = target.offset(dx, dy);
        if !ctx.grid.passable(work) {
            continue;
        }
        if work == from {
            return Some(vec![from]);
        }
        let path = ctx.pathfinder.find_path(ctx.grid.nav(), algo, from, work);
        let Some(cost) = path_cost(ctx.grid.nav(), &path) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((bc, bp)) => cost < *bc - 1e-4 || (cost <= *bc + 1e-4 && path.len() < bp.len()),
        };
        if better {
            best = Some((cost, path));
        }
    }
    best.map(|(_, p)| p)
}

/// Release whatever claim the task holds on its target.
pub fn release_claims(grid: &mut WorldGrid, id: ColonistId, task: &Task) {
    let claim = match task.kind {
        JobKind::BuildPlan => Some(Claim::Plan),
        JobKind::Harvest => Some(Claim::Harvest),
        JobKind::HaulWood if task.haul_stage == HaulStage::Pickup => Some(Claim::Pile),
        _ => None,
    };
    if let Some(claim) = claim {
        grid.release(claim, task.target, id);
    }
}

/// Drop the current job immediately: claims released, carried wood put
/// down at the colonist's tile, task back to idle.
pub fn cancel_task(grid: &mut WorldGrid, inventory: &mut Inventory, id: ColonistId, pos: &Position, task: &mut Task) {
    if task.kind != JobKind::None {
        log::debug!("{} cancelled {} job", id, task.kind.name());
    }
    release_claims(grid, id, task);
    if task.carrying_wood > 0 {
        grid.drop_loose_wood_near(pos.tile(), task.carrying_wood, inventory);
        task.carrying_wood = 0;
    }
    task.clear();
}
