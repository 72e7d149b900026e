//! Job assignment for idle colonists.
//!
//! Runs once per tick after the passive flows: hungry workers are pulled off
//! their jobs, drafted colonists pick up queued orders, the fields idle
//! colonists need are refreshed, and every idle undrafted colonist gets the
//! first job it can reach, trying the work its role allows in order of its
//! work priorities.

use hecs::World;

use super::{cancel_task, colonists_in_order, start_queued_orders, TickContext};
use crate::components::{
    Colonist, FieldKind, JobKind, Needs, Position, Role, RoleKind, Task, TaskPhase, WorkPriorities, WorkType,
};

/// Autonomous job order after eating, for work of equal priority.
const WORK_ORDER: [FieldKind; 6] = [
    FieldKind::Harvest,
    FieldKind::Build(3),
    FieldKind::Build(2),
    FieldKind::Build(1),
    FieldKind::Build(0),
    FieldKind::HaulPickup,
];

/// Steps 2 and 3 of the tick: refresh demanded fields, then assign.
pub fn job_assignment_system(world: &mut World, ctx: &mut TickContext) {
    preempt_hungry(world, ctx);
    start_queued_orders(world, ctx);

    let threshold = ctx.config.colonist_eat_threshold_food;
    let mut any_idle = false;
    let mut any_hungry = false;
    for (_, (colonist, needs, task)) in world.query::<(&Colonist, &Needs, &Task)>().iter() {
        if colonist.drafted || !task.is_idle() {
            continue;
        }
        any_idle = true;
        any_hungry |= needs.is_hungry(threshold);
    }
    if !any_idle {
        return;
    }

    // Stockpile distances seed the haul field, so it goes first.
    ctx.router.refresh(ctx.grid, &[FieldKind::Stockpile]);
    ctx.router.refresh(ctx.grid, &WORK_ORDER);
    if any_hungry {
        ctx.router.refresh(ctx.grid, &[FieldKind::Eat]);
    }

    for (id, entity) in colonists_in_order(world) {
        let Ok((colonist, pos, needs, task, role, priorities)) = world
            .query_one_mut::<(&Colonist, &Position, &Needs, &mut Task, &Role, &WorkPriorities)>(entity)
        else {
            continue;
        };
        if colonist.drafted || !task.is_idle() {
            continue;
        }
        let here = pos.tile();

        if needs.is_hungry(threshold) && ctx.inventory.food > 0.0 {
            match ctx.router.assign(ctx.grid, FieldKind::Eat, id, here) {
                Some(a) => task.start(JobKind::Eat, a.target, a.path, false),
                None => {
                    // No stockpile in reach: eat where we stand.
                    task.start(JobKind::Eat, here, vec![here], false);
                    task.phase = TaskPhase::Working;
                    task.work_remaining = ctx.config.colonist_eat_duration_seconds;
                    log::debug!("{} eating in place", id);
                }
            }
            continue;
        }

        let out_of_food = ctx.inventory.food <= 0.0;
        for kind in work_order_for(role.kind, priorities, out_of_food) {
            if ctx.router.field(kind).is_empty() {
                continue;
            }
            if let Some(a) = ctx.router.assign(ctx.grid, kind, id, here) {
                task.start(kind.job(), a.target, a.path, false);
                break;
            }
        }
    }
}

/// Fields a colonist tries, most urgent first. Work the role cannot do or
/// whose priority is off is left out; equal priorities keep [`WORK_ORDER`].
/// With the colony out of food, harvesting jumps the queue for any role
/// that can farm, even with farming switched off.
pub fn work_order_for(role: RoleKind, priorities: &WorkPriorities, out_of_food: bool) -> Vec<FieldKind> {
    let mut ranked: Vec<(u8, FieldKind)> = WORK_ORDER
        .iter()
        .filter_map(|&kind| {
            let work = WorkType::of_field(kind)?;
            if !role.can(work) {
                return None;
            }
            if out_of_food && work == WorkType::Farm {
                return Some((0, kind));
            }
            match priorities.get(work) {
                0 => None,
                p => Some((p, kind)),
            }
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, kind)| kind).collect()
}

/// Pull hungry, undrafted colonists off interruptible jobs while there is
/// food to eat.
fn preempt_hungry(world: &mut World, ctx: &mut TickContext) {
    if ctx.inventory.food <= 0.0 {
        return;
    }
    let threshold = ctx.config.colonist_eat_threshold_food;
    for (id, entity) in colonists_in_order(world) {
        let Ok((colonist, pos, needs, task)) = world.query_one_mut::<(&Colonist, &Position, &Needs, &mut Task)>(entity)
        else {
            continue;
        };
        if colonist.drafted || !task.is_active() || !task.kind.yields_to_hunger() {
            continue;
        }
        if needs.is_hungry(threshold) {
            log::debug!("{} is hungry, dropping {}", id, task.kind.name());
            cancel_task(ctx.grid, ctx.inventory, id, pos, task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColonistId, Inventory, OrderQueue, PlanCost};
    use crate::config::WorldConfig;
    use crate::systems::JobRouter;
    use crate::world_grid::WorldGrid;
    use colonysim_logic::grid::Coord;
    use colonysim_logic::pathfinding::Pathfinder;
    use colonysim_logic::tiles::TileType;

    fn spawn(world: &mut World, id: u32, at: Coord, food: f32) -> hecs::Entity {
        spawn_as(world, id, at, food, RoleKind::Worker, WorkPriorities::default())
    }

    fn spawn_as(world: &mut World, id: u32, at: Coord, food: f32, kind: RoleKind, priorities: WorkPriorities) -> hecs::Entity {
        world.spawn((
            Colonist { id: ColonistId(id), drafted: false },
            Position::center_of(at),
            Needs { personal_food: food },
            Task::default(),
            OrderQueue::default(),
            Role::new(kind),
            priorities,
        ))
    }

    #[test]
    fn test_hungry_colonist_eats_before_building() {
        let mut grid = WorldGrid::new(6, 6, true);
        let mut inv = Inventory::default();
        grid.debug_set_built(Coord::new(5, 5), TileType::Stockpile, &mut inv);
        grid.place_plan(Coord::new(1, 1), TileType::Floor, 3, &mut inv, PlanCost::Charge);
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let hungry = spawn(&mut world, 1, Coord::new(0, 0), 1.0);
        let fed = spawn(&mut world, 2, Coord::new(0, 0), 6.0);

        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);

        assert_eq!(world.get::<&Task>(hungry).unwrap().kind, JobKind::Eat);
        assert_eq!(world.get::<&Task>(hungry).unwrap().target, Coord::new(5, 5));
        assert_eq!(world.get::<&Task>(fed).unwrap().kind, JobKind::BuildPlan);
    }

    #[test]
    fn test_eat_in_place_without_stockpile() {
        let mut grid = WorldGrid::new(4, 4, true);
        let mut inv = Inventory::default();
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let e = spawn(&mut world, 1, Coord::new(2, 2), 0.5);
        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);
        let task = world.get::<&Task>(e).unwrap();
        assert_eq!(task.kind, JobKind::Eat);
        assert_eq!(task.phase, TaskPhase::Working);
        assert_eq!(task.target, Coord::new(2, 2));
    }

    #[test]
    fn test_drafted_colonist_gets_no_job() {
        let mut grid = WorldGrid::new(4, 4, true);
        let mut inv = Inventory::default();
        grid.place_plan(Coord::new(1, 1), TileType::Floor, 0, &mut inv, PlanCost::Charge);
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let e = spawn(&mut world, 1, Coord::new(3, 3), 6.0);
        world.get::<&mut Colonist>(e).unwrap().drafted = true;
        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);
        assert!(world.get::<&Task>(e).unwrap().is_idle());
    }

    #[test]
    fn test_hunger_preempts_build() {
        let mut grid = WorldGrid::new(6, 6, true);
        let mut inv = Inventory::default();
        let plan = Coord::new(4, 4);
        grid.place_plan(plan, TileType::Wall, 0, &mut inv, PlanCost::Charge);
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let e = spawn(&mut world, 1, Coord::new(0, 0), 6.0);
        {
            let mut ctx = TickContext {
                grid: &mut grid,
                inventory: &mut inv,
                router: &mut router,
                pathfinder: &mut pf,
                config: &config,
            };
            job_assignment_system(&mut world, &mut ctx);
        }
        assert_eq!(world.get::<&Task>(e).unwrap().kind, JobKind::BuildPlan);
        world.get::<&mut Needs>(e).unwrap().personal_food = 1.0;
        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);
        assert_eq!(world.get::<&Task>(e).unwrap().kind, JobKind::Eat);
        assert_eq!(grid.holder(crate::components::Claim::Plan, plan), None);
    }

    #[test]
    fn test_work_order_ranks_by_priority() {
        let mut p = WorkPriorities::default();
        p.set(WorkType::Haul, 1);
        p.set(WorkType::Farm, 0);
        let order = work_order_for(RoleKind::Worker, &p, false);
        assert_eq!(order.first(), Some(&FieldKind::HaulPickup));
        assert!(!order.contains(&FieldKind::Harvest));
        assert_eq!(order[1..], WORK_ORDER[1..5]);

        // Out of food: harvest first even though farming is off.
        let order = work_order_for(RoleKind::Worker, &p, true);
        assert_eq!(order.first(), Some(&FieldKind::Harvest));

        let order = work_order_for(RoleKind::Hauler, &WorkPriorities::default(), true);
        assert_eq!(order, vec![FieldKind::HaulPickup]);
        assert!(work_order_for(RoleKind::Guard, &WorkPriorities::default(), true).is_empty());
    }

    #[test]
    fn test_builder_leaves_wood_for_haulers() {
        let mut grid = WorldGrid::new(6, 6, true);
        let mut inv = Inventory::default();
        grid.debug_set_built(Coord::new(5, 5), TileType::Stockpile, &mut inv);
        grid.adjust_loose_wood(Coord::new(2, 2), 5);
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let builder = spawn_as(
            &mut world,
            1,
            Coord::new(0, 0),
            6.0,
            RoleKind::Builder,
            WorkPriorities::for_role(RoleKind::Builder),
        );
        let hauler = spawn_as(
            &mut world,
            2,
            Coord::new(0, 5),
            6.0,
            RoleKind::Hauler,
            WorkPriorities::for_role(RoleKind::Hauler),
        );
        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);
        assert!(world.get::<&Task>(builder).unwrap().is_idle());
        assert_eq!(world.get::<&Task>(hauler).unwrap().kind, JobKind::HaulWood);
    }

    #[test]
    fn test_haul_priority_beats_build() {
        let mut grid = WorldGrid::new(6, 6, true);
        let mut inv = Inventory::default();
        grid.debug_set_built(Coord::new(5, 5), TileType::Stockpile, &mut inv);
        grid.place_plan(Coord::new(1, 1), TileType::Floor, 3, &mut inv, PlanCost::Charge);
        grid.adjust_loose_wood(Coord::new(4, 4), 5);
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let mut hauling_first = WorkPriorities::default();
        hauling_first.set(WorkType::Haul, 1);
        let e = spawn_as(&mut world, 1, Coord::new(0, 0), 6.0, RoleKind::Worker, hauling_first);
        let plain = spawn(&mut world, 2, Coord::new(0, 1), 6.0);
        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);
        assert_eq!(world.get::<&Task>(e).unwrap().kind, JobKind::HaulWood);
        assert_eq!(world.get::<&Task>(plain).unwrap().kind, JobKind::BuildPlan);
    }

    #[test]
    fn test_empty_larder_overrides_farm_off() {
        let mut grid = WorldGrid::new(6, 6, true);
        let mut inv = Inventory { wood: 50, food: 0.0 };
        grid.debug_set_built(Coord::new(4, 4), TileType::Farm, &mut inv);
        grid.grow_farms(1.0);
        grid.place_plan(Coord::new(1, 1), TileType::Floor, 3, &mut inv, PlanCost::Charge);
        let mut router = JobRouter::new(true);
        let mut pf = Pathfinder::new();
        let config = WorldConfig::default();
        let mut world = World::new();
        let mut no_farming = WorkPriorities::default();
        no_farming.set(WorkType::Farm, 0);
        let e = spawn_as(&mut world, 1, Coord::new(0, 0), 6.0, RoleKind::Worker, no_farming);
        let mut ctx = TickContext {
            grid: &mut grid,
            inventory: &mut inv,
            router: &mut router,
            pathfinder: &mut pf,
            config: &config,
        };
        job_assignment_system(&mut world, &mut ctx);
        assert_eq!(world.get::<&Task>(e).unwrap().kind, JobKind::Harvest);
    }
}
