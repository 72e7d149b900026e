//! World - main entry point for running the colony simulation

use colonysim_logic::grid::Coord;
use colonysim_logic::pathfinding::{PathAlgo, Pathfinder};
use colonysim_logic::rooms::RoomInfo;
use colonysim_logic::tiles::TileType;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::components::*;
use crate::config::{validate_config, ConfigError, WorldConfig};
use crate::systems::*;
use crate::world_grid::WorldGrid;

/// Colonists placed by [`World::reset`].
pub const START_COLONISTS: u32 = 5;
/// Half-size of the floor patch laid down by [`World::reset`].
const START_PATCH_RADIUS: i32 = 3;
/// Random walls and trees keep this far from the center.
const START_CLEAR_RADIUS: i32 = 6;

/// The whole simulation: tiles, stock, colonists and routing state.
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) grid: WorldGrid,
    pub(crate) inventory: Inventory,
    /// ECS world holding one entity per colonist.
    pub(crate) colonists: hecs::World,
    pub(crate) router: JobRouter,
    pub(crate) pathfinder: Pathfinder,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) next_colonist_id: u32,
    pub(crate) tree_spread_accum: f32,
    /// Seconds simulated since the last reset.
    pub(crate) sim_time: f64,
    pub(crate) tick_count: u64,
}

impl World {
    /// An empty `width` x `height` world with default tuning and no colonists.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_config(width, height, WorldConfig::default())
    }

    /// A world with caller-supplied tuning. The config is used as given;
    /// see [`World::try_with_config`] for a checked constructor.
    pub fn with_config(width: i32, height: i32, config: WorldConfig) -> Self {
        Self {
            grid: WorldGrid::new(width, height, config.nav_use_terrain_costs),
            inventory: Inventory::default(),
            colonists: hecs::World::new(),
            router: JobRouter::new(config.allow_diagonal),
            pathfinder: pathfinder_for(&config),
            rng: ChaCha8Rng::seed_from_u64(0),
            next_colonist_id: 0,
            tree_spread_accum: 0.0,
            sim_time: 0.0,
            tick_count: 0,
            config,
        }
    }

    /// Like [`World::with_config`], but rejects a config that fails
    /// [`validate_config`].
    pub fn try_with_config(width: i32, height: i32, config: WorldConfig) -> Result<Self, Vec<ConfigError>> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self::with_config(width, height, config))
    }

    /// Start a fresh colony: floor patch and stockpile at the center,
    /// scattered rocks and trees, five fed colonists.
    pub fn reset(&mut self, width: i32, height: i32, seed: u64) {
        let w = width.max(1);
        let h = height.max(1);
        self.grid = WorldGrid::new(w, h, self.config.nav_use_terrain_costs);
        self.inventory = Inventory { wood: 60, food: 20.0 };
        self.colonists.clear();
        self.router = JobRouter::new(self.config.allow_diagonal);
        self.pathfinder = pathfinder_for(&self.config);
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.next_colonist_id = 0;
        self.tree_spread_accum = 0.0;
        self.sim_time = 0.0;
        self.tick_count = 0;

        let (cx, cy) = (w / 2, h / 2);
        let mut scratch = Inventory::default();
        for dy in -START_PATCH_RADIUS..=START_PATCH_RADIUS {
            for dx in -START_PATCH_RADIUS..=START_PATCH_RADIUS {
                self.grid.debug_set_built(Coord::new(cx + dx, cy + dy), TileType::Floor, &mut scratch);
            }
        }
        self.grid.debug_set_built(Coord::new(cx, cy), TileType::Stockpile, &mut scratch);

        if w > 2 && h > 2 {
            self.scatter(TileType::Wall, (w * h / 60) as usize, cx, cy, false);
            self.scatter(TileType::Tree, (w * h / 35) as usize, cx, cy, true);
        }

        let full = self.config.colonist_max_personal_food.max(0.0);
        for i in 0..START_COLONISTS as i32 {
            let x = cx as f32 + 0.5 + ((i % 2) - 1) as f32 * 0.5;
            let y = cy as f32 + 0.5 + ((i / 2) - 1) as f32 * 0.5;
            let id = self.spawn_colonist(x, y);
            self.set_colonist_food(id, full);
        }

        self.grid.rebuild_rooms();
        info!("World reset: {}x{} seed {}", w, h, seed);
    }

    fn scatter(&mut self, t: TileType, count: usize, cx: i32, cy: i32, only_empty: bool) {
        let (w, h) = (self.grid.width(), self.grid.height());
        let mut scratch = Inventory::default();
        for _ in 0..count {
            let x = self.rng.gen_range(1..=w - 2);
            let y = self.rng.gen_range(1..=h - 2);
            if (x - cx).abs() < START_CLEAR_RADIUS && (y - cy).abs() < START_CLEAR_RADIUS {
                continue;
            }
            let at = Coord::new(x, y);
            if only_empty && self.grid.cell(at).map_or(true, |c| c.built != TileType::Empty) {
                continue;
            }
            self.grid.debug_set_built(at, t, &mut scratch);
        }
    }

    fn split(&mut self) -> (&mut hecs::World, TickContext<'_>) {
        (
            &mut self.colonists,
            TickContext {
                grid: &mut self.grid,
                inventory: &mut self.inventory,
                router: &mut self.router,
                pathfinder: &mut self.pathfinder,
                config: &self.config,
            },
        )
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Order: passive flows, field refresh and assignment, colonist
    /// movement and work, completion. Rooms are rebuilt at the end if
    /// anything changed them.
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.sim_time += dt as f64;
        self.tick_count += 1;

        // Step 1: passive flows
        farm_growth_system(&mut self.grid, &self.config, dt);
        let occupied = occupied_tiles(&self.colonists);
        tree_spread_system(
            &mut self.grid,
            &mut self.rng,
            &occupied,
            &self.config,
            &mut self.tree_spread_accum,
            dt,
        );
        hunger_system(&mut self.colonists, &self.config, dt);

        let (colonists, mut ctx) = self.split();
        // Steps 2-3: fields and assignment
        job_assignment_system(colonists, &mut ctx);
        // Step 4: walk and work
        step_colonists(colonists, &mut ctx, dt);
        // Step 5: apply results
        resolve_tasks(colonists, &mut ctx);

        if self.grid.rooms_dirty() {
            self.grid.rebuild_rooms();
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.grid.cell(Coord::new(x, y))
    }

    /// The plan-related state of a tile, for plan history.
    pub fn snapshot_tile(&self, x: i32, y: i32) -> Option<TileSnapshot> {
        self.cell(x, y).map(TileSnapshot::from)
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    pub fn planned_count(&self) -> usize {
        self.grid.planned_count()
    }

    pub fn built_count(&self, t: TileType) -> usize {
        self.grid.built_count(t)
    }

    /// Router counters plus pathfinder search counts.
    pub fn path_stats(&self) -> PathStats {
        let mut stats = *self.router.stats();
        let search = self.pathfinder.stats();
        stats.astar_searches = search.astar_searches;
        stats.jps_searches = search.jps_searches;
        stats.path_cache_hits = search.cache_hits;
        stats.path_cache_misses = search.cache_misses;
        stats
    }

    /// Point-to-point path with the configured solver.
    pub fn find_path(&mut self, start: Coord, goal: Coord) -> Vec<Coord> {
        self.pathfinder.find_path(self.grid.nav(), self.config.path_algo, start, goal)
    }

    // ── Colonists ───────────────────────────────────────────────────────

    /// Every colonist, sorted by id.
    pub fn colonists(&self) -> Vec<ColonistView> {
        colonists_in_order(&self.colonists)
            .into_iter()
            .filter_map(|(id, _)| self.colonist(id))
            .collect()
    }

    pub fn colonist(&self, id: ColonistId) -> Option<ColonistView> {
        let entity = find_colonist(&self.colonists, id)?;
        let mut query = self
            .colonists
            .query_one::<(&Colonist, &Position, &Needs, &Task, &OrderQueue, &Role, &WorkPriorities)>(entity)
            .ok()?;
        let (colonist, pos, needs, task, orders, role, priorities) = query.get()?;
        Some(ColonistView {
            id: colonist.id,
            x: pos.x,
            y: pos.y,
            drafted: colonist.drafted,
            personal_food: needs.personal_food,
            job: task.kind,
            phase: task.phase,
            target: task.target,
            path: task.path.clone(),
            path_cursor: task.path_cursor,
            carrying_wood: task.carrying_wood,
            queued_orders: orders.orders.len(),
            role: role.kind,
            level: role.level,
            xp: role.xp,
            work_priorities: *priorities,
        })
    }

    pub fn colonist_count(&self) -> usize {
        self.colonists.query::<&Colonist>().iter().count()
    }

    pub fn spawn_colonist(&mut self, x: f32, y: f32) -> ColonistId {
        let id = ColonistId(self.next_colonist_id);
        self.next_colonist_id += 1;
        self.colonists.spawn((
            Colonist { id, drafted: false },
            Position { x, y },
            Needs {
                personal_food: self.config.colonist_max_personal_food.max(0.0),
            },
            Task::default(),
            OrderQueue::default(),
            Role::default(),
            WorkPriorities::default(),
        ));
        id
    }

    /// Remove every colonist, releasing whatever they held.
    pub fn remove_colonists(&mut self) {
        self.cancel_all_jobs_and_clear_reservations();
        self.colonists.clear();
    }

    /// Teleport a colonist. An active job re-plans its route.
    pub fn set_colonist_position(&mut self, id: ColonistId, x: f32, y: f32) -> bool {
        let Some(entity) = find_colonist(&self.colonists, id) else {
            return false;
        };
        match self.colonists.query_one_mut::<(&mut Position, &mut Task)>(entity) {
            Ok((pos, task)) => {
                *pos = Position { x, y };
                if task.phase == TaskPhase::Seeking {
                    task.path.clear();
                    task.path_cursor = 0;
                }
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_colonist_food(&mut self, id: ColonistId, food: f32) -> bool {
        let Some(entity) = find_colonist(&self.colonists, id) else {
            return false;
        };
        match self.colonists.query_one_mut::<&mut Needs>(entity) {
            Ok(needs) => {
                needs.personal_food = food.max(0.0);
                true
            }
            Err(_) => false,
        }
    }

    /// Change a colonist's role. See [`set_role`] for what happens to its
    /// current job.
    pub fn set_colonist_role(&mut self, id: ColonistId, kind: RoleKind) -> bool {
        let (colonists, mut ctx) = self.split();
        set_role(colonists, &mut ctx, id, kind)
    }

    /// Set one work priority (`0` off, `1` most urgent). Takes effect the
    /// next time the colonist looks for work.
    pub fn set_colonist_work_priority(&mut self, id: ColonistId, work: WorkType, priority: u8) -> bool {
        let Some(entity) = find_colonist(&self.colonists, id) else {
            return false;
        };
        match self.colonists.query_one_mut::<&mut WorkPriorities>(entity) {
            Ok(priorities) => {
                priorities.set(work, priority);
                true
            }
            Err(_) => false,
        }
    }

    /// Reset every work priority to the defaults of the colonist's role.
    pub fn reset_colonist_work_priorities(&mut self, id: ColonistId) -> bool {
        let Some(entity) = find_colonist(&self.colonists, id) else {
            return false;
        };
        match self.colonists.query_one_mut::<(&Role, &mut WorkPriorities)>(entity) {
            Ok((role, priorities)) => {
                *priorities = WorkPriorities::for_role(role.kind);
                true
            }
            Err(_) => false,
        }
    }

    /// Award experience directly. Returns the levels gained, or `None` for
    /// an unknown colonist.
    pub fn grant_colonist_xp(&mut self, id: ColonistId, xp: u32) -> Option<u32> {
        let entity = find_colonist(&self.colonists, id)?;
        let role = self.colonists.query_one_mut::<&mut Role>(entity).ok()?;
        Some(role.grant_xp(xp))
    }

    // ── Player input ────────────────────────────────────────────────────

    pub fn place_plan(&mut self, x: i32, y: i32, plan: TileType, priority: u8) -> PlacePlanResult {
        self.grid
            .place_plan(Coord::new(x, y), plan, priority, &mut self.inventory, PlanCost::Charge)
    }

    pub(crate) fn place_plan_free(&mut self, at: Coord, plan: TileType, priority: u8) -> PlacePlanResult {
        self.grid.place_plan(at, plan, priority, &mut self.inventory, PlanCost::Free)
    }

    pub(crate) fn set_plan_state(&mut self, at: Coord, priority: u8, work_remaining: f32) {
        self.grid.set_plan_state(at, priority, work_remaining);
    }

    /// Refund and clear every plan. Returns how many were cleared.
    pub fn clear_all_plans(&mut self) -> usize {
        self.grid.clear_all_plans(&mut self.inventory)
    }

    pub fn set_colonist_drafted(&mut self, id: ColonistId, drafted: bool) -> bool {
        let (colonists, mut ctx) = self.split();
        set_drafted(colonists, &mut ctx, id, drafted)
    }

    pub fn order_colonist_move(&mut self, id: ColonistId, x: i32, y: i32, queue: bool) -> OrderResult {
        self.order(id, ManualOrder::Move(Coord::new(x, y)), queue)
    }

    pub fn order_colonist_build(&mut self, id: ColonistId, x: i32, y: i32, queue: bool) -> OrderResult {
        self.order(id, ManualOrder::Build(Coord::new(x, y)), queue)
    }

    pub fn order_colonist_harvest(&mut self, id: ColonistId, x: i32, y: i32, queue: bool) -> OrderResult {
        self.order(id, ManualOrder::Harvest(Coord::new(x, y)), queue)
    }

    fn order(&mut self, id: ColonistId, order: ManualOrder, queue: bool) -> OrderResult {
        let (colonists, mut ctx) = self.split();
        issue_order(colonists, &mut ctx, id, order, queue)
    }

    pub fn cancel_colonist_job(&mut self, id: ColonistId) -> bool {
        let (colonists, mut ctx) = self.split();
        cancel_colonist_job(colonists, &mut ctx, id)
    }

    /// Drop every job and every reservation on the map.
    pub fn cancel_all_jobs_and_clear_reservations(&mut self) {
        let (colonists, mut ctx) = self.split();
        cancel_all_jobs(colonists, &mut ctx);
    }

    // ── Navigation settings ─────────────────────────────────────────────

    pub fn set_path_algo(&mut self, algo: PathAlgo) {
        self.config.path_algo = algo;
    }

    pub fn set_nav_terrain_costs(&mut self, enabled: bool) {
        self.config.nav_use_terrain_costs = enabled;
        self.grid.set_terrain_costs(enabled);
    }

    pub fn set_allow_diagonal(&mut self, allow: bool) {
        self.config.allow_diagonal = allow;
        self.pathfinder.set_allow_diagonal(allow);
        self.router.set_allow_diagonal(allow);
    }

    /// Turn the path cache on or off and resize it.
    pub fn set_path_cache(&mut self, enabled: bool, max_entries: usize) {
        self.config.path_cache_enabled = enabled;
        self.config.path_cache_max_entries = max_entries;
        self.pathfinder.set_cache_capacity(self.config.path_cache_capacity());
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.grid.rooms().room_count()
    }

    pub fn room_id_at(&self, x: i32, y: i32) -> Option<usize> {
        self.grid.rooms().room_id_at(x, y)
    }

    pub fn room_info(&self, id: usize) -> Option<&RoomInfo> {
        self.grid.rooms().room_info(id)
    }

    pub fn indoors_room_count(&self) -> usize {
        self.grid.rooms().indoors_room_count()
    }

    pub fn indoors_tile_count(&self) -> usize {
        self.grid.rooms().indoors_tile_count()
    }

    pub fn tile_indoors(&self, x: i32, y: i32) -> bool {
        self.grid.rooms().tile_indoors(x, y)
    }

    // ── Debug hooks ─────────────────────────────────────────────────────

    /// Set a built tile directly, bypassing plans and wood.
    pub fn debug_set_built_tile(&mut self, x: i32, y: i32, t: TileType) -> bool {
        let changed = self.grid.debug_set_built(Coord::new(x, y), t, &mut self.inventory);
        if changed && !t.is_walkable() {
            let (colonists, mut ctx) = self.split();
            nudge_off_blocked_tiles(colonists, &mut ctx);
        }
        changed
    }

    pub fn debug_set_loose_wood(&mut self, x: i32, y: i32, amount: i32) {
        let at = Coord::new(x, y);
        let current = self.grid.cell(at).map_or(0, |c| c.loose_wood);
        self.grid.adjust_loose_wood(at, amount.max(0) - current);
    }

    pub fn debug_rebuild_rooms_now(&mut self) {
        self.grid.rebuild_rooms();
    }
}

pub(crate) fn pathfinder_for(config: &WorldConfig) -> Pathfinder {
    let mut pathfinder = Pathfinder::with_diagonal(config.allow_diagonal);
    pathfinder.set_cache_capacity(config.path_cache_capacity());
    pathfinder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_layout() {
        let mut world = World::new(1, 1);
        world.reset(64, 48, 42);
        assert_eq!(world.width(), 64);
        assert_eq!(world.inventory().wood, 60);
        assert_eq!(world.colonist_count(), 5);
        assert_eq!(world.built_count(TileType::Stockpile), 1);
        assert_eq!(world.cell(32, 24).unwrap().built, TileType::Stockpile);
        assert_eq!(world.cell(29, 21).unwrap().built, TileType::Floor);
        assert!(world.built_count(TileType::Tree) > 0);
        for c in world.colonists() {
            assert_eq!(c.personal_food, 6.0);
            assert!((c.x - 32.5).abs() <= 0.5 && (c.y - 24.5).abs() <= 0.5);
        }
    }

    #[test]
    fn test_reset_tiny_world() {
        let mut world = World::new(1, 1);
        world.reset(0, -3, 1);
        assert_eq!((world.width(), world.height()), (1, 1));
        assert_eq!(world.cell(0, 0).unwrap().built, TileType::Stockpile);
        assert_eq!(world.colonist_count(), 5);
    }

    #[test]
    fn test_tick_ignores_bad_dt() {
        let mut world = World::new(4, 4);
        world.tick(0.0);
        world.tick(f32::NAN);
        world.tick(-1.0);
        assert_eq!(world.tick_count(), 0);
        world.tick(0.1);
        assert_eq!(world.tick_count(), 1);
    }

    #[test]
    fn test_colonist_builds_plan() {
        let mut world = World::new(8, 8);
        let id = world.spawn_colonist(0.5, 0.5);
        assert_eq!(world.place_plan(4, 4, TileType::Floor, 0), PlacePlanResult::Ok);
        for _ in 0..200 {
            world.tick(0.05);
        }
        assert_eq!(world.cell(4, 4).unwrap().built, TileType::Floor);
        assert_eq!(world.planned_count(), 0);
        assert!(!world.colonist(id).unwrap().has_job());
        assert!(world.path_stats().build.assigned >= 1);
    }

    #[test]
    fn test_debug_wall_nudges_colonist() {
        let mut world = World::new(5, 5);
        let id = world.spawn_colonist(2.5, 2.5);
        world.debug_set_built_tile(2, 2, TileType::Wall);
        let c = world.colonist(id).unwrap();
        assert_ne!(c.tile(), Coord::new(2, 2));
    }
}
