//! Tile state for the whole map, and the only API that mutates it.
//!
//! Every write to a cell goes through `WorldGrid`: plan edits, construction
//! completion, farm growth, loose wood and the three reservation claims.
//! Each write bumps the revision counter of the distance fields it can
//! affect, which is how the job router knows a field is stale. Walkability
//! and cost changes bump every field and mark rooms dirty when room
//! membership changes.

use colonysim_logic::grid::{Coord, GridMap};
use colonysim_logic::rooms::RoomIndex;
use colonysim_logic::tiles::{clamp_priority, TileType, MAX_PLAN_PRIORITY};

use crate::components::{
    Cell, Claim, ColonistId, FieldKind, Inventory, PlacePlanResult, PlanCost, ReservationConflict,
};

/// Chebyshev radius searched when dropping loose wood.
const DROP_RADIUS: i32 = 4;

/// What a finished plan turned the tile into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanCompletion {
    pub at: Coord,
    /// What was planned; `Remove` for demolitions.
    pub plan: TileType,
    pub before: TileType,
    pub after: TileType,
}

impl PlanCompletion {
    /// The tile stopped being walkable.
    pub fn blocked(&self) -> bool {
        self.before.is_walkable() && !self.after.is_walkable()
    }
}

#[derive(Debug, Clone)]
pub struct WorldGrid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    nav: GridMap,
    terrain_costs: bool,
    built_counts: [usize; TileType::ALL.len()],
    planned_count: usize,
    loose_wood_total: i64,
    revisions: [u64; FieldKind::COUNT],
    rooms: RoomIndex,
    rooms_dirty: bool,
}

impl WorldGrid {
    /// An all-`Empty` map. Dimensions are clamped to 1x1.
    pub fn new(width: i32, height: i32, terrain_costs: bool) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let n = (width * height) as usize;
        let mut built_counts = [0; TileType::ALL.len()];
        built_counts[TileType::Empty.index()] = n;
        Self {
            width,
            height,
            cells: vec![Cell::default(); n],
            nav: GridMap::new(width, height),
            terrain_costs,
            built_counts,
            planned_count: 0,
            loose_wood_total: 0,
            revisions: [1; FieldKind::COUNT],
            rooms: RoomIndex::default(),
            rooms_dirty: true,
        }
    }

    /// Rebuild a grid from saved cells. Derived state is recomputed.
    pub fn from_cells(width: i32, height: i32, cells: Vec<Cell>, terrain_costs: bool) -> Option<Self> {
        if width < 1 || height < 1 || cells.len() != (width * height) as usize {
            return None;
        }
        let mut grid = Self::new(width, height, terrain_costs);
        grid.cells = cells;
        grid.recount();
        for y in 0..height {
            for x in 0..width {
                grid.sync_nav(Coord::new(x, y));
            }
        }
        Some(grid)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, at: Coord) -> bool {
        at.x >= 0 && at.y >= 0 && at.x < self.width && at.y < self.height
    }

    fn index(&self, at: Coord) -> usize {
        (at.y * self.width + at.x) as usize
    }

    pub fn cell(&self, at: Coord) -> Option<&Cell> {
        if self.in_bounds(at) {
            Some(&self.cells[self.index(at)])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn nav(&self) -> &GridMap {
        &self.nav
    }

    pub fn passable(&self, at: Coord) -> bool {
        self.nav.passable_at(at)
    }

    pub fn terrain_costs(&self) -> bool {
        self.terrain_costs
    }

    pub fn set_terrain_costs(&mut self, enabled: bool) {
        if self.terrain_costs == enabled {
            return;
        }
        self.terrain_costs = enabled;
        for y in 0..self.height {
            for x in 0..self.width {
                self.sync_nav(Coord::new(x, y));
            }
        }
        self.bump_all();
    }

    pub fn built_count(&self, t: TileType) -> usize {
        self.built_counts[t.index()]
    }

    pub fn planned_count(&self) -> usize {
        self.planned_count
    }

    pub fn loose_wood_total(&self) -> i64 {
        self.loose_wood_total
    }

    // ── Field revisions ─────────────────────────────────────────────────

    /// Changes whenever anything a field of `kind` depends on changes.
    pub fn field_stamp(&self, kind: FieldKind) -> u64 {
        let own = self.revisions[kind.slot()];
        match kind {
            FieldKind::HaulPickup => own + self.revisions[FieldKind::Stockpile.slot()],
            _ => own,
        }
    }

    fn bump(&mut self, kind: FieldKind) {
        self.revisions[kind.slot()] += 1;
    }

    fn bump_builds(&mut self) {
        for p in 0..=MAX_PLAN_PRIORITY {
            self.bump(FieldKind::Build(p));
        }
    }

    fn bump_all(&mut self) {
        for r in &mut self.revisions {
            *r += 1;
        }
    }

    // ── Built tiles ─────────────────────────────────────────────────────

    fn sync_nav(&mut self, at: Coord) {
        let built = self.cells[self.index(at)].built;
        self.nav.set_walkable(at.x, at.y, built.is_walkable());
        let cost = if self.terrain_costs { built.nav_cost() } else { 1.0 };
        self.nav.set_cost_multiplier(at.x, at.y, cost);
    }

    /// Overwrite the built type. Clears a plan that now matches, resets farm
    /// state, and invalidates nav, fields and rooms.
    fn set_built(&mut self, at: Coord, t: TileType) {
        let i = self.index(at);
        let old = self.cells[i].built;
        if old == t {
            return;
        }
        self.built_counts[old.index()] -= 1;
        self.built_counts[t.index()] += 1;

        let c = &mut self.cells[i];
        c.built = t;
        c.farm_growth = 0.0;
        c.harvest_reserved_by = None;
        let stale_plan = c.planned == t;
        if stale_plan {
            self.clear_plan_at(i);
        }

        if old.is_room_space() != t.is_room_space() || old == TileType::Door || t == TileType::Door {
            self.rooms_dirty = true;
        }
        self.sync_nav(at);
        self.bump_all();
    }

    /// Test/debug hook: set a built tile directly, no cost and no refund.
    /// Loose wood on a tile that becomes unwalkable is pushed out.
    pub fn debug_set_built(&mut self, at: Coord, t: TileType, inv: &mut Inventory) -> bool {
        if !self.in_bounds(at) || t == TileType::Remove {
            return false;
        }
        self.set_built(at, t);
        let i = self.index(at);
        self.cells[i].built_from_plan = false;
        if !t.is_walkable() {
            self.push_out_loose_wood(at, inv);
        }
        true
    }

    /// Natural growth: an empty, planless tile becomes a tree.
    pub(crate) fn grow_tree(&mut self, at: Coord) {
        self.set_built(at, TileType::Tree);
        let i = self.index(at);
        self.cells[i].built_from_plan = false;
    }

    // ── Plans ───────────────────────────────────────────────────────────

    fn clear_plan_at(&mut self, i: usize) {
        let c = &mut self.cells[i];
        if c.planned != TileType::Empty {
            self.planned_count -= 1;
        }
        c.planned = TileType::Empty;
        c.plan_priority = 0;
        c.work_remaining = 0.0;
        c.reserved_by = None;
        let farm = c.built == TileType::Farm;
        self.bump_builds();
        if farm {
            self.bump(FieldKind::Harvest);
        }
    }

    /// Create, change, re-prioritise or clear a plan.
    ///
    /// `Empty`, or `Remove` on an empty tile, clears any plan with a refund.
    /// Asking for what the tile already is (or will be) is `NoChange`,
    /// unless only the priority differs. Otherwise the wood difference
    /// between the new and old plan is charged or refunded; with
    /// insufficient wood nothing is mutated.
    pub fn place_plan(
        &mut self,
        at: Coord,
        plan: TileType,
        priority: u8,
        inv: &mut Inventory,
        cost: PlanCost,
    ) -> PlacePlanResult {
        if !self.in_bounds(at) {
            return PlacePlanResult::OutOfBounds;
        }
        let priority = clamp_priority(priority);
        let i = self.index(at);
        let (built, planned, current_priority) = {
            let c = &self.cells[i];
            (c.built, c.planned, c.plan_priority)
        };
        let has_plan = planned != TileType::Empty;

        if plan == TileType::Empty || (plan == TileType::Remove && built == TileType::Empty) {
            if !has_plan {
                return PlacePlanResult::NoChange;
            }
            if cost == PlanCost::Charge {
                inv.wood += planned.wood_cost();
            }
            self.clear_plan_at(i);
            return PlacePlanResult::Ok;
        }

        let current = if has_plan { planned } else { built };
        if plan == current {
            if has_plan && current_priority != priority {
                self.cells[i].plan_priority = priority;
                self.bump_builds();
                return PlacePlanResult::Ok;
            }
            return PlacePlanResult::NoChange;
        }

        let new_cost = if plan == built { 0 } else { plan.wood_cost() };
        let old_cost = if has_plan { planned.wood_cost() } else { 0 };
        let delta = new_cost - old_cost;
        if cost == PlanCost::Charge {
            if delta > 0 && inv.wood < delta {
                return PlacePlanResult::NotEnoughWood;
            }
            inv.wood -= delta;
        }

        if plan == built {
            self.clear_plan_at(i);
            return PlacePlanResult::Ok;
        }

        if !has_plan {
            self.planned_count += 1;
        }
        let c = &mut self.cells[i];
        c.planned = plan;
        c.plan_priority = priority;
        c.work_remaining = plan.build_time();
        c.reserved_by = None;
        let farm = c.built == TileType::Farm;
        self.bump_builds();
        if farm {
            self.bump(FieldKind::Harvest);
        }
        PlacePlanResult::Ok
    }

    /// Force priority and remaining work on an active plan (history replay).
    pub fn set_plan_state(&mut self, at: Coord, priority: u8, work_remaining: f32) {
        if !self.in_bounds(at) {
            return;
        }
        let i = self.index(at);
        if !self.cells[i].has_active_plan() {
            return;
        }
        let c = &mut self.cells[i];
        c.plan_priority = clamp_priority(priority);
        c.work_remaining = work_remaining;
        self.bump_builds();
    }

    /// Refund and clear every plan. Returns how many were cleared.
    pub fn clear_all_plans(&mut self, inv: &mut Inventory) -> usize {
        let mut cleared = 0;
        for i in 0..self.cells.len() {
            let planned = self.cells[i].planned;
            if planned != TileType::Empty {
                inv.wood += planned.wood_cost();
                self.clear_plan_at(i);
                cleared += 1;
            }
        }
        cleared
    }

    /// Spend construction work. Returns the work left.
    pub fn progress_plan(&mut self, at: Coord, work: f32) -> f32 {
        if !self.in_bounds(at) {
            return 0.0;
        }
        let i = self.index(at);
        let c = &mut self.cells[i];
        c.work_remaining = (c.work_remaining - work).max(0.0);
        c.work_remaining
    }

    /// Turn a finished plan into a built tile, dropping salvage and any
    /// wood trapped on a tile that became unwalkable.
    pub fn complete_plan(&mut self, at: Coord, tree_chop_yield: i32, inv: &mut Inventory) -> Option<PlanCompletion> {
        if !self.in_bounds(at) {
            return None;
        }
        let i = self.index(at);
        let c = &self.cells[i];
        if !c.has_active_plan() {
            return None;
        }
        let before = c.built;
        let plan = c.planned;
        let after = if plan == TileType::Remove { TileType::Empty } else { plan };

        let mut salvage = 0;
        if plan == TileType::Remove && before != TileType::Empty && c.built_from_plan {
            salvage += before.wood_cost().max(0);
        }
        if before == TileType::Tree && after != TileType::Tree {
            salvage += tree_chop_yield.max(0);
        }

        self.clear_plan_at(i);
        self.set_built(at, after);
        let c = &mut self.cells[i];
        c.built_from_plan = after != TileType::Empty && after != TileType::Tree;
        if c.loose_wood_reserved_by.take().is_some() {
            self.bump(FieldKind::HaulPickup);
        }

        if !after.is_walkable() {
            self.push_out_loose_wood(at, inv);
        }
        if salvage > 0 {
            self.drop_loose_wood_near(at, salvage, inv);
        }

        Some(PlanCompletion { at, plan, before, after })
    }

    // ── Farms ───────────────────────────────────────────────────────────

    /// Grow every planless farm by `step` (fraction of full growth).
    pub fn grow_farms(&mut self, step: f32) {
        if self.built_count(TileType::Farm) == 0 {
            return;
        }
        let mut ripened = false;
        for c in &mut self.cells {
            if c.built != TileType::Farm || c.has_active_plan() || c.farm_growth >= 1.0 {
                continue;
            }
            c.farm_growth = (c.farm_growth + step).min(1.0);
            ripened |= c.farm_growth >= 1.0;
        }
        if ripened {
            self.bump(FieldKind::Harvest);
        }
    }

    pub fn reset_farm(&mut self, at: Coord) {
        if let Some(i) = self.in_bounds(at).then(|| self.index(at)) {
            self.cells[i].farm_growth = 0.0;
            self.bump(FieldKind::Harvest);
        }
    }

    // ── Loose wood ──────────────────────────────────────────────────────

    /// Add (or remove, with a negative delta) loose wood, floored at zero.
    pub fn adjust_loose_wood(&mut self, at: Coord, delta: i32) {
        if !self.in_bounds(at) || delta == 0 {
            return;
        }
        let i = self.index(at);
        let c = &mut self.cells[i];
        let before = c.loose_wood;
        let after = (before + delta).max(0);
        if after == before {
            return;
        }
        c.loose_wood = after;
        if after == 0 {
            c.loose_wood_reserved_by = None;
        }
        self.loose_wood_total += (after - before) as i64;
        if (before == 0) != (after == 0) {
            self.bump(FieldKind::HaulPickup);
        }
    }

    /// Remove up to `max` wood from a pile. Returns what was taken.
    pub fn take_loose_wood(&mut self, at: Coord, max: i32) -> i32 {
        let Some(c) = self.cell(at) else {
            return 0;
        };
        let taken = c.loose_wood.min(max.max(0));
        self.adjust_loose_wood(at, -taken);
        taken
    }

    /// Drop wood on the nearest walkable, planless tile within a small
    /// radius, preferring `at`. Wood landing on a stockpile, or with no
    /// stockpile on the map, or with nowhere to go, goes to the inventory.
    pub fn drop_loose_wood_near(&mut self, at: Coord, amount: i32, inv: &mut Inventory) {
        if amount <= 0 {
            return;
        }
        if self.built_count(TileType::Stockpile) == 0 {
            inv.wood += amount;
            return;
        }
        for r in 0..=DROP_RADIUS {
            for dy in -r..=r {
                for dx in -r..=r {
                    let t = at.offset(dx, dy);
                    let Some(c) = self.cell(t) else {
                        continue;
                    };
                    if !c.built.is_walkable() || c.has_active_plan() {
                        continue;
                    }
                    if c.built == TileType::Stockpile {
                        inv.wood += amount;
                    } else {
                        self.adjust_loose_wood(t, amount);
                    }
                    return;
                }
            }
        }
        inv.wood += amount;
    }

    fn push_out_loose_wood(&mut self, at: Coord, inv: &mut Inventory) {
        let trapped = self.cell(at).map_or(0, |c| c.loose_wood);
        if trapped > 0 {
            self.adjust_loose_wood(at, -trapped);
            self.drop_loose_wood_near(at, trapped, inv);
        }
    }

    // ── Reservations ────────────────────────────────────────────────────

    pub fn holder(&self, claim: Claim, at: Coord) -> Option<ColonistId> {
        let c = self.cell(at)?;
        match claim {
            Claim::Plan => c.reserved_by,
            Claim::Harvest => c.harvest_reserved_by,
            Claim::Pile => c.loose_wood_reserved_by,
        }
    }

    fn claimable(c: &Cell, claim: Claim) -> bool {
        match claim {
            Claim::Plan => c.has_active_plan(),
            Claim::Harvest => c.built == TileType::Farm && !c.has_active_plan(),
            Claim::Pile => c.loose_wood > 0 && c.built.is_walkable(),
        }
    }

    fn claim_slot(c: &mut Cell, claim: Claim) -> &mut Option<ColonistId> {
        match claim {
            Claim::Plan => &mut c.reserved_by,
            Claim::Harvest => &mut c.harvest_reserved_by,
            Claim::Pile => &mut c.loose_wood_reserved_by,
        }
    }

    fn bump_claim(&mut self, claim: Claim, at: Coord) {
        match claim {
            Claim::Plan => {
                let p = self.cells[self.index(at)].plan_priority;
                self.bump(FieldKind::Build(p));
            }
            Claim::Harvest => self.bump(FieldKind::Harvest),
            Claim::Pile => self.bump(FieldKind::HaulPickup),
        }
    }

    /// Claim a cell exclusively. Re-claiming one's own reservation succeeds.
    pub fn reserve(&mut self, claim: Claim, at: Coord, who: ColonistId) -> Result<(), ReservationConflict> {
        let conflict = |holder| ReservationConflict { claim, at, holder };
        if !self.in_bounds(at) {
            return Err(conflict(None));
        }
        let i = self.index(at);
        let c = &mut self.cells[i];
        if !Self::claimable(c, claim) {
            return Err(conflict(None));
        }
        let slot = Self::claim_slot(c, claim);
        let current = *slot;
        match current {
            Some(holder) if holder != who => Err(conflict(Some(holder))),
            Some(_) => Ok(()),
            None => {
                *slot = Some(who);
                self.bump_claim(claim, at);
                Ok(())
            }
        }
    }

    /// Release a claim if `who` holds it.
    pub fn release(&mut self, claim: Claim, at: Coord, who: ColonistId) {
        if !self.in_bounds(at) {
            return;
        }
        let i = self.index(at);
        let slot = Self::claim_slot(&mut self.cells[i], claim);
        if *slot == Some(who) {
            *slot = None;
            self.bump_claim(claim, at);
        }
    }

    /// Take a claim from whoever holds it. Returns the previous holder.
    pub fn steal(&mut self, claim: Claim, at: Coord, who: ColonistId) -> Result<Option<ColonistId>, ReservationConflict> {
        let previous = self.holder(claim, at);
        if let Some(holder) = previous {
            self.release(claim, at, holder);
        }
        self.reserve(claim, at, who)?;
        Ok(previous.filter(|h| *h != who))
    }

    pub fn clear_all_reservations(&mut self) {
        for c in &mut self.cells {
            c.reserved_by = None;
            c.harvest_reserved_by = None;
            c.loose_wood_reserved_by = None;
        }
        self.bump_all();
    }

    // ── Job sources ─────────────────────────────────────────────────────

    /// Whether `at` is currently an eligible, unclaimed source for `kind`.
    pub fn offers(&self, kind: FieldKind, at: Coord) -> bool {
        let Some(c) = self.cell(at) else {
            return false;
        };
        match kind {
            FieldKind::Build(p) => c.has_active_plan() && c.plan_priority == clamp_priority(p) && c.reserved_by.is_none(),
            FieldKind::Harvest => c.is_ripe_farm() && c.harvest_reserved_by.is_none(),
            FieldKind::Eat | FieldKind::Stockpile => c.built == TileType::Stockpile,
            FieldKind::HaulPickup => {
                c.loose_wood > 0
                    && c.built.is_walkable()
                    && c.built != TileType::Stockpile
                    && c.loose_wood_reserved_by.is_none()
            }
        }
    }

    /// The claim a colonist takes when assigned from `kind`, if any.
    pub fn claim_for(kind: FieldKind) -> Option<Claim> {
        match kind {
            FieldKind::Build(_) => Some(Claim::Plan),
            FieldKind::Harvest => Some(Claim::Harvest),
            FieldKind::HaulPickup => Some(Claim::Pile),
            FieldKind::Eat | FieldKind::Stockpile => None,
        }
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn rooms_dirty(&self) -> bool {
        self.rooms_dirty
    }

    pub fn rebuild_rooms(&mut self) {
        let tiles: Vec<TileType> = self.cells.iter().map(|c| c.built).collect();
        self.rooms = RoomIndex::build(self.width, self.height, &tiles);
        self.rooms_dirty = false;
    }

    fn recount(&mut self) {
        self.built_counts = [0; TileType::ALL.len()];
        self.planned_count = 0;
        self.loose_wood_total = 0;
        for c in &self.cells {
            self.built_counts[c.built.index()] += 1;
            if c.planned != TileType::Empty {
                self.planned_count += 1;
            }
            self.loose_wood_total += c.loose_wood.max(0) as i64;
        }
        self.rooms_dirty = true;
        self.bump_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> (WorldGrid, Inventory) {
        (WorldGrid::new(8, 8, true), Inventory::default())
    }

    #[test]
    fn test_place_plan_charges_and_no_change() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(2, 2);
        assert_eq!(g.place_plan(at, TileType::Wall, 0, &mut inv, PlanCost::Charge), PlacePlanResult::Ok);
        assert_eq!(inv.wood, 48);
        assert_eq!(g.planned_count(), 1);
        assert_eq!(g.place_plan(at, TileType::Wall, 0, &mut inv, PlanCost::Charge), PlacePlanResult::NoChange);
        assert_eq!(inv.wood, 48);
    }

    #[test]
    fn test_priority_only_change() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(1, 1);
        g.place_plan(at, TileType::Floor, 0, &mut inv, PlanCost::Charge);
        assert_eq!(g.place_plan(at, TileType::Floor, 2, &mut inv, PlanCost::Charge), PlacePlanResult::Ok);
        assert_eq!(g.cell(at).unwrap().plan_priority, 2);
        assert_eq!(inv.wood, 49);
        // Clamped to the max priority.
        g.place_plan(at, TileType::Floor, 200, &mut inv, PlanCost::Charge);
        assert_eq!(g.cell(at).unwrap().plan_priority, 3);
    }

    #[test]
    fn test_not_enough_wood_leaves_cell_untouched() {
        let (mut g, mut inv) = grid();
        inv.wood = 2;
        let at = Coord::new(3, 3);
        let before = g.cell(at).unwrap().clone();
        assert_eq!(g.place_plan(at, TileType::Farm, 1, &mut inv, PlanCost::Charge), PlacePlanResult::NotEnoughWood);
        assert_eq!(g.cell(at).unwrap(), &before);
        assert_eq!(inv.wood, 2);
        assert_eq!(g.planned_count(), 0);
    }

    #[test]
    fn test_replace_plan_charges_difference() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(0, 0);
        g.place_plan(at, TileType::Floor, 0, &mut inv, PlanCost::Charge);
        g.place_plan(at, TileType::Farm, 0, &mut inv, PlanCost::Charge);
        assert_eq!(inv.wood, 47);
        assert_eq!(g.place_plan(at, TileType::Empty, 0, &mut inv, PlanCost::Charge), PlacePlanResult::Ok);
        assert_eq!(inv.wood, 50);
        assert_eq!(g.planned_count(), 0);
        assert_eq!(g.place_plan(at, TileType::Empty, 0, &mut inv, PlanCost::Charge), PlacePlanResult::NoChange);
    }

    #[test]
    fn test_out_of_bounds() {
        let (mut g, mut inv) = grid();
        assert_eq!(
            g.place_plan(Coord::new(8, 0), TileType::Wall, 0, &mut inv, PlanCost::Charge),
            PlacePlanResult::OutOfBounds
        );
    }

    #[test]
    fn test_free_plan_skips_wood() {
        let (mut g, mut inv) = grid();
        inv.wood = 0;
        assert_eq!(
            g.place_plan(Coord::new(1, 1), TileType::Wall, 0, &mut inv, PlanCost::Free),
            PlacePlanResult::Ok
        );
        assert_eq!(inv.wood, 0);
    }

    #[test]
    fn test_complete_wall_blocks_nav() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(4, 4);
        g.place_plan(at, TileType::Wall, 0, &mut inv, PlanCost::Charge);
        let done = g.complete_plan(at, 4, &mut inv).unwrap();
        assert!(done.blocked());
        assert!(!g.passable(at));
        assert_eq!(g.built_count(TileType::Wall), 1);
        assert_eq!(g.planned_count(), 0);
        assert!(g.cell(at).unwrap().built_from_plan);
    }

    #[test]
    fn test_demolish_refunds_as_loose_wood() {
        let (mut g, mut inv) = grid();
        g.debug_set_built(Coord::new(0, 0), TileType::Stockpile, &mut inv);
        let at = Coord::new(5, 5);
        g.place_plan(at, TileType::Wall, 0, &mut inv, PlanCost::Charge);
        g.complete_plan(at, 4, &mut inv);
        g.place_plan(at, TileType::Remove, 0, &mut inv, PlanCost::Charge);
        g.complete_plan(at, 4, &mut inv);
        assert_eq!(g.cell(at).unwrap().built, TileType::Empty);
        assert_eq!(g.cell(at).unwrap().loose_wood, 2);
        assert_eq!(g.loose_wood_total(), 2);
    }

    #[test]
    fn test_chop_tree_without_stockpile_goes_to_inventory() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(2, 5);
        g.debug_set_built(at, TileType::Tree, &mut inv);
        g.place_plan(at, TileType::Remove, 0, &mut inv, PlanCost::Charge);
        g.complete_plan(at, 4, &mut inv);
        assert_eq!(inv.wood, 54);
        assert_eq!(g.loose_wood_total(), 0);
    }

    #[test]
    fn test_reservation_exclusive() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(1, 2);
        g.place_plan(at, TileType::Floor, 0, &mut inv, PlanCost::Charge);
        assert!(g.reserve(Claim::Plan, at, ColonistId(1)).is_ok());
        let err = g.reserve(Claim::Plan, at, ColonistId(2)).unwrap_err();
        assert_eq!(err.holder, Some(ColonistId(1)));
        // Not the holder: release is ignored.
        g.release(Claim::Plan, at, ColonistId(2));
        assert_eq!(g.holder(Claim::Plan, at), Some(ColonistId(1)));
        g.release(Claim::Plan, at, ColonistId(1));
        assert!(g.reserve(Claim::Plan, at, ColonistId(2)).is_ok());
    }

    #[test]
    fn test_reserve_ineligible_cell() {
        let (mut g, _) = grid();
        let err = g.reserve(Claim::Pile, Coord::new(0, 0), ColonistId(1)).unwrap_err();
        assert_eq!(err.holder, None);
    }

    #[test]
    fn test_reservation_bumps_field_stamp() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(1, 2);
        g.place_plan(at, TileType::Floor, 2, &mut inv, PlanCost::Charge);
        let before = g.field_stamp(FieldKind::Build(2));
        let harvest_before = g.field_stamp(FieldKind::Harvest);
        g.reserve(Claim::Plan, at, ColonistId(1)).unwrap();
        assert_ne!(g.field_stamp(FieldKind::Build(2)), before);
        assert_eq!(g.field_stamp(FieldKind::Harvest), harvest_before);
    }

    #[test]
    fn test_haul_stamp_follows_stockpiles() {
        let (mut g, mut inv) = grid();
        let before = g.field_stamp(FieldKind::HaulPickup);
        g.debug_set_built(Coord::new(3, 3), TileType::Stockpile, &mut inv);
        assert_ne!(g.field_stamp(FieldKind::HaulPickup), before);
    }

    #[test]
    fn test_farm_growth_ripens() {
        let (mut g, mut inv) = grid();
        let at = Coord::new(6, 6);
        g.debug_set_built(at, TileType::Farm, &mut inv);
        assert!(!g.offers(FieldKind::Harvest, at));
        g.grow_farms(0.6);
        g.grow_farms(0.6);
        assert!(g.offers(FieldKind::Harvest, at));
        g.reset_farm(at);
        assert!(!g.offers(FieldKind::Harvest, at));
    }

    #[test]
    fn test_drop_prefers_origin_and_skips_plans() {
        let (mut g, mut inv) = grid();
        g.debug_set_built(Coord::new(7, 7), TileType::Stockpile, &mut inv);
        let at = Coord::new(3, 3);
        g.place_plan(at, TileType::Floor, 0, &mut inv, PlanCost::Charge);
        g.drop_loose_wood_near(at, 5, &mut inv);
        assert_eq!(g.cell(at).unwrap().loose_wood, 0);
        assert_eq!(g.cell(Coord::new(2, 2)).unwrap().loose_wood, 5);
    }

    #[test]
    fn test_wall_over_pile_pushes_wood() {
        let (mut g, mut inv) = grid();
        g.debug_set_built(Coord::new(7, 7), TileType::Stockpile, &mut inv);
        let at = Coord::new(4, 1);
        g.adjust_loose_wood(at, 3);
        g.debug_set_built(at, TileType::Wall, &mut inv);
        assert_eq!(g.cell(at).unwrap().loose_wood, 0);
        assert_eq!(g.loose_wood_total(), 3);
    }

    #[test]
    fn test_from_cells_rebuilds_counts() {
        let (mut g, mut inv) = grid();
        g.debug_set_built(Coord::new(1, 1), TileType::Wall, &mut inv);
        g.place_plan(Coord::new(2, 2), TileType::Floor, 0, &mut inv, PlanCost::Charge);
        let back = WorldGrid::from_cells(8, 8, g.cells().to_vec(), true).unwrap();
        assert_eq!(back.built_count(TileType::Wall), 1);
        assert_eq!(back.planned_count(), 1);
        assert!(!back.passable(Coord::new(1, 1)));
        assert!(WorldGrid::from_cells(8, 7, g.cells().to_vec(), true).is_none());
    }
}
