//! Undo/redo for plan edits.
//!
//! The input layer opens a command, records every tile it touches together
//! with the wood total before and after, and commits. Undo and redo replay
//! the recorded snapshots through the live plan-placement path with the wood
//! check bypassed, then restore the command's exact wood total and cancel
//! every job, since assignments made against the old tile state are stale.

use std::collections::VecDeque;

use colonysim_logic::grid::Coord;
use colonysim_logic::tiles::TileType;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::components::{PlacePlanResult, TileSnapshot};
use crate::config::WorldConfig;
use crate::world::World;

/// One tile's plan state before and after a command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileEdit {
    pub at: Coord,
    pub before: TileSnapshot,
    pub after: TileSnapshot,
}

/// A committed (or open) group of tile edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanCommand {
    /// In recording order, at most one entry per tile.
    pub edits: Vec<TileEdit>,
    pub wood_before: i32,
    pub wood_after: i32,
}

impl PlanCommand {
    fn record(&mut self, edit: TileEdit) {
        match self.edits.iter_mut().find(|e| e.at == edit.at) {
            Some(existing) => existing.after = edit.after,
            None => self.edits.push(edit),
        }
    }
}

/// Bounded undo stack plus redo stack.
#[derive(Debug, Clone)]
pub struct PlanHistory {
    undo: VecDeque<PlanCommand>,
    redo: Vec<PlanCommand>,
    active: Option<PlanCommand>,
    max_commands: usize,
}

impl Default for PlanHistory {
    fn default() -> Self {
        Self::new(WorldConfig::default().history_max_commands)
    }
}

impl PlanHistory {
    /// A cap of zero is treated as one.
    pub fn new(max_commands: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            active: None,
            max_commands: max_commands.max(1),
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.history_max_commands)
    }

    /// Takes effect on the next commit or redo.
    pub fn set_max_commands(&mut self, max_commands: usize) {
        self.max_commands = max_commands.max(1);
    }

    pub fn max_commands(&self) -> usize {
        self.max_commands
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn has_active_command(&self) -> bool {
        self.active.is_some()
    }

    /// Drop both stacks and any open command.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.active = None;
    }

    // ── Recording ───────────────────────────────────────────────────────

    /// Open a command. An already open command is discarded.
    pub fn begin_command(&mut self, wood_before: i32) {
        self.active = Some(PlanCommand {
            edits: Vec::new(),
            wood_before,
            wood_after: wood_before,
        });
    }

    /// Record one tile change. A second change to the same tile keeps the
    /// first `before` and takes the new `after`. Ignored without an open
    /// command.
    pub fn record_change(&mut self, x: i32, y: i32, before: TileSnapshot, after: TileSnapshot) {
        if let Some(cmd) = self.active.as_mut() {
            cmd.record(TileEdit {
                at: Coord::new(x, y),
                before,
                after,
            });
        }
    }

    /// Place a plan through the world and record the change into the open
    /// command when it did something.
    pub fn place_plan(&mut self, world: &mut World, x: i32, y: i32, plan: TileType, priority: u8) -> PlacePlanResult {
        let Some(before) = world.snapshot_tile(x, y) else {
            return PlacePlanResult::OutOfBounds;
        };
        let result = world.place_plan(x, y, plan, priority);
        if result == PlacePlanResult::Ok {
            if let Some(after) = world.snapshot_tile(x, y) {
                self.record_change(x, y, before, after);
            }
        }
        result
    }

    /// Close the open command. Empty commands are dropped and return false.
    pub fn commit_command(&mut self, wood_after: i32) -> bool {
        let Some(mut cmd) = self.active.take() else {
            return false;
        };
        if cmd.edits.is_empty() {
            return false;
        }
        cmd.wood_after = wood_after;
        self.redo.clear();
        self.push_undo(cmd);
        true
    }

    pub fn cancel_command(&mut self) {
        self.active = None;
    }

    fn push_undo(&mut self, cmd: PlanCommand) {
        self.undo.push_back(cmd);
        while self.undo.len() > self.max_commands {
            self.undo.pop_front();
        }
    }

    // ── Replay ──────────────────────────────────────────────────────────

    /// Revert the newest command. False when there is nothing to undo.
    pub fn undo(&mut self, world: &mut World) -> bool {
        let Some(cmd) = self.undo.pop_back() else {
            return false;
        };
        apply(world, &cmd, Side::Before);
        debug!("Undid plan command ({} tiles)", cmd.edits.len());
        self.redo.push(cmd);
        true
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, world: &mut World) -> bool {
        let Some(cmd) = self.redo.pop() else {
            return false;
        };
        apply(world, &cmd, Side::After);
        debug!("Redid plan command ({} tiles)", cmd.edits.len());
        self.push_undo(cmd);
        true
    }
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

fn apply(world: &mut World, cmd: &PlanCommand, side: Side) {
    for edit in &cmd.edits {
        let s = match side {
            Side::Before => edit.before,
            Side::After => edit.after,
        };
        if world.cell(edit.at.x, edit.at.y).is_none() {
            continue;
        }
        world.place_plan_free(edit.at, s.planned, s.plan_priority);
        world.set_plan_state(edit.at, s.plan_priority, s.work_remaining);
    }
    world.inventory_mut().wood = match side {
        Side::Before => cmd.wood_before,
        Side::After => cmd.wood_after,
    };
    world.cancel_all_jobs_and_clear_reservations();
    info!("Plan history applied {} tile edits", cmd.edits.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let mut w = World::new(8, 8);
        w.inventory_mut().wood = 100;
        w
    }

    fn snap(w: &World, x: i32, y: i32) -> TileSnapshot {
        w.snapshot_tile(x, y).unwrap()
    }

    #[test]
    fn test_undo_redo_restores_tiles_and_wood() {
        let mut w = world();
        let mut h = PlanHistory::new(16);
        let wood0 = w.inventory().wood;
        let before = snap(&w, 1, 1);

        h.begin_command(wood0);
        assert_eq!(h.place_plan(&mut w, 1, 1, TileType::Floor, 2), PlacePlanResult::Ok);
        assert_eq!(h.place_plan(&mut w, 2, 1, TileType::Wall, 0), PlacePlanResult::Ok);
        let after = snap(&w, 1, 1);
        let wood1 = w.inventory().wood;
        assert!(h.commit_command(wood1));
        assert!(wood1 < wood0);

        assert!(h.undo(&mut w));
        assert_eq!(snap(&w, 1, 1), before);
        assert_eq!(w.cell(2, 1).unwrap().planned, TileType::Empty);
        assert_eq!(w.inventory().wood, wood0);
        assert_eq!(w.planned_count(), 0);

        assert!(h.redo(&mut w));
        assert_eq!(snap(&w, 1, 1), after);
        assert_eq!(w.cell(2, 1).unwrap().planned, TileType::Wall);
        assert_eq!(w.inventory().wood, wood1);
        assert_eq!(w.planned_count(), 2);
        assert!(!h.redo(&mut w));
    }

    #[test]
    fn test_duplicate_edits_keep_first_before() {
        let mut w = world();
        let mut h = PlanHistory::new(16);
        let wood0 = w.inventory().wood;
        let before = snap(&w, 2, 2);

        h.begin_command(wood0);
        h.place_plan(&mut w, 2, 2, TileType::Floor, 0);
        h.place_plan(&mut w, 2, 2, TileType::Wall, 3);
        let after = snap(&w, 2, 2);
        assert!(h.commit_command(w.inventory().wood));

        assert!(h.undo(&mut w));
        assert_eq!(snap(&w, 2, 2), before);
        assert_eq!(w.inventory().wood, wood0);
        assert!(h.redo(&mut w));
        assert_eq!(snap(&w, 2, 2), after);
        assert_eq!(after.planned, TileType::Wall);
        assert_eq!(after.plan_priority, 3);
    }

    #[test]
    fn test_redo_trims_to_lowered_cap() {
        let mut w = world();
        let mut h = PlanHistory::new(8);

        h.begin_command(w.inventory().wood);
        h.place_plan(&mut w, 1, 1, TileType::Floor, 1);
        assert!(h.commit_command(w.inventory().wood));
        let floor_after = snap(&w, 1, 1);
        let wood_after_first = w.inventory().wood;

        h.begin_command(w.inventory().wood);
        h.place_plan(&mut w, 2, 2, TileType::Wall, 0);
        assert!(h.commit_command(w.inventory().wood));
        assert_eq!(h.undo_count(), 2);

        assert!(h.undo(&mut w));
        assert_eq!((h.undo_count(), h.redo_count()), (1, 1));

        h.set_max_commands(1);
        assert!(h.redo(&mut w));
        assert_eq!((h.undo_count(), h.redo_count()), (1, 0));

        assert!(h.undo(&mut w));
        assert!(!h.can_undo());
        assert_eq!(snap(&w, 1, 1).planned, floor_after.planned);
        assert_eq!(snap(&w, 1, 1).plan_priority, floor_after.plan_priority);
        assert_eq!(w.cell(2, 2).unwrap().planned, TileType::Empty);
        assert_eq!(w.inventory().wood, wood_after_first);
    }

    #[test]
    fn test_empty_commit_is_dropped() {
        let mut h = PlanHistory::new(4);
        h.begin_command(10);
        assert!(h.has_active_command());
        assert!(!h.commit_command(10));
        assert!(!h.has_active_command());
        assert!(!h.commit_command(10));
        assert_eq!(h.undo_count(), 0);
    }

    #[test]
    fn test_new_commit_clears_redo() {
        let mut w = world();
        let mut h = PlanHistory::new(4);
        h.begin_command(w.inventory().wood);
        h.place_plan(&mut w, 1, 1, TileType::Floor, 0);
        h.commit_command(w.inventory().wood);
        h.undo(&mut w);
        assert!(h.can_redo());

        h.begin_command(w.inventory().wood);
        h.place_plan(&mut w, 3, 3, TileType::Floor, 0);
        h.commit_command(w.inventory().wood);
        assert!(!h.can_redo());
    }

    #[test]
    fn test_undo_restores_work_in_progress() {
        let mut w = world();
        let mut h = PlanHistory::new(4);
        w.place_plan(4, 4, TileType::Wall, 1);
        w.set_plan_state(Coord::new(4, 4), 1, 0.25);
        let before = snap(&w, 4, 4);

        h.begin_command(w.inventory().wood);
        h.place_plan(&mut w, 4, 4, TileType::Empty, 0);
        assert!(h.commit_command(w.inventory().wood));
        assert_eq!(w.cell(4, 4).unwrap().planned, TileType::Empty);

        assert!(h.undo(&mut w));
        assert_eq!(snap(&w, 4, 4), before);
    }

    #[test]
    fn test_cancelled_and_unopened_commands() {
        let mut w = world();
        let mut h = PlanHistory::new(4);
        let s = snap(&w, 0, 0);
        h.record_change(0, 0, s, s);
        assert!(!h.has_active_command());
        h.begin_command(0);
        h.record_change(0, 0, s, s);
        h.cancel_command();
        assert!(!h.commit_command(0));
        assert!(!h.undo(&mut w));
    }
}
