//! Colonist components. Every colonist entity carries exactly
//! `(Colonist, Position, Needs, Task, OrderQueue, Role, WorkPriorities)`;
//! the last two live in the `role` module.

use std::collections::VecDeque;

use colonysim_logic::grid::Coord;
use serde::{Deserialize, Serialize};

use super::job::JobKind;
use super::role::{RoleKind, WorkPriorities};

/// Stable colonist identifier, independent of the ECS entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColonistId(pub u32);

impl std::fmt::Display for ColonistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity and control mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colonist {
    pub id: ColonistId,
    /// Drafted colonists only follow player orders.
    pub drafted: bool,
}

/// Continuous position in tile units; tile `(x, y)` spans `[x, x+1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn tile(&self) -> Coord {
        Coord::from_world(self.x, self.y)
    }

    pub fn center_of(tile: Coord) -> Self {
        let (x, y) = tile.center();
        Self { x, y }
    }
}

/// Personal food reserve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub personal_food: f32,
}

impl Needs {
    pub fn is_hungry(&self, threshold: f32) -> bool {
        threshold > 0.0 && self.personal_food <= threshold
    }
}

/// Lifecycle of the current job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskPhase {
    #[default]
    Idle,
    /// Walking toward the work tile.
    Seeking,
    /// Standing at the work tile, spending work time.
    Working,
    /// Work done; effects are applied at the end of the tick.
    Completed,
    /// Job invalidated; reservations are released at the end of the tick.
    Cancelled,
}

/// Which leg of a haul the colonist is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HaulStage {
    #[default]
    Pickup,
    Dropoff,
}

/// The job state machine's data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Task {
    pub kind: JobKind,
    pub phase: TaskPhase,
    pub target: Coord,
    /// Dense tile path. `path[path_cursor]` is the next tile to enter.
    pub path: Vec<Coord>,
    pub path_cursor: usize,
    /// Colonist-side work timer (eat, harvest, haul). Construction progress
    /// lives on the cell instead.
    pub work_remaining: f32,
    pub haul_stage: HaulStage,
    pub carrying_wood: i32,
    /// Started from a player order rather than the router.
    pub manual: bool,
}

impl Task {
    pub fn is_idle(&self) -> bool {
        self.phase == TaskPhase::Idle
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, TaskPhase::Seeking | TaskPhase::Working)
    }

    /// Begin travelling along `path`. A path that already ends at the
    /// colonist's tile goes straight to `Working`.
    pub fn start(&mut self, kind: JobKind, target: Coord, path: Vec<Coord>, manual: bool) {
        self.kind = kind;
        self.target = target;
        self.path_cursor = if path.len() > 1 { 1 } else { path.len() };
        self.path = path;
        self.phase = TaskPhase::Seeking;
        self.work_remaining = 0.0;
        self.haul_stage = HaulStage::Pickup;
        self.manual = manual;
    }

    pub fn path_done(&self) -> bool {
        self.path_cursor >= self.path.len()
    }

    pub fn remaining_path(&self) -> &[Coord] {
        self.path.get(self.path_cursor..).unwrap_or(&[])
    }

    /// Back to `Idle`. Does not touch reservations or carried wood.
    pub fn clear(&mut self) {
        let carrying_wood = self.carrying_wood;
        *self = Task::default();
        self.carrying_wood = carrying_wood;
    }
}

/// A queued player order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualOrder {
    Move(Coord),
    Build(Coord),
    Harvest(Coord),
}

impl ManualOrder {
    pub fn target(self) -> Coord {
        match self {
            ManualOrder::Move(c) | ManualOrder::Build(c) | ManualOrder::Harvest(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderQueue {
    pub orders: VecDeque<ManualOrder>,
}

/// Read-only copy of one colonist for callers outside the tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonistView {
    pub id: ColonistId,
    pub x: f32,
    pub y: f32,
    pub drafted: bool,
    pub personal_food: f32,
    pub job: JobKind,
    pub phase: TaskPhase,
    pub target: Coord,
    pub path: Vec<Coord>,
    pub path_cursor: usize,
    pub carrying_wood: i32,
    pub queued_orders: usize,
    pub role: RoleKind,
    pub level: u32,
    pub xp: u32,
    pub work_priorities: WorkPriorities,
}

impl ColonistView {
    pub fn has_job(&self) -> bool {
        self.job != JobKind::None
    }

    pub fn tile(&self) -> Coord {
        Coord::from_world(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_skips_current_tile() {
        let mut t = Task::default();
        t.start(
            JobKind::ManualMove,
            Coord::new(2, 0),
            vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0)],
            true,
        );
        assert_eq!(t.phase, TaskPhase::Seeking);
        assert_eq!(t.path_cursor, 1);
        assert_eq!(t.remaining_path(), &[Coord::new(1, 0), Coord::new(2, 0)]);
    }

    #[test]
    fn test_single_tile_path_is_done() {
        let mut t = Task::default();
        t.start(JobKind::Eat, Coord::new(1, 1), vec![Coord::new(1, 1)], false);
        assert!(t.path_done());
    }

    #[test]
    fn test_clear_keeps_carried_wood() {
        let mut t = Task::default();
        t.start(JobKind::HaulWood, Coord::new(1, 1), vec![], false);
        t.carrying_wood = 7;
        t.clear();
        assert!(t.is_idle());
        assert_eq!(t.kind, JobKind::None);
        assert_eq!(t.carrying_wood, 7);
    }

    #[test]
    fn test_hunger_threshold() {
        let n = Needs { personal_food: 2.0 };
        assert!(n.is_hungry(2.0));
        assert!(!n.is_hungry(1.5));
        assert!(!n.is_hungry(0.0));
    }

    #[test]
    fn test_position_tile() {
        let p = Position { x: 2.5, y: 3.99 };
        assert_eq!(p.tile(), Coord::new(2, 3));
        assert_eq!(Position::center_of(Coord::new(4, 1)), Position { x: 4.5, y: 1.5 });
    }
}
