//! Roles, work priorities and experience.
//!
//! A role decides which kinds of autonomous work a colonist will take and
//! scales how fast it walks, how fast it works and how much it carries.
//! Levels come from experience earned by finishing builds and harvests and
//! add a small bonus on top of the role's own multipliers.

use colonysim_logic::tiles::TileType;
use serde::{Deserialize, Serialize};

use super::job::{FieldKind, JobKind};

/// Experience needed for each level after the first.
pub const XP_PER_LEVEL: u32 = 200;
/// Lowest (least urgent) work priority. `0` means the work is off.
pub const MAX_WORK_PRIORITY: u8 = 4;

/// Kinds of autonomous work a role can be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    Build,
    Farm,
    Haul,
}

impl WorkType {
    pub const ALL: [WorkType; 3] = [WorkType::Build, WorkType::Farm, WorkType::Haul];

    pub fn name(self) -> &'static str {
        match self {
            WorkType::Build => "Build",
            WorkType::Farm => "Farm",
            WorkType::Haul => "Haul",
        }
    }

    /// The work a field hands out, if it hands out work at all.
    pub fn of_field(kind: FieldKind) -> Option<WorkType> {
        match kind {
            FieldKind::Build(_) => Some(WorkType::Build),
            FieldKind::Harvest => Some(WorkType::Farm),
            FieldKind::HaulPickup => Some(WorkType::Haul),
            FieldKind::Eat | FieldKind::Stockpile => None,
        }
    }

    pub fn of_job(kind: JobKind) -> Option<WorkType> {
        match kind {
            JobKind::BuildPlan => Some(WorkType::Build),
            JobKind::Harvest => Some(WorkType::Farm),
            JobKind::HaulWood => Some(WorkType::Haul),
            JobKind::None | JobKind::Eat | JobKind::ManualMove => None,
        }
    }
}

/// A colonist's specialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoleKind {
    /// Does everything at base speed.
    #[default]
    Worker,
    Hauler,
    Builder,
    Miner,
    Farmer,
    Medic,
    Guard,
    Researcher,
    Engineer,
}

impl RoleKind {
    pub const ALL: [RoleKind; 9] = [
        RoleKind::Worker,
        RoleKind::Hauler,
        RoleKind::Builder,
        RoleKind::Miner,
        RoleKind::Farmer,
        RoleKind::Medic,
        RoleKind::Guard,
        RoleKind::Researcher,
        RoleKind::Engineer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RoleKind::Worker => "Worker",
            RoleKind::Hauler => "Hauler",
            RoleKind::Builder => "Builder",
            RoleKind::Miner => "Miner",
            RoleKind::Farmer => "Farmer",
            RoleKind::Medic => "Medic",
            RoleKind::Guard => "Guard",
            RoleKind::Researcher => "Researcher",
            RoleKind::Engineer => "Engineer",
        }
    }

    /// Whether the role takes this kind of autonomous work at all.
    pub fn can(self, work: WorkType) -> bool {
        use RoleKind::*;
        match work {
            WorkType::Build => matches!(self, Worker | Builder | Engineer),
            WorkType::Farm => matches!(self, Worker | Farmer),
            WorkType::Haul => matches!(self, Worker | Hauler | Farmer | Medic | Researcher),
        }
    }

    pub fn move_mult(self) -> f32 {
        match self {
            RoleKind::Hauler | RoleKind::Guard => 1.05,
            RoleKind::Builder | RoleKind::Miner => 0.95,
            RoleKind::Medic => 1.10,
            _ => 1.0,
        }
    }

    pub fn work_mult(self) -> f32 {
        match self {
            RoleKind::Builder | RoleKind::Miner | RoleKind::Engineer => 1.15,
            RoleKind::Farmer | RoleKind::Researcher => 1.10,
            _ => 1.0,
        }
    }

    /// Extra wood carried per haul trip.
    pub fn carry_bonus(self) -> i32 {
        match self {
            RoleKind::Worker | RoleKind::Researcher => 0,
            RoleKind::Hauler => 20,
            RoleKind::Farmer | RoleKind::Guard => 10,
            RoleKind::Builder | RoleKind::Miner | RoleKind::Medic | RoleKind::Engineer => 5,
        }
    }
}

/// Role, level and experience of one colonist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub kind: RoleKind,
    /// Starts at 1.
    pub level: u32,
    /// Experience toward the next level.
    pub xp: u32,
}

impl Default for Role {
    fn default() -> Self {
        Self::new(RoleKind::Worker)
    }
}

impl Role {
    pub fn new(kind: RoleKind) -> Self {
        Self { kind, level: 1, xp: 0 }
    }

    /// Add experience, levelling up as often as it allows. Returns the
    /// number of levels gained.
    pub fn grant_xp(&mut self, xp: u32) -> u32 {
        self.xp = self.xp.saturating_add(xp);
        let mut gained = 0;
        while self.xp >= XP_PER_LEVEL {
            self.xp -= XP_PER_LEVEL;
            self.level = self.level.saturating_add(1);
            gained += 1;
        }
        gained
    }

    pub fn aptitude(&self) -> Aptitude {
        let steps = self.level.max(1) as f32 - 1.0;
        let move_bonus = (1.0 + 0.01 * steps).clamp(0.5, 2.0);
        let work_bonus = (1.0 + 0.02 * steps).clamp(0.5, 2.5);
        Aptitude {
            move_mult: (self.kind.move_mult().max(0.05) * move_bonus).clamp(0.1, 5.0),
            work_mult: (self.kind.work_mult().max(0.05) * work_bonus).clamp(0.1, 6.0),
            carry_bonus: self.kind.carry_bonus(),
        }
    }
}

/// Effective multipliers for a role at its current level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aptitude {
    /// Scales walk speed.
    pub move_mult: f32,
    /// Scales build progress and every work timer.
    pub work_mult: f32,
    /// Added to the haul carry capacity.
    pub carry_bonus: i32,
}

impl Default for Aptitude {
    fn default() -> Self {
        Self {
            move_mult: 1.0,
            work_mult: 1.0,
            carry_bonus: 0,
        }
    }
}

/// Per-colonist work priorities: `1` most urgent, [`MAX_WORK_PRIORITY`]
/// least, `0` off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPriorities {
    pub build: u8,
    pub farm: u8,
    pub haul: u8,
}

impl Default for WorkPriorities {
    fn default() -> Self {
        Self { build: 2, farm: 2, haul: 2 }
    }
}

impl WorkPriorities {
    /// Normal priority for everything the role can do, off for the rest.
    pub fn for_role(kind: RoleKind) -> Self {
        let mut p = Self::default();
        for work in WorkType::ALL {
            if !kind.can(work) {
                p.set(work, 0);
            }
        }
        p
    }

    pub fn get(&self, work: WorkType) -> u8 {
        match work {
            WorkType::Build => self.build,
            WorkType::Farm => self.farm,
            WorkType::Haul => self.haul,
        }
    }

    /// Values above [`MAX_WORK_PRIORITY`] are clamped.
    pub fn set(&mut self, work: WorkType, priority: u8) {
        let priority = priority.min(MAX_WORK_PRIORITY);
        match work {
            WorkType::Build => self.build = priority,
            WorkType::Farm => self.farm = priority,
            WorkType::Haul => self.haul = priority,
        }
    }

    pub fn enabled(&self, work: WorkType) -> bool {
        self.get(work) != 0
    }
}

/// Experience for finishing a plan: longer and costlier builds teach more.
pub fn xp_for_plan(plan: TileType) -> u32 {
    let xp = plan.build_time().max(0.05) * 20.0 + plan.wood_cost().max(0) as f32 * 6.0;
    xp.round().clamp(1.0, 1000.0) as u32
}

pub fn xp_for_harvest(yield_food: f32) -> u32 {
    let yield_food = if yield_food.is_finite() { yield_food.max(0.0) } else { 0.0 };
    (10.0 + yield_food).round().clamp(1.0, 1000.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_xp_rolls_over_levels() {
        let mut r = Role::new(RoleKind::Builder);
        assert_eq!(r.grant_xp(150), 0);
        assert_eq!(r.grant_xp(470), 3);
        assert_eq!(r.level, 4);
        assert_eq!(r.xp, 20);
    }

    #[test]
    fn test_level_one_worker_is_neutral() {
        assert_eq!(Role::default().aptitude(), Aptitude::default());
    }

    #[test]
    fn test_aptitude_combines_role_and_level() {
        let mut r = Role::new(RoleKind::Builder);
        r.level = 11;
        let a = r.aptitude();
        assert!((a.move_mult - 0.95 * 1.1).abs() < 1e-5);
        assert!((a.work_mult - 1.15 * 1.2).abs() < 1e-5);
        assert_eq!(a.carry_bonus, 5);

        // Level bonuses saturate.
        r.level = 10_000;
        let a = r.aptitude();
        assert!((a.move_mult - 0.95 * 2.0).abs() < 1e-5);
        assert!((a.work_mult - 1.15 * 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_capabilities() {
        assert!(WorkType::ALL.iter().all(|w| RoleKind::Worker.can(*w)));
        assert!(RoleKind::Builder.can(WorkType::Build));
        assert!(!RoleKind::Builder.can(WorkType::Haul));
        assert!(RoleKind::Farmer.can(WorkType::Farm) && RoleKind::Farmer.can(WorkType::Haul));
        assert!(WorkType::ALL.iter().all(|w| !RoleKind::Guard.can(*w)));
    }

    #[test]
    fn test_default_priorities_follow_capabilities() {
        let p = WorkPriorities::for_role(RoleKind::Hauler);
        assert_eq!((p.build, p.farm, p.haul), (0, 0, 2));
        assert_eq!(WorkPriorities::for_role(RoleKind::Worker), WorkPriorities::default());
        let mut p = WorkPriorities::default();
        p.set(WorkType::Farm, 9);
        assert_eq!(p.farm, MAX_WORK_PRIORITY);
    }

    #[test]
    fn test_xp_rewards() {
        // Wall: 0.8 s of work and 2 wood.
        assert_eq!(xp_for_plan(TileType::Wall), 28);
        assert_eq!(xp_for_plan(TileType::Remove), 13);
        assert_eq!(xp_for_harvest(10.0), 20);
        assert_eq!(xp_for_harvest(f32::NAN), 10);
    }
}
