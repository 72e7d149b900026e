//! Job and field kinds.
//!
//! Both are closed enums: adding a job means adding a variant here and the
//! matching arms in source eligibility and completion.

use colonysim_logic::tiles::MAX_PLAN_PRIORITY;
use serde::{Deserialize, Serialize};

/// What a colonist is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobKind {
    #[default]
    None,
    BuildPlan,
    Eat,
    Harvest,
    HaulWood,
    /// Player-issued walk order for a drafted colonist.
    ManualMove,
}

impl JobKind {
    pub fn name(self) -> &'static str {
        match self {
            JobKind::None => "Idle",
            JobKind::BuildPlan => "Build",
            JobKind::Eat => "Eat",
            JobKind::Harvest => "Harvest",
            JobKind::HaulWood => "Haul",
            JobKind::ManualMove => "Move",
        }
    }

    /// Jobs a hungry colonist drops in order to go and eat.
    pub fn yields_to_hunger(self) -> bool {
        matches!(self, JobKind::BuildPlan | JobKind::HaulWood | JobKind::ManualMove)
    }
}

/// One distance field per kind of job source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Active plans of one priority.
    Build(u8),
    /// Ripe farms.
    Harvest,
    /// Stockpiles, as food sources.
    Eat,
    /// Loose wood piles.
    HaulPickup,
    /// Stockpiles, as haul drop-off points.
    Stockpile,
}

/// Where a colonist stands to work a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// On any walkable orthogonal neighbour of the source.
    Adjacent,
    /// On the source tile itself.
    OnTile,
}

impl FieldKind {
    pub const COUNT: usize = MAX_PLAN_PRIORITY as usize + 5;

    /// Every field, build priorities highest first.
    pub fn all() -> [FieldKind; Self::COUNT] {
        [
            FieldKind::Build(3),
            FieldKind::Build(2),
            FieldKind::Build(1),
            FieldKind::Build(0),
            FieldKind::Harvest,
            FieldKind::Eat,
            FieldKind::HaulPickup,
            FieldKind::Stockpile,
        ]
    }

    /// Dense slot for per-field tables.
    pub fn slot(self) -> usize {
        match self {
            FieldKind::Build(p) => p.min(MAX_PLAN_PRIORITY) as usize,
            FieldKind::Harvest => 4,
            FieldKind::Eat => 5,
            FieldKind::HaulPickup => 6,
            FieldKind::Stockpile => 7,
        }
    }

    pub fn mode(self) -> SourceMode {
        match self {
            FieldKind::Build(_) | FieldKind::Harvest => SourceMode::Adjacent,
            FieldKind::Eat | FieldKind::HaulPickup | FieldKind::Stockpile => SourceMode::OnTile,
        }
    }

    /// The job a colonist takes when assigned from this field.
    pub fn job(self) -> JobKind {
        match self {
            FieldKind::Build(_) => JobKind::BuildPlan,
            FieldKind::Harvest => JobKind::Harvest,
            FieldKind::Eat => JobKind::Eat,
            FieldKind::HaulPickup | FieldKind::Stockpile => JobKind::HaulWood,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Build(_) => "build",
            FieldKind::Harvest => "harvest",
            FieldKind::Eat => "eat",
            FieldKind::HaulPickup => "haul",
            FieldKind::Stockpile => "stockpile",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_unique_and_dense() {
        let mut seen = [false; FieldKind::COUNT];
        for kind in FieldKind::all() {
            assert!(!seen[kind.slot()]);
            seen[kind.slot()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_build_priority_clamped() {
        assert_eq!(FieldKind::Build(9).slot(), FieldKind::Build(3).slot());
    }

    #[test]
    fn test_modes() {
        assert_eq!(FieldKind::Build(0).mode(), SourceMode::Adjacent);
        assert_eq!(FieldKind::Harvest.mode(), SourceMode::Adjacent);
        assert_eq!(FieldKind::HaulPickup.mode(), SourceMode::OnTile);
        assert_eq!(FieldKind::Eat.mode(), SourceMode::OnTile);
    }
}
