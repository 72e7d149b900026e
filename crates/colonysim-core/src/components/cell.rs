//! Per-tile state and the colony-wide stock.

use colonysim_logic::grid::Coord;
use colonysim_logic::tiles::TileType;
use serde::{Deserialize, Serialize};

use super::colonist::ColonistId;

/// One grid tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub built: TileType,
    /// `Empty` means no active plan. Never equal to `built`.
    pub planned: TileType,
    pub plan_priority: u8,
    /// Seconds of labour left on the plan.
    pub work_remaining: f32,
    pub reserved_by: Option<ColonistId>,
    /// Built by a colonist, so demolishing refunds its wood.
    pub built_from_plan: bool,
    /// 0..=1, ripe at 1. Only meaningful on farms.
    pub farm_growth: f32,
    pub harvest_reserved_by: Option<ColonistId>,
    pub loose_wood: i32,
    pub loose_wood_reserved_by: Option<ColonistId>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            built: TileType::Empty,
            planned: TileType::Empty,
            plan_priority: 0,
            work_remaining: 0.0,
            reserved_by: None,
            built_from_plan: false,
            farm_growth: 0.0,
            harvest_reserved_by: None,
            loose_wood: 0,
            loose_wood_reserved_by: None,
        }
    }
}

impl Cell {
    pub fn has_active_plan(&self) -> bool {
        self.planned != TileType::Empty && self.planned != self.built
    }

    /// What the tile will be once any plan completes.
    pub fn effective_type(&self) -> TileType {
        if self.planned == TileType::Empty {
            self.built
        } else {
            self.planned
        }
    }

    pub fn is_ripe_farm(&self) -> bool {
        self.built == TileType::Farm && !self.has_active_plan() && self.farm_growth >= 1.0
    }
}

/// Colony-wide resources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub wood: i32,
    pub food: f32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self { wood: 50, food: 20.0 }
    }
}

/// The plan-related part of a cell, as recorded by plan history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub planned: TileType,
    pub plan_priority: u8,
    pub work_remaining: f32,
}

impl From<&Cell> for TileSnapshot {
    fn from(c: &Cell) -> Self {
        Self {
            planned: c.planned,
            plan_priority: c.plan_priority,
            work_remaining: c.work_remaining,
        }
    }
}

/// Outcome of a plan edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacePlanResult {
    Ok,
    OutOfBounds,
    NoChange,
    NotEnoughWood,
}

impl PlacePlanResult {
    pub fn changed(self) -> bool {
        self == PlacePlanResult::Ok
    }
}

/// Whether a plan edit is charged against the wood stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanCost {
    Charge,
    /// Skip the affordability check and leave wood untouched.
    Free,
}

/// The three exclusive claims a cell can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Claim {
    Plan,
    Harvest,
    Pile,
}

/// A claim was refused: someone holds it, or the cell no longer offers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationConflict {
    pub claim: Claim,
    pub at: Coord,
    /// `None` when the cell is simply no longer eligible.
    pub holder: Option<ColonistId>,
}

impl std::fmt::Display for ReservationConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.holder {
            Some(h) => write!(f, "{:?} claim at ({}, {}) held by {}", self.claim, self.at.x, self.at.y, h),
            None => write!(f, "{:?} claim at ({}, {}) not available", self.claim, self.at.x, self.at.y),
        }
    }
}

impl std::error::Error for ReservationConflict {}
