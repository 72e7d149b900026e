//! Tile types and their static tables: walkability, room membership,
//! navigation cost, wood cost and build time.

use serde::{Deserialize, Serialize};

/// Highest plan priority. Priorities are clamped to `0..=MAX_PLAN_PRIORITY`.
pub const MAX_PLAN_PRIORITY: u8 = 3;

/// What a tile is (built) or should become (planned).
///
/// `Remove` only ever appears as a plan and means "demolish to `Empty`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Empty,
    Floor,
    Wall,
    Farm,
    Stockpile,
    Remove,
    Tree,
    Door,
}

impl TileType {
    pub const ALL: [TileType; 8] = [
        TileType::Empty,
        TileType::Floor,
        TileType::Wall,
        TileType::Farm,
        TileType::Stockpile,
        TileType::Remove,
        TileType::Tree,
        TileType::Door,
    ];

    /// Dense index for per-type tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TileType::Empty => "Empty",
            TileType::Floor => "Floor",
            TileType::Wall => "Wall",
            TileType::Farm => "Farm",
            TileType::Stockpile => "Stockpile",
            TileType::Remove => "Demolish",
            TileType::Tree => "Tree",
            TileType::Door => "Door",
        }
    }

    pub fn is_walkable(self) -> bool {
        !matches!(self, TileType::Wall | TileType::Tree)
    }

    /// Tiles that belong to a room interior. Walls, trees and doors bound rooms.
    pub fn is_room_space(self) -> bool {
        matches!(
            self,
            TileType::Empty | TileType::Floor | TileType::Farm | TileType::Stockpile
        )
    }

    /// Movement cost multiplier when terrain costs are enabled.
    pub fn nav_cost(self) -> f32 {
        match self {
            TileType::Farm => 1.25,
            TileType::Stockpile => 1.10,
            TileType::Door => 1.05,
            _ => 1.0,
        }
    }

    pub fn wood_cost(self) -> i32 {
        match self {
            TileType::Empty | TileType::Remove | TileType::Tree => 0,
            TileType::Floor | TileType::Stockpile | TileType::Door => 1,
            TileType::Wall => 2,
            TileType::Farm => 3,
        }
    }

    /// Seconds of labour at 1 work unit per second.
    pub fn build_time(self) -> f32 {
        match self {
            TileType::Empty => 0.15,
            TileType::Floor => 0.40,
            TileType::Wall => 0.80,
            TileType::Farm => 1.25,
            TileType::Stockpile => 0.55,
            TileType::Remove => 0.65,
            TileType::Tree => 0.90,
            TileType::Door => 0.70,
        }
    }
}

pub fn clamp_priority(priority: u8) -> u8 {
    priority.min(MAX_PLAN_PRIORITY)
}
