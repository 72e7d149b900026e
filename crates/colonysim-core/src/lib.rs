//! ColonySim Core - tile colony simulation
//!
//! A grid of tiles holds plans, built structures, farms, trees and loose
//! wood. Colonists are `hecs` entities that eat, build, harvest and haul,
//! routed to their jobs by multi-source distance fields instead of one
//! search per colonist.
//!
//! # Architecture
//!
//! - **`WorldGrid`**: cells, the navigation grid, incremental counts,
//!   reservations and room labels
//! - **Components**: pure data on colonist entities (Position, Needs, Task, ...)
//! - **Systems**: free functions over the ECS world and a `TickContext`
//! - **`World`**: owns everything and runs the fixed tick order
//!
//! # Example
//!
//! ```rust,no_run
//! use colonysim_core::prelude::*;
//!
//! let mut world = World::new(1, 1);
//! world.reset(64, 64, 42);
//! world.place_plan(34, 32, TileType::Wall, 1);
//!
//! loop {
//!     world.tick(1.0 / 60.0);
//! }
//! ```

pub mod components;
pub mod config;
pub mod history;
pub mod persistence;
pub mod systems;
pub mod world;
pub mod world_grid;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{ConfigError, WorldConfig};
    pub use crate::history::PlanHistory;
    pub use crate::persistence::{SaveError, WorldSnapshot};
    pub use crate::systems::{OrderResult, PathStats};
    pub use crate::world::World;
    pub use colonysim_logic::grid::Coord;
    pub use colonysim_logic::pathfinding::PathAlgo;
    pub use colonysim_logic::tiles::TileType;
}
