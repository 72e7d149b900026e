//! Pure grid logic for ColonySim.
//!
//! This crate holds everything that can be computed from plain data with no
//! entity storage or world state: the walkability grid, point-to-point
//! pathfinding, tile tables and room analysis. The simulation core builds on
//! top of it; the headless harness and benchmarks use it directly.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`grid`] | `GridMap` walkability/cost grid, step rules, `Coord` |
//! | [`pathfinding`] | A* and Jump Point Search over a `GridMap` |
//! | [`rooms`] | Flood-fill room labelling with perimeter/door/indoor stats |
//! | [`tiles`] | `TileType` and its cost/build-time tables |

pub mod grid;
pub mod pathfinding;
pub mod rooms;
pub mod tiles;

pub use grid::{Coord, GridMap};
pub use pathfinding::{PathAlgo, Pathfinder};
pub use tiles::TileType;
