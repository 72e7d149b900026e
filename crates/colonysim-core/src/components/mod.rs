//! Component and plain-data definitions.
//!
//! Components are pure data. Behaviour lives in `systems` and on the
//! `WorldGrid`.

mod cell;
mod colonist;
mod job;
mod role;

pub use cell::*;
pub use colonist::*;
pub use job::*;
pub use role::*;
