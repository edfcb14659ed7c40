//! tilecast: swept collision detection for unit-tile grids (time-ordered events, no resolution)

pub mod types;
pub mod api;
pub mod grid;
pub mod sweep;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::grid::GridCollider;
pub use crate::sweep::{MovingPawnSweep, MovingPointSweep};
