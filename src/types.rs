use std::hash::Hash;

use glam::{DVec2, IVec2};

use thiserror::Error;

/// Integer coordinate of one grid cell: the unit square `[x, x+1) x [y, y+1)`.
pub type Cell = IVec2;

/// A static occupant of a single grid cell.
///
/// Implementations are expected to be cheap handles (ids, indices, `Rc`s);
/// the grid clones them into query results. Identity must be stable, and
/// `position` must not change while the tile is in a grid: its cell is
/// derived once, at insertion, and never recomputed.
pub trait Tile: Clone + Eq + Hash {
    /// Position in cell units. Floored to find the containing cell.
    fn position(&self) -> DVec2;
}

/// A movable query-time actor. Never stored in the grid.
pub trait Pawn {
    /// Extent in cell units along each axis (both components >= 0).
    fn size(&self) -> DVec2;
    /// Default query position; the `_at` query variants override it.
    fn position(&self) -> DVec2;
}

/// One time-ordered collision event produced by a sweep query.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepHit<T> {
    /// Fraction in [0,1] of the requested displacement at which the overlap occurs.
    pub toi: f64,
    /// Actor position at `toi`.
    pub pos: DVec2,
    /// Tiles found there; never empty.
    pub hits: Vec<T>,
}

/// Programmer-error conditions from grid mutation. Queries never fail.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridError {
    #[error("tile already in grid at ({x}, {y})")]
    DuplicateTile { x: f64, y: f64 },
    #[error("tile position ({x}, {y}) outside the grid bounds")]
    OutOfBounds { x: f64, y: f64 },
    #[error("tile not in grid at ({x}, {y})")]
    UnknownTile { x: f64, y: f64 },
}
