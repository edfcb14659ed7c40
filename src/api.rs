use glam::DVec2;

use crate::sweep::{MovingPawnSweep, MovingPointSweep};
use crate::types::*;

/// Public API contract for the tile-grid collision engine.
pub trait GridApi<T: Tile> {
    /// Construct an empty grid covering `[0, size]` on both axes.
    fn new(size: DVec2) -> Self
    where
        Self: Sized;

    /// Construct an empty grid covering `[origin, origin + size]`.
    fn with_origin(size: DVec2, origin: DVec2) -> Self
    where
        Self: Sized;

    // --- Tile store --------------------------------------------------------

    /// Insert a tile into the cell containing its position.
    fn add(&mut self, tile: T) -> Result<(), GridError>;

    /// Remove a previously added tile.
    fn remove(&mut self, tile: &T) -> Result<(), GridError>;

    /// O(1) membership test.
    fn contains(&self, tile: &T) -> bool;

    // --- Static queries ----------------------------------------------------

    /// Tiles in the cell containing `pos`; fractional remainder is ignored.
    fn collide_point(&self, pos: DVec2) -> &[T];

    /// Tiles overlapping the pawn at its own position. `None` if clear.
    fn collide_pawn<P: Pawn>(&self, pawn: &P) -> Option<Vec<T>>;

    /// Tiles overlapping the pawn's extent placed at `pos`. `None` if clear.
    ///
    /// The covered region `[pos, pos + size)` is half-open: a tile exactly at
    /// `pos + size` on either axis is not a hit.
    fn collide_pawn_at<P: Pawn>(&self, pawn: &P, pos: DVec2) -> Option<Vec<T>>;

    // --- Sweep queries -----------------------------------------------------

    /// Lazily enumerate occupied cells a point entering while moving by
    /// `delta` over `t` in [0,1], in increasing time order.
    fn collide_moving_point(&self, pos: DVec2, delta: DVec2) -> MovingPointSweep<'_, T>;

    /// Lazily enumerate collision events for the pawn moving by `delta` from
    /// its own position. See [`collide_moving_pawn_at`](Self::collide_moving_pawn_at).
    fn collide_moving_pawn<P: Pawn>(&self, pawn: &P, delta: DVec2) -> MovingPawnSweep<'_, T>;

    /// Lazily enumerate, in non-decreasing time order, every `t` in [0,1] at
    /// which the moving extent newly overlaps tile content, starting with a
    /// `toi = 0` event if the pawn already overlaps tiles at `pos`.
    /// Consecutive events with an identical hit set are suppressed.
    fn collide_moving_pawn_at<P: Pawn>(
        &self,
        pawn: &P,
        delta: DVec2,
        pos: DVec2,
    ) -> MovingPawnSweep<'_, T>;
}
