use glam::DVec2;

use std::collections::{HashMap, HashSet};

use crate::api::GridApi;
use crate::sweep::{MovingPawnSweep, MovingPointSweep};
use crate::types::*;

/// Sparse cell-indexed tile store with static and swept overlap queries.
///
/// Tiles live in exactly one cell each; cells are unit squares addressed by
/// their integer lower corner. The grid persists for the lifetime of a level
/// and is mutated only between simulation steps.
pub struct GridCollider<T: Tile> {
    size: DVec2,
    origin: DVec2,

    // Cell coord -> tiles in that cell, insertion order preserved.
    // Absent key means empty.
    cells: HashMap<Cell, Vec<T>>,

    // Every tile currently in the grid, for O(1) membership checks.
    tiles: HashSet<T>,
}

/// Cell containing `pos`, ignoring direction of travel.
pub(crate) fn cell_of(pos: DVec2) -> Cell {
    Cell::new(pos.x.floor() as i32, pos.y.floor() as i32)
}

/// True when the coordinate sits exactly on a cell boundary.
pub(crate) fn aligned(v: f64) -> bool {
    v.fract() == 0.0
}

impl<T: Tile> GridApi<T> for GridCollider<T> {
    fn new(size: DVec2) -> Self {
        Self::with_origin(size, DVec2::ZERO)
    }

    fn with_origin(size: DVec2, origin: DVec2) -> Self {
        Self {
            size,
            origin,
            cells: HashMap::new(),
            tiles: HashSet::new(),
        }
    }

    fn add(&mut self, tile: T) -> Result<(), GridError> {
        let pos = tile.position();
        let max = self.origin + self.size;
        if pos.x < self.origin.x || pos.y < self.origin.y || pos.x > max.x || pos.y > max.y {
            return Err(GridError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if self.tiles.contains(&tile) {
            return Err(GridError::DuplicateTile { x: pos.x, y: pos.y });
        }
        let cell = cell_of(pos);
        log::trace!("add tile at ({}, {}) -> cell ({}, {})", pos.x, pos.y, cell.x, cell.y);
        self.cells.entry(cell).or_default().push(tile.clone());
        self.tiles.insert(tile);
        Ok(())
    }

    fn remove(&mut self, tile: &T) -> Result<(), GridError> {
        let pos = tile.position();
        if !self.tiles.remove(tile) {
            return Err(GridError::UnknownTile { x: pos.x, y: pos.y });
        }
        let cell = cell_of(pos);
        log::trace!("remove tile at ({}, {}) from cell ({}, {})", pos.x, pos.y, cell.x, cell.y);
        if let Some(bucket) = self.cells.get_mut(&cell) {
            // Take out exactly the matched element; the rest keep their order.
            if let Some(index) = bucket.iter().position(|t| t == tile) {
                bucket.remove(index);
            }
            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
        Ok(())
    }

    fn contains(&self, tile: &T) -> bool {
        let tracked = self.tiles.contains(tile);
        debug_assert_eq!(
            tracked,
            self.cells
                .get(&cell_of(tile.position()))
                .is_some_and(|bucket| bucket.contains(tile)),
            "membership set out of sync with cell contents"
        );
        tracked
    }

    fn collide_point(&self, pos: DVec2) -> &[T] {
        self.tiles_in(cell_of(pos))
    }

    fn collide_pawn<P: Pawn>(&self, pawn: &P) -> Option<Vec<T>> {
        self.collide_pawn_at(pawn, pawn.position())
    }

    fn collide_pawn_at<P: Pawn>(&self, pawn: &P, pos: DVec2) -> Option<Vec<T>> {
        self.collide_extent(pawn.size(), pos)
    }

    fn collide_moving_point(&self, pos: DVec2, delta: DVec2) -> MovingPointSweep<'_, T> {
        MovingPointSweep::new(self, pos, delta)
    }

    fn collide_moving_pawn<P: Pawn>(&self, pawn: &P, delta: DVec2) -> MovingPawnSweep<'_, T> {
        self.collide_moving_pawn_at(pawn, delta, pawn.position())
    }

    fn collide_moving_pawn_at<P: Pawn>(
        &self,
        pawn: &P,
        delta: DVec2,
        pos: DVec2,
    ) -> MovingPawnSweep<'_, T> {
        MovingPawnSweep::new(self, pawn.size(), pos, delta)
    }
}

impl<T: Tile> GridCollider<T> {
    pub(crate) fn tiles_in(&self, cell: Cell) -> &[T] {
        self.cells.get(&cell).map_or(&[], Vec::as_slice)
    }

    /// Static overlap query for an extent placed at `pos`.
    ///
    /// Three paths, cheapest first:
    /// - aligned and no larger than one cell: a single cell lookup;
    /// - exactly 1x1 but unaligned: the base cell plus the up-to-3 neighbors
    ///   the overhang reaches;
    /// - anything else: scan the block of cells the extent can touch.
    pub(crate) fn collide_extent(&self, size: DVec2, pos: DVec2) -> Option<Vec<T>> {
        debug_assert!(
            size.x >= 0.0 && size.y >= 0.0,
            "pawn extent must be non-negative"
        );
        let x_aligned = aligned(pos.x);
        let y_aligned = aligned(pos.y);

        if size.x <= 1.0 && size.y <= 1.0 && x_aligned && y_aligned {
            let hits = self.collide_point(pos);
            return if hits.is_empty() {
                None
            } else {
                Some(hits.to_vec())
            };
        }

        let base = cell_of(pos);

        if size.x == 1.0 && size.y == 1.0 {
            // At least one axis is unaligned here; up to 4 lookups.
            let mut hits: Vec<T> = Vec::new();
            hits.extend_from_slice(self.tiles_in(base));
            if !x_aligned {
                hits.extend_from_slice(self.tiles_in(base + Cell::new(1, 0)));
            }
            if !y_aligned {
                hits.extend_from_slice(self.tiles_in(base + Cell::new(0, 1)));
            }
            if !x_aligned && !y_aligned {
                hits.extend_from_slice(self.tiles_in(base + Cell::new(1, 1)));
            }
            return if hits.is_empty() { None } else { Some(hits) };
        }

        let cols = size.x.ceil() as i32 + i32::from(!x_aligned);
        let rows = size.y.ceil() as i32 + i32::from(!y_aligned);
        let mut hits: Vec<T> = Vec::new();
        for y in 0..rows {
            for x in 0..cols {
                hits.extend_from_slice(self.tiles_in(base + Cell::new(x, y)));
            }
        }
        if hits.is_empty() { None } else { Some(hits) }
    }
}
