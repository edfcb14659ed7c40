use glam::DVec2;

use crate::grid::GridCollider;
use crate::types::*;

/// Cell index containing coordinate `c` for a mover heading in the given
/// direction. Moving positive, a coordinate exactly on a boundary still
/// belongs to the cell below it; moving negative it belongs to the cell at
/// that integer. Holds for negative coordinates too, where truncating
/// arithmetic would pick the wrong side.
pub(crate) fn cell_toward(c: f64, positive: bool) -> i32 {
    let f = c.floor();
    if positive && c == f {
        f as i32 - 1
    } else {
        f as i32
    }
}

fn start_cell(c: f64, delta: f64) -> i32 {
    if delta == 0.0 {
        c.floor() as i32
    } else {
        cell_toward(c, delta > 0.0)
    }
}

/// First cell boundary a coordinate will cross while travelling in the given
/// direction. An aligned coordinate's first boundary is itself.
fn first_boundary(c: f64, positive: bool) -> f64 {
    if positive {
        (cell_toward(c, true) + 1) as f64
    } else {
        cell_toward(c, false) as f64
    }
}

/// Per-axis boundary walk for a swept point. A parked axis never crosses.
struct AxisWalk {
    start: f64,
    delta: f64,
    boundary: f64,
    step: i32,
}

impl AxisWalk {
    fn new(start: f64, delta: f64) -> Self {
        if delta == 0.0 {
            return Self { start, delta, boundary: 0.0, step: 0 };
        }
        let positive = delta > 0.0;
        Self {
            start,
            delta,
            boundary: first_boundary(start, positive),
            step: if positive { 1 } else { -1 },
        }
    }

    /// Time at which the next boundary is reached; infinite when parked.
    fn next_t(&self) -> f64 {
        if self.step == 0 {
            f64::INFINITY
        } else {
            (self.boundary - self.start) / self.delta
        }
    }

    fn advance(&mut self) {
        self.boundary += self.step as f64;
    }
}

/// Lazy time-ordered enumeration of the occupied cells a moving point
/// enters. Created by `collide_moving_point`; finite and not restartable.
pub struct MovingPointSweep<'a, T: Tile> {
    grid: &'a GridCollider<T>,
    pos: DVec2,
    delta: DVec2,
    // Current cell, advanced by integer steps so the walk cannot drift.
    cell: Cell,
    x: AxisWalk,
    y: AxisWalk,
}

impl<'a, T: Tile> MovingPointSweep<'a, T> {
    pub(crate) fn new(grid: &'a GridCollider<T>, pos: DVec2, delta: DVec2) -> Self {
        Self {
            grid,
            pos,
            delta,
            cell: Cell::new(start_cell(pos.x, delta.x), start_cell(pos.y, delta.y)),
            x: AxisWalk::new(pos.x, delta.x),
            y: AxisWalk::new(pos.y, delta.y),
        }
    }
}

impl<'a, T: Tile> Iterator for MovingPointSweep<'a, T> {
    type Item = SweepHit<T>;

    fn next(&mut self) -> Option<SweepHit<T>> {
        loop {
            let tx = self.x.next_t();
            let ty = self.y.next_t();
            let t = tx.min(ty);
            if !(t <= 1.0) {
                return None;
            }
            if tx == ty {
                // Both axes cross at once: one diagonal cell step.
                self.cell += Cell::new(self.x.step, self.y.step);
                self.x.advance();
                self.y.advance();
            } else if tx < ty {
                self.cell.x += self.x.step;
                self.x.advance();
            } else {
                self.cell.y += self.y.step;
                self.y.advance();
            }
            let hits = self.grid.tiles_in(self.cell);
            if !hits.is_empty() {
                return Some(SweepHit {
                    toi: t,
                    pos: self.pos + self.delta * t,
                    hits: hits.to_vec(),
                });
            }
        }
    }
}

/// Boundary walk for one leading edge of a swept extent.
struct EdgeWalk {
    start: f64,
    delta: f64,
    boundary: f64,
    positive: bool,
}

impl EdgeWalk {
    fn new(edge: f64, delta: f64) -> Self {
        debug_assert!(delta != 0.0);
        let positive = delta > 0.0;
        Self {
            start: edge,
            delta,
            boundary: first_boundary(edge, positive),
            positive,
        }
    }

    /// Smallest `t` that puts the edge strictly inside the next cell, or
    /// `None` once that falls beyond the end of the displacement. The step
    /// over the boundary is one float successor, never a fixed epsilon, so
    /// thin slivers are not skipped and the cell just left is not re-tested.
    fn next_t(&mut self) -> Option<f64> {
        let probe = if self.positive {
            self.boundary.next_up()
        } else {
            self.boundary.next_down()
        };
        let t = (probe - self.start) / self.delta;
        if !(t <= 1.0) {
            return None;
        }
        // Reversibility within rounding: the edge evaluated at `t` must land
        // at or past the boundary it just crossed. The round trip through
        // the division can lose an ulp, hence the scaled slack.
        let reached = self.start + self.delta * t;
        let slack = 4.0 * f64::EPSILON * (self.start.abs() + self.delta.abs());
        debug_assert!(
            if self.positive {
                reached >= self.boundary - slack
            } else {
                reached <= self.boundary + slack
            },
            "edge failed to reach the crossed boundary"
        );
        self.boundary += if self.positive { 1.0 } else { -1.0 };
        Some(t)
    }
}

/// Lazy time-ordered enumeration of the collision events for a moving
/// extent. Created by `collide_moving_pawn`; finite and not restartable.
///
/// Yields a `toi = 0` event first if the extent already overlaps tiles at
/// the start, then one event per leading-edge cell entry that finds tiles,
/// with exact-tie x/y crossings merged into a single corner event and
/// consecutive set-identical events suppressed.
pub struct MovingPawnSweep<'a, T: Tile> {
    grid: &'a GridCollider<T>,
    size: DVec2,
    pos: DVec2,
    delta: DVec2,
    started: bool,
    x: Option<EdgeWalk>,
    y: Option<EdgeWalk>,
    pending_x: Option<SweepHit<T>>,
    pending_y: Option<SweepHit<T>>,
    last_hits: Vec<T>,
}

impl<'a, T: Tile> MovingPawnSweep<'a, T> {
    pub(crate) fn new(grid: &'a GridCollider<T>, size: DVec2, pos: DVec2, delta: DVec2) -> Self {
        // Starting clear, new overlap can only arrive through a leading
        // edge: the right edge moving right, the left edge moving left, and
        // likewise along y. A parked axis contributes nothing.
        let x = if delta.x > 0.0 {
            Some(EdgeWalk::new(pos.x + size.x, delta.x))
        } else if delta.x < 0.0 {
            Some(EdgeWalk::new(pos.x, delta.x))
        } else {
            None
        };
        let y = if delta.y > 0.0 {
            Some(EdgeWalk::new(pos.y + size.y, delta.y))
        } else if delta.y < 0.0 {
            Some(EdgeWalk::new(pos.y, delta.y))
        } else {
            None
        };
        Self {
            grid,
            size,
            pos,
            delta,
            started: false,
            x,
            y,
            pending_x: None,
            pending_y: None,
            last_hits: Vec::new(),
        }
    }
}

/// Advance one axis walk until it produces a candidate event or runs out.
/// Every candidate queries the full extent, not just the crossing corner: a
/// leading edge spans more than one cell along the perpendicular axis.
fn refill_axis<T: Tile>(
    grid: &GridCollider<T>,
    size: DVec2,
    pos: DVec2,
    delta: DVec2,
    walk: &mut Option<EdgeWalk>,
    pending: &mut Option<SweepHit<T>>,
) {
    while pending.is_none() {
        let Some(w) = walk.as_mut() else { return };
        let Some(t) = w.next_t() else {
            *walk = None;
            return;
        };
        let at = pos + delta * t;
        if let Some(hits) = grid.collide_extent(size, at) {
            *pending = Some(SweepHit { toi: t, pos: at, hits });
        }
    }
}

fn same_hit_set<T: Tile>(a: &[T], b: &[T]) -> bool {
    // Hit lists never contain duplicates (a tile occupies exactly one cell
    // and each query visits a cell once), so a one-sided check suffices.
    a.len() == b.len() && a.iter().all(|t| b.contains(t))
}

impl<'a, T: Tile> Iterator for MovingPawnSweep<'a, T> {
    type Item = SweepHit<T>;

    fn next(&mut self) -> Option<SweepHit<T>> {
        if !self.started {
            self.started = true;
            if let Some(hits) = self.grid.collide_extent(self.size, self.pos) {
                self.last_hits = hits.clone();
                return Some(SweepHit { toi: 0.0, pos: self.pos, hits });
            }
        }
        loop {
            refill_axis(
                self.grid,
                self.size,
                self.pos,
                self.delta,
                &mut self.x,
                &mut self.pending_x,
            );
            refill_axis(
                self.grid,
                self.size,
                self.pos,
                self.delta,
                &mut self.y,
                &mut self.pending_y,
            );
            let event = match (self.pending_x.take(), self.pending_y.take()) {
                (None, None) => return None,
                (Some(ex), None) => ex,
                (None, Some(ey)) => ey,
                (Some(ex), Some(ey)) => {
                    if ex.toi < ey.toi {
                        self.pending_y = Some(ey);
                        ex
                    } else if ey.toi < ex.toi {
                        self.pending_x = Some(ex);
                        ey
                    } else {
                        // Both edges entered new cells at the same instant:
                        // a corner hit, reported as one event.
                        debug_assert_eq!(ex.pos, ey.pos);
                        let mut merged = ex;
                        for tile in ey.hits {
                            if !merged.hits.contains(&tile) {
                                merged.hits.push(tile);
                            }
                        }
                        merged
                    }
                }
            };
            if same_hit_set(&event.hits, &self.last_hits) {
                continue;
            }
            self.last_hits = event.hits.clone();
            return Some(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GridApi;
    use proptest::prelude::*;
    use std::hash::{Hash, Hasher};

    #[derive(Clone, Copy, Debug)]
    struct TestTile {
        id: u32,
        pos: DVec2,
    }

    impl TestTile {
        fn new(id: u32, x: f64, y: f64) -> Self {
            Self { id, pos: DVec2::new(x, y) }
        }
    }

    impl PartialEq for TestTile {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl Eq for TestTile {}
    impl Hash for TestTile {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }
    impl Tile for TestTile {
        fn position(&self) -> DVec2 {
            self.pos
        }
    }

    struct TestPawn {
        pos: DVec2,
        size: DVec2,
    }

    impl TestPawn {
        fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
            Self { pos: DVec2::new(x, y), size: DVec2::new(w, h) }
        }
    }

    impl Pawn for TestPawn {
        fn size(&self) -> DVec2 {
            self.size
        }
        fn position(&self) -> DVec2 {
            self.pos
        }
    }

    fn hit_ids(hit: &SweepHit<TestTile>) -> Vec<u32> {
        let mut v: Vec<u32> = hit.hits.iter().map(|t| t.id).collect();
        v.sort_unstable();
        v
    }

    /// 3x2 tile slab: ids 1..=3 at y=20 (x 15..=17), ids 4..=6 at y=21.
    fn slab_grid() -> GridCollider<TestTile> {
        let mut grid = GridCollider::new(DVec2::new(200.0, 100.0));
        let mut id = 0;
        for y in 20..=21 {
            for x in 15..=17 {
                id += 1;
                grid.add(TestTile::new(id, x as f64, y as f64)).unwrap();
            }
        }
        grid
    }

    const TOL: f64 = 1e-9;

    #[test]
    fn test_point_sweep_scenario_b_exact_times() {
        let grid = slab_grid();
        let events: Vec<_> = grid
            .collide_moving_point(DVec2::new(14.0, 20.0), DVec2::new(4.0, 0.0))
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].toi, 0.25);
        assert_eq!(events[1].toi, 0.5);
        assert_eq!(events[2].toi, 0.75);
        assert_eq!(hit_ids(&events[0]), vec![1]);
        assert_eq!(hit_ids(&events[1]), vec![2]);
        assert_eq!(hit_ids(&events[2]), vec![3]);
        assert_eq!(events[0].pos, DVec2::new(15.0, 20.0));
    }

    #[test]
    fn test_point_sweep_clear_path_yields_nothing() {
        let grid = slab_grid();
        assert_eq!(
            grid.collide_moving_point(DVec2::new(0.5, 0.5), DVec2::new(5.0, 5.0))
                .count(),
            0
        );
        // Parked point.
        assert_eq!(
            grid.collide_moving_point(DVec2::new(15.5, 20.5), DVec2::ZERO)
                .count(),
            0
        );
    }

    #[test]
    fn test_point_sweep_diagonal_corner_is_one_event() {
        let grid = slab_grid();
        // Crossing x=15 and y=21 at exactly t=0.5: a single diagonal step
        // into (15,21), not two events through the adjacent cells.
        let events: Vec<_> = grid
            .collide_moving_point(DVec2::new(14.5, 20.5), DVec2::new(1.0, 1.0))
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].toi, 0.5);
        assert_eq!(hit_ids(&events[0]), vec![4]);
        assert_eq!(events[0].pos, DVec2::new(15.0, 21.0));
    }

    #[test]
    fn test_point_sweep_negative_direction_negative_cells() {
        let mut grid =
            GridCollider::with_origin(DVec2::new(10.0, 10.0), DVec2::new(-5.0, -5.0));
        grid.add(TestTile::new(1, -1.0, 0.0)).unwrap();
        grid.add(TestTile::new(2, -2.0, 0.0)).unwrap();
        let events: Vec<_> = grid
            .collide_moving_point(DVec2::new(0.5, 0.5), DVec2::new(-3.0, 0.0))
            .collect();
        assert_eq!(events.len(), 2);
        assert!((events[0].toi - 1.0 / 6.0).abs() < TOL);
        assert_eq!(hit_ids(&events[0]), vec![1]);
        assert!((events[1].toi - 0.5).abs() < TOL);
        assert_eq!(hit_ids(&events[1]), vec![2]);
    }

    #[test]
    fn test_pawn_sweep_scenario_a_three_events() {
        let grid = slab_grid();
        let pawn = TestPawn::new(14.0, 19.0, 1.0, 1.0);
        let events: Vec<_> = grid
            .collide_moving_pawn(&pawn, DVec2::new(3.0, 3.0))
            .collect();
        assert_eq!(events.len(), 3);

        // Aligned leading edges intrude into the first new cells immediately.
        assert!(events[0].toi < 1e-12);
        assert_eq!(hit_ids(&events[0]), vec![1]);

        assert!((events[1].toi - 1.0 / 3.0).abs() < TOL);
        assert_eq!(hit_ids(&events[1]), vec![1, 2, 4, 5]);

        assert!((events[2].toi - 2.0 / 3.0).abs() < TOL);
        assert_eq!(hit_ids(&events[2]), vec![5, 6]);
    }

    #[test]
    fn test_pawn_sweep_starts_overlapping_reports_t_zero() {
        let grid = slab_grid();
        let pawn = TestPawn::new(15.0, 20.0, 1.0, 1.0);
        let events: Vec<_> = grid
            .collide_moving_pawn(&pawn, DVec2::new(1.0, 0.0))
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].toi, 0.0);
        assert_eq!(events[0].pos, DVec2::new(15.0, 20.0));
        assert_eq!(hit_ids(&events[0]), vec![1]);
        // The right edge then immediately reaches into (16,20).
        assert!(events[1].toi < 1e-12);
        assert_eq!(hit_ids(&events[1]), vec![1, 2]);
    }

    #[test]
    fn test_pawn_sweep_zero_delta() {
        let grid = slab_grid();
        // Overlapping: exactly the t=0 event, then the stream ends.
        let events: Vec<_> = grid
            .collide_moving_pawn(&TestPawn::new(15.0, 20.0, 1.0, 1.0), DVec2::ZERO)
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].toi, 0.0);
        // Clear: nothing at all.
        assert_eq!(
            grid.collide_moving_pawn(&TestPawn::new(10.0, 10.0, 1.0, 1.0), DVec2::ZERO)
                .count(),
            0
        );
    }

    #[test]
    fn test_pawn_sweep_clear_path_yields_nothing() {
        let grid = slab_grid();
        let pawn = TestPawn::new(5.0, 5.0, 1.0, 1.0);
        assert_eq!(
            grid.collide_moving_pawn(&pawn, DVec2::new(2.0, 2.0)).count(),
            0
        );
    }

    #[test]
    fn test_pawn_sweep_first_hit_left_column() {
        let grid = slab_grid();
        let pawn = TestPawn::new(13.0, 20.0, 1.0, 1.0);
        let events: Vec<_> = grid
            .collide_moving_pawn(&pawn, DVec2::new(3.0, 0.5))
            .collect();
        assert!(!events.is_empty());
        assert!((events[0].toi - 1.0 / 3.0).abs() < TOL);
        assert_eq!(hit_ids(&events[0]), vec![1, 4]);
        assert!((events[0].pos.x - 14.0).abs() < TOL);
    }

    #[test]
    fn test_pawn_sweep_large_pawn_falling() {
        let grid = slab_grid();
        // 3x3 pawn above the slab moving down-right; its bottom edge meets
        // the top tile row halfway through the step.
        let pawn = TestPawn::new(15.0, 23.0, 3.0, 3.0);
        let events: Vec<_> = grid
            .collide_moving_pawn(&pawn, DVec2::new(1.0, -2.0))
            .collect();
        assert_eq!(events.len(), 1);
        assert!((events[0].toi - 0.5).abs() < TOL);
        assert_eq!(hit_ids(&events[0]), vec![4, 5, 6]);
        assert!((events[0].pos.y - 22.0).abs() < TOL);
    }

    #[test]
    fn test_pawn_sweep_negative_delta_left() {
        let grid = slab_grid();
        let pawn = TestPawn::new(19.0, 20.0, 1.0, 1.0);
        let events: Vec<_> = grid
            .collide_moving_pawn(&pawn, DVec2::new(-2.0, 0.0))
            .collect();
        // Left edge crosses x=18 into the slab's right column; the pawn sits
        // on row 20 only, so row 21 stays untouched.
        assert_eq!(events.len(), 1);
        assert!((events[0].toi - 0.5).abs() < TOL);
        assert_eq!(hit_ids(&events[0]), vec![3]);
    }

    fn assert_stream_invariants(events: &[SweepHit<TestTile>]) {
        let mut prev_t = 0.0;
        let mut prev_ids: Vec<u32> = Vec::new();
        for ev in events {
            assert!(ev.toi >= 0.0 && ev.toi <= 1.0, "toi out of range: {}", ev.toi);
            assert!(ev.toi >= prev_t, "toi went backwards");
            assert!(!ev.hits.is_empty(), "event with empty hit set");
            let ids = {
                let mut v: Vec<u32> = ev.hits.iter().map(|t| t.id).collect();
                v.sort_unstable();
                v
            };
            assert_ne!(ids, prev_ids, "consecutive events with identical hits");
            prev_t = ev.toi;
            prev_ids = ids;
        }
    }

    proptest! {
        #[test]
        fn prop_pawn_sweep_ordered_and_deduped(
            px in 10.0f64..22.0,
            py in 16.0f64..24.0,
            w in 0.0f64..3.0,
            h in 0.0f64..3.0,
            dx in -5.0f64..5.0,
            dy in -5.0f64..5.0,
        ) {
            let grid = slab_grid();
            let pawn = TestPawn::new(px, py, w, h);
            let events: Vec<_> = grid
                .collide_moving_pawn(&pawn, DVec2::new(dx, dy))
                .collect();
            assert_stream_invariants(&events);
        }

        #[test]
        fn prop_point_sweep_ordered_and_deduped(
            px in 10.0f64..22.0,
            py in 16.0f64..24.0,
            dx in -6.0f64..6.0,
            dy in -6.0f64..6.0,
        ) {
            let grid = slab_grid();
            let events: Vec<_> = grid
                .collide_moving_point(DVec2::new(px, py), DVec2::new(dx, dy))
                .collect();
            assert_stream_invariants(&events);
        }
    }
}
