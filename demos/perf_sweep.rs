use glam::DVec2;
use std::hash::{Hash, Hasher};
use std::time::Instant;
use tilecast::*;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

#[derive(Clone, Copy, Debug)]
struct Block {
    id: u32,
    pos: DVec2,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Block {}
impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl Tile for Block {
    fn position(&self) -> DVec2 {
        self.pos
    }
}

struct Actor {
    pos: DVec2,
    size: DVec2,
}

impl Pawn for Actor {
    fn size(&self) -> DVec2 {
        self.size
    }
    fn position(&self) -> DVec2 {
        self.pos
    }
}

const EXTENT: f64 = 256.0;

fn build_grid(n: usize, seed: &mut u32) -> GridCollider<Block> {
    let mut grid = GridCollider::new(DVec2::splat(EXTENT));
    for id in 0..n as u32 {
        let x = (lcg(seed) % EXTENT as u32) as f64;
        let y = (lcg(seed) % EXTENT as u32) as f64;
        grid.add(Block { id, pos: DVec2::new(x, y) })
            .expect("in-bounds unique block");
    }
    grid
}

fn main() {
    let tile_counts = [1_000usize, 10_000, 50_000];
    let sweeps = 10_000usize;
    println!("tiles,sweeps,events,build_ms,sweep_ms");
    for &n in &tile_counts {
        let mut seed = 0x5eed_u32;
        let t_build = Instant::now();
        let grid = build_grid(n, &mut seed);
        let build_ms = t_build.elapsed().as_secs_f64() * 1000.0;

        let t_sweep = Instant::now();
        let mut events = 0usize;
        for _ in 0..sweeps {
            let px = (lcg(&mut seed) as f64 / u32::MAX as f64) * (EXTENT - 8.0);
            let py = (lcg(&mut seed) as f64 / u32::MAX as f64) * (EXTENT - 8.0);
            let dx = (lcg(&mut seed) as f64 / u32::MAX as f64) * 8.0 - 4.0;
            let dy = (lcg(&mut seed) as f64 / u32::MAX as f64) * 8.0 - 4.0;
            let actor = Actor { pos: DVec2::new(px, py), size: DVec2::new(1.0, 1.0) };
            events += grid
                .collide_moving_pawn(&actor, DVec2::new(dx, dy))
                .count();
        }
        let sweep_ms = t_sweep.elapsed().as_secs_f64() * 1000.0;
        println!("{n},{sweeps},{events},{build_ms:.3},{sweep_ms:.3}");
    }
}
