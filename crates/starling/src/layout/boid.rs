//! Flocking preview layout.
//!
//! Cheap enough to step every frame. Each boid keeps away from neighbors whose boxes it would
//! touch, drifts with the local flock, and is pulled towards a desired position that the
//! background simulation keeps feeding in.

use crate::config::BoidConfig;
use crate::geom::{NodeBox, Point, Vector, point, vector};
use crate::layout::PositionSource;
use crate::rng::XorShift64Star;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct Boid {
    id: String,
    pos: Point,
    velocity: Vector,
    desired: Option<Point>,
    radius: f64,
    pinned: bool,
}

#[derive(Debug, Clone)]
pub struct BoidLayout {
    config: BoidConfig,
    boids: Vec<Boid>,
    index: FxHashMap<String, usize>,
    rng: XorShift64Star,
    grid: NeighborGrid,
}

impl BoidLayout {
    pub fn new(config: BoidConfig, seed: u64) -> Self {
        Self {
            config,
            boids: Vec::new(),
            index: FxHashMap::default(),
            rng: XorShift64Star::new(seed),
            grid: NeighborGrid::default(),
        }
    }

    /// Adds a boid near the center of `node_box`. Re-adding an id only refreshes its size.
    pub fn add_node(&mut self, id: &str, node_box: &NodeBox) -> Point {
        if let Some(&idx) = self.index.get(id) {
            self.boids[idx].radius = node_box.radius();
            return self.boids[idx].pos;
        }
        let center = point(0.0, 0.0) + node_box.center_offset();
        let jitter = self.config.jitter;
        let pos = point(
            center.x + self.rng.next_offset(jitter),
            center.y + self.rng.next_offset(jitter),
        );
        self.index.insert(id.to_string(), self.boids.len());
        self.boids.push(Boid {
            id: id.to_string(),
            pos,
            velocity: vector(0.0, 0.0),
            desired: None,
            radius: node_box.radius(),
            pinned: false,
        });
        pos
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn set_desired_node_position(&mut self, id: &str, desired: Point) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        self.boids[idx].desired = Some(desired);
        true
    }

    pub fn pin_node(&mut self, id: &str, pinned: bool) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        self.boids[idx].pinned = pinned;
        self.boids[idx].velocity = vector(0.0, 0.0);
        true
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index.get(id).is_some_and(|&idx| self.boids[idx].pinned)
    }

    /// Advances the flock by one frame. Returns the total distance moved.
    pub fn step(&mut self) -> f64 {
        if self.boids.is_empty() {
            return 0.0;
        }
        let cfg = self.config;
        self.grid.rebuild(&self.boids, cfg.neighbor_radius);

        let mut steering = Vec::with_capacity(self.boids.len());
        let mut neighbors = Vec::new();
        for (idx, boid) in self.boids.iter().enumerate() {
            if boid.pinned {
                steering.push(vector(0.0, 0.0));
                continue;
            }
            neighbors.clear();
            self.grid.neighbors_of(boid.pos, &mut neighbors);

            let mut separation = vector(0.0, 0.0);
            let mut centroid = vector(0.0, 0.0);
            let mut heading = vector(0.0, 0.0);
            let mut flock = 0usize;
            for &other in &neighbors {
                if other == idx {
                    continue;
                }
                let o = &self.boids[other];
                let mut away = boid.pos - o.pos;
                let mut d = away.length();
                if d > cfg.neighbor_radius {
                    continue;
                }
                flock += 1;
                centroid += o.pos.to_vector();
                heading += o.velocity;

                let personal = boid.radius + o.radius + cfg.padding;
                if d < personal {
                    if d == 0.0 {
                        away = vector(self.rng.next_f64_signed(), self.rng.next_f64_signed());
                        d = away.length().max(f64::EPSILON);
                    }
                    // stronger the deeper the intrusion
                    separation += away / d * ((personal - d) / personal);
                }
            }

            let mut force = separation * cfg.separation_weight;
            if flock > 0 {
                let n = flock as f64;
                force += (centroid / n - boid.pos.to_vector()) * cfg.cohesion_weight;
                force += (heading / n - boid.velocity) * cfg.alignment_weight;
            }
            if let Some(desired) = boid.desired {
                force += arrive(boid, desired, &cfg) * cfg.desire_weight;
            }
            force += vector(self.rng.next_f64_signed(), self.rng.next_f64_signed()) * cfg.wander;

            steering.push(clamp_length(force, cfg.max_force));
        }

        let mut moved = 0.0;
        for (boid, force) in self.boids.iter_mut().zip(steering) {
            if boid.pinned {
                continue;
            }
            boid.velocity = clamp_length((boid.velocity + force) * cfg.damping, cfg.max_speed);
            boid.pos += boid.velocity;
            moved += boid.velocity.length();
        }
        moved
    }
}

impl PositionSource for BoidLayout {
    fn node_position(&self, id: &str) -> Option<Point> {
        self.index.get(id).map(|&idx| self.boids[idx].pos)
    }
}

/// Steering towards `target` that slows down inside the arrive radius.
fn arrive(boid: &Boid, target: Point, cfg: &BoidConfig) -> Vector {
    let offset = target - boid.pos;
    let d = offset.length();
    if d == 0.0 {
        return -boid.velocity;
    }
    let speed = if d < cfg.arrive_radius {
        cfg.max_speed * d / cfg.arrive_radius
    } else {
        cfg.max_speed
    };
    offset / d * speed - boid.velocity
}

fn clamp_length(v: Vector, max: f64) -> Vector {
    let len = v.length();
    if len > max && len > 0.0 {
        v * (max / len)
    } else {
        v
    }
}

/// Uniform bucket grid over boid positions; a boid's neighbors live in its cell and the 8
/// around it.
#[derive(Debug, Clone, Default)]
struct NeighborGrid {
    cell_size: f64,
    cells: FxHashMap<(i64, i64), Vec<usize>>,
}

impl NeighborGrid {
    fn rebuild(&mut self, boids: &[Boid], cell_size: f64) {
        self.cell_size = cell_size.max(1.0);
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        for (idx, b) in boids.iter().enumerate() {
            let key = self.key(b.pos);
            self.cells.entry(key).or_default().push(idx);
        }
        // cells the flock has left
        self.cells.retain(|_, bucket| !bucket.is_empty());
    }

    fn key(&self, p: Point) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    fn neighbors_of(&self, p: Point, out: &mut Vec<usize>) {
        let (cx, cy) = self.key(p);
        for gx in cx - 1..=cx + 1 {
            for gy in cy - 1..=cy + 1 {
                if let Some(bucket) = self.cells.get(&(gx, gy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }
}
