//! Barnes-Hut quadtree for approximate n-body repulsion.

use super::Body;
use crate::geom::{Vector, vector};
use crate::rng::XorShift64Star;

// Coincident bodies would otherwise split forever; past this depth a leaf keeps them together.
const MAX_DEPTH: u32 = 32;

#[derive(Debug, Clone)]
struct Quad {
    left: f64,
    top: f64,
    size: f64,
    mass: f64,
    // mass-weighted position sums; divide by `mass` for the center of mass
    mass_x: f64,
    mass_y: f64,
    children: [Option<u32>; 4],
    bodies: Vec<usize>,
}

impl Quad {
    fn new(left: f64, top: f64, size: f64) -> Self {
        Self {
            left,
            top,
            size,
            mass: 0.0,
            mass_x: 0.0,
            mass_y: 0.0,
            children: [None; 4],
            bodies: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    fn quadrant_of(&self, x: f64, y: f64) -> usize {
        let half = self.size / 2.0;
        let right = x >= self.left + half;
        let bottom = y >= self.top + half;
        usize::from(right) + 2 * usize::from(bottom)
    }

    fn child_bounds(&self, quadrant: usize) -> (f64, f64, f64) {
        let half = self.size / 2.0;
        let left = if quadrant & 1 == 1 {
            self.left + half
        } else {
            self.left
        };
        let top = if quadrant & 2 == 2 {
            self.top + half
        } else {
            self.top
        };
        (left, top, half)
    }

    fn accumulate(&mut self, body: &Body) {
        self.mass += body.mass;
        self.mass_x += body.mass * body.pos.x;
        self.mass_y += body.mass * body.pos.y;
    }
}

/// Arena-backed quadtree, rebuilt from scratch before every simulation step.
#[derive(Debug, Clone, Default)]
pub(super) struct QuadTree {
    quads: Vec<Quad>,
}

impl QuadTree {
    pub(super) fn rebuild(&mut self, bodies: &[Body]) {
        self.quads.clear();
        if bodies.is_empty() {
            return;
        }

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for b in bodies {
            min_x = min_x.min(b.pos.x);
            min_y = min_y.min(b.pos.y);
            max_x = max_x.max(b.pos.x);
            max_y = max_y.max(b.pos.y);
        }
        // Square root cell with a margin so bodies on the max edge stay inside.
        let size = (max_x - min_x).max(max_y - min_y).max(1.0) + 1.0;
        self.quads.push(Quad::new(min_x - 0.5, min_y - 0.5, size));

        for idx in 0..bodies.len() {
            self.insert(idx, bodies);
        }
    }

    fn insert(&mut self, idx: usize, bodies: &[Body]) {
        let body = &bodies[idx];
        let mut q = 0usize;
        let mut depth = 0u32;
        loop {
            self.quads[q].accumulate(body);

            if self.quads[q].is_leaf() {
                if self.quads[q].bodies.is_empty() || depth >= MAX_DEPTH {
                    self.quads[q].bodies.push(idx);
                    return;
                }
                // Occupied leaf: push its resident body one level down, then keep descending.
                let resident = std::mem::take(&mut self.quads[q].bodies);
                for r in resident {
                    let child = self.child_for(q, bodies[r].pos.x, bodies[r].pos.y);
                    self.quads[child].accumulate(&bodies[r]);
                    self.quads[child].bodies.push(r);
                }
            }

            q = self.child_for(q, body.pos.x, body.pos.y);
            depth += 1;
        }
    }

    fn child_for(&mut self, q: usize, x: f64, y: f64) -> usize {
        let quadrant = self.quads[q].quadrant_of(x, y);
        if let Some(child) = self.quads[q].children[quadrant] {
            return child as usize;
        }
        let (left, top, size) = self.quads[q].child_bounds(quadrant);
        let child = self.quads.len();
        self.quads.push(Quad::new(left, top, size));
        self.quads[q].children[quadrant] = Some(child as u32);
        child
    }

    /// Repulsion (or attraction, for positive `gravity`) acting on `bodies[idx]`.
    pub(super) fn force_on(
        &self,
        idx: usize,
        bodies: &[Body],
        gravity: f64,
        theta: f64,
        rng: &mut XorShift64Star,
    ) -> Vector {
        let mut force = vector(0.0, 0.0);
        if self.quads.is_empty() {
            return force;
        }
        let source = &bodies[idx];
        let mut stack: Vec<usize> = vec![0];

        while let Some(q) = stack.pop() {
            let quad = &self.quads[q];
            if quad.is_leaf() {
                for &other in &quad.bodies {
                    if other == idx {
                        continue;
                    }
                    let b = &bodies[other];
                    force += pair_force(
                        b.pos.x - source.pos.x,
                        b.pos.y - source.pos.y,
                        gravity * b.mass * source.mass,
                        rng,
                    );
                }
                continue;
            }

            let dx = quad.mass_x / quad.mass - source.pos.x;
            let dy = quad.mass_y / quad.mass - source.pos.y;
            let r = (dx * dx + dy * dy).sqrt();
            if r > 0.0 && quad.size / r < theta {
                force += pair_force(dx, dy, gravity * quad.mass * source.mass, rng);
            } else {
                stack.extend(quad.children.iter().flatten().map(|&c| c as usize));
            }
        }
        force
    }
}

fn pair_force(mut dx: f64, mut dy: f64, strength: f64, rng: &mut XorShift64Star) -> Vector {
    let mut r = (dx * dx + dy * dy).sqrt();
    if r == 0.0 {
        // Coincident: nudge in a random direction so the pair can separate.
        dx = (rng.next_f64_unit() - 0.5) / 50.0;
        dy = (rng.next_f64_unit() - 0.5) / 50.0;
        r = (dx * dx + dy * dy).sqrt();
    }
    let v = strength / (r * r * r);
    vector(v * dx, v * dy)
}
