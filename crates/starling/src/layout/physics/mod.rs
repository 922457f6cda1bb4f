//! Force-directed layout: Barnes-Hut repulsion, springs along links, drag, Euler integration.
//!
//! This is the "real" layout. It runs hidden while the flocking preview is on screen and is
//! only shown once the orchestrator decides it is good enough.

use crate::config::PhysicsConfig;
use crate::geom::{Point, Vector, point, vector};
use crate::layout::PositionSource;
use crate::rng::XorShift64Star;
use rustc_hash::{FxHashMap, FxHashSet};

mod quadtree;

use quadtree::QuadTree;

/// Simulated mass of a node: `len(id) * max(links, 1) * ((max_depth - depth) + 1)`.
///
/// Shallow nodes are heavier and therefore move less. Depths beyond `max_depth` saturate to a
/// depth factor of 1.
pub fn node_mass(id: &str, link_count: usize, depth: u32, max_depth: u32) -> f64 {
    let len = id.chars().count() as f64;
    let links = link_count.max(1) as f64;
    let depth_factor = (max_depth.saturating_sub(depth) + 1) as f64;
    len * links * depth_factor
}

#[derive(Debug, Clone)]
struct Body {
    id: String,
    pos: Point,
    velocity: Vector,
    force: Vector,
    mass: f64,
    pinned: bool,
    degree: usize,
}

impl Body {
    fn new(id: String, pos: Point, mass: f64) -> Self {
        Self {
            id,
            pos,
            velocity: vector(0.0, 0.0),
            force: vector(0.0, 0.0),
            mass: sanitize_mass(mass),
            pinned: false,
            degree: 0,
        }
    }
}

fn sanitize_mass(mass: f64) -> f64 {
    if mass.is_finite() && mass > 0.0 {
        mass
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    from: usize,
    to: usize,
}

#[derive(Debug, Clone)]
pub struct PhysicsLayout {
    config: PhysicsConfig,
    bodies: Vec<Body>,
    index: FxHashMap<String, usize>,
    springs: Vec<Spring>,
    spring_keys: FxHashSet<(usize, usize)>,
    tree: QuadTree,
    rng: XorShift64Star,
}

impl PhysicsLayout {
    pub fn new(config: PhysicsConfig, seed: u64) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            index: FxHashMap::default(),
            springs: Vec::new(),
            spring_keys: FxHashSet::default(),
            tree: QuadTree::default(),
            rng: XorShift64Star::new(seed),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Adds a body, scattered around `near` (or the origin) by up to half a spring length.
    ///
    /// Re-adding an existing id only updates its mass. Returns the body position.
    pub fn add_node(&mut self, id: &str, mass: f64, near: Option<Point>) -> Point {
        if let Some(&idx) = self.index.get(id) {
            self.bodies[idx].mass = sanitize_mass(mass);
            return self.bodies[idx].pos;
        }
        let spread = self.config.spring_length.max(1.0);
        let base = near.unwrap_or_else(|| point(0.0, 0.0));
        let pos = point(
            base.x + self.rng.next_offset(spread / 2.0),
            base.y + self.rng.next_offset(spread / 2.0),
        );
        self.index.insert(id.to_string(), self.bodies.len());
        self.bodies.push(Body::new(id.to_string(), pos, mass));
        pos
    }

    /// Connects two bodies with a spring. Returns `false` for unknown endpoints and repeated
    /// pairs. Self links count towards the degree but get no spring.
    pub fn add_link(&mut self, from: &str, to: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        if !self.spring_keys.insert((a, b)) {
            return false;
        }
        self.bodies[a].degree += 1;
        if a != b {
            self.bodies[b].degree += 1;
            self.springs.push(Spring { from: a, to: b });
        }
        true
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.bodies.iter().map(|b| b.id.as_str())
    }

    /// Number of links attached through [`PhysicsLayout::add_link`].
    pub fn degree(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |&idx| self.bodies[idx].degree)
    }

    pub fn mass(&self, id: &str) -> Option<f64> {
        self.index.get(id).map(|&idx| self.bodies[idx].mass)
    }

    pub fn set_mass(&mut self, id: &str, mass: f64) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        self.bodies[idx].mass = sanitize_mass(mass);
        true
    }

    /// Pinned bodies still push and pull others but are never integrated.
    pub fn pin_node(&mut self, id: &str, pinned: bool) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let body = &mut self.bodies[idx];
        body.pinned = pinned;
        body.velocity = vector(0.0, 0.0);
        true
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index
            .get(id)
            .is_some_and(|&idx| self.bodies[idx].pinned)
    }

    /// Moves a body and drops its velocity.
    pub fn set_node_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let body = &mut self.bodies[idx];
        body.pos = point(x, y);
        body.velocity = vector(0.0, 0.0);
        true
    }

    /// One integration step. Returns the total distance moved by all bodies.
    pub fn step(&mut self) -> f64 {
        if self.bodies.is_empty() {
            return 0.0;
        }

        for b in &mut self.bodies {
            b.force = vector(0.0, 0.0);
        }

        self.tree.rebuild(&self.bodies);
        for idx in 0..self.bodies.len() {
            let f = self.tree.force_on(
                idx,
                &self.bodies,
                self.config.gravity,
                self.config.theta,
                &mut self.rng,
            );
            self.bodies[idx].force += f;
        }

        self.apply_springs();

        let drag = self.config.drag_coeff;
        for b in &mut self.bodies {
            b.force -= b.velocity * drag;
        }

        self.integrate()
    }

    fn apply_springs(&mut self) {
        let length = self.config.spring_length;
        let coeff = self.config.spring_coeff;
        for s in &self.springs {
            let mut dx = self.bodies[s.to].pos.x - self.bodies[s.from].pos.x;
            let mut dy = self.bodies[s.to].pos.y - self.bodies[s.from].pos.y;
            let mut r = (dx * dx + dy * dy).sqrt();
            if r == 0.0 {
                dx = (self.rng.next_f64_unit() - 0.5) / 50.0;
                dy = (self.rng.next_f64_unit() - 0.5) / 50.0;
                r = (dx * dx + dy * dy).sqrt();
            }
            let k = coeff * (r - length) / r;
            let f = vector(k * dx, k * dy);
            self.bodies[s.from].force += f;
            self.bodies[s.to].force -= f;
        }
    }

    fn integrate(&mut self) -> f64 {
        let dt = self.config.time_step;
        let max_v = self.config.max_velocity;
        let mut moved = 0.0;
        for b in &mut self.bodies {
            if b.pinned {
                b.velocity = vector(0.0, 0.0);
                continue;
            }
            b.velocity += b.force * (dt / b.mass);
            let v = b.velocity.length();
            if v > max_v {
                b.velocity = b.velocity * (max_v / v);
            }
            let d = b.velocity * dt;
            b.pos += d;
            moved += d.length();
        }
        moved
    }
}

impl PositionSource for PhysicsLayout {
    fn node_position(&self, id: &str) -> Option<Point> {
        self.index.get(id).map(|&idx| self.bodies[idx].pos)
    }
}

#[cfg(test)]
mod tests {
    use super::{PhysicsLayout, node_mass};
    use crate::config::PhysicsConfig;
    use crate::geom::point;
    use crate::layout::PositionSource;

    #[test]
    fn mass_favors_shallow_well_connected_nodes() {
        assert_eq!(node_mass("root", 3, 0, 2), 4.0 * 3.0 * 3.0);
        assert_eq!(node_mass("leaf", 1, 2, 2), 4.0);
        // nodes without links count as having one
        assert_eq!(node_mass("ab", 0, 1, 2), 2.0 * 1.0 * 2.0);
        // deeper than the recorded max depth saturates
        assert_eq!(node_mass("ab", 1, 5, 2), 2.0);
    }

    #[test]
    fn repulsion_pushes_free_bodies_apart() {
        let mut layout = PhysicsLayout::new(PhysicsConfig::default(), 1);
        layout.add_node("a", 1.0, Some(point(0.0, 0.0)));
        layout.add_node("b", 1.0, Some(point(0.0, 0.0)));
        layout.set_node_position("a", 0.0, 0.0);
        layout.set_node_position("b", 5.0, 0.0);

        for _ in 0..20 {
            layout.step();
        }
        let a = layout.node_position("a").unwrap();
        let b = layout.node_position("b").unwrap();
        assert!((b - a).length() > 5.0);
    }

    #[test]
    fn springs_pull_distant_bodies_together() {
        let config = PhysicsConfig {
            gravity: 0.0,
            ..PhysicsConfig::default()
        };
        let mut layout = PhysicsLayout::new(config, 1);
        layout.add_node("a", 1.0, None);
        layout.add_node("b", 1.0, None);
        assert!(layout.add_link("a", "b"));
        layout.set_node_position("a", 0.0, 0.0);
        layout.set_node_position("b", 500.0, 0.0);

        for _ in 0..50 {
            layout.step();
        }
        let a = layout.node_position("a").unwrap();
        let b = layout.node_position("b").unwrap();
        assert!((b - a).length() < 500.0);
    }

    #[test]
    fn pinned_body_never_moves() {
        let mut layout = PhysicsLayout::new(PhysicsConfig::default(), 9);
        layout.add_node("root", 10.0, None);
        for i in 0..5 {
            let id = format!("c{i}");
            layout.add_node(&id, 2.0, None);
            layout.add_link("root", &id);
        }
        assert!(layout.pin_node("root", true));
        let before = layout.node_position("root").unwrap();
        for _ in 0..100 {
            layout.step();
        }
        assert_eq!(layout.node_position("root").unwrap(), before);
    }

    #[test]
    fn duplicate_and_dangling_links_are_ignored() {
        let mut layout = PhysicsLayout::new(PhysicsConfig::default(), 1);
        layout.add_node("a", 1.0, None);
        layout.add_node("b", 1.0, None);
        assert!(layout.add_link("a", "b"));
        assert!(!layout.add_link("a", "b"));
        assert!(!layout.add_link("a", "zzz"));
        assert_eq!(layout.degree("a"), 1);
        assert_eq!(layout.degree("b"), 1);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let run = || {
            let mut layout = PhysicsLayout::new(PhysicsConfig::default(), 5);
            for i in 0..30 {
                layout.add_node(&format!("n{i}"), 1.0 + i as f64, None);
            }
            for i in 1..30 {
                layout.add_link(&format!("n{}", (i - 1) / 2), &format!("n{i}"));
            }
            for _ in 0..40 {
                layout.step();
            }
            layout
                .node_ids()
                .map(|id| layout.node_position(id).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
