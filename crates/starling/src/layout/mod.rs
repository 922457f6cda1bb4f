//! Individual layouts the orchestrator switches between.

pub mod boid;
pub mod interpolate;
pub mod overlap;
pub mod physics;

pub use boid::BoidLayout;
pub use interpolate::InterpolationLayout;
pub use overlap::remove_overlaps;
pub use physics::{PhysicsLayout, node_mass};

use crate::geom::Point;
use indexmap::IndexMap;

/// Anything that can answer "where is this node right now".
pub trait PositionSource {
    fn node_position(&self, id: &str) -> Option<Point>;
}

impl PositionSource for IndexMap<String, Point> {
    fn node_position(&self, id: &str) -> Option<Point> {
        self.get(id).copied()
    }
}
