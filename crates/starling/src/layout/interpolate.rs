//! Linear blend from one layout's positions to another's.

use crate::geom::Point;
use crate::layout::PositionSource;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct InterpolationLayout {
    // (start, end) per node, snapshotted at construction
    endpoints: IndexMap<String, (Point, Point)>,
    frame: u32,
    frames: u32,
}

impl InterpolationLayout {
    /// Snapshots start positions from `source` and end positions from `dest`.
    ///
    /// Nodes missing from one side hold the other side's position for the whole blend; nodes
    /// missing from both are skipped.
    pub fn new<'a>(
        ids: impl IntoIterator<Item = &'a str>,
        source: &dyn PositionSource,
        dest: &dyn PositionSource,
        frames: u32,
    ) -> Self {
        let mut endpoints = IndexMap::new();
        for id in ids {
            let pair = match (source.node_position(id), dest.node_position(id)) {
                (Some(s), Some(e)) => (s, e),
                (Some(s), None) => (s, s),
                (None, Some(e)) => (e, e),
                (None, None) => continue,
            };
            endpoints.insert(id.to_string(), pair);
        }
        Self {
            endpoints,
            frame: 0,
            frames: frames.max(1),
        }
    }

    pub fn step(&mut self) {
        if self.frame < self.frames {
            self.frame += 1;
        }
    }

    /// Normalized time in `[0, 1]`.
    pub fn t(&self) -> f64 {
        f64::from(self.frame) / f64::from(self.frames)
    }

    pub fn done(&self) -> bool {
        self.frame >= self.frames
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl PositionSource for InterpolationLayout {
    fn node_position(&self, id: &str) -> Option<Point> {
        let (start, end) = self.endpoints.get(id)?;
        if self.done() {
            return Some(*end);
        }
        Some(start.lerp(*end, self.t()))
    }
}
