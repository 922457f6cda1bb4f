//! 2D points, node boxes and the world-space rects used for overlap removal.

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

/// A node's box relative to its anchor, i.e. the point layouts move around.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeBox {
    /// Box of the given size centered on the anchor.
    pub fn centered(width: f64, height: f64) -> Self {
        Self {
            x: -width / 2.0,
            y: -height / 2.0,
            width,
            height,
        }
    }

    /// Offset from the anchor to the box center.
    pub fn center_offset(&self) -> Vector {
        vector(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Radius of the circle enclosing the box's larger side.
    pub fn radius(&self) -> f64 {
        self.width.max(self.height) / 2.0
    }
}

/// World-space box of a node.
///
/// `dx`/`dy` are the offset from the node anchor to the box origin, so the anchor can be
/// recovered after the box has been moved (see [`Rect::anchor`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub id: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub dx: f64,
    pub dy: f64,
    /// Fixed rects are never moved by overlap resolution.
    pub fixed: bool,
}

impl Rect {
    pub fn around(id: impl Into<String>, anchor: Point, node_box: &NodeBox) -> Self {
        Self {
            id: id.into(),
            left: anchor.x + node_box.x,
            top: anchor.y + node_box.y,
            width: node_box.width,
            height: node_box.height,
            dx: node_box.x,
            dy: node_box.y,
            fixed: false,
        }
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        point(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn anchor(&self) -> Point {
        point(self.left - self.dx, self.top - self.dy)
    }

    pub fn move_by(&mut self, delta: Vector) {
        self.left += delta.x;
        self.top += delta.y;
    }

    /// Overlap extent on both axes, or `None` when the rects are disjoint or only touch.
    pub fn overlap(&self, other: &Rect) -> Option<(f64, f64)> {
        let ox = self.right().min(other.right()) - self.left.max(other.left);
        let oy = self.bottom().min(other.bottom()) - self.top.max(other.top);
        (ox > 0.0 && oy > 0.0).then_some((ox, oy))
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlap(other).is_some()
    }

    /// Smallest axis-aligned translation that moves `self` clear of `other`, plus `padding`.
    ///
    /// The push goes along the axis with the smaller overlap, away from `other`'s center. When
    /// both centers coincide on that axis, `self` is pushed towards negative coordinates.
    pub fn min_translation(&self, other: &Rect, padding: f64) -> Option<Vector> {
        let (ox, oy) = self.overlap(other)?;
        let a = self.center();
        let b = other.center();
        if ox <= oy {
            let dir = if a.x > b.x { 1.0 } else { -1.0 };
            Some(vector(dir * (ox + padding), 0.0))
        } else {
            let dir = if a.y > b.y { 1.0 } else { -1.0 };
            Some(vector(0.0, dir * (oy + padding)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeBox, Rect, point};

    #[test]
    fn rect_round_trips_its_anchor() {
        let b = NodeBox::centered(40.0, 20.0);
        let r = Rect::around("a", point(100.0, 50.0), &b);
        assert_eq!((r.left, r.top), (80.0, 40.0));
        assert_eq!(r.anchor(), point(100.0, 50.0));
        assert_eq!(r.center(), point(100.0, 50.0));
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let b = NodeBox::centered(10.0, 10.0);
        let a = Rect::around("a", point(0.0, 0.0), &b);
        let c = Rect::around("c", point(10.0, 0.0), &b);
        assert!(!a.overlaps(&c));
        assert!(a.min_translation(&c, 0.0).is_none());
    }

    #[test]
    fn min_translation_uses_axis_of_least_overlap() {
        let b = NodeBox::centered(10.0, 10.0);
        let a = Rect::around("a", point(0.0, 0.0), &b);
        let c = Rect::around("c", point(8.0, 2.0), &b);
        // overlap is 2 on x and 8 on y
        let v = a.min_translation(&c, 0.0).unwrap();
        assert_eq!((v.x, v.y), (-2.0, 0.0));

        let mut moved = a.clone();
        moved.move_by(v);
        assert!(!moved.overlaps(&c));
    }
}
