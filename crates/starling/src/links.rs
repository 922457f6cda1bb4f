//! Progressive link drawing.
//!
//! Links are drawn shallowest first, a bounded number at a time, each growing from its source
//! node towards its target over a randomized number of frames.

use crate::config::LinkAnimationConfig;
use crate::geom::Point;
use crate::layout::PositionSource;
use crate::rng::XorShift64Star;
use indexmap::IndexMap;
use starling_graph::{Graph, Link};
use std::fmt;
use tracing::{debug, trace};

/// Stroke of a link, derived from its priority score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkStyle {
    pub stroke_width: f64,
    /// Grey level of the stroke, from 75 (score 1) to 200 (score 0).
    pub grey: u8,
}

impl LinkStyle {
    pub fn for_score(score: f64) -> Self {
        Self {
            stroke_width: 8.0 * score + 2.0,
            grey: ((200.0 - 75.0) * (1.0 - score) + 75.0).round() as u8,
        }
    }

    pub fn stroke_color(&self) -> String {
        let g = self.grey;
        format!("rgb({g}, {g}, {g})")
    }
}

/// Host side of link drawing: owns whatever actually puts a link on screen.
pub trait LinkVisuals {
    /// Called once per link, on its first animation frame.
    fn create(&mut self, link: &Link, style: &LinkStyle, path: &str);

    /// Called on every later frame with the grown path.
    fn update(&mut self, link_id: &str, path: &str);
}

/// Bookkeeping kept for every link whose visual has been created.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkInfo {
    pub link: Link,
    pub style: LinkStyle,
    /// Animation length in frames.
    pub frames: u32,
    /// Scheduler tick on which the animation started.
    pub started_tick: u64,
}

/// Priority of a link: 1 for links between roots, approaching 0 for the deepest ones.
pub fn link_score(avg_depth: f64, max_depth: u32) -> f64 {
    if max_depth == 0 {
        return 0.0;
    }
    let max_depth = f64::from(max_depth);
    (max_depth - avg_depth) / max_depth
}

/// Quadratic ease-out.
pub fn ease(t: f64) -> f64 {
    t * (2.0 - t)
}

pub fn path_data(from: Point, to: Point) -> String {
    format!("M{},{} L{},{}", from.x, from.y, to.x, to.y)
}

#[derive(Debug, Clone)]
struct Scheduled {
    link: Link,
    score: f64,
}

#[derive(Debug, Clone)]
struct Animation {
    link: Link,
    style: LinkStyle,
    from: Point,
    to: Point,
    frame: u32,
    max_t: u32,
}

impl Animation {
    /// Draws the current frame. Returns `true` once the link is fully drawn.
    fn step(&mut self, visuals: &mut dyn LinkVisuals, created: bool) -> bool {
        let t = ease(f64::from(self.frame) / f64::from(self.max_t));
        let tip = self.from.lerp(self.to, t);
        let path = path_data(self.from, tip);
        if created {
            visuals.update(&self.link.id, &path);
        } else {
            visuals.create(&self.link, &self.style, &path);
        }
        self.frame += 1;
        self.frame > self.max_t
    }

    fn info(&self, started_tick: u64) -> LinkInfo {
        LinkInfo {
            link: self.link.clone(),
            style: self.style,
            frames: self.max_t,
            started_tick,
        }
    }
}

pub struct LinkAnimationScheduler {
    max_animations: usize,
    speed_scale: f64,
    // ascending by score; the next link to draw is at the end
    backlog: Vec<Scheduled>,
    in_flight: IndexMap<String, Animation>,
    drawn: IndexMap<String, LinkInfo>,
    rng: XorShift64Star,
    tick: u64,
    disposed: bool,
}

impl fmt::Debug for LinkAnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkAnimationScheduler")
            .field("backlog", &self.backlog.len())
            .field("in_flight", &self.in_flight.len())
            .field("drawn", &self.drawn.len())
            .field("tick", &self.tick)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl LinkAnimationScheduler {
    /// Snapshots every link in `graph`. Links added to the graph later are not drawn.
    pub fn new(graph: &Graph, config: &LinkAnimationConfig) -> Self {
        let max_depth = graph.max_depth();
        let depth_of = |id: &str| graph.node(id).map_or(max_depth, |n| n.depth);

        let mut backlog: Vec<Scheduled> = graph
            .links()
            .map(|link| {
                let avg = (f64::from(depth_of(&link.from_id)) + f64::from(depth_of(&link.to_id)))
                    / 2.0;
                Scheduled {
                    link: link.clone(),
                    score: link_score(avg, max_depth),
                }
            })
            .collect();
        backlog.sort_by(|a, b| a.score.total_cmp(&b.score));
        debug!(links = backlog.len(), "link animation scheduled");

        Self {
            max_animations: config.max_animations.max(1),
            speed_scale: config.speed_scale,
            backlog,
            in_flight: IndexMap::new(),
            drawn: IndexMap::new(),
            rng: XorShift64Star::new(config.seed),
            tick: 0,
            disposed: false,
        }
    }

    /// Starts queued links up to the concurrency limit and advances every running animation by
    /// one frame. Returns whether more ticks are needed.
    pub fn tick(&mut self, positions: &dyn PositionSource, visuals: &mut dyn LinkVisuals) -> bool {
        if self.disposed {
            return false;
        }

        while self.in_flight.len() < self.max_animations {
            let Some(next) = self.backlog.pop() else {
                break;
            };
            self.start(next, positions);
        }

        let drawn = &self.drawn;
        self.in_flight.retain(|id, animation| {
            let done = animation.step(visuals, drawn.contains_key(id));
            !done
        });
        // register visuals created this frame
        let tick = self.tick;
        for (id, animation) in &self.in_flight {
            if !self.drawn.contains_key(id) {
                self.drawn.insert(id.clone(), animation.info(tick));
            }
        }

        trace!(
            tick = self.tick,
            in_flight = self.in_flight.len(),
            backlog = self.backlog.len(),
            "link tick"
        );
        self.tick += 1;

        let more = !self.is_finished();
        if !more {
            debug!(drawn = self.drawn.len(), ticks = self.tick, "link animation finished");
        }
        more
    }

    fn start(&mut self, next: Scheduled, positions: &dyn PositionSource) {
        let duration = (self.rng.gaussian() * self.speed_scale).abs().round() as u32 + 1;
        let (Some(from), Some(to)) = (
            positions.node_position(&next.link.from_id),
            positions.node_position(&next.link.to_id),
        ) else {
            trace!(link = %next.link.id, "link endpoints have no position, skipped");
            return;
        };
        let animation = Animation {
            style: LinkStyle::for_score(next.score),
            link: next.link,
            from,
            to,
            frame: 0,
            max_t: duration,
        };
        self.in_flight.insert(animation.link.id.clone(), animation);
    }

    /// Stops drawing. Later ticks do nothing; links already drawn keep their info.
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!(
                backlog = self.backlog.len(),
                in_flight = self.in_flight.len(),
                "link animation disposed"
            );
        }
        self.disposed = true;
        self.backlog.clear();
        self.in_flight.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_finished(&self) -> bool {
        self.backlog.is_empty() && self.in_flight.is_empty()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn link_info(&self, link_id: &str) -> Option<&LinkInfo> {
        self.drawn.get(link_id)
    }

    /// Links whose visual exists, in the order they were created.
    pub fn drawn(&self) -> impl Iterator<Item = &LinkInfo> {
        self.drawn.values()
    }
}
