//! Progressive layout orchestration.
//!
//! The orchestrator shows a flocking preview while the force-directed simulation runs hidden
//! under an iteration/time budget. Once the budget is spent (and the graph has been fully
//! delivered), overlaps are removed from the final positions and the preview is blended into
//! them. From then on the simulation positions are authoritative.
//!
//! ```text
//! Fake -> RemoveOverlaps -> Interpolate -> Real
//! ```
//!
//! Phases only move forward. A new graph session needs a new orchestrator.

use crate::clock::{Clock, MonotonicClock};
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::geom::{NodeBox, Point, Rect, vector};
use crate::layout::{
    BoidLayout, InterpolationLayout, PhysicsLayout, PositionSource, node_mass, remove_overlaps,
};
use crate::progress::{NoopProgress, ProgressReporter};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use starling_graph::{ChangeKind, Graph, GraphChange, Link, ListenerId, Listeners, Node};
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutPhase {
    /// Flocking preview on screen, simulation running in the background.
    Fake,
    /// Single tick that separates overlapping node boxes.
    RemoveOverlaps,
    /// Preview positions blending into the final ones.
    Interpolate,
    /// Simulation positions shown directly.
    Real,
}

impl LayoutPhase {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Fake => Some(Self::RemoveOverlaps),
            Self::RemoveOverlaps => Some(Self::Interpolate),
            Self::Interpolate => Some(Self::Real),
            Self::Real => None,
        }
    }
}

impl fmt::Display for LayoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fake => "fake",
            Self::RemoveOverlaps => "remove-overlaps",
            Self::Interpolate => "interpolate",
            Self::Real => "real",
        };
        f.write_str(s)
    }
}

/// Fired once, on entering [`LayoutPhase::Real`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadyEvent {
    /// Simulation steps counted since the graph was marked ready.
    pub iterations: u32,
    pub layout_time: Duration,
}

#[derive(Debug)]
enum PhaseState {
    Fake,
    RemoveOverlaps,
    Interpolate(InterpolationLayout),
    Real,
}

impl PhaseState {
    fn phase(&self) -> LayoutPhase {
        match self {
            Self::Fake => LayoutPhase::Fake,
            Self::RemoveOverlaps => LayoutPhase::RemoveOverlaps,
            Self::Interpolate(_) => LayoutPhase::Interpolate,
            Self::Real => LayoutPhase::Real,
        }
    }
}

pub struct LayoutOrchestrator {
    config: LayoutConfig,
    // captured once; later, deeper nodes saturate in the mass function
    max_depth: u32,
    depths: FxHashMap<String, u32>,
    physics: PhysicsLayout,
    boids: BoidLayout,
    boxes: IndexMap<String, NodeBox>,
    state: PhaseState,
    graph_ready: bool,
    iterations: u32,
    layout_time: Duration,
    progress: Box<dyn ProgressReporter>,
    clock: Box<dyn Clock>,
    ready: Listeners<ReadyEvent>,
    disposed: bool,
}

impl fmt::Debug for LayoutOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutOrchestrator")
            .field("phase", &self.phase())
            .field("graph_ready", &self.graph_ready)
            .field("iterations", &self.iterations)
            .field("layout_time", &self.layout_time)
            .field("nodes", &self.physics.node_count())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl LayoutOrchestrator {
    /// Builds the background simulation from every node and link currently in `graph`.
    pub fn new(graph: &Graph, config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        let mut this = Self {
            physics: PhysicsLayout::new(config.physics, config.seed),
            boids: BoidLayout::new(config.boids, config.seed.wrapping_add(1)),
            config,
            max_depth: graph.max_depth(),
            depths: FxHashMap::default(),
            boxes: IndexMap::new(),
            state: PhaseState::Fake,
            graph_ready: false,
            iterations: 0,
            layout_time: Duration::ZERO,
            progress: Box::new(NoopProgress),
            clock: Box::new(MonotonicClock::new()),
            ready: Listeners::new(),
            disposed: false,
        };
        for node in graph.nodes() {
            this.ingest_node(node);
        }
        for link in graph.links() {
            this.ingest_link(link);
        }
        debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            max_depth = graph.max_depth(),
            "layout orchestrator created"
        );
        Ok(this)
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Folds graph notifications into the background simulation. Removals are ignored.
    pub fn apply_changes(&mut self, changes: &[GraphChange]) {
        // nodes first, so links in the same batch find both endpoints
        for change in changes {
            if let (ChangeKind::Add | ChangeKind::Update, Some(node)) = (change.kind, &change.node) {
                self.ingest_node(node);
            }
        }
        for change in changes {
            match (change.kind, &change.link) {
                (ChangeKind::Add, Some(link)) => self.ingest_link(link),
                (ChangeKind::Remove, _) => trace!("ignoring graph removal"),
                _ => {}
            }
        }
    }

    fn ingest_node(&mut self, node: &Node) {
        self.depths.insert(node.id.clone(), node.depth);
        let mass = self.mass_of(&node.id);
        self.physics.add_node(&node.id, mass, None);
    }

    fn ingest_link(&mut self, link: &Link) {
        let (from, to) = (link.from_id.as_str(), link.to_id.as_str());
        if !self.physics.has_node(from) || !self.physics.has_node(to) {
            trace!(link = %link.id, "link endpoints not in layout");
            return;
        }
        // a body joining through its first link starts next to the body it links to
        if from != to {
            if self.physics.degree(to) == 0 {
                self.place_near(to, from);
            } else if self.physics.degree(from) == 0 {
                self.place_near(from, to);
            }
        }
        if self.physics.add_link(from, to) {
            let from_mass = self.mass_of(from);
            let to_mass = self.mass_of(to);
            self.physics.set_mass(from, from_mass);
            self.physics.set_mass(to, to_mass);
        }
    }

    fn place_near(&mut self, id: &str, anchor: &str) {
        if self.physics.is_pinned(id) {
            return;
        }
        if let Some(p) = self.physics.node_position(anchor) {
            let spread = self.config.physics.spring_length / 2.0;
            let jitter = self.physics.node_position(id).unwrap_or(p) - p;
            let offset = jitter.normalize() * spread;
            let offset = if offset.x.is_finite() && offset.y.is_finite() {
                offset
            } else {
                vector(spread, 0.0)
            };
            self.physics
                .set_node_position(id, p.x + offset.x, p.y + offset.y);
        }
    }

    fn mass_of(&self, id: &str) -> f64 {
        let depth = self.depths.get(id).copied().unwrap_or(self.max_depth);
        node_mass(id, self.physics.degree(id), depth, self.max_depth)
    }

    /// Registers a node's box. The node shows up in the preview right away; nodes the graph
    /// never mentioned are also added to the simulation.
    pub fn add_node(&mut self, id: &str, node_box: NodeBox) {
        let pos = self.boids.add_node(id, &node_box);
        self.boxes.insert(id.to_string(), node_box);
        if !self.physics.has_node(id) {
            let mass = self.mass_of(id);
            self.physics.add_node(id, mass, Some(pos));
        }
    }

    /// Pins `node` in the simulation. Its box is also kept in place during overlap removal.
    pub fn pin_node(&mut self, node: &Node) -> Result<()> {
        if !self.physics.pin_node(&node.id, true) {
            return Err(Error::UnknownNode {
                id: node.id.clone(),
            });
        }
        debug!(node = %node.id, "pinned");
        Ok(())
    }

    /// Marks the topology as complete and restarts the budget.
    ///
    /// Until this is called the preview keeps running indefinitely.
    pub fn set_graph_ready(&mut self) {
        self.iterations = 0;
        self.layout_time = Duration::ZERO;
        self.graph_ready = true;
        debug!(nodes = self.physics.node_count(), "graph ready");
    }

    pub fn is_graph_ready(&self) -> bool {
        self.graph_ready
    }

    pub fn phase(&self) -> LayoutPhase {
        self.state.phase()
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn layout_time(&self) -> Duration {
        self.layout_time
    }

    pub fn physics(&self) -> &PhysicsLayout {
        &self.physics
    }

    pub fn boids(&self) -> &BoidLayout {
        &self.boids
    }

    /// Position from whichever layout the current phase shows.
    pub fn node_position(&self, id: &str) -> Option<Point> {
        let shown = match &self.state {
            PhaseState::Fake | PhaseState::RemoveOverlaps => self.boids.node_position(id),
            PhaseState::Interpolate(blend) => blend.node_position(id),
            PhaseState::Real => None,
        };
        let pos = shown.or_else(|| self.physics.node_position(id));
        debug_assert!(
            pos.is_some() || !self.boxes.contains_key(id),
            "added node {id} has no position"
        );
        pos
    }

    pub fn on_ready<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&ReadyEvent) + 'static,
    {
        self.ready.subscribe(callback)
    }

    pub fn off_ready(&mut self, id: ListenerId) -> bool {
        self.ready.unsubscribe(id)
    }

    /// Stops the orchestrator. Later calls to [`LayoutOrchestrator::step`] do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.ready.clear();
        debug!(phase = %self.phase(), "layout orchestrator disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Runs one tick. Returns whether the driver should schedule another one.
    pub fn step(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        let state = std::mem::replace(&mut self.state, PhaseState::Real);
        let from = state.phase();
        let (next, more) = self.advance(state);
        if next.phase() != from {
            debug!(
                from = %from,
                to = %next.phase(),
                iterations = self.iterations,
                elapsed_ms = self.layout_time.as_secs_f64() * 1000.0,
                "layout phase changed"
            );
        }
        self.state = next;
        more
    }

    fn advance(&mut self, state: PhaseState) -> (PhaseState, bool) {
        match state {
            PhaseState::Fake => {
                self.run_preview_tick();
                if self.graph_ready && self.iterations >= self.config.budget.max_layout_iterations {
                    self.report_timing();
                    (PhaseState::RemoveOverlaps, true)
                } else {
                    (PhaseState::Fake, true)
                }
            }
            PhaseState::RemoveOverlaps => {
                self.run_overlap_removal();
                let blend = InterpolationLayout::new(
                    self.physics.node_ids(),
                    &self.boids,
                    &self.physics,
                    self.config.interpolation.frames,
                );
                (PhaseState::Interpolate(blend), true)
            }
            PhaseState::Interpolate(mut blend) => {
                blend.step();
                if blend.done() {
                    let event = ReadyEvent {
                        iterations: self.iterations,
                        layout_time: self.layout_time,
                    };
                    self.ready.emit(&event);
                    (PhaseState::Real, true)
                } else {
                    (PhaseState::Interpolate(blend), true)
                }
            }
            PhaseState::Real => (PhaseState::Real, false),
        }
    }

    fn run_preview_tick(&mut self) {
        let budget = self.config.budget;
        let slice = budget.slice();
        let start = self.clock.now();
        self.boids.step();

        let max_iterations = budget.max_layout_iterations;
        // A stalled clock must not hold the tick forever.
        let step_cap = if self.graph_ready {
            max_iterations.saturating_sub(self.iterations).max(1)
        } else {
            max_iterations
        };

        let mut steps = 0u32;
        let elapsed = loop {
            self.physics.step();
            steps += 1;
            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= slice || steps >= step_cap {
                break elapsed;
            }
        };
        self.iterations = self.iterations.saturating_add(steps);
        self.layout_time += elapsed;

        let mut finished = f64::from(self.iterations) / f64::from(max_iterations);
        if let Some(max_time) = budget.max_layout_time() {
            if self.layout_time > max_time {
                self.iterations = max_iterations;
            }
            finished = finished.max(self.layout_time.as_secs_f64() / max_time.as_secs_f64());
        }
        let finished = finished.min(1.0);

        for id in self.physics.node_ids() {
            if let Some(p) = self.physics.node_position(id) {
                self.boids.set_desired_node_position(id, p);
            }
        }

        let percent = (finished * 100.0).round() as u8;
        self.progress.set_layout_completion(percent);
        trace!(
            steps,
            iterations = self.iterations,
            elapsed_ms = self.layout_time.as_secs_f64() * 1000.0,
            percent,
            "preview tick"
        );
    }

    fn run_overlap_removal(&mut self) {
        let mut rects: Vec<Rect> = self
            .boxes
            .iter()
            .filter_map(|(id, node_box)| {
                let pos = self.physics.node_position(id)?;
                Some(Rect::around(id.as_str(), pos, node_box).with_fixed(self.physics.is_pinned(id)))
            })
            .collect();
        let resolved = remove_overlaps(&mut rects, &self.config.overlap);
        for rect in rects.iter().filter(|r| !r.fixed) {
            let anchor = rect.anchor();
            self.physics.set_node_position(&rect.id, anchor.x, anchor.y);
        }
        debug!(rects = rects.len(), resolved, "overlaps removed");
    }

    fn report_timing(&self) {
        let timing_enabled = std::env::var("STARLING_LAYOUT_TIMING").ok().as_deref() == Some("1");
        if !timing_enabled {
            return;
        }
        eprintln!(
            "[starling-layout-timing] layout_time={:?} iterations={} nodes={} boxes={}",
            self.layout_time,
            self.iterations,
            self.physics.node_count(),
            self.boxes.len(),
        );
    }
}

impl PositionSource for LayoutOrchestrator {
    fn node_position(&self, id: &str) -> Option<Point> {
        LayoutOrchestrator::node_position(self, id)
    }
}
