//! Headless render session: wires a graph, the layout orchestrator and the link scheduler.
//!
//! A host calls [`RenderSession::render`] with a graph, then [`RenderSession::frame`] once per
//! animation frame until it returns `false`, reading positions in between. Graph additions made
//! through [`RenderSession::graph_mut`] are picked up on the next frame.

use crate::clock::{Clock, MonotonicClock};
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::geom::{NodeBox, Point};
use crate::links::{LinkAnimationScheduler, LinkInfo, LinkVisuals};
use crate::orchestrator::{LayoutOrchestrator, LayoutPhase};
use crate::progress::{NoopProgress, ProgressReporter};
use indexmap::IndexMap;
use starling_graph::{ChangeKind, Graph, GraphChange, ListenerId, Node};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextSize {
    pub total_width: f64,
    pub space_width: f64,
}

pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f64) -> TextSize;
}

/// Fixed-advance estimate for hosts without a font engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateTextMeasure {
    /// Glyph advance in ems.
    pub glyph_width: f64,
    pub space_width: f64,
}

impl Default for ApproximateTextMeasure {
    fn default() -> Self {
        Self {
            glyph_width: 0.6,
            space_width: 0.3,
        }
    }
}

impl TextMeasure for ApproximateTextMeasure {
    fn measure(&self, text: &str, font_size: f64) -> TextSize {
        TextSize {
            total_width: text.chars().count() as f64 * self.glyph_width * font_size,
            space_width: self.space_width * font_size,
        }
    }
}

/// Size and decoration of a node, scaled by how close it is to the roots.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAppearance {
    pub text: String,
    pub font_size: f64,
    pub width: f64,
    pub height: f64,
    /// Box origin relative to the node anchor.
    pub x: f64,
    pub y: f64,
    pub corner_radius: f64,
    pub stroke_width: f64,
    /// Label origin relative to the node anchor.
    pub label_x: f64,
    pub label_y: f64,
}

impl NodeAppearance {
    /// Box metrics for `node`. The width follows the displayed text: the label when the node has
    /// one, otherwise its id.
    pub fn for_node(node: &Node, max_depth: u32, measure: &dyn TextMeasure) -> Self {
        let ratio = depth_ratio(node.depth, max_depth);
        let font_size = 45.0 * ratio + 14.0;
        let text = node.text();
        let size = measure.measure(text, font_size);
        let width = size.total_width + size.space_width * 6.0;
        let height = font_size * 1.6;
        Self {
            text: text.to_string(),
            font_size,
            width,
            height,
            x: -width / 2.0,
            y: -height / 2.0,
            corner_radius: 15.0 * ratio + 2.0,
            stroke_width: 4.0 * ratio + 1.0,
            label_x: -width / 2.0 + size.space_width * 3.0,
            label_y: -height / 2.0 + font_size * 1.1,
        }
    }

    pub fn node_box(&self) -> NodeBox {
        NodeBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

// 1 at the roots, 0 at the deepest level; a graph with only roots is all roots.
fn depth_ratio(depth: u32, max_depth: u32) -> f64 {
    if max_depth == 0 {
        return 1.0;
    }
    f64::from(max_depth.saturating_sub(depth)) / f64::from(max_depth)
}

struct Scene {
    layout: LayoutOrchestrator,
    links: Option<LinkAnimationScheduler>,
    appearances: IndexMap<String, NodeAppearance>,
    inbox: Rc<RefCell<Vec<GraphChange>>>,
    graph_listener: ListenerId,
    ready_listener: ListenerId,
    ready: Rc<Cell<bool>>,
}

pub struct RenderSession<V> {
    config: LayoutConfig,
    visuals: V,
    measure: Box<dyn TextMeasure>,
    progress: Rc<RefCell<dyn ProgressReporter>>,
    clock: Rc<dyn Clock>,
    graph: Option<Graph>,
    scene: Option<Scene>,
}

impl<V> fmt::Debug for RenderSession<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSession")
            .field("phase", &self.scene.as_ref().map(|s| s.layout.phase()))
            .field("nodes", &self.graph.as_ref().map(Graph::node_count))
            .field("links", &self.graph.as_ref().map(Graph::link_count))
            .finish()
    }
}

impl<V: LinkVisuals> RenderSession<V> {
    pub fn new(config: LayoutConfig, visuals: V) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            visuals,
            measure: Box::new(ApproximateTextMeasure::default()),
            progress: Rc::new(RefCell::new(NoopProgress)),
            clock: Rc::new(MonotonicClock::new()),
            graph: None,
            scene: None,
        })
    }

    pub fn with_text_measure(mut self, measure: impl TextMeasure + 'static) -> Self {
        self.measure = Box::new(measure);
        self
    }

    pub fn with_progress(mut self, progress: Rc<RefCell<dyn ProgressReporter>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts a new session for `graph`, tearing down the previous one.
    pub fn render(&mut self, mut graph: Graph) -> Result<()> {
        self.clear_scene();

        let mut layout = LayoutOrchestrator::new(&graph, self.config.clone())?
            .with_progress(Box::new(Rc::clone(&self.progress)))
            .with_clock(Box::new(Rc::clone(&self.clock)));

        let ready = Rc::new(Cell::new(false));
        let ready_listener = {
            let ready = Rc::clone(&ready);
            layout.on_ready(move |_| ready.set(true))
        };

        let inbox: Rc<RefCell<Vec<GraphChange>>> = Rc::default();
        let graph_listener = {
            let inbox = Rc::clone(&inbox);
            graph.on_changed(move |changes| inbox.borrow_mut().extend_from_slice(changes))
        };

        let mut scene = Scene {
            layout,
            links: None,
            appearances: IndexMap::new(),
            inbox,
            graph_listener,
            ready_listener,
            ready,
        };
        for node in graph.nodes() {
            add_node_visual(&mut scene, node, graph.max_depth(), self.measure.as_ref())?;
        }
        debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            "render session started"
        );

        self.graph = Some(graph);
        self.scene = Some(scene);
        Ok(())
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    /// Mutable access for streaming in more nodes and links.
    pub fn graph_mut(&mut self) -> Option<&mut Graph> {
        self.graph.as_mut()
    }

    pub fn layout(&self) -> Option<&LayoutOrchestrator> {
        self.scene.as_ref().map(|s| &s.layout)
    }

    pub fn phase(&self) -> Option<LayoutPhase> {
        self.scene.as_ref().map(|s| s.layout.phase())
    }

    pub fn visuals(&self) -> &V {
        &self.visuals
    }

    /// Tells the layout the whole graph has been delivered.
    pub fn set_graph_ready(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        scene.layout.set_graph_ready();
        self.progress.borrow_mut().start_layout();
    }

    /// Advances layout and link drawing by one frame. Returns whether more frames are needed.
    pub fn frame(&mut self) -> Result<bool> {
        let (Some(scene), Some(graph)) = (self.scene.as_mut(), self.graph.as_ref()) else {
            return Ok(false);
        };

        let changes = std::mem::take(&mut *scene.inbox.borrow_mut());
        if !changes.is_empty() {
            scene.layout.apply_changes(&changes);
            for change in &changes {
                if let (ChangeKind::Add, Some(node)) = (change.kind, &change.node) {
                    add_node_visual(scene, node, graph.max_depth(), self.measure.as_ref())?;
                }
            }
        }

        let mut more = scene.layout.step();

        if scene.ready.get() && scene.links.is_none() {
            self.progress.borrow_mut().done();
            scene.links = Some(LinkAnimationScheduler::new(graph, &self.config.links));
        }
        if let Some(links) = scene.links.as_mut() {
            more |= links.tick(&scene.layout, &mut self.visuals);
        }
        Ok(more)
    }

    pub fn node_position(&self, id: &str) -> Option<Point> {
        self.scene.as_ref()?.layout.node_position(id)
    }

    pub fn node_appearance(&self, id: &str) -> Option<&NodeAppearance> {
        self.scene.as_ref()?.appearances.get(id)
    }

    pub fn link_info(&self, link_id: &str) -> Option<&LinkInfo> {
        self.scene.as_ref()?.links.as_ref()?.link_info(link_id)
    }

    /// Tears down the current session. The graph is kept; call [`RenderSession::render`] to
    /// start over.
    pub fn dispose(&mut self) {
        self.clear_scene();
    }

    fn clear_scene(&mut self) {
        let Some(mut scene) = self.scene.take() else {
            return;
        };
        if let Some(graph) = self.graph.as_mut() {
            graph.off_changed(scene.graph_listener);
        }
        scene.layout.off_ready(scene.ready_listener);
        scene.layout.dispose();
        if let Some(links) = scene.links.as_mut() {
            links.dispose();
        }
        debug!("render session disposed");
    }
}

fn add_node_visual(
    scene: &mut Scene,
    node: &Node,
    max_depth: u32,
    measure: &dyn TextMeasure,
) -> Result<()> {
    if scene.appearances.contains_key(&node.id) {
        return Ok(());
    }
    if node.depth == 0 {
        scene.layout.pin_node(node)?;
    }
    let appearance = NodeAppearance::for_node(node, max_depth, measure);
    scene.layout.add_node(&node.id, appearance.node_box());
    scene.appearances.insert(node.id.clone(), appearance);
    Ok(())
}
