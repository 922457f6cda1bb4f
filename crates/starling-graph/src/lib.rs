#![forbid(unsafe_code)]

//! Depth-annotated graph container consumed by `starling`.
//!
//! Nodes carry a depth (distance from the designated roots), which layouts use both as a mass
//! heuristic and as a link drawing priority. Nodes and links can be added after construction but
//! are never removed; every addition is reported to change listeners.

mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{ListenerId, Listeners};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub depth: u32,
    pub label: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, depth: u32) -> Self {
        Self {
            id: id.into(),
            depth,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Text shown for the node: its label, or its id when unlabeled.
    pub fn text(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
}

impl Link {
    /// Id of the link `from_id -> to_id`.
    ///
    /// Plain ids give `from->to`. A `>` or `\` inside either endpoint id is backslash-escaped, so
    /// the only unescaped `>` is the separator and distinct pairs never share an id.
    pub fn id_for(from_id: &str, to_id: &str) -> String {
        let mut id = String::with_capacity(from_id.len() + to_id.len() + 2);
        push_escaped(&mut id, from_id);
        id.push_str("->");
        push_escaped(&mut id, to_id);
        id
    }
}

fn push_escaped(out: &mut String, part: &str) {
    for c in part.chars() {
        if matches!(c, '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphChange {
    pub kind: ChangeKind,
    pub node: Option<Node>,
    pub link: Option<Link>,
}

impl GraphChange {
    fn node(kind: ChangeKind, node: &Node) -> Self {
        Self {
            kind,
            node: Some(node.clone()),
            link: None,
        }
    }

    fn link(kind: ChangeKind, link: &Link) -> Self {
        Self {
            kind,
            node: None,
            link: Some(link.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    links: IndexMap<String, Link>,
    // node id -> indices into `links`, in insertion order
    incident: FxHashMap<String, Vec<usize>>,
    max_depth: u32,

    update_depth: usize,
    pending: Vec<GraphChange>,
    listeners: Listeners<[GraphChange]>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node`, or replaces the depth/label of an existing node with the same id.
    pub fn add_node(&mut self, node: Node) -> &Node {
        let kind = if self.nodes.contains_key(&node.id) {
            ChangeKind::Update
        } else {
            ChangeKind::Add
        };
        self.max_depth = self.max_depth.max(node.depth);
        let (idx, _) = self.nodes.insert_full(node.id.clone(), node);
        let change = GraphChange::node(kind, &self.nodes[idx]);
        self.record(change);
        &self.nodes[idx]
    }

    /// Adds a link between two existing nodes. Adding the same pair twice returns the first link.
    pub fn add_link(&mut self, from_id: &str, to_id: &str) -> Result<&Link> {
        let link_id = Link::id_for(from_id, to_id);
        if !self.nodes.contains_key(from_id) || !self.nodes.contains_key(to_id) {
            return Err(Error::MissingEndpoint { link_id });
        }
        if let Some(idx) = self.links.get_index_of(&link_id) {
            return Ok(&self.links[idx]);
        }

        let link = Link {
            id: link_id.clone(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
        };
        let (idx, _) = self.links.insert_full(link_id, link);
        self.incident
            .entry(from_id.to_string())
            .or_default()
            .push(idx);
        if from_id != to_id {
            self.incident.entry(to_id.to_string()).or_default().push(idx);
        }
        let change = GraphChange::link(ChangeKind::Add, &self.links[idx]);
        self.record(change);
        Ok(&self.links[idx])
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    /// Links incident to `node_id`, in insertion order.
    pub fn links_of<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a Link> + 'a {
        self.incident
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&idx| &self.links[idx])
    }

    /// Number of links incident to `node_id`.
    pub fn degree(&self, node_id: &str) -> usize {
        self.incident.get(node_id).map_or(0, Vec::len)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn for_each_node(&self, mut f: impl FnMut(&Node)) {
        self.nodes.values().for_each(|n| f(n));
    }

    pub fn for_each_link(&self, mut f: impl FnMut(&Link)) {
        self.links.values().for_each(|l| f(l));
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Defers change notifications until the matching [`Graph::end_update`].
    pub fn begin_update(&mut self) {
        self.update_depth += 1;
    }

    pub fn end_update(&mut self) {
        self.update_depth = self.update_depth.saturating_sub(1);
        if self.update_depth == 0 {
            self.flush();
        }
    }

    pub fn on_changed<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&[GraphChange]) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn off_changed(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn record(&mut self, change: GraphChange) {
        self.pending.push(change);
        if self.update_depth == 0 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let changes = std::mem::take(&mut self.pending);
        self.listeners.emit(changes.as_slice());
    }
}
