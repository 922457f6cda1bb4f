use starling::graph::{Graph, Link, Node};
use starling::{
    Clock, LayoutConfig, LayoutPhase, LinkStyle, LinkVisuals, ManualClock, ProgressReporter,
    RenderSession,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct CountingVisuals {
    created: Vec<String>,
    updates: usize,
}

impl LinkVisuals for CountingVisuals {
    fn create(&mut self, link: &Link, _style: &LinkStyle, _path: &str) {
        self.created.push(link.id.clone());
    }

    fn update(&mut self, _link_id: &str, _path: &str) {
        self.updates += 1;
    }
}

#[derive(Default)]
struct Progress {
    percents: Vec<u8>,
    started: usize,
    done: usize,
}

impl ProgressReporter for Progress {
    fn set_layout_completion(&mut self, percent: u8) {
        self.percents.push(percent);
    }

    fn start_layout(&mut self) {
        self.started += 1;
    }

    fn done(&mut self) {
        self.done += 1;
    }
}

fn star_graph(children: usize) -> Graph {
    let mut g = Graph::new();
    g.add_node(Node::new("root", 0).with_label("Root"));
    for i in 0..children {
        let id = format!("child{i}");
        g.add_node(Node::new(id.clone(), 1));
        g.add_link("root", &id).unwrap();
    }
    g
}

fn new_session(progress: Rc<RefCell<Progress>>) -> RenderSession<CountingVisuals> {
    let mut config = LayoutConfig::default();
    config.budget.max_layout_iterations = 100;
    config.budget.max_layout_time_ms = None;
    config.interpolation.frames = 10;
    let clock: Rc<dyn Clock> = Rc::new(ManualClock::with_auto_advance(Duration::from_millis(1)));
    RenderSession::new(config, CountingVisuals::default())
        .unwrap()
        .with_progress(progress)
        .with_clock(clock)
}

fn run_frames(session: &mut RenderSession<CountingVisuals>) -> usize {
    let mut frames = 0;
    while session.frame().unwrap() {
        frames += 1;
        assert!(frames < 10_000, "session never settled");
    }
    frames
}

#[test]
fn full_session_lays_out_and_draws_every_link() {
    let progress = Rc::new(RefCell::new(Progress::default()));
    let mut session = new_session(progress.clone());
    session.render(star_graph(5)).unwrap();
    assert_eq!(session.phase(), Some(LayoutPhase::Fake));
    assert!(session.node_position("root").is_some());

    session.set_graph_ready();
    run_frames(&mut session);

    assert_eq!(session.phase(), Some(LayoutPhase::Real));
    assert_eq!(session.visuals().created.len(), 5);
    for i in 0..5 {
        let id = format!("root->child{i}");
        let info = session.link_info(&id).unwrap();
        assert_eq!(info.link.from_id, "root");
    }

    let progress = progress.borrow();
    assert_eq!(progress.started, 1);
    assert_eq!(progress.done, 1);
    assert_eq!(progress.percents.last(), Some(&100));
}

#[test]
fn depth_zero_nodes_are_pinned_and_styled_as_roots() {
    let progress = Rc::new(RefCell::new(Progress::default()));
    let mut session = new_session(progress);
    session.render(star_graph(3)).unwrap();

    let layout = session.layout().unwrap();
    assert!(layout.physics().is_pinned("root"));
    assert!(!layout.physics().is_pinned("child0"));

    let root = session.node_appearance("root").unwrap();
    let child = session.node_appearance("child0").unwrap();
    assert_eq!(root.text, "Root");
    assert!(root.font_size > child.font_size);
    assert!(root.height > child.height);
}

#[test]
fn nodes_streamed_in_after_render_get_positions() {
    let progress = Rc::new(RefCell::new(Progress::default()));
    let mut session = new_session(progress);
    session.render(star_graph(1)).unwrap();
    session.frame().unwrap();
    assert!(session.node_position("late").is_none());

    {
        let graph = session.graph_mut().unwrap();
        graph.begin_update();
        graph.add_node(Node::new("late", 1));
        graph.add_link("root", "late").unwrap();
        graph.end_update();
    }
    session.frame().unwrap();

    assert!(session.node_position("late").is_some());
    assert!(session.node_appearance("late").is_some());
    let layout = session.layout().unwrap();
    assert_eq!(layout.physics().degree("root"), 2);

    session.set_graph_ready();
    run_frames(&mut session);
    assert!(session.link_info("root->late").is_some());
}

#[test]
fn rendering_again_starts_a_fresh_session() {
    let progress = Rc::new(RefCell::new(Progress::default()));
    let mut session = new_session(progress);
    session.render(star_graph(2)).unwrap();
    session.set_graph_ready();
    run_frames(&mut session);
    assert!(session.link_info("root->child0").is_some());

    session.render(star_graph(4)).unwrap();
    assert_eq!(session.phase(), Some(LayoutPhase::Fake));
    assert!(session.link_info("root->child0").is_none());
    assert!(!session.layout().unwrap().is_graph_ready());
    assert_eq!(session.graph().unwrap().node_count(), 5);
}

#[test]
fn disposed_session_stops() {
    let progress = Rc::new(RefCell::new(Progress::default()));
    let mut session = new_session(progress);
    session.render(star_graph(2)).unwrap();
    session.frame().unwrap();
    session.dispose();

    assert!(!session.frame().unwrap());
    assert_eq!(session.phase(), None);
    assert!(session.node_position("root").is_none());
    // the graph outlives the session and no longer reports to it
    let graph = session.graph_mut().unwrap();
    graph.add_node(Node::new("after", 1));
    assert!(!session.frame().unwrap());
}
