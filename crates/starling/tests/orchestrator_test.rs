use starling::graph::{Graph, Node};
use starling::{
    Error, LayoutConfig, LayoutOrchestrator, LayoutPhase, ManualClock, NodeBox, PositionSource,
    ProgressReporter, Rect, node_mass,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn star_graph(children: usize) -> Graph {
    let mut g = Graph::new();
    g.add_node(Node::new("root", 0));
    for i in 0..children {
        let id = format!("c{i}");
        g.add_node(Node::new(id.clone(), 1));
        g.add_link("root", &id).unwrap();
    }
    g
}

fn config(max_iterations: u32, max_time_ms: Option<f64>) -> LayoutConfig {
    let mut config = LayoutConfig::default();
    config.budget.max_layout_iterations = max_iterations;
    config.budget.max_layout_time_ms = max_time_ms;
    config
}

/// Every clock read advances 1ms, so each tick runs exactly 10 simulation steps.
fn manual_clock() -> Box<ManualClock> {
    Box::new(ManualClock::with_auto_advance(Duration::from_millis(1)))
}

fn orchestrator(graph: &Graph, config: LayoutConfig) -> LayoutOrchestrator {
    let mut layout = LayoutOrchestrator::new(graph, config)
        .unwrap()
        .with_clock(manual_clock());
    for node in graph.nodes() {
        layout.add_node(&node.id, NodeBox::centered(40.0, 20.0));
    }
    layout
}

fn run_to_end(layout: &mut LayoutOrchestrator) -> Vec<LayoutPhase> {
    let mut phases = vec![layout.phase()];
    for _ in 0..10_000 {
        let more = layout.step();
        if phases.last() != Some(&layout.phase()) {
            phases.push(layout.phase());
        }
        if !more {
            return phases;
        }
    }
    panic!("layout never finished, stuck in {:?}", layout.phase());
}

#[derive(Default)]
struct Recorder {
    percents: Vec<u8>,
}

impl ProgressReporter for Recorder {
    fn set_layout_completion(&mut self, percent: u8) {
        self.percents.push(percent);
    }
}

#[test]
fn phases_advance_in_order_exactly_once() {
    let graph = star_graph(4);
    let mut layout = orchestrator(&graph, config(50, None));
    layout.set_graph_ready();

    let phases = run_to_end(&mut layout);
    assert_eq!(
        phases,
        vec![
            LayoutPhase::Fake,
            LayoutPhase::RemoveOverlaps,
            LayoutPhase::Interpolate,
            LayoutPhase::Real
        ]
    );
    assert!(!layout.step());
    assert_eq!(layout.phase(), LayoutPhase::Real);
}

#[test]
fn fake_phase_runs_the_iteration_budget() {
    let graph = star_graph(3);
    let mut layout = orchestrator(&graph, config(50, None));

    // warm-up before the graph is ready does not count
    for _ in 0..3 {
        assert!(layout.step());
    }
    assert_eq!(layout.iterations(), 30);
    layout.set_graph_ready();
    assert_eq!(layout.iterations(), 0);
    assert_eq!(layout.layout_time(), Duration::ZERO);

    let mut ticks = 0;
    while layout.phase() == LayoutPhase::Fake {
        layout.step();
        ticks += 1;
    }
    assert_eq!(ticks, 5);
    assert_eq!(layout.iterations(), 50);
    assert_eq!(layout.layout_time(), Duration::from_millis(50));
}

#[test]
fn default_manual_clock_drives_the_layout_to_the_end() {
    let graph = star_graph(1);
    let mut layout =
        orchestrator(&graph, config(20, None)).with_clock(Box::new(ManualClock::new()));
    layout.set_graph_ready();
    run_to_end(&mut layout);
    assert_eq!(layout.phase(), LayoutPhase::Real);
    assert_eq!(layout.iterations(), 20);
}

#[test]
fn frozen_clock_is_bounded_by_the_iteration_budget() {
    let graph = star_graph(2);
    let frozen = Box::new(ManualClock::with_auto_advance(Duration::ZERO));
    let mut layout = orchestrator(&graph, config(25, None)).with_clock(frozen);

    assert!(layout.step());
    assert_eq!(layout.iterations(), 25);

    layout.set_graph_ready();
    assert!(layout.step());
    assert_eq!(layout.iterations(), 25);
    assert_eq!(layout.layout_time(), Duration::ZERO);
    assert_eq!(layout.phase(), LayoutPhase::RemoveOverlaps);
    run_to_end(&mut layout);
    assert_eq!(layout.phase(), LayoutPhase::Real);
}

#[test]
fn preview_never_ends_without_graph_ready() {
    let graph = star_graph(3);
    let mut layout = orchestrator(&graph, config(10, Some(5.0)));
    for _ in 0..200 {
        assert!(layout.step());
    }
    assert_eq!(layout.phase(), LayoutPhase::Fake);
    assert!(!layout.is_graph_ready());
}

#[test]
fn time_overrun_forces_the_phase_to_advance() {
    let graph = star_graph(3);
    let progress = Rc::new(RefCell::new(Recorder::default()));
    let mut layout = orchestrator(&graph, config(10_000, Some(30.0)))
        .with_progress(Box::new(Rc::clone(&progress)));
    layout.set_graph_ready();

    let mut ticks = 0;
    while layout.phase() == LayoutPhase::Fake {
        layout.step();
        ticks += 1;
    }
    // 30ms is only exceeded on the fourth 10ms slice
    assert_eq!(ticks, 4);
    assert_eq!(layout.iterations(), 10_000);

    let percents = progress.borrow().percents.clone();
    assert_eq!(percents, vec![33, 67, 100, 100]);
}

#[test]
fn added_nodes_have_positions_in_every_phase() {
    let graph = star_graph(6);
    let mut layout = orchestrator(&graph, config(40, None));
    for node in graph.nodes() {
        assert!(layout.node_position(&node.id).is_some());
    }
    layout.set_graph_ready();
    loop {
        let more = layout.step();
        for node in graph.nodes() {
            let p = layout
                .node_position(&node.id)
                .unwrap_or_else(|| panic!("{} missing in {:?}", node.id, layout.phase()));
            assert!(p.x.is_finite() && p.y.is_finite());
        }
        if !more {
            break;
        }
    }
}

#[test]
fn ready_fires_once_on_entering_real() {
    let graph = star_graph(2);
    let mut layout = orchestrator(&graph, config(20, None));
    let fired = Rc::new(Cell::new(0));
    let iterations = Rc::new(Cell::new(0));
    {
        let fired = Rc::clone(&fired);
        let iterations = Rc::clone(&iterations);
        layout.on_ready(move |event| {
            fired.set(fired.get() + 1);
            iterations.set(event.iterations);
        });
    }
    layout.set_graph_ready();
    run_to_end(&mut layout);
    for _ in 0..5 {
        layout.step();
    }
    assert_eq!(fired.get(), 1);
    assert_eq!(iterations.get(), 20);
}

#[test]
fn removed_ready_listener_is_not_called() {
    let graph = star_graph(2);
    let mut layout = orchestrator(&graph, config(20, None));
    let fired = Rc::new(Cell::new(false));
    let id = {
        let fired = Rc::clone(&fired);
        layout.on_ready(move |_| fired.set(true))
    };
    assert!(layout.off_ready(id));
    layout.set_graph_ready();
    run_to_end(&mut layout);
    assert!(!fired.get());
}

#[test]
fn pinned_root_keeps_its_place_and_children_do_not_overlap() {
    let graph = star_graph(5);
    let mut layout = orchestrator(&graph, config(200, None));
    let root = graph.node("root").unwrap().clone();
    layout.pin_node(&root).unwrap();
    let root_before = layout.physics().node_position("root");

    layout.set_graph_ready();
    run_to_end(&mut layout);

    assert_eq!(layout.node_position("root"), root_before);

    let node_box = NodeBox::centered(40.0, 20.0);
    let rects: Vec<Rect> = graph
        .nodes()
        .map(|n| Rect::around(n.id.as_str(), layout.node_position(&n.id).unwrap(), &node_box))
        .collect();
    for (i, a) in rects.iter().enumerate() {
        for b in &rects[i + 1..] {
            assert_ne!(a.anchor(), b.anchor(), "{} and {} coincide", a.id, b.id);
            assert!(!a.overlaps(b), "{} overlaps {}", a.id, b.id);
        }
    }
}

#[test]
fn pinning_an_unknown_node_is_an_error() {
    let graph = star_graph(1);
    let mut layout = orchestrator(&graph, config(10, None));
    let err = layout.pin_node(&Node::new("ghost", 0)).unwrap_err();
    assert!(matches!(err, Error::UnknownNode { ref id } if id == "ghost"));
}

#[test]
fn later_graph_changes_reach_the_simulation() {
    let mut graph = star_graph(1);
    let changes = Rc::new(RefCell::new(Vec::new()));
    {
        let changes = Rc::clone(&changes);
        graph.on_changed(move |batch| changes.borrow_mut().extend_from_slice(batch));
    }
    let mut layout = orchestrator(&graph, config(10, None));

    graph.begin_update();
    graph.add_node(Node::new("late", 1));
    graph.add_link("root", "late").unwrap();
    graph.end_update();
    layout.apply_changes(&changes.borrow());

    assert!(layout.physics().has_node("late"));
    assert_eq!(layout.physics().degree("root"), 2);
    // root mass follows its new link count
    assert_eq!(
        layout.physics().mass("root"),
        Some(node_mass("root", 2, 0, 1))
    );
}

#[test]
fn disposed_orchestrator_stops_ticking() {
    let graph = star_graph(2);
    let mut layout = orchestrator(&graph, config(10, None));
    layout.set_graph_ready();
    layout.step();
    layout.dispose();
    let phase = layout.phase();
    assert!(!layout.step());
    assert_eq!(layout.phase(), phase);
    assert!(layout.is_disposed());
}

#[test]
fn invalid_budget_is_rejected() {
    let graph = star_graph(1);
    let err = LayoutOrchestrator::new(&graph, config(0, None)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}
