#![forbid(unsafe_code)]

//! Progressive graph layout.
//!
//! A force-directed layout converges slowly and looks chaotic while it does. `starling` hides
//! that: a flocking preview is shown from the first frame while the real simulation runs in the
//! background under a budget, then overlaps are removed and the preview glides into the final
//! positions. Once the layout is final, links are drawn progressively, shallowest first.
//!
//! The crate is headless. Hosts drive it one frame at a time and plug in their own drawing
//! ([`LinkVisuals`]), text measurement ([`TextMeasure`]), progress display
//! ([`ProgressReporter`]) and clock ([`Clock`]).

pub mod clock;
pub mod config;
mod error;
pub mod geom;
pub mod layout;
pub mod links;
pub mod orchestrator;
pub mod progress;
pub mod rng;
pub mod session;

pub use starling_graph as graph;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    BoidConfig, BudgetConfig, InterpolationConfig, LayoutConfig, LinkAnimationConfig,
    OverlapConfig, PhysicsConfig,
};
pub use error::{Error, Result};
pub use geom::{NodeBox, Point, Rect, Vector};
pub use layout::{
    BoidLayout, InterpolationLayout, PhysicsLayout, PositionSource, node_mass, remove_overlaps,
};
pub use links::{LinkAnimationScheduler, LinkInfo, LinkStyle, LinkVisuals};
pub use orchestrator::{LayoutOrchestrator, LayoutPhase, ReadyEvent};
pub use progress::{NoopProgress, ProgressReporter};
pub use session::{ApproximateTextMeasure, NodeAppearance, RenderSession, TextMeasure, TextSize};
