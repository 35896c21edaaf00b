#![forbid(unsafe_code)]

//! Headless sunburst layout and rendering primitives.
//!
//! - [`layout`]: layer trees to polar [`LayoutArc`]s on a shared radial scale
//! - [`geometry`]: polar math and renderer-agnostic arc paths
//! - [`transition`]: easing, frame-driven animations with cancellation
//! - [`reconcile`]: keyed diffing of arcs against a retained [`SceneSink`]

pub mod geometry;
pub mod layout;
pub mod model;
pub mod reconcile;
pub mod transition;

pub use geometry::{ArcGeometry, ArcPath, PathCommand, Point, describe_arc};
pub use layout::{RadialScale, layout, layout_with};
pub use model::{ArcNode, LayoutArc};
pub use reconcile::{
    Attributes, ManagedElement, Reconciler, RenderOptions, RenderStats, SceneSink, element_key,
};
pub use transition::{
    Animation, AnimationStatus, Easing, RunningAnimation, Transition, TransitionInput,
    TransitionOptions, interpolate_arc, resolve_transition, run_animation,
};
