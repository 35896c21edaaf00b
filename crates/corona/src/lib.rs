#![forbid(unsafe_code)]

//! `corona` is a headless engine for interactive, animated multi-layer sunburst charts.
//!
//! - [`Chart`]: layout, keyed reconciliation against a [`SceneSink`] and drill-down navigation
//! - [`Navigator`]: focus state, re-rooted sub-configs and breadcrumb trails
//!
//! The layout and reconciliation layers are re-exported from `corona-render` under
//! [`render`]; the configuration model from `corona-core` is re-exported at the root.

pub mod chart;
pub mod navigation;

pub use corona_core::*;

pub mod render {
    pub use corona_render::geometry;
    pub use corona_render::layout::{RadialScale, layout, layout_with};
    pub use corona_render::model::{ArcNode, LayoutArc};
    pub use corona_render::reconcile::{
        Attributes, ManagedElement, Reconciler, RenderOptions, RenderStats, SceneSink,
        arc_attributes, element_key,
    };
    pub use corona_render::transition::{
        Animation, AnimationStatus, Easing, RunningAnimation, Step, Transition, TransitionInput,
        TransitionOptions, interpolate_arc, resolve_transition, run_animation,
    };
}

pub use chart::{Breadcrumbs, Chart, ChartOptions};
pub use navigation::{
    BaseRef, FocusTarget, NavigationOptions, Navigator, TrailEntry, TransitionOverride,
};

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    Core(#[from] corona_core::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;
