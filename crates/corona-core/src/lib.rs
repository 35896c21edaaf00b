#![forbid(unsafe_code)]

//! Sunburst configuration model and tree normalizer (headless).
//!
//! - [`SunburstConfig`] / [`LayerConfig`] / [`TreeNode`]: the caller-facing chart description,
//!   deserializable from JSON
//! - [`normalize`]: resolves values, thickness, hidden/collapsed nodes and multi-parent groups
//! - [`ChartConfig`]: a JSON option bag with deep-merge semantics

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;

pub use config::ChartConfig;
pub use error::{Error, Result};
pub use model::{
    AngleMode, ChartSize, FULL_ANGLE, LayerConfig, NodeId, SunburstConfig, Tree, TreeNode,
};
pub use normalize::{
    MultiParentGroup, NormalizeContext, Normalized, NormalizedNode, normalize, normalize_with,
};
