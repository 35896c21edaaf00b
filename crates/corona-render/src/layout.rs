//! Sunburst layout: normalized layer trees to polar arcs.
//!
//! Layers are laid out in declaration order against one shared radial scale. `free` layers split
//! their angle by value; `align` layers take their root spans from keyed root arcs of an earlier
//! layer. Multi-parent groups are placed last, outside the union of their parents.

use crate::geometry::MIN_ARC_SPAN;
use crate::model::{ArcNode, LayoutArc};
use corona_core::{
    AngleMode, Error, LayerConfig, MultiParentGroup, NormalizeContext, NormalizedNode, Result,
    SunburstConfig, normalize_with,
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::ops::Range;

/// Maps layout units onto pixels. One scale is shared by every layer of a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialScale {
    pub radius: f64,
    pub max_units: f64,
}

impl RadialScale {
    pub fn unit_to_radius(&self, units: f64) -> f64 {
        units / self.max_units * self.radius
    }

    pub fn radius_to_unit(&self, radius: f64) -> f64 {
        radius / self.radius * self.max_units
    }
}

/// Lays out every layer of `config`.
///
/// Recoverable data problems (unknown multi-parent keys, unmatched alignment keys) are logged
/// through `tracing` and skipped; configuration problems are returned as errors.
pub fn layout(config: &SunburstConfig) -> Result<Vec<LayoutArc>> {
    layout_with(config, &mut NormalizeContext::new())
}

pub fn layout_with(config: &SunburstConfig, ctx: &mut NormalizeContext) -> Result<Vec<LayoutArc>> {
    let radius = config.size.radius;
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::InvalidRadius { radius });
    }
    if config.layers.is_empty() {
        return Ok(Vec::new());
    }

    let max_units = config
        .layers
        .iter()
        .map(LayerConfig::end_units)
        .filter(|u| u.is_finite())
        .fold(0.0_f64, f64::max);
    if max_units <= 0.0 {
        return Err(Error::EmptyRadialRange);
    }

    let scale = RadialScale { radius, max_units };
    let total_angle = config.size.total_angle();
    let mut arcs: Vec<LayoutArc> = Vec::new();
    let mut layer_ranges: FxHashMap<&str, Range<usize>> = FxHashMap::default();

    for layer in &config.layers {
        let normalized = normalize_with(&layer.tree, ctx);
        let start = arcs.len();
        let mut placer = LayerPlacer {
            layer,
            scale,
            arcs: &mut arcs,
        };

        match layer.angle_mode {
            AngleMode::Free => {
                let base = placer.base_offset();
                placer.distribute(&normalized.nodes, Window::root(base, total_angle));
            }
            AngleMode::Align => {
                let source = align_source(layer, &layer_ranges)?;
                placer.align(&normalized.nodes, source, total_angle)?;
            }
        }

        placer.place_multi_parent_groups(&normalized.multi_parent_groups, start);

        layer_ranges.insert(layer.id.as_str(), start..arcs.len());
    }

    Ok(arcs)
}

fn align_source<'c>(
    layer: &'c LayerConfig,
    layer_ranges: &FxHashMap<&str, Range<usize>>,
) -> Result<(&'c str, Range<usize>)> {
    let Some(align_with) = layer.align_with.as_deref() else {
        return Err(Error::MissingAlignWith {
            layer: layer.id.clone(),
        });
    };
    let Some(range) = layer_ranges.get(align_with) else {
        return Err(Error::UnknownAlignLayer {
            layer: layer.id.clone(),
            align_with: align_with.to_string(),
        });
    };
    Ok((align_with, range.clone()))
}

/// Angular window and radial offset handed to one sibling group.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: f64,
    span: f64,
    depth_units: f64,
    depth: usize,
}

impl Window {
    fn root(start: f64, span: f64) -> Self {
        Self {
            start,
            span,
            depth_units: 0.0,
            depth: 0,
        }
    }
}

/// In-progress sibling group on the distribution worklist.
struct SiblingRun<'n, 'a> {
    visible: Vec<&'n NormalizedNode<'a>>,
    next: usize,
    cursor: f64,
    available: f64,
    total_value: f64,
    gap_scale: f64,
    window: Window,
}

struct LayerPlacer<'c, 'o> {
    layer: &'c LayerConfig,
    scale: RadialScale,
    arcs: &'o mut Vec<LayoutArc>,
}

impl LayerPlacer<'_, '_> {
    fn base_offset(&self) -> f64 {
        self.layer.base_offset.filter(|o| o.is_finite()).unwrap_or(0.0)
    }

    fn layer_pad(&self) -> f64 {
        self.layer
            .pad_angle
            .filter(|p| p.is_finite() && *p >= 0.0)
            .unwrap_or(0.0)
    }

    fn gap_after(&self, node: &NormalizedNode<'_>) -> f64 {
        node.pad_angle().unwrap_or_else(|| self.layer_pad())
    }

    fn open_run<'n, 'a>(
        &self,
        siblings: &'n [NormalizedNode<'a>],
        window: Window,
    ) -> SiblingRun<'n, 'a> {
        let mut visible: Vec<&NormalizedNode<'a>> = siblings
            .iter()
            .filter(|n| n.value > 0.0 || n.has_children())
            .collect();
        if visible.is_empty() {
            visible = siblings.iter().collect();
        }

        let span = window.span.max(0.0);
        let total_gap: f64 = match visible.split_last() {
            Some((_, head)) => head.iter().map(|n| self.gap_after(n)).sum(),
            None => 0.0,
        };
        let gap_scale = if total_gap > span && total_gap > 0.0 {
            span / total_gap
        } else {
            1.0
        };
        let total_value: f64 = visible.iter().map(|n| n.value).sum();

        SiblingRun {
            visible,
            next: 0,
            cursor: window.start,
            available: (span - total_gap * gap_scale).max(0.0),
            total_value,
            gap_scale,
            window,
        }
    }

    /// Free distribution over `window`, pre-order, without call-stack recursion.
    fn distribute(&mut self, siblings: &[NormalizedNode<'_>], window: Window) {
        let mut stack = vec![self.open_run(siblings, window)];

        while let Some(run) = stack.last_mut() {
            let Some(node) = run.visible.get(run.next).copied() else {
                stack.pop();
                continue;
            };
            let index = run.next;
            run.next += 1;

            let share = if run.total_value > 0.0 {
                node.value / run.total_value
            } else {
                1.0 / run.visible.len() as f64
            };
            let span = run.available * share;
            let x0 = run.cursor;
            run.cursor += span;
            if index + 1 < run.visible.len() {
                run.cursor += self.gap_after(node) * run.gap_scale;
            }
            let window = run.window;

            if span < MIN_ARC_SPAN {
                continue;
            }

            self.emit(node, x0, x0 + span, window.depth_units, window.depth, share);
            if node.has_children() {
                let child_window = Window {
                    start: x0,
                    span,
                    depth_units: window.depth_units + node.expand_levels,
                    depth: window.depth + 1,
                };
                let child_run = self.open_run(&node.children, child_window);
                stack.push(child_run);
            }
        }
    }

    fn align(
        &mut self,
        roots: &[NormalizedNode<'_>],
        (align_with, source): (&str, Range<usize>),
        total_angle: f64,
    ) -> Result<()> {
        if roots.is_empty() {
            return Ok(());
        }
        let mut slots: IndexMap<String, (f64, f64)> = IndexMap::new();
        for arc in &self.arcs[source] {
            if arc.depth != 0 {
                continue;
            }
            if let Some(key) = arc.key.as_ref() {
                slots.entry(key.clone()).or_insert((arc.x0, arc.x1));
            }
        }
        if slots.is_empty() {
            return Err(Error::NoAlignableArcs {
                layer: self.layer.id.clone(),
                align_with: align_with.to_string(),
            });
        }
        if let Some(unkeyed) = roots.iter().find(|n| n.key().is_none()) {
            return Err(Error::MissingAlignKey {
                layer: self.layer.id.clone(),
                align_with: align_with.to_string(),
                node: unkeyed.name().to_string(),
            });
        }

        let start = self.arcs.len();
        let half_pad = self.layer_pad() / 2.0;
        for root in roots {
            let Some(key) = root.key() else {
                continue;
            };
            let Some((x0, x1)) = slots.swap_remove(key) else {
                tracing::warn!(
                    layer = %self.layer.id,
                    align_with,
                    key,
                    "no unclaimed root arc with this key; skipping aligned node"
                );
                continue;
            };

            let (mut a0, mut a1) = (x0 + half_pad, x1 - half_pad);
            if a1 < a0 {
                let mid = (x0 + x1) / 2.0;
                a0 = mid;
                a1 = mid;
            }
            if a1 - a0 < MIN_ARC_SPAN {
                continue;
            }

            self.emit(root, a0, a1, 0.0, 0, 1.0);
            if root.has_children() {
                self.distribute(
                    &root.children,
                    Window {
                        start: a0,
                        span: a1 - a0,
                        depth_units: root.expand_levels,
                        depth: 1,
                    },
                );
            }
        }

        if self.arcs.len() == start {
            tracing::warn!(
                layer = %self.layer.id,
                align_with,
                "aligned layer produced no arcs; falling back to free layout"
            );
            let base = self.base_offset();
            self.distribute(roots, Window::root(base, total_angle));
        }
        Ok(())
    }

    fn place_multi_parent_groups(&mut self, groups: &[MultiParentGroup<'_>], layer_start: usize) {
        if groups.is_empty() {
            return;
        }
        let mut by_key: FxHashMap<String, usize> = FxHashMap::default();
        let mut indexed = layer_start;
        for group in groups {
            for index in indexed..self.arcs.len() {
                if let Some(key) = self.arcs[index].key.as_ref() {
                    by_key.entry(key.clone()).or_insert(index);
                }
            }
            indexed = self.arcs.len();
            self.place_multi_parent_group(group, &by_key);
        }
    }

    /// Places one group outside the union of its parents; `by_key` maps keys to this layer's arcs.
    fn place_multi_parent_group(
        &mut self,
        group: &MultiParentGroup<'_>,
        by_key: &FxHashMap<String, usize>,
    ) {
        let mut x0 = f64::INFINITY;
        let mut x1 = f64::NEG_INFINITY;
        let mut outer = 0.0_f64;
        let mut depth = 0usize;
        let mut matched = 0usize;
        let mut missing: Vec<&str> = Vec::new();
        let mut conflict: Option<&str> = None;

        for parent_key in &group.parent_keys {
            let Some(parent) = by_key.get(parent_key).map(|&index| &self.arcs[index]) else {
                missing.push(parent_key.as_str());
                continue;
            };
            if parent.has_children && conflict.is_none() {
                conflict = Some(parent_key.as_str());
            }
            matched += 1;
            x0 = x0.min(parent.x0);
            x1 = x1.max(parent.x1);
            outer = outer.max(parent.y1);
            depth = depth.max(parent.depth);
        }

        if !missing.is_empty() {
            tracing::warn!(
                layer = %self.layer.id,
                group = %group.key,
                missing = ?missing,
                "multi-parent group references unknown parent keys"
            );
        }
        if matched == 0 {
            return;
        }
        if let Some(parent_key) = conflict {
            tracing::error!(
                layer = %self.layer.id,
                group = %group.key,
                parent = parent_key,
                "multi-parent parent already has children; skipping the whole group"
            );
            return;
        }

        let depth_units = self.scale.radius_to_unit(outer) - self.layer.start_units();
        self.distribute(
            &group.children,
            Window {
                start: x0,
                span: x1 - x0,
                depth_units,
                depth: depth + 1,
            },
        );
    }

    fn emit(
        &mut self,
        node: &NormalizedNode<'_>,
        x0: f64,
        x1: f64,
        depth_units: f64,
        depth: usize,
        percentage: f64,
    ) {
        let base = self.layer.start_units() + depth_units;
        self.arcs.push(LayoutArc {
            layer_id: self.layer.id.clone(),
            node: ArcNode::from(node.source),
            x0,
            x1,
            y0: self.scale.unit_to_radius(base),
            y1: self.scale.unit_to_radius(base + node.expand_levels),
            depth,
            key: node.source.key.clone(),
            value: node.value,
            percentage,
            path: node.path.clone(),
            path_indices: node.path_indices.clone(),
            has_children: node.has_children(),
        });
    }
}
