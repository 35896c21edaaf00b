//! Resolves caller trees into layout-ready nodes.
//!
//! - hidden nodes are dropped,
//! - values and radial thickness are resolved bottom-up,
//! - collapsed nodes keep their subtree's radial space but lose their children,
//! - nodes with two or more distinct parents are pulled out into [`MultiParentGroup`]s.
//!
//! The walk is an explicit post-order worklist, so deep trees do not grow the call stack.

use crate::model::{Tree, TreeNode};
use indexmap::IndexMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct NormalizedNode<'a> {
    pub source: &'a TreeNode,
    /// Resolved value, always `>= 0`.
    pub value: f64,
    /// Radial thickness in layout units (inflated for collapsed nodes).
    pub expand_levels: f64,
    pub children: Vec<NormalizedNode<'a>>,
    /// Names from the root down to this node.
    pub path: Vec<String>,
    /// Indices into the caller's arrays, root index first.
    pub path_indices: Vec<usize>,
    pub collapsed: bool,
    /// Radial units needed by this node and its deepest descendant.
    pub subtree_thickness: f64,
}

impl NormalizedNode<'_> {
    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn key(&self) -> Option<&str> {
        self.source.key.as_deref()
    }

    pub fn pad_angle(&self) -> Option<f64> {
        self.source.pad_angle.filter(|p| p.is_finite() && *p >= 0.0)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Nodes sharing the same set of parent keys.
#[derive(Debug, Clone)]
pub struct MultiParentGroup<'a> {
    /// Sorted parent keys joined with `,`.
    pub key: String,
    pub parent_keys: Vec<String>,
    pub children: Vec<NormalizedNode<'a>>,
}

#[derive(Debug, Clone)]
pub struct Normalized<'a> {
    pub nodes: Vec<NormalizedNode<'a>>,
    pub multi_parent_groups: Vec<MultiParentGroup<'a>>,
}

/// State carried across normalization calls.
///
/// The multi-parent warning fires once per context; keep one context alive (as `Chart` does)
/// to warn once per chart instead of once per layout pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    warned_multi_parent: bool,
}

impl NormalizeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warned_multi_parent(&self) -> bool {
        self.warned_multi_parent
    }

    fn note_multi_parent(&mut self, node: &TreeNode, group_key: &str) {
        if self.warned_multi_parent {
            return;
        }
        self.warned_multi_parent = true;
        tracing::warn!(
            node = %node.name,
            parents = %group_key,
            "multi-parent nodes are experimental; their interaction with aligned layers and offsets is undefined"
        );
    }
}

pub fn normalize(tree: &Tree) -> Normalized<'_> {
    normalize_with(tree, &mut NormalizeContext::new())
}

enum Placement {
    Tree,
    Group { key: String, parent_keys: Vec<String> },
}

struct Frame<'a> {
    source: &'a TreeNode,
    path: Vec<String>,
    path_indices: Vec<usize>,
    placement: Placement,
    next_child: usize,
    children: Vec<NormalizedNode<'a>>,
}

pub fn normalize_with<'a>(tree: &'a Tree, ctx: &mut NormalizeContext) -> Normalized<'a> {
    let mut nodes: Vec<NormalizedNode<'a>> = Vec::new();
    let mut groups: IndexMap<String, MultiParentGroup<'a>> = IndexMap::new();
    let mut stack: Vec<Frame<'a>> = Vec::new();

    for (index, root) in tree.roots().iter().enumerate() {
        if let Some(frame) = open_frame(ctx, root, &[], &[], index) {
            stack.push(frame);
        }

        while let Some(top) = stack.last_mut() {
            let source: &'a TreeNode = top.source;
            if let Some(child) = source.children.get(top.next_child) {
                let child_index = top.next_child;
                top.next_child += 1;
                let opened = open_frame(ctx, child, &top.path, &top.path_indices, child_index);
                if let Some(frame) = opened {
                    stack.push(frame);
                }
                continue;
            }

            let Some(frame) = stack.pop() else {
                break;
            };
            let node = finish_node(frame.source, frame.children, frame.path, frame.path_indices);
            match frame.placement {
                Placement::Group { key, parent_keys } => {
                    groups
                        .entry(key.clone())
                        .or_insert_with(|| MultiParentGroup {
                            key,
                            parent_keys,
                            children: Vec::new(),
                        })
                        .children
                        .push(node);
                }
                Placement::Tree => match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => nodes.push(node),
                },
            }
        }
    }

    Normalized {
        nodes,
        multi_parent_groups: groups.into_values().collect(),
    }
}

fn open_frame<'a>(
    ctx: &mut NormalizeContext,
    source: &'a TreeNode,
    parent_path: &[String],
    parent_indices: &[usize],
    index: usize,
) -> Option<Frame<'a>> {
    if source.hidden {
        return None;
    }

    let distinct: BTreeSet<&str> = source.parents.iter().map(String::as_str).collect();
    let placement = if distinct.len() >= 2 {
        let parent_keys: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        let key = parent_keys.join(",");
        ctx.note_multi_parent(source, &key);
        Placement::Group { key, parent_keys }
    } else {
        Placement::Tree
    };

    let mut path = parent_path.to_vec();
    path.push(source.name.clone());
    let mut path_indices = parent_indices.to_vec();
    path_indices.push(index);

    Some(Frame {
        source,
        path,
        path_indices,
        placement,
        next_child: 0,
        children: Vec::new(),
    })
}

fn finish_node<'a>(
    source: &'a TreeNode,
    children: Vec<NormalizedNode<'a>>,
    path: Vec<String>,
    path_indices: Vec<usize>,
) -> NormalizedNode<'a> {
    let children_value: f64 = children.iter().map(|c| c.value).filter(|v| *v >= 0.0).sum();
    let value = match source.value {
        Some(v) if v.is_finite() => v,
        _ => children_value,
    }
    .max(0.0);

    let mut expand_levels = match source.expand_levels {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 1.0,
    };
    let deepest_child = children
        .iter()
        .map(|c| c.subtree_thickness)
        .fold(0.0_f64, f64::max);

    let (children, subtree_thickness) = if source.collapsed {
        expand_levels += deepest_child;
        (Vec::new(), expand_levels)
    } else {
        (children, expand_levels + deepest_child)
    };

    NormalizedNode {
        source,
        value,
        expand_levels,
        children,
        path,
        path_indices,
        collapsed: source.collapsed,
        subtree_thickness,
    }
}
