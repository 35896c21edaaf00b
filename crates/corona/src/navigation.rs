//! Drill-down navigation: focus state, derived sub-configs and breadcrumb trails.
//!
//! The navigator owns a private copy of the caller's base config. Every node of the config it
//! hands out for layout is a clone tagged with a fresh [`NodeId`]; the id maps back to the node's
//! path in the base config, so clicks inside a re-rooted view resolve to absolute base paths.

use corona_core::{AngleMode, NodeId, SunburstConfig, Tree, TreeNode};
use corona_render::{ArcNode, LayoutArc, Transition, TransitionInput, resolve_transition};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROOT_LABEL: &str = "All";

/// Trail entry id of the root (unfocused) view.
pub const ROOT_TRAIL_ID: &str = "root";

fn default_root_label() -> String {
    DEFAULT_ROOT_LABEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOptions {
    /// Layers whose arcs respond to clicks; `None` allows every layer.
    #[serde(default)]
    pub layers: Option<Vec<String>>,
    #[serde(default = "default_root_label")]
    pub root_label: String,
    /// Transition for focus changes; `None` uses the chart's transition.
    #[serde(default)]
    pub focus_transition: Option<TransitionInput>,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            layers: None,
            root_label: default_root_label(),
            focus_transition: None,
        }
    }
}

impl NavigationOptions {
    pub fn allows_layer(&self, layer_id: &str) -> bool {
        match &self.layers {
            Some(layers) => layers.iter().any(|l| l == layer_id),
            None => true,
        }
    }
}

/// A node position in the base config.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseRef {
    pub layer_id: String,
    pub path_indices: Vec<usize>,
}

/// The drilled-down node.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusTarget {
    pub layer_id: String,
    /// Path in the base config, root index first.
    pub path_indices: Vec<usize>,
    pub node: ArcNode,
    /// Root first, ending with `node`.
    pub path_nodes: Vec<ArcNode>,
    pub key: Option<String>,
    /// `layer:i.j.k`; stable while the base path resolves.
    pub identifier: String,
}

impl FocusTarget {
    fn resolve(base: &SunburstConfig, target: &BaseRef) -> Option<Self> {
        let layer = base.layer(&target.layer_id)?;
        let along = layer.tree.nodes_along(&target.path_indices)?;
        if along.iter().any(|n| n.hidden) {
            return None;
        }
        let path_nodes: Vec<ArcNode> = along.into_iter().map(ArcNode::from).collect();
        let node = path_nodes.last()?.clone();
        Some(Self {
            layer_id: target.layer_id.clone(),
            path_indices: target.path_indices.clone(),
            key: node.key.clone(),
            node,
            path_nodes,
            identifier: identifier(&target.layer_id, &target.path_indices),
        })
    }

    pub fn base_ref(&self) -> BaseRef {
        BaseRef {
            layer_id: self.layer_id.clone(),
            path_indices: self.path_indices.clone(),
        }
    }

    pub fn parent(&self) -> Option<BaseRef> {
        let (_, parent) = self.path_indices.split_last()?;
        if parent.is_empty() {
            return None;
        }
        Some(BaseRef {
            layer_id: self.layer_id.clone(),
            path_indices: parent.to_vec(),
        })
    }
}

fn identifier(layer_id: &str, path_indices: &[usize]) -> String {
    let joined: Vec<String> = path_indices.iter().map(usize::to_string).collect();
    format!("{layer_id}:{}", joined.join("."))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrailEntry {
    pub id: String,
    pub label: String,
    pub active: bool,
    /// Selecting this entry refocuses it (see [`Navigator::select_trail`]).
    pub selectable: bool,
}

/// Render hint armed by a focus change; read once by the next render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionOverride {
    /// `None` keeps the chart's transition.
    pub transition: Option<Transition>,
    pub morph: bool,
}

pub type FocusListener = Box<dyn FnMut(Option<&FocusTarget>)>;

pub struct Navigator {
    options: NavigationOptions,
    base: SunburstConfig,
    active: SunburstConfig,
    focus: Option<FocusTarget>,
    trail: Vec<TrailEntry>,
    next_id: u64,
    origins: FxHashMap<NodeId, BaseRef>,
    registered: FxHashMap<(String, Vec<usize>), BaseRef>,
    transition_override: Option<TransitionOverride>,
    listener: Option<FocusListener>,
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("options", &self.options)
            .field("focus", &self.focus)
            .field("trail", &self.trail)
            .finish_non_exhaustive()
    }
}

impl Navigator {
    pub fn new(base: SunburstConfig, options: NavigationOptions) -> Self {
        let mut nav = Self {
            options,
            active: base.clone(),
            base,
            focus: None,
            trail: Vec::new(),
            next_id: 0,
            origins: FxHashMap::default(),
            registered: FxHashMap::default(),
            transition_override: None,
            listener: None,
        };
        nav.derive();
        nav.rebuild_trail();
        nav
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    pub fn base_config(&self) -> &SunburstConfig {
        &self.base
    }

    /// The config to lay out: the base config, or the focused sub-view of it.
    pub fn active_config(&self) -> &SunburstConfig {
        &self.active
    }

    pub fn focus(&self) -> Option<&FocusTarget> {
        self.focus.as_ref()
    }

    pub fn trail(&self) -> &[TrailEntry] {
        &self.trail
    }

    pub fn on_focus_change(&mut self, listener: impl FnMut(Option<&FocusTarget>) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Replaces the base config. A focus that no longer resolves clears without a transition.
    pub fn set_base_config(&mut self, base: SunburstConfig) {
        self.base = base;
        if let Some(focus) = self.focus.take() {
            match FocusTarget::resolve(&self.base, &focus.base_ref()) {
                Some(refreshed) => self.focus = Some(refreshed),
                None => {
                    tracing::debug!(focus = %focus.identifier, "focus no longer resolves; resetting");
                    self.rebuild_trail();
                    self.notify();
                }
            }
        }
        self.derive();
        if self.focus.is_some() {
            self.rebuild_trail();
        }
    }

    /// Records the arcs of the latest layout pass for click resolution.
    pub fn register_arcs(&mut self, arcs: &[LayoutArc]) {
        self.registered.clear();
        for arc in arcs {
            let Some(base_ref) = arc.node.origin.and_then(|id| self.origins.get(&id)) else {
                continue;
            };
            self.registered.insert(
                (arc.layer_id.clone(), arc.path_indices.clone()),
                base_ref.clone(),
            );
        }
    }

    /// Resolves an arc of the active view to its base-config position.
    pub fn resolve_arc(&self, arc: &LayoutArc) -> Option<BaseRef> {
        if let Some(found) = arc.node.origin.and_then(|id| self.origins.get(&id)) {
            return Some(found.clone());
        }
        self.registered
            .get(&(arc.layer_id.clone(), arc.path_indices.clone()))
            .cloned()
    }

    /// Applies a click. Returns `false` when the arc is not navigable.
    pub fn handle_arc_click(&mut self, arc: &LayoutArc) -> bool {
        if !self.options.allows_layer(&arc.layer_id) {
            return false;
        }
        let Some(clicked) = self.resolve_arc(arc) else {
            return false;
        };
        let target = match &self.focus {
            Some(focus) if focus.layer_id == clicked.layer_id
                && focus.path_indices == clicked.path_indices =>
            {
                focus.parent()
            }
            _ => Some(clicked),
        };
        self.set_focus(target)
    }

    /// Returns to the unfocused view. Returns `false` when nothing was focused.
    pub fn reset(&mut self) -> bool {
        if self.focus.is_none() {
            return false;
        }
        self.set_focus(None)
    }

    /// Selects a trail entry: the root entry resets, any other non-active entry refocuses that
    /// ancestor.
    pub fn select_trail(&mut self, index: usize) -> bool {
        let Some(entry) = self.trail.get(index) else {
            return false;
        };
        if !entry.selectable {
            return false;
        }
        if index == 0 {
            return self.reset();
        }
        let Some(focus) = &self.focus else {
            return false;
        };
        let target = BaseRef {
            layer_id: focus.layer_id.clone(),
            path_indices: focus.path_indices[..index].to_vec(),
        };
        self.set_focus(Some(target))
    }

    /// Puts back a focus captured before a navigation whose render pass failed. Drops the armed
    /// transition override; listeners hear about the restored focus.
    pub fn restore_focus(&mut self, focus: Option<FocusTarget>) {
        self.transition_override = None;
        let focus = focus.and_then(|f| FocusTarget::resolve(&self.base, &f.base_ref()));
        if focus == self.focus {
            return;
        }
        self.focus = focus;
        self.derive();
        self.rebuild_trail();
        self.notify();
    }

    pub fn consume_transition_override(&mut self) -> Option<TransitionOverride> {
        self.transition_override.take()
    }

    fn set_focus(&mut self, target: Option<BaseRef>) -> bool {
        let next = match target {
            Some(target) => match FocusTarget::resolve(&self.base, &target) {
                Some(focus) => Some(focus),
                None => return false,
            },
            None => None,
        };
        if next == self.focus {
            return false;
        }
        tracing::debug!(
            focus = next.as_ref().map(|f| f.identifier.as_str()).unwrap_or(ROOT_TRAIL_ID),
            "focus changed"
        );
        self.focus = next;
        self.derive();
        self.rebuild_trail();
        self.transition_override = Some(TransitionOverride {
            transition: resolve_transition(self.options.focus_transition.as_ref()),
            morph: true,
        });
        self.notify();
        true
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener(self.focus.as_ref());
        }
    }

    fn rebuild_trail(&mut self) {
        let mut trail = Vec::with_capacity(1 + self.focus.as_ref().map_or(0, |f| f.path_nodes.len()));
        trail.push(TrailEntry {
            id: ROOT_TRAIL_ID.to_string(),
            label: self.options.root_label.clone(),
            active: self.focus.is_none(),
            selectable: self.focus.is_some(),
        });
        if let Some(focus) = &self.focus {
            let last = focus.path_nodes.len() - 1;
            for (depth, node) in focus.path_nodes.iter().enumerate() {
                trail.push(TrailEntry {
                    id: identifier(&focus.layer_id, &focus.path_indices[..=depth]),
                    label: node.display_label().to_string(),
                    active: depth == last,
                    selectable: depth != last,
                });
            }
        }
        self.trail = trail;
    }

    /// Rebuilds the active config and the id → base-path map.
    ///
    /// An unkeyed focus has nothing an aligned layer can follow: its own layer switches to free
    /// distribution and aligned layers downstream of it render empty.
    fn derive(&mut self) {
        self.origins.clear();
        let mut active = self.base.clone();

        let focus: Option<(String, Vec<usize>, Option<String>)> = self
            .focus
            .as_ref()
            .map(|f| (f.layer_id.clone(), f.path_indices.clone(), f.key.clone()));
        let mut unkeyed: Vec<String> = Vec::new();

        for layer in &mut active.layers {
            let reroot_at = match &focus {
                Some((focus_layer, path, _)) if *focus_layer == layer.id => Some(path.clone()),
                Some((_, _, Some(key))) => layer.tree.find_key(key),
                _ => None,
            };
            let follows_unkeyed = layer.angle_mode == AngleMode::Align
                && layer
                    .align_with
                    .as_ref()
                    .is_some_and(|source| unkeyed.contains(source));

            match reroot_at.and_then(|path| layer.tree.node_at(&path).cloned().map(|n| (path, n))) {
                Some((path, mut root)) => {
                    root.collapsed = false;
                    root.parents.clear();
                    if root.key.is_none() {
                        layer.angle_mode = AngleMode::Free;
                        unkeyed.push(layer.id.clone());
                    }
                    self.tag(&layer.id, &path, &mut root);
                    layer.tree = Tree::Single(root);
                }
                None if follows_unkeyed => {
                    layer.tree = Tree::Forest(Vec::new());
                    unkeyed.push(layer.id.clone());
                }
                None => {
                    let layer_id = layer.id.clone();
                    let roots: &mut [TreeNode] = match &mut layer.tree {
                        Tree::Single(node) => std::slice::from_mut(node),
                        Tree::Forest(nodes) => nodes,
                    };
                    for (index, root) in roots.iter_mut().enumerate() {
                        self.tag(&layer_id, &[index], root);
                    }
                }
            }
        }
        self.active = active;
    }

    /// Assigns fresh ids to `root` and its descendants; `base_path` is `root`'s base position.
    fn tag(&mut self, layer_id: &str, base_path: &[usize], root: &mut TreeNode) {
        let mut stack: Vec<(&mut TreeNode, Vec<usize>)> = vec![(root, base_path.to_vec())];
        while let Some((node, path)) = stack.pop() {
            let id = NodeId(self.next_id);
            self.next_id += 1;
            node.origin = Some(id);
            for (index, child) in node.children.iter_mut().enumerate() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push((child, child_path));
            }
            self.origins.insert(
                id,
                BaseRef {
                    layer_id: layer_id.to_string(),
                    path_indices: path,
                },
            );
        }
    }
}
