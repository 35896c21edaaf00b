use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Full turn; the default `size.angle`.
pub const FULL_ANGLE: f64 = std::f64::consts::TAU;

/// Synthetic identity assigned to cloned nodes (see `corona::navigation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

fn is_false(v: &bool) -> bool {
    !*v
}

/// Caller-supplied tree node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Radial thickness in layout units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_levels: Option<f64>,
    /// Gap (radians) inserted after this node among its siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Parent keys for multi-parent placement. Two or more distinct keys move the node out of the
    /// main tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    /// Set on navigation clones only.
    #[serde(skip)]
    pub origin: Option<NodeId>,
}

impl TreeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    /// Text shown for this node in trails and tooltips.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Root(s) of a layer. JSON accepts either a single object or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tree {
    Forest(Vec<TreeNode>),
    Single(TreeNode),
}

impl Default for Tree {
    fn default() -> Self {
        Self::Forest(Vec::new())
    }
}

impl From<TreeNode> for Tree {
    fn from(node: TreeNode) -> Self {
        Self::Single(node)
    }
}

impl From<Vec<TreeNode>> for Tree {
    fn from(nodes: Vec<TreeNode>) -> Self {
        Self::Forest(nodes)
    }
}

impl Tree {
    pub fn roots(&self) -> &[TreeNode] {
        match self {
            Self::Single(node) => std::slice::from_ref(node),
            Self::Forest(nodes) => nodes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots().is_empty()
    }

    /// Resolves a path of input indices (root index first).
    pub fn node_at(&self, path_indices: &[usize]) -> Option<&TreeNode> {
        let (first, rest) = path_indices.split_first()?;
        let mut cur = self.roots().get(*first)?;
        for idx in rest {
            cur = cur.children.get(*idx)?;
        }
        Some(cur)
    }

    /// Every node along `path_indices`, root first.
    pub fn nodes_along(&self, path_indices: &[usize]) -> Option<Vec<&TreeNode>> {
        let (first, rest) = path_indices.split_first()?;
        let mut cur = self.roots().get(*first)?;
        let mut out = Vec::with_capacity(path_indices.len());
        out.push(cur);
        for idx in rest {
            cur = cur.children.get(*idx)?;
            out.push(cur);
        }
        Some(out)
    }

    /// Pre-order search for the first node carrying `key`; returns its path indices.
    pub fn find_key(&self, key: &str) -> Option<Vec<usize>> {
        let mut stack: Vec<(&TreeNode, Vec<usize>)> = self
            .roots()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, n)| (n, vec![i]))
            .collect();
        while let Some((node, path)) = stack.pop() {
            if node.key.as_deref() == Some(key) {
                return Some(path);
            }
            for (i, child) in node.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child, child_path));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleMode {
    #[default]
    Free,
    Align,
}

/// One concentric ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    pub id: String,
    /// `[start, end)` in layout units.
    pub radial_units: [f64; 2],
    #[serde(default)]
    pub angle_mode: AngleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_angle: Option<f64>,
    /// Rotation (radians) applied to the start of free distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_offset: Option<f64>,
    #[serde(default)]
    pub tree: Tree,
}

impl LayerConfig {
    pub fn free(id: impl Into<String>, radial_units: [f64; 2], tree: impl Into<Tree>) -> Self {
        Self {
            id: id.into(),
            radial_units,
            angle_mode: AngleMode::Free,
            align_with: None,
            pad_angle: None,
            base_offset: None,
            tree: tree.into(),
        }
    }

    pub fn aligned(
        id: impl Into<String>,
        radial_units: [f64; 2],
        align_with: impl Into<String>,
        tree: impl Into<Tree>,
    ) -> Self {
        Self {
            angle_mode: AngleMode::Align,
            align_with: Some(align_with.into()),
            ..Self::free(id, radial_units, tree)
        }
    }

    pub fn start_units(&self) -> f64 {
        self.radial_units[0]
    }

    pub fn end_units(&self) -> f64 {
        self.radial_units[1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartSize {
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

impl ChartSize {
    pub fn total_angle(&self) -> f64 {
        match self.angle {
            Some(a) if a.is_finite() && a > 0.0 => a,
            _ => FULL_ANGLE,
        }
    }
}

/// Whole chart description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunburstConfig {
    pub size: ChartSize,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

impl SunburstConfig {
    pub fn new(radius: f64) -> Self {
        Self {
            size: ChartSize {
                radius,
                angle: None,
            },
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: LayerConfig) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut LayerConfig> {
        self.layers.iter_mut().find(|l| l.id == id)
    }
}
