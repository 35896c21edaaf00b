use crate::geometry::ArcGeometry;
use corona_core::{NodeId, TreeNode};
use serde::{Deserialize, Serialize};

/// Childless snapshot of the [`TreeNode`] an arc was laid out from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcNode {
    pub name: String,
    pub key: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    pub tooltip: Option<String>,
    pub origin: Option<NodeId>,
}

impl ArcNode {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl From<&TreeNode> for ArcNode {
    fn from(node: &TreeNode) -> Self {
        Self {
            name: node.name.clone(),
            key: node.key.clone(),
            label: node.label.clone(),
            color: node.color.clone(),
            tooltip: node.tooltip.clone(),
            origin: node.origin,
        }
    }
}

/// One laid-out wedge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutArc {
    pub layer_id: String,
    pub node: ArcNode,
    /// Start angle, radians.
    pub x0: f64,
    /// End angle, radians.
    pub x1: f64,
    /// Inner radius, pixels.
    pub y0: f64,
    /// Outer radius, pixels.
    pub y1: f64,
    pub depth: usize,
    pub key: Option<String>,
    pub value: f64,
    /// Share of the sibling group (1 for aligned roots).
    pub percentage: f64,
    pub path: Vec<String>,
    pub path_indices: Vec<usize>,
    /// Whether the source node kept structural children after normalization.
    pub has_children: bool,
}

impl LayoutArc {
    pub fn geometry(&self) -> ArcGeometry {
        ArcGeometry {
            x0: self.x0,
            x1: self.x1,
            y0: self.y0,
            y1: self.y1,
        }
    }

    pub fn set_geometry(&mut self, geom: ArcGeometry) {
        self.x0 = geom.x0;
        self.x1 = geom.x1;
        self.y0 = geom.y0;
        self.y1 = geom.y1;
    }

    pub fn with_geometry(&self, geom: ArcGeometry) -> Self {
        let mut out = self.clone();
        out.set_geometry(geom);
        out
    }

    pub fn span(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }
}
