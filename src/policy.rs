use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Id, Identity, ThreadNode};
use crate::tree::TreeNode;

/// What the soft-delete rules decide for a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Visible,
    Placeholder,
    Excluded,
}

/// A deleted root is kept while it has any rendered child, placeholders
/// included; a deleted reply is always kept as a placeholder.
///
/// `depth` is 0 for roots. `has_children` must be computed after the
/// children themselves went through the policy.
pub fn disposition(node: &ThreadNode, depth: usize, has_children: bool) -> Disposition {
    if !node.deleted {
        Disposition::Visible
    } else if depth > 0 || has_children {
        // deleted replies always keep their slot
        Disposition::Placeholder
    } else {
        Disposition::Excluded
    }
}

/// Display tree handed to the renderer. Deleted content never reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayNode {
    Visible {
        node: ThreadNode,
        #[serde(rename = "canEdit")]
        can_edit: bool,
        #[serde(rename = "canDelete")]
        can_delete: bool,
        children: Vec<DisplayNode>,
    },
    Placeholder {
        id: Id,
        #[serde(rename = "parentId")]
        parent_id: Option<Id>,
        #[serde(rename = "createdAt")]
        created_at: DateTime<Utc>,
        children: Vec<DisplayNode>,
    },
}

impl DisplayNode {
    pub fn id(&self) -> Id {
        match self {
            Self::Visible { node, .. } => node.id,
            Self::Placeholder { id, .. } => *id,
        }
    }

    pub fn parent_id(&self) -> Option<Id> {
        match self {
            Self::Visible { node, .. } => node.parent_id,
            Self::Placeholder { parent_id, .. } => *parent_id,
        }
    }

    pub fn children(&self) -> &[DisplayNode] {
        match self {
            Self::Visible { children, .. } | Self::Placeholder { children, .. } => children,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

/// Run the soft-delete rules over an assembled tree for `viewer`.
pub fn apply(tree: Vec<TreeNode>, viewer: Option<&Identity>) -> Vec<DisplayNode> {
    tree.into_iter()
        .filter_map(|t| render(t, 0, viewer))
        .collect()
}

fn render(tree: TreeNode, depth: usize, viewer: Option<&Identity>) -> Option<DisplayNode> {
    let TreeNode { node, children } = tree;
    let children: Vec<DisplayNode> = children
        .into_iter()
        .filter_map(|c| render(c, depth + 1, viewer))
        .collect();

    match disposition(&node, depth, !children.is_empty()) {
        Disposition::Visible => {
            let owns = viewer.is_some_and(|v| v.is_author_of(&node));
            Some(DisplayNode::Visible { node, can_edit: owns, can_delete: owns, children })
        }
        Disposition::Placeholder => Some(DisplayNode::Placeholder {
            id: node.id,
            parent_id: node.parent_id,
            created_at: node.created_at,
            children,
        }),
        Disposition::Excluded => None,
    }
}
