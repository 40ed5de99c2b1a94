use std::collections::HashMap;

use crate::models::{Id, ThreadNode};
use crate::store::NodeStore;

/// A root (or reply) with the replies attached beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub node: ThreadNode,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(node: ThreadNode) -> Self {
        Self { node, children: Vec::new() }
    }
}

/// Group a flat snapshot into the two-level thread tree.
///
/// Replies keep fetch order beneath their root; roots are ordered newest
/// first with ties left in fetch order. A reply whose parent is not a root
/// of this snapshot is dropped.
pub fn assemble(store: &NodeStore) -> Vec<TreeNode> {
    let mut roots: Vec<TreeNode> = Vec::new();
    let mut root_pos: HashMap<Id, usize> = HashMap::new();

    for node in store.nodes().iter().filter(|n| n.is_root()) {
        if root_pos.contains_key(&node.id) {
            continue;
        }
        root_pos.insert(node.id, roots.len());
        roots.push(TreeNode::leaf(node.clone()));
    }

    let mut orphans = 0usize;
    for reply in store.nodes().iter().filter(|n| !n.is_root()) {
        match reply.parent_id.and_then(|pid| root_pos.get(&pid)) {
            Some(&pos) => roots[pos].children.push(TreeNode::leaf(reply.clone())),
            None => orphans += 1,
        }
    }
    if orphans > 0 {
        tracing::debug!(orphans, "dropped replies without a root parent");
    }

    // sort_by is stable
    roots.sort_by(|a, b| b.node.created_at.cmp(&a.node.created_at));
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn node(id: Id, parent_id: Option<Id>, minute: i64) -> ThreadNode {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        ThreadNode {
            id,
            parent_id,
            content: format!("body {id}"),
            author_id: 7,
            author_name: "lee".into(),
            created_at: base + Duration::minutes(minute),
            updated_at: None,
            deleted: false,
        }
    }

    fn ids(tree: &[TreeNode]) -> Vec<Id> {
        tree.iter().map(|t| t.node.id).collect()
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(assemble(&NodeStore::new()).is_empty());
    }

    #[test]
    fn roots_newest_first_children_in_arrival_order() {
        let store = NodeStore::from_nodes(vec![
            node(1, None, 0),
            node(2, None, 10),
            node(3, Some(1), 30),
            node(4, Some(1), 20),
            node(5, Some(2), 11),
        ]);
        let tree = assemble(&store);
        assert_eq!(ids(&tree), vec![2, 1]);
        assert_eq!(ids(&tree[1].children), vec![3, 4]);
        assert_eq!(ids(&tree[0].children), vec![5]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let store = NodeStore::from_nodes(vec![node(9, None, 5), node(4, None, 5), node(6, None, 5)]);
        assert_eq!(ids(&assemble(&store)), vec![9, 4, 6]);
    }

    #[test]
    fn orphans_and_nested_replies_are_dropped() {
        let store = NodeStore::from_nodes(vec![
            node(1, None, 0),
            node(2, Some(1), 1),
            node(3, Some(2), 2),
            node(5, Some(999), 3),
        ]);
        let tree = assemble(&store);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![2]);
        assert!(tree[0].children[0].children.is_empty());
    }

    #[test]
    fn root_without_replies_has_empty_children() {
        let tree = assemble(&NodeStore::from_nodes(vec![node(1, None, 0)]));
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }
}
