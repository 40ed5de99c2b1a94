use std::collections::HashMap;

use crate::models::{Id, ThreadNode};

/// Snapshot of one fetched thread.
///
/// Every fetch is a full refresh: `load` throws the previous snapshot away
/// instead of merging into it.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Vec<ThreadNode>,
    index: HashMap<Id, usize>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<ThreadNode>) -> Self {
        let mut store = Self::new();
        store.load(nodes);
        store
    }

    pub fn load(&mut self, nodes: Vec<ThreadNode>) {
        self.index.clear();
        for (pos, node) in nodes.iter().enumerate() {
            // first occurrence wins on duplicate ids
            self.index.entry(node.id).or_insert(pos);
        }
        self.nodes = nodes;
    }

    pub fn get(&self, id: Id) -> Option<&ThreadNode> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// Nodes in fetch order.
    pub fn nodes(&self) -> &[ThreadNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(id: Id, parent_id: Option<Id>) -> ThreadNode {
        ThreadNode {
            id,
            parent_id,
            content: format!("n{id}"),
            author_id: 1,
            author_name: "kim".into(),
            created_at: Utc::now(),
            updated_at: None,
            deleted: false,
        }
    }

    #[test]
    fn load_replaces_previous_snapshot() {
        let mut store = NodeStore::from_nodes(vec![node(1, None), node(2, Some(1))]);
        assert_eq!(store.len(), 2);
        assert!(store.get(2).is_some());

        store.load(vec![node(3, None)]);
        assert_eq!(store.len(), 1);
        assert!(store.get(1).is_none());
        assert!(store.get(2).is_none());
        assert_eq!(store.get(3).map(|n| n.content.as_str()), Some("n3"));
    }

    #[test]
    fn empty_store() {
        let store = NodeStore::new();
        assert!(store.is_empty());
        assert!(store.get(1).is_none());
    }
}
