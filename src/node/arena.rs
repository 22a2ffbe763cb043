use crate::node::{Node, NodeId};

/// The node arena is the single source of nodes for a document. Slots are
/// never reused: a node detached from the tree keeps its id, so handles held
/// by the open elements stack or the formatting list stay valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id.0)
    }

    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id.0)
    }

    /// Adds the node to the arena and returns its id. The node is not yet
    /// attached anywhere in the tree.
    pub fn register_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
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
    use crate::node::Namespace;
    use crate::tags::TagName;
    use std::collections::HashMap;

    #[test]
    fn register_assigns_sequential_ids() {
        let mut arena = NodeArena::new();
        let a = arena.register_node(Node::new_element(TagName::Div, HashMap::new(), Namespace::Html));
        let b = arena.register_node(Node::new_text("x"));
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(arena.get_node(a).unwrap().tag(), Some(TagName::Div));
    }

    #[test]
    fn get_mut_allows_in_place_edits() {
        let mut arena = NodeArena::new();
        let id = arena.register_node(Node::new_element(TagName::P, HashMap::new(), Namespace::Html));
        arena.get_node_mut(id).unwrap().children.push(NodeId(42));
        assert_eq!(arena.get_node(id).unwrap().children, vec![NodeId(42)]);
    }

    #[test]
    fn missing_ids_return_none() {
        let arena = NodeArena::new();
        assert!(arena.get_node(NodeId(7)).is_none());
    }
}
