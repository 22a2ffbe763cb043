//! The Document collaborator: an arena-backed tree the parser mutates
//! through a small primitive set (create, append, insert-before, detach,
//! attribute assignment). The document owns every node; the parser only ever
//! holds [`NodeId`] handles.

use std::collections::HashMap;
use std::fmt;

use crate::errors::DocumentError;
use crate::node::arena::NodeArena;
use crate::node::{Namespace, Node, NodeData, NodeId};
use crate::parser::quirks::QuirksMode;
use crate::tags::TagName;

pub struct Document {
    arena: NodeArena,
    pub quirks_mode: QuirksMode,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only the root document node.
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        arena.register_node(Node::new_document());
        Self {
            arena,
            quirks_mode: QuirksMode::NoQuirks,
        }
    }

    pub fn get_node_by_id(&self, node_id: NodeId) -> Option<&Node> {
        self.arena.get_node(node_id)
    }

    pub fn get_mut_node_by_id(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.arena.get_node_mut(node_id)
    }

    pub fn get_root(&self) -> &Node {
        self.arena.get_node(NodeId::ROOT).expect("root node not found")
    }

    /// Creates an unattached element node and returns its handle.
    pub fn create_element(
        &mut self,
        name: TagName,
        namespace: Namespace,
        attributes: HashMap<String, String>,
    ) -> NodeId {
        self.arena.register_node(Node::new_element(name, attributes, namespace))
    }

    /// Creates an unattached text node and returns its handle.
    pub fn create_text(&mut self, value: &str) -> NodeId {
        self.arena.register_node(Node::new_text(value))
    }

    pub fn create_comment(&mut self, value: &str) -> NodeId {
        self.arena.register_node(Node::new_comment(value))
    }

    pub fn create_doctype(&mut self, name: &str, pub_identifier: &str, sys_identifier: &str) -> NodeId {
        self.arena
            .register_node(Node::new_doctype(name, pub_identifier, sys_identifier))
    }

    /// Appends `node_id` as the last child of `parent_id`, detaching it from
    /// any previous parent first. Refuses attachments that would create a
    /// cycle and returns false in that case.
    pub fn append(&mut self, node_id: NodeId, parent_id: NodeId) -> bool {
        self.attach_node(node_id, parent_id, None)
    }

    /// Inserts `node_id` as a child of `parent_id` immediately before
    /// `before_id`. Falls back to appending when `before_id` is not a child
    /// of `parent_id`.
    pub fn insert_before(&mut self, node_id: NodeId, parent_id: NodeId, before_id: NodeId) -> bool {
        let position = self
            .arena
            .get_node(parent_id)
            .and_then(|parent| parent.children.iter().position(|&id| id == before_id));
        self.attach_node(node_id, parent_id, position)
    }

    /// Core attachment primitive: detach, cycle-check, then splice into the
    /// parent's child list at `position` (or the end).
    pub fn attach_node(&mut self, node_id: NodeId, parent_id: NodeId, position: Option<usize>) -> bool {
        if node_id == parent_id || self.is_ancestor_of(node_id, parent_id) {
            log::warn!("refusing to attach node {node_id} under its own descendant {parent_id}");
            return false;
        }

        self.detach_node(node_id);

        if let Some(parent) = self.arena.get_node_mut(parent_id) {
            match position {
                Some(idx) if idx <= parent.children.len() => parent.children.insert(idx, node_id),
                _ => parent.children.push(node_id),
            }
        } else {
            return false;
        }
        if let Some(node) = self.arena.get_node_mut(node_id) {
            node.parent = Some(parent_id);
        }
        true
    }

    /// Removes the node from its parent's child list. The node stays in the
    /// arena; handles to it remain valid.
    pub fn detach_node(&mut self, node_id: NodeId) {
        let parent_id = self.arena.get_node(node_id).and_then(|node| node.parent);
        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.arena.get_node_mut(parent_id) {
                parent.children.retain(|&id| id != node_id);
            }
        }
        if let Some(node) = self.arena.get_node_mut(node_id) {
            node.parent = None;
        }
    }

    /// Sets one attribute on an element node.
    pub fn set_attribute(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<(), DocumentError> {
        let node = self
            .arena
            .get_node_mut(node_id)
            .ok_or(DocumentError::UnknownNode(node_id))?;
        match &mut node.data {
            NodeData::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(DocumentError::NotAnElement(node_id)),
        }
    }

    fn is_ancestor_of(&self, node_id: NodeId, candidate: NodeId) -> bool {
        let mut cursor = self.arena.get_node(candidate).and_then(|node| node.parent);
        while let Some(id) = cursor {
            if id == node_id {
                return true;
            }
            cursor = self.arena.get_node(id).and_then(|node| node.parent);
        }
        false
    }
}

impl Document {
    /// Prints a node and its subtree in a tree-like structure.
    fn print_tree(&self, node: &Node, prefix: String, last: bool, f: &mut fmt::Formatter<'_>) {
        let mut buffer = prefix.clone();
        if last {
            buffer.push_str("└─ ");
        } else {
            buffer.push_str("├─ ");
        }

        match &node.data {
            NodeData::Document => {
                _ = writeln!(f, "{buffer}Document");
            }
            NodeData::DocType { name, .. } => {
                _ = writeln!(f, "{buffer}<!DOCTYPE {name}>");
            }
            NodeData::Text { value } => {
                _ = writeln!(f, "{buffer}\"{value}\"");
            }
            NodeData::Comment { value } => {
                _ = writeln!(f, "{buffer}<!-- {value} -->");
            }
            NodeData::Element {
                name, attributes, ..
            } => {
                _ = write!(f, "{buffer}<{name}");
                let mut keys: Vec<_> = attributes.keys().collect();
                keys.sort();
                for key in keys {
                    _ = write!(f, " {}={}", key, attributes[key]);
                }
                _ = writeln!(f, ">");
            }
        }

        let mut buffer = prefix;
        if last {
            buffer.push_str("   ");
        } else {
            buffer.push_str("│  ");
        }

        let len = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            let child = self.arena.get_node(*child).expect("child not found");
            self.print_tree(child, buffer.clone(), i == len - 1, f);
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_tree(self.get_root(), "".to_string(), true, f);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, tag: TagName) -> NodeId {
        doc.create_element(tag, Namespace::Html, HashMap::new())
    }

    #[test]
    fn append_and_reparent() {
        let mut doc = Document::new();
        let html = element(&mut doc, TagName::Html);
        let body = element(&mut doc, TagName::Body);
        let p = element(&mut doc, TagName::P);

        assert!(doc.append(html, NodeId::ROOT));
        assert!(doc.append(body, html));
        assert!(doc.append(p, html));

        // Re-appending under a new parent detaches first.
        assert!(doc.append(p, body));
        assert_eq!(doc.get_node_by_id(html).unwrap().children, vec![body]);
        assert_eq!(doc.get_node_by_id(body).unwrap().children, vec![p]);
        assert_eq!(doc.get_node_by_id(p).unwrap().parent, Some(body));
    }

    #[test]
    fn insert_before_places_sibling() {
        let mut doc = Document::new();
        let parent = element(&mut doc, TagName::Div);
        let table = element(&mut doc, TagName::Table);
        let text = doc.create_text("X");

        doc.append(parent, NodeId::ROOT);
        doc.append(table, parent);
        assert!(doc.insert_before(text, parent, table));
        assert_eq!(doc.get_node_by_id(parent).unwrap().children, vec![text, table]);
    }

    #[test]
    fn cycles_are_refused() {
        let mut doc = Document::new();
        let outer = element(&mut doc, TagName::Div);
        let inner = element(&mut doc, TagName::Div);
        doc.append(outer, NodeId::ROOT);
        doc.append(inner, outer);

        assert!(!doc.append(outer, inner));
        assert!(!doc.append(outer, outer));
        assert_eq!(doc.get_node_by_id(outer).unwrap().children, vec![inner]);
    }

    #[test]
    fn detached_nodes_keep_their_handle() {
        let mut doc = Document::new();
        let div = element(&mut doc, TagName::Div);
        doc.append(div, NodeId::ROOT);
        doc.detach_node(div);
        assert!(doc.get_node_by_id(div).is_some());
        assert_eq!(doc.get_node_by_id(div).unwrap().parent, None);
        assert!(doc.get_root().children.is_empty());
    }

    #[test]
    fn set_attribute_requires_an_element() {
        let mut doc = Document::new();
        let text = doc.create_text("x");
        assert_eq!(
            doc.set_attribute(text, "id", "nope"),
            Err(DocumentError::NotAnElement(text))
        );
        let div = element(&mut doc, TagName::Div);
        assert!(doc.set_attribute(div, "id", "yes").is_ok());
        assert_eq!(
            doc.get_node_by_id(div).unwrap().attributes().unwrap().get("id"),
            Some(&"yes".to_string())
        );
    }
}
