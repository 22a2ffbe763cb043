//! The stack of open elements and its scope queries. The stack keeps
//! bottom-to-top order (the root `<html>` element at index 0) and tracks the
//! `<html>`, `<head>` and `<body>` elements in dedicated slots so the generic
//! pop operations can never remove them by accident.

use crate::document::Document;
use crate::node::{Namespace, NodeId};
use crate::tags::TagName;

/// Boundary classification used by the scope queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Regular,
    ListItem,
    Button,
    Table,
    Select,
}

/// Elements the "generate implied end tags" step may close.
pub const IMPLIED_END_TAGS: [TagName; 8] = [
    TagName::Dd,
    TagName::Dt,
    TagName::Li,
    TagName::Option,
    TagName::Optgroup,
    TagName::P,
    TagName::Rp,
    TagName::Rt,
];

const HTML_SCOPE_BOUNDARIES: [TagName; 8] = [
    TagName::Applet,
    TagName::Caption,
    TagName::Html,
    TagName::Table,
    TagName::Td,
    TagName::Th,
    TagName::Marquee,
    TagName::Object,
];

const MATHML_SCOPE_BOUNDARIES: [TagName; 6] = [
    TagName::Mi,
    TagName::Mo,
    TagName::Mn,
    TagName::Ms,
    TagName::Mtext,
    TagName::AnnotationXml,
];

const SVG_SCOPE_BOUNDARIES: [TagName; 3] = [TagName::ForeignObject, TagName::Desc, TagName::Title];

#[derive(Default)]
pub struct OpenElements {
    stack: Vec<NodeId>,
    html_element: Option<NodeId>,
    head_element: Option<NodeId>,
    body_element: Option<NodeId>,
}

impl OpenElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeId> {
        self.stack.iter()
    }

    /// Topmost entry, the current node.
    pub fn current(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.stack.get(index).copied()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.stack.first().copied()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.stack.contains(&node_id)
    }

    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.stack.iter().position(|&id| id == node_id)
    }

    pub fn html_element(&self) -> Option<NodeId> {
        self.html_element
    }

    pub fn head_element(&self) -> Option<NodeId> {
        self.head_element
    }

    pub fn body_element(&self) -> Option<NodeId> {
        self.body_element
    }

    /// Generic push. The `<html>`, `<head>` and `<body>` elements go through
    /// their dedicated push operations instead.
    pub fn push(&mut self, node_id: NodeId) {
        self.stack.push(node_id);
    }

    pub fn push_html(&mut self, node_id: NodeId) {
        debug_assert!(self.html_element.is_none(), "html element pushed twice");
        self.html_element = Some(node_id);
        self.stack.push(node_id);
    }

    pub fn push_head(&mut self, node_id: NodeId) {
        debug_assert!(self.head_element.is_none(), "head element pushed twice");
        self.head_element = Some(node_id);
        self.stack.push(node_id);
    }

    pub fn push_body(&mut self, node_id: NodeId) {
        debug_assert!(self.body_element.is_none(), "body element pushed twice");
        self.body_element = Some(node_id);
        self.stack.push(node_id);
    }

    fn is_protected(&self, node_id: NodeId) -> bool {
        Some(node_id) == self.html_element
            || Some(node_id) == self.head_element
            || Some(node_id) == self.body_element
    }

    /// Generic pop. Leaves the singleton elements alone; popping those is the
    /// job of [`pop_head`](Self::pop_head) and friends.
    pub fn pop(&mut self) -> Option<NodeId> {
        match self.stack.last() {
            Some(&top) if !self.is_protected(top) => self.stack.pop(),
            _ => None,
        }
    }

    /// Pops the `<head>` element off the top of the stack. The slot keeps the
    /// handle so head-only elements can still be routed there later.
    pub fn pop_head(&mut self) -> Option<NodeId> {
        match (self.stack.last().copied(), self.head_element) {
            (Some(top), Some(head)) if top == head => self.stack.pop(),
            _ => None,
        }
    }

    pub fn pop_body(&mut self) -> Option<NodeId> {
        match (self.stack.last().copied(), self.body_element) {
            (Some(top), Some(body)) if top == body => self.stack.pop(),
            _ => None,
        }
    }

    /// Removes the `<body>` element from the stack wherever it sits and
    /// forgets the slot. Used by the stray `<frameset>` recovery path only.
    pub fn remove_body(&mut self) -> Option<NodeId> {
        let body = self.body_element.take()?;
        self.stack.retain(|&id| id != body);
        Some(body)
    }

    /// Pops up to and including the first element matching `tag`. Stops early
    /// when a singleton element would be popped.
    pub fn pop_until(&mut self, document: &Document, tag: TagName) {
        self.pop_until_any(document, &[tag]);
    }

    pub fn pop_until_any(&mut self, document: &Document, tags: &[TagName]) {
        while let Some(top) = self.current() {
            if self.is_protected(top) {
                return;
            }
            let matched = document
                .get_node_by_id(top)
                .and_then(|node| node.tag())
                .is_some_and(|tag| tag.is_one_of(tags));
            self.stack.pop();
            if matched {
                return;
            }
        }
    }

    /// Pops up to and including the given element.
    pub fn pop_until_node(&mut self, node_id: NodeId) {
        while let Some(top) = self.current() {
            if self.is_protected(top) {
                return;
            }
            self.stack.pop();
            if top == node_id {
                return;
            }
        }
    }

    /// Empties the whole stack, singleton slots included. Runs at parse end.
    pub fn pop_all(&mut self) {
        self.stack.clear();
        self.html_element = None;
        self.head_element = None;
        self.body_element = None;
    }

    pub fn remove(&mut self, node_id: NodeId) {
        self.stack.retain(|&id| id != node_id);
    }

    pub fn replace(&mut self, old_id: NodeId, new_id: NodeId) {
        if let Some(idx) = self.position(old_id) {
            self.stack[idx] = new_id;
        }
    }

    pub fn insert(&mut self, index: usize, node_id: NodeId) {
        self.stack.insert(index, node_id);
    }

    /// Checks whether an HTML element with the given tag is in the given
    /// scope: scan from the top, found-first wins, boundary-first loses.
    pub fn is_in_scope(&self, document: &Document, tag: TagName, scope: Scope) -> bool {
        for &node_id in self.stack.iter().rev() {
            let Some(node) = document.get_node_by_id(node_id) else {
                return false;
            };
            let (Some(node_tag), Some(namespace)) = (node.tag(), node.namespace()) else {
                return false;
            };
            if node_tag == tag && namespace == Namespace::Html {
                return true;
            }
            if Self::is_scope_boundary(node_tag, namespace, scope) {
                return false;
            }
        }
        false
    }

    fn is_scope_boundary(tag: TagName, namespace: Namespace, scope: Scope) -> bool {
        let default_boundary = match namespace {
            Namespace::Html => tag.is_one_of(&HTML_SCOPE_BOUNDARIES),
            Namespace::MathMl => tag.is_one_of(&MATHML_SCOPE_BOUNDARIES),
            Namespace::Svg => tag.is_one_of(&SVG_SCOPE_BOUNDARIES),
        };
        match scope {
            Scope::Regular => default_boundary,
            Scope::ListItem => {
                default_boundary
                    || (namespace == Namespace::Html && tag.is_one_of(&[TagName::Ol, TagName::Ul]))
            }
            Scope::Button => {
                default_boundary || (namespace == Namespace::Html && tag == TagName::Button)
            }
            Scope::Table => {
                namespace == Namespace::Html && tag.is_one_of(&[TagName::Html, TagName::Table])
            }
            // Select scope inverts the test: everything that is not an
            // optgroup or option is a boundary.
            Scope::Select => {
                !(namespace == Namespace::Html
                    && tag.is_one_of(&[TagName::Optgroup, TagName::Option]))
            }
        }
    }

    /// Pops elements while the current node is one the "implied end tags"
    /// step may close. The `except` tag, when given, stops the run even
    /// though it is itself in the set.
    pub fn generate_implied_end_tags(&mut self, document: &Document, except: Option<TagName>) {
        while let Some(top) = self.current() {
            let Some(tag) = document.get_node_by_id(top).and_then(|node| node.tag()) else {
                return;
            };
            if except == Some(tag) || !tag.is_one_of(&IMPLIED_END_TAGS) {
                return;
            }
            self.pop();
        }
    }

    /// Finds the furthest block for the adoption agency: the first "special"
    /// element above `formatting_element` on the stack, or None when nothing
    /// special sits above it.
    pub fn furthest_block(&self, document: &Document, formatting_element: NodeId) -> Option<NodeId> {
        let start = self.position(formatting_element)?;
        for &node_id in &self.stack[start + 1..] {
            let node = document.get_node_by_id(node_id)?;
            if node.is_special() {
                return Some(node_id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Namespace;
    use std::collections::HashMap;

    fn open_element(document: &mut Document, stack: &mut OpenElements, tag: TagName) -> NodeId {
        let id = document.create_element(tag, Namespace::Html, HashMap::new());
        match tag {
            TagName::Html => stack.push_html(id),
            TagName::Head => stack.push_head(id),
            TagName::Body => stack.push_body(id),
            _ => stack.push(id),
        }
        id
    }

    #[test]
    fn generic_pop_skips_singletons() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        let div = open_element(&mut document, &mut stack, TagName::Div);

        assert_eq!(stack.pop(), Some(div));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn pop_until_stops_at_match() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        let p = open_element(&mut document, &mut stack, TagName::P);
        open_element(&mut document, &mut stack, TagName::B);
        open_element(&mut document, &mut stack, TagName::I);

        stack.pop_until(&document, TagName::P);
        assert!(!stack.contains(p));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn button_scope_blocked_by_boundary() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        open_element(&mut document, &mut stack, TagName::P);
        assert!(stack.is_in_scope(&document, TagName::P, Scope::Button));

        open_element(&mut document, &mut stack, TagName::Table);
        assert!(!stack.is_in_scope(&document, TagName::P, Scope::Button));
    }

    #[test]
    fn button_scope_blocked_by_button() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        open_element(&mut document, &mut stack, TagName::P);
        open_element(&mut document, &mut stack, TagName::Button);

        assert!(!stack.is_in_scope(&document, TagName::P, Scope::Button));
        assert!(stack.is_in_scope(&document, TagName::P, Scope::Regular));
    }

    #[test]
    fn select_scope_inverts_membership() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        open_element(&mut document, &mut stack, TagName::Select);
        open_element(&mut document, &mut stack, TagName::Optgroup);
        open_element(&mut document, &mut stack, TagName::Option);

        assert!(stack.is_in_scope(&document, TagName::Select, Scope::Select));
        assert!(!stack.is_in_scope(&document, TagName::Body, Scope::Select));
    }

    #[test]
    fn implied_end_tags_noop_when_clean() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        open_element(&mut document, &mut stack, TagName::Div);

        let before = stack.len();
        stack.generate_implied_end_tags(&document, None);
        assert_eq!(stack.len(), before);
    }

    #[test]
    fn implied_end_tags_pop_run() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        open_element(&mut document, &mut stack, TagName::P);
        open_element(&mut document, &mut stack, TagName::Li);
        open_element(&mut document, &mut stack, TagName::Dd);

        stack.generate_implied_end_tags(&document, None);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn implied_end_tags_honor_exception() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        let p = open_element(&mut document, &mut stack, TagName::P);
        open_element(&mut document, &mut stack, TagName::Li);

        stack.generate_implied_end_tags(&document, Some(TagName::P));
        assert_eq!(stack.current(), Some(p));
    }

    #[test]
    fn furthest_block_finds_first_special_above() {
        let mut document = Document::new();
        let mut stack = OpenElements::new();
        open_element(&mut document, &mut stack, TagName::Html);
        open_element(&mut document, &mut stack, TagName::Body);
        let b = open_element(&mut document, &mut stack, TagName::B);
        open_element(&mut document, &mut stack, TagName::I);
        let div = open_element(&mut document, &mut stack, TagName::Div);
        open_element(&mut document, &mut stack, TagName::Em);

        assert_eq!(stack.furthest_block(&document, b), Some(div));
        assert_eq!(stack.furthest_block(&document, div), None);
    }
}
