//! Insertion primitives: computing the appropriate place for a node
//! (including the foster-parenting detour around table structure) and the
//! element, text and comment insertion helpers built on top of it.

use std::collections::HashMap;

use crate::document::Document;
use crate::node::{Namespace, NodeId};
use crate::parser::Html5Parser;
use crate::tags::TagName;
use crate::tokenizer::token::Token;
use crate::tokenizer::TokenSource;

/// Tags that trigger foster parenting when they are the insertion target.
const TABLE_STRUCTURAL: [TagName; 5] = [
    TagName::Table,
    TagName::Tbody,
    TagName::Thead,
    TagName::Tfoot,
    TagName::Tr,
];

/// Where the next node will land: a parent and an optional next sibling.
/// Computed fresh for every insertion, never cached across tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionLocation {
    pub parent: NodeId,
    pub before: Option<NodeId>,
}

impl InsertionLocation {
    fn attach(&self, document: &mut Document, node_id: NodeId) {
        match self.before {
            Some(before_id) => {
                document.insert_before(node_id, self.parent, before_id);
            }
            None => {
                document.append(node_id, self.parent);
            }
        }
    }
}

impl<T: TokenSource> Html5Parser<'_, T> {
    /// Computes the appropriate place for inserting a node. Normally the
    /// last-child position of the target; when foster parenting is active
    /// and the target is table-structural, the position just before the
    /// last open `<table>` instead.
    pub(crate) fn appropriate_place_insert(&self, override_target: Option<NodeId>) -> InsertionLocation {
        let Some(target_id) = override_target.or_else(|| self.open_elements.current()) else {
            return InsertionLocation {
                parent: NodeId::ROOT,
                before: None,
            };
        };

        let target_is_table_structural = self
            .document
            .get_node_by_id(target_id)
            .and_then(|node| node.tag())
            .is_some_and(|tag| tag.is_one_of(&TABLE_STRUCTURAL));

        if !(self.foster_parenting && target_is_table_structural) {
            return InsertionLocation {
                parent: target_id,
                before: None,
            };
        }

        let mut iter = self.open_elements.iter().rev().peekable();
        while let Some(&node_id) = iter.next() {
            let Some(node) = self.document.get_node_by_id(node_id) else {
                continue;
            };
            if node.tag() == Some(TagName::Table) {
                if let Some(parent_id) = node.parent {
                    return InsertionLocation {
                        parent: parent_id,
                        before: Some(node_id),
                    };
                }
                // Detached table: degrade to the last-child position of the
                // stack entry just below it.
                if let Some(&&below_id) = iter.peek() {
                    return InsertionLocation {
                        parent: below_id,
                        before: None,
                    };
                }
            }
        }

        InsertionLocation {
            parent: self.open_elements.first().unwrap_or(NodeId::ROOT),
            before: None,
        }
    }

    /// Creates an unattached element node from a start tag token.
    pub(crate) fn create_element_from_token(&mut self, token: &Token, namespace: Namespace) -> NodeId {
        let (name, attributes) = match token {
            Token::StartTag { name, attributes, .. } => (*name, attributes.clone()),
            Token::EndTag { name } => (*name, HashMap::new()),
            _ => panic!("node can only be created from a tag token"),
        };
        self.document.create_element(name, namespace, attributes)
    }

    /// Inserts an HTML element for the token at the appropriate place and
    /// pushes it onto the stack of open elements.
    pub(crate) fn insert_html_element(&mut self, token: &Token) -> NodeId {
        self.insert_foreign_element(token, Namespace::Html)
    }

    pub(crate) fn insert_foreign_element(&mut self, token: &Token, namespace: Namespace) -> NodeId {
        let node_id = self.create_element_from_token(token, namespace);
        let location = self.appropriate_place_insert(None);
        location.attach(self.document, node_id);
        self.open_elements.push(node_id);
        node_id
    }

    /// Inserts an already-created element node at the appropriate place and
    /// pushes it. Used when reconstructing formatting elements from clones.
    pub(crate) fn insert_element_node(&mut self, node_id: NodeId) {
        let location = self.appropriate_place_insert(None);
        location.attach(self.document, node_id);
        self.open_elements.push(node_id);
    }

    /// Inserts the root `<html>` element under the document node and records
    /// it in its singleton stack slot.
    pub(crate) fn insert_html_root(&mut self, token: &Token) -> NodeId {
        let node_id = self.create_element_from_token(token, Namespace::Html);
        self.document.append(node_id, NodeId::ROOT);
        self.open_elements.push_html(node_id);
        node_id
    }

    pub(crate) fn insert_head_element(&mut self, token: &Token) -> NodeId {
        let node_id = self.create_element_from_token(token, Namespace::Html);
        let location = self.appropriate_place_insert(None);
        location.attach(self.document, node_id);
        self.open_elements.push_head(node_id);
        node_id
    }

    pub(crate) fn insert_body_element(&mut self, token: &Token) -> NodeId {
        let node_id = self.create_element_from_token(token, Namespace::Html);
        let location = self.appropriate_place_insert(None);
        location.attach(self.document, node_id);
        self.open_elements.push_body(node_id);
        node_id
    }

    /// Inserts a character run at the appropriate place, merging it into an
    /// adjacent text node when one borders the insertion point.
    pub(crate) fn insert_text(&mut self, value: &str) {
        let location = self.appropriate_place_insert(None);
        self.insert_text_at(location, value);
    }

    pub(crate) fn insert_text_at(&mut self, location: InsertionLocation, value: &str) {
        let sibling_id = match location.before {
            Some(before_id) => {
                let preceding = self.document.get_node_by_id(location.parent).and_then(|parent| {
                    let idx = parent.children.iter().position(|&id| id == before_id)?;
                    idx.checked_sub(1).map(|i| parent.children[i])
                });
                preceding
            }
            None => self
                .document
                .get_node_by_id(location.parent)
                .and_then(|parent| parent.children.last().copied()),
        };

        if let Some(sibling_id) = sibling_id {
            if let Some(sibling) = self.document.get_mut_node_by_id(sibling_id) {
                if let Some(text) = sibling.text_value_mut() {
                    text.push_str(value);
                    return;
                }
            }
        }

        let text_id = self.document.create_text(value);
        location.attach(self.document, text_id);
    }

    /// Inserts a comment node, either at the appropriate place or as the
    /// last child of an explicitly given parent.
    pub(crate) fn insert_comment(&mut self, value: &str, parent: Option<NodeId>) {
        let comment_id = self.document.create_comment(value);
        match parent {
            Some(parent_id) => {
                self.document.append(comment_id, parent_id);
            }
            None => {
                let location = self.appropriate_place_insert(None);
                location.attach(self.document, comment_id);
            }
        }
    }

    /// Reattaches an existing node at the appropriate place relative to the
    /// given target, foster parenting included. Used by the adoption agency
    /// when it hangs the rebuilt chain under the common ancestor.
    pub(crate) fn relocate_node(&mut self, node_id: NodeId, target: NodeId) {
        self.document.detach_node(node_id);
        let location = self.appropriate_place_insert(Some(target));
        location.attach(self.document, node_id);
    }
}
