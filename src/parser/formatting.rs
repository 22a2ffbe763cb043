//! The list of active formatting elements: element entries interleaved with
//! marker sentinels. The list is what lets inline formatting be re-opened
//! after a block-level interruption, and the Noah's Ark clause keeps it from
//! growing without bound on repeated identical tags.

use crate::document::Document;
use crate::node::NodeId;
use crate::tags::TagName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormattingEntry {
    Marker,
    Element(NodeId),
}

#[derive(Default)]
pub struct ActiveFormattingElements {
    entries: Vec<FormattingEntry>,
}

impl ActiveFormattingElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FormattingEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<FormattingEntry> {
        self.entries.get(index).copied()
    }

    pub fn last(&self) -> Option<FormattingEntry> {
        self.entries.last().copied()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.entries.contains(&FormattingEntry::Element(node_id))
    }

    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.entries
            .iter()
            .position(|&entry| entry == FormattingEntry::Element(node_id))
    }

    /// Appends an element, applying the Noah's Ark clause first: when three
    /// structurally identical entries already sit between here and the last
    /// marker, the earliest of them is evicted.
    pub fn push(&mut self, document: &Document, node_id: NodeId) {
        let Some(node) = document.get_node_by_id(node_id) else {
            return;
        };

        let mut matches = Vec::new();
        for (idx, entry) in self.entries.iter().enumerate().rev() {
            match entry {
                FormattingEntry::Marker => break,
                FormattingEntry::Element(entry_id) => {
                    if document
                        .get_node_by_id(*entry_id)
                        .is_some_and(|candidate| candidate.matches_tag_and_attrs(node))
                    {
                        matches.push(idx);
                    }
                }
            }
        }
        if matches.len() >= 3 {
            // matches was collected back-to-front, so the last index is the
            // earliest duplicate.
            self.entries.remove(*matches.last().expect("at least three matches"));
        }

        self.entries.push(FormattingEntry::Element(node_id));
    }

    pub fn push_marker(&mut self) {
        self.entries.push(FormattingEntry::Marker);
    }

    /// Pops entries until a marker has been popped or the list is empty.
    pub fn clear_to_last_marker(&mut self) {
        while let Some(entry) = self.entries.pop() {
            if entry == FormattingEntry::Marker {
                break;
            }
        }
    }

    /// Scans from the end for an element with the given tag, stopping at the
    /// first marker.
    pub fn closest_in_scope(&self, document: &Document, tag: TagName) -> Option<NodeId> {
        for entry in self.entries.iter().rev() {
            match entry {
                FormattingEntry::Marker => return None,
                FormattingEntry::Element(node_id) => {
                    if document
                        .get_node_by_id(*node_id)
                        .and_then(|node| node.tag())
                        == Some(tag)
                    {
                        return Some(*node_id);
                    }
                }
            }
        }
        None
    }

    pub fn remove(&mut self, node_id: NodeId) {
        self.entries
            .retain(|&entry| entry != FormattingEntry::Element(node_id));
    }

    pub fn replace(&mut self, old_id: NodeId, new_id: NodeId) {
        if let Some(idx) = self.position(old_id) {
            self.entries[idx] = FormattingEntry::Element(new_id);
        }
    }

    pub fn insert(&mut self, index: usize, node_id: NodeId) {
        self.entries.insert(index, FormattingEntry::Element(node_id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
