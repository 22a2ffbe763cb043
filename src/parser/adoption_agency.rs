//! The adoption agency algorithm: bounded tree surgery that untangles
//! mis-nested formatting elements such as `<b><i></b></i>`. Both loop caps
//! are part of the observable behavior; running into one silently stops the
//! algorithm without an error.

use crate::node::NodeId;
use crate::parser::formatting::FormattingEntry;
use crate::parser::open_elements::Scope;
use crate::parser::Html5Parser;
use crate::tags::TagName;
use crate::tokenizer::TokenSource;

const ADOPTION_AGENCY_OUTER_LOOP_DEPTH: usize = 8;
const ADOPTION_AGENCY_INNER_LOOP_DEPTH: usize = 3;

/// Where the replacement formatting element lands in the active list.
enum Bookmark {
    Replace(NodeId),
    InsertAfter(NodeId),
}

/// Tells the caller whether the algorithm resolved the end tag itself or
/// wants it handled as any other end tag.
#[derive(Debug, PartialEq, Eq)]
pub enum AdoptionResult {
    Completed,
    ProcessAsAnyOther,
}

impl<T: TokenSource> Html5Parser<'_, T> {
    pub(crate) fn run_adoption_agency(&mut self, subject: TagName) -> AdoptionResult {
        // step 2
        if let Some(current_node_id) = self.open_elements.current() {
            let matches_subject = self
                .document
                .get_node_by_id(current_node_id)
                .is_some_and(|node| node.is_html_element(subject));
            if matches_subject && !self.active_formatting_elements.contains(current_node_id) {
                self.open_elements.pop();
                return AdoptionResult::Completed;
            }
        }

        // step 3
        let mut outer_loop_counter = 0;

        // step 4
        loop {
            // step 4.1
            if outer_loop_counter >= ADOPTION_AGENCY_OUTER_LOOP_DEPTH {
                log::warn!("adoption agency gave up on </{subject}> after {outer_loop_counter} iterations");
                return AdoptionResult::Completed;
            }

            // step 4.2
            outer_loop_counter += 1;

            // step 4.3
            let Some(format_elem_node_id) = self
                .active_formatting_elements
                .closest_in_scope(self.document, subject)
            else {
                return AdoptionResult::ProcessAsAnyOther;
            };

            // step 4.4
            let Some(format_elem_stack_position) = self.open_elements.position(format_elem_node_id)
            else {
                self.parse_error("formatting element missing from the stack of open elements");
                self.active_formatting_elements.remove(format_elem_node_id);
                return AdoptionResult::Completed;
            };

            // step 4.5
            if !self.open_elements.is_in_scope(self.document, subject, Scope::Regular) {
                self.parse_error("formatting element not in scope");
                return AdoptionResult::Completed;
            }

            // step 4.6
            if self.open_elements.current() != Some(format_elem_node_id) {
                self.parse_error("formatting element not the current node");
            }

            // step 4.7
            let Some(furthest_block_node_id) =
                self.open_elements.furthest_block(self.document, format_elem_node_id)
            else {
                // step 4.8
                self.open_elements.pop_until_node(format_elem_node_id);
                self.active_formatting_elements.remove(format_elem_node_id);
                return AdoptionResult::Completed;
            };
            let furthest_block_idx = self
                .open_elements
                .position(furthest_block_node_id)
                .expect("furthest block is on the stack");

            // step 4.9
            let common_ancestor = self
                .open_elements
                .get(format_elem_stack_position - 1)
                .expect("formatting element has a stack entry below it");

            // step 4.10
            let mut bookmark = Bookmark::Replace(format_elem_node_id);

            // step 4.11
            let mut node_idx = furthest_block_idx;
            let mut last_node_id = furthest_block_node_id;

            // step 4.12
            let mut inner_loop_counter = 0;

            // step 4.13
            loop {
                // step 4.13.1
                inner_loop_counter += 1;

                // step 4.13.2
                node_idx -= 1;
                let mut node_id = self
                    .open_elements
                    .get(node_idx)
                    .expect("inner loop stays inside the stack");

                // step 4.13.3
                if node_id == format_elem_node_id {
                    break;
                }

                // step 4.13.4
                if inner_loop_counter > ADOPTION_AGENCY_INNER_LOOP_DEPTH {
                    self.active_formatting_elements.remove(node_id);
                    self.open_elements.remove(node_id);
                    continue;
                }

                // step 4.13.5
                let Some(node_list_position) = self.active_formatting_elements.position(node_id)
                else {
                    self.open_elements.remove(node_id);
                    continue;
                };

                // step 4.13.6
                let replacement_id = self.clone_element(node_id);
                self.active_formatting_elements
                    .replace(node_id, replacement_id);
                self.open_elements.replace(node_id, replacement_id);
                debug_assert_eq!(
                    self.active_formatting_elements.get(node_list_position),
                    Some(FormattingEntry::Element(replacement_id))
                );
                node_id = replacement_id;

                // step 4.13.7
                if last_node_id == furthest_block_node_id {
                    bookmark = Bookmark::InsertAfter(node_id);
                }

                // step 4.13.8
                self.document.detach_node(last_node_id);
                self.document.append(last_node_id, node_id);

                // step 4.13.9
                last_node_id = node_id;
            }

            // step 4.14
            self.relocate_node(last_node_id, common_ancestor);

            // step 4.15 / 4.16
            let new_format_node_id = self.clone_element(format_elem_node_id);
            let children = self
                .document
                .get_node_by_id(furthest_block_node_id)
                .map(|node| node.children.clone())
                .unwrap_or_default();
            for child_id in children {
                self.document.append(child_id, new_format_node_id);
            }

            // step 4.17
            self.document.append(new_format_node_id, furthest_block_node_id);

            // step 4.18
            match bookmark {
                Bookmark::Replace(old_id) => {
                    self.active_formatting_elements.replace(old_id, new_format_node_id);
                }
                Bookmark::InsertAfter(previous_id) => {
                    let index = self
                        .active_formatting_elements
                        .position(previous_id)
                        .expect("bookmark still in the active list")
                        + 1;
                    self.active_formatting_elements.insert(index, new_format_node_id);
                    self.active_formatting_elements.remove(format_elem_node_id);
                }
            }

            // step 4.19
            self.open_elements.remove(format_elem_node_id);
            let position = self
                .open_elements
                .position(furthest_block_node_id)
                .expect("furthest block still on the stack");
            self.open_elements.insert(position + 1, new_format_node_id);
        }
    }

    /// Makes a fresh, unattached element with the same tag, namespace and
    /// attributes as the original.
    pub(crate) fn clone_element(&mut self, node_id: NodeId) -> NodeId {
        let node = self
            .document
            .get_node_by_id(node_id)
            .expect("cloned node exists");
        let tag = node.tag().expect("cloned node is an element");
        let namespace = node.namespace().expect("cloned node is an element");
        let attributes = node.attributes().cloned().unwrap_or_default();
        self.document.create_element(tag, namespace, attributes)
    }
}
