//! Error handling for the tree builder.
//!
//! Malformed input is never fatal: every deviation is recorded as a
//! [`ParseError`] through the [`ErrorLogger`] and parsing continues with a
//! recovery action. Fallible *document* operations (attribute access on a
//! non-element, unknown handles) return a typed [`DocumentError`].

use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} does not exist in this document")]
    UnknownNode(NodeId),
}

/// A recoverable deviation from well-formed input, recorded at the token
/// where it was noticed.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
    /// Index of the offending token in the stream, starting at 0.
    pub token_index: usize,
}

/// Collects parse errors during one parse. No-op by default; a hook can be
/// installed to observe errors as they happen (error overlays, test
/// harnesses). Shared behind `Rc<RefCell<_>>` so a tokenizer feeding the
/// parser can report into the same sink.
#[derive(Default)]
pub struct ErrorLogger {
    errors: Vec<ParseError>,
    hook: Option<Box<dyn FnMut(&ParseError)>>,
}

impl ErrorLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an observer called once per recorded error.
    pub fn set_hook(&mut self, hook: Box<dyn FnMut(&ParseError)>) {
        self.hook = Some(hook);
    }

    pub fn get_errors(&self) -> Vec<ParseError> {
        self.errors.clone()
    }

    pub fn add_error(&mut self, token_index: usize, message: &str) {
        // A token reprocessed through several modes may trip the same rule
        // twice; keep one record per (token, message).
        for err in &self.errors {
            if err.token_index == token_index && err.message == *message {
                return;
            }
        }

        let error = ParseError {
            message: message.to_string(),
            token_index,
        };
        log::debug!("parse error at token {}: {}", token_index, message);
        if let Some(hook) = self.hook.as_mut() {
            hook(&error);
        }
        self.errors.push(error);
    }
}

impl std::fmt::Debug for ErrorLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLogger")
            .field("errors", &self.errors)
            .field("hook", &self.hook.as_ref().map(|_| "..."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn duplicate_errors_are_collapsed() {
        let mut logger = ErrorLogger::new();
        logger.add_error(3, "stray end tag");
        logger.add_error(3, "stray end tag");
        logger.add_error(4, "stray end tag");
        assert_eq!(logger.get_errors().len(), 2);
    }

    #[test]
    fn hook_sees_every_recorded_error() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut logger = ErrorLogger::new();
        logger.set_hook(Box::new(move |err| sink.borrow_mut().push(err.message.clone())));
        logger.add_error(0, "one");
        logger.add_error(1, "two");
        logger.add_error(1, "two");
        assert_eq!(*seen.borrow(), vec!["one".to_string(), "two".to_string()]);
    }
}
