//! HTML5 tree construction for the Shrike document engine.
//!
//! This crate is the second half of an HTML5 parser: it consumes a token
//! stream (from any [`tokenizer::TokenSource`]) and builds a DOM tree in a
//! [`document::Document`], following the HTML5 parsing rules for insertion
//! modes, implied tags, mis-nesting recovery (the adoption agency algorithm),
//! foster parenting and foreign (SVG/MathML) content.
//!
//! Malformed input never aborts a parse. Every deviation is recorded as an
//! [`errors::ParseError`] and recovered from, so the output tree is as close
//! as possible to what a browser would build for the same input.
//!
//! ```
//! use shrike_html5::document::Document;
//! use shrike_html5::parser::Html5Parser;
//! use shrike_html5::tags::TagName;
//! use shrike_html5::tokenizer::token::Token;
//! use shrike_html5::tokenizer::TokenQueue;
//!
//! let mut tokenizer = TokenQueue::new(vec![
//!     Token::fake_start_tag(TagName::P),
//!     Token::Text { value: "hello".into() },
//! ]);
//! let mut document = Document::new();
//! let errors = Html5Parser::new(&mut tokenizer, &mut document).parse();
//!
//! // The missing doctype is reported, the tree is built anyway.
//! assert_eq!(errors.len(), 1);
//! assert!(document.to_string().contains("<p>"));
//! ```

pub mod document;
pub mod errors;
pub mod node;
pub mod parser;
pub mod tags;
pub mod tokenizer;

pub use document::Document;
pub use errors::ParseError;
pub use parser::Html5Parser;
