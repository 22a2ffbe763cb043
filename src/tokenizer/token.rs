use std::collections::HashMap;

use crate::tags::TagName;

/// The different token kinds a tokenizer hands to the tree builder.
///
/// Character data arrives as runs, split by the tokenizer into pure
/// whitespace runs ([`Token::Whitespace`]) and runs containing at least one
/// non-whitespace character ([`Token::Text`]). The tree builder never splits
/// a run; where a decision depends on the whole run (table text), the run is
/// buffered, not re-tokenized.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    DocType {
        name: Option<String>,
        force_quirks: bool,
        pub_identifier: Option<String>,
        sys_identifier: Option<String>,
    },
    StartTag {
        name: TagName,
        is_self_closing: bool,
        attributes: HashMap<String, String>,
    },
    EndTag {
        name: TagName,
    },
    Comment {
        value: String,
    },
    Text {
        value: String,
    },
    Whitespace {
        value: String,
    },
    Eof,
}

impl Token {
    /// A synthesized start tag carrying only a name. Used by handlers that
    /// need to act as if a tag had been seen (e.g. an implied `<colgroup>`).
    pub fn fake_start_tag(name: TagName) -> Token {
        Token::StartTag {
            name,
            is_self_closing: false,
            attributes: HashMap::new(),
        }
    }

    /// A synthesized end tag carrying only a name. Used e.g. to close a
    /// stray open `<p>` before a block element is inserted.
    pub fn fake_end_tag(name: TagName) -> Token {
        Token::EndTag { name }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }

    pub fn is_start_tag(&self, tag: TagName) -> bool {
        matches!(self, Token::StartTag { name, .. } if *name == tag)
    }

    pub fn is_any_start_tag(&self) -> bool {
        matches!(self, Token::StartTag { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text { .. } | Token::Whitespace { .. })
    }

    /// Returns true when any of the characters in a text run are NUL.
    pub fn is_null(&self) -> bool {
        match self {
            Token::Text { value } => value.chars().any(|ch| ch == '\0'),
            _ => false,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::DocType {
                name,
                force_quirks,
                pub_identifier,
                sys_identifier,
            } => {
                write!(f, "<!DOCTYPE {}", name.as_deref().unwrap_or(""))?;
                if let Some(pub_id) = pub_identifier {
                    write!(f, " PUBLIC \"{pub_id}\"")?;
                }
                if let Some(sys_id) = sys_identifier {
                    write!(f, " \"{sys_id}\"")?;
                }
                if *force_quirks {
                    write!(f, " FORCE_QUIRKS")?;
                }
                write!(f, ">")
            }
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
            } => {
                write!(f, "StartTag[<{name}")?;
                for (key, value) in attributes.iter() {
                    write!(f, " {key}=\"{value}\"")?;
                }
                if *is_self_closing {
                    write!(f, " /")?;
                }
                write!(f, ">]")
            }
            Token::EndTag { name } => write!(f, "EndTag[</{name}>]"),
            Token::Comment { value } => write!(f, "Comment[<!-- {value} -->]"),
            Token::Text { value } => write!(f, "Text[{value}]"),
            Token::Whitespace { value } => write!(f, "Whitespace[{}]", value.escape_debug()),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_tokens_carry_only_a_name() {
        let token = Token::fake_start_tag(TagName::Colgroup);
        match token {
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
            } => {
                assert_eq!(name, TagName::Colgroup);
                assert!(!is_self_closing);
                assert!(attributes.is_empty());
            }
            _ => panic!("expected a start tag"),
        }
    }

    #[test]
    fn null_detection_only_applies_to_text() {
        assert!(Token::Text {
            value: "a\0b".into()
        }
        .is_null());
        assert!(!Token::Comment {
            value: "a\0b".into()
        }
        .is_null());
    }

    #[test]
    fn display() {
        let token = Token::fake_end_tag(TagName::P);
        assert_eq!(format!("{token}"), "EndTag[</p>]");
    }
}
