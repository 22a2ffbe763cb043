//! The tokenizer-facing boundary of the tree builder.
//!
//! This crate does not contain a lexer. It consumes tokens from anything
//! implementing [`TokenSource`] and, in return, drives that source's lexical
//! state: several start tags (`<script>`, `<textarea>`, `<style>`, ...)
//! switch the tokenizer out of the Data state, which is a parser decision,
//! not a lexer one.

pub mod token;

use crate::tokenizer::token::Token;

/// Lexical states the tree builder can put a tokenizer into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Data,
    RCDATA,
    RAWTEXT,
    ScriptData,
    PLAINTEXT,
}

impl Default for State {
    fn default() -> Self {
        State::Data
    }
}

/// A sequential source of tokens, with a control channel for its lexical
/// state. Implemented by a real tokenizer in the surrounding pipeline and by
/// [`TokenQueue`] for tests and pre-lexed input.
pub trait TokenSource {
    /// Produces the next token. After the underlying input is exhausted this
    /// returns [`Token::Eof`] forever.
    fn next_token(&mut self) -> Token;

    /// Switches the lexical state for subsequent tokens.
    fn set_state(&mut self, state: State);
}

/// A fixed, pre-lexed token sequence.
#[derive(Debug, Default)]
pub struct TokenQueue {
    tokens: std::collections::VecDeque<Token>,
    state: State,
}

impl TokenQueue {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            state: State::Data,
        }
    }

    /// The lexical state the parser last requested. A pre-lexed queue cannot
    /// re-lex, but tests assert against this to check the control channel.
    pub fn state(&self) -> State {
        self.state
    }
}

impl TokenSource for TokenQueue {
    fn next_token(&mut self) -> Token {
        self.tokens.pop_front().unwrap_or(Token::Eof)
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagName;

    #[test]
    fn queue_yields_eof_forever_after_exhaustion() {
        let mut queue = TokenQueue::new(vec![Token::fake_start_tag(TagName::Html)]);
        assert!(queue.next_token().is_any_start_tag());
        assert!(queue.next_token().is_eof());
        assert!(queue.next_token().is_eof());
    }

    #[test]
    fn state_is_recorded() {
        let mut queue = TokenQueue::new(vec![]);
        assert_eq!(queue.state(), State::Data);
        queue.set_state(State::RAWTEXT);
        assert_eq!(queue.state(), State::RAWTEXT);
    }
}
