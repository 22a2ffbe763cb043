//! The tree builder: an insertion-mode state machine that turns a token
//! stream into a DOM tree, with the recovery behavior malformed markup
//! requires. One token is consumed at a time; "lookahead" only ever happens
//! by re-dispatching the same token under a different mode, driven by an
//! explicit reprocess flag and a small synthetic-token queue rather than
//! call-stack recursion.

pub mod adoption_agency;
pub mod attr_replacements;
pub mod formatting;
pub mod helper;
pub mod open_elements;
pub mod quirks;

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::document::Document;
use crate::errors::{ErrorLogger, ParseError};
use crate::node::{Namespace, NodeId, FORMATTING_HTML_ELEMENTS};
use crate::parser::adoption_agency::AdoptionResult;
use crate::parser::attr_replacements::{
    MATHML_ADJUSTMENTS, SVG_ADJUSTMENTS_ATTRIBUTES, SVG_ADJUSTMENTS_TAGS, XML_ADJUSTMENTS,
};
use crate::parser::formatting::{ActiveFormattingElements, FormattingEntry};
use crate::parser::open_elements::{OpenElements, Scope};
use crate::parser::quirks::{identify_quirks_mode, QuirksMode};
use crate::tags::TagName;
use crate::tokenizer::token::Token;
use crate::tokenizer::{State, TokenSource};

/// The named parser states. `InForeignContent` is never stored; it is the
/// per-token effective mode computed when the current node sits in a foreign
/// namespace without an integration-point escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
    InForeignContent,
}

const BLOCK_START_TAGS: [TagName; 25] = [
    TagName::Address,
    TagName::Article,
    TagName::Aside,
    TagName::Blockquote,
    TagName::Center,
    TagName::Details,
    TagName::Dialog,
    TagName::Dir,
    TagName::Div,
    TagName::Dl,
    TagName::Fieldset,
    TagName::Figcaption,
    TagName::Figure,
    TagName::Footer,
    TagName::Header,
    TagName::Hgroup,
    TagName::Main,
    TagName::Menu,
    TagName::Nav,
    TagName::Ol,
    TagName::P,
    TagName::Search,
    TagName::Section,
    TagName::Summary,
    TagName::Ul,
];

const BLOCK_END_TAGS: [TagName; 27] = [
    TagName::Address,
    TagName::Article,
    TagName::Aside,
    TagName::Blockquote,
    TagName::Button,
    TagName::Center,
    TagName::Details,
    TagName::Dialog,
    TagName::Dir,
    TagName::Div,
    TagName::Dl,
    TagName::Fieldset,
    TagName::Figcaption,
    TagName::Figure,
    TagName::Footer,
    TagName::Header,
    TagName::Hgroup,
    TagName::Listing,
    TagName::Main,
    TagName::Menu,
    TagName::Nav,
    TagName::Ol,
    TagName::Pre,
    TagName::Search,
    TagName::Section,
    TagName::Summary,
    TagName::Ul,
];

const HEADING_TAGS: [TagName; 6] = [
    TagName::H1,
    TagName::H2,
    TagName::H3,
    TagName::H4,
    TagName::H5,
    TagName::H6,
];

const HEAD_CONTENT_TAGS: [TagName; 9] = [
    TagName::Base,
    TagName::Basefont,
    TagName::Bgsound,
    TagName::Link,
    TagName::Meta,
    TagName::Noframes,
    TagName::Script,
    TagName::Style,
    TagName::Title,
];

const VOID_START_TAGS: [TagName; 6] = [
    TagName::Area,
    TagName::Br,
    TagName::Embed,
    TagName::Img,
    TagName::Keygen,
    TagName::Wbr,
];

/// Elements that may still be open when the end of the token stream is seen
/// in body content without that being a parse error.
const ACCEPTABLE_OPEN_AT_EOF: [TagName; 16] = [
    TagName::Dd,
    TagName::Dt,
    TagName::Li,
    TagName::Option,
    TagName::Optgroup,
    TagName::P,
    TagName::Rp,
    TagName::Rt,
    TagName::Tbody,
    TagName::Td,
    TagName::Tfoot,
    TagName::Th,
    TagName::Thead,
    TagName::Tr,
    TagName::Body,
    TagName::Html,
];

/// HTML-only start tags that break out of foreign content.
const FOREIGN_BREAKOUT_TAGS: [TagName; 44] = [
    TagName::B,
    TagName::Big,
    TagName::Blockquote,
    TagName::Body,
    TagName::Br,
    TagName::Center,
    TagName::Code,
    TagName::Dd,
    TagName::Div,
    TagName::Dl,
    TagName::Dt,
    TagName::Em,
    TagName::Embed,
    TagName::H1,
    TagName::H2,
    TagName::H3,
    TagName::H4,
    TagName::H5,
    TagName::H6,
    TagName::Head,
    TagName::Hr,
    TagName::I,
    TagName::Img,
    TagName::Li,
    TagName::Listing,
    TagName::Menu,
    TagName::Meta,
    TagName::Nobr,
    TagName::Ol,
    TagName::P,
    TagName::Pre,
    TagName::Ruby,
    TagName::S,
    TagName::Small,
    TagName::Span,
    TagName::Strong,
    TagName::Strike,
    TagName::Sub,
    TagName::Sup,
    TagName::Table,
    TagName::Tt,
    TagName::U,
    TagName::Ul,
    TagName::Var,
];

fn is_html_whitespace(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\x0C' | '\r' | ' ')
}

/// The tree builder. Borrows the tokenizer and the document for the duration
/// of one parse; all intermediate state (stack, formatting list, pending
/// character buffer) lives here and is cleared when parsing finishes.
pub struct Html5Parser<'a, T: TokenSource> {
    tokenizer: &'a mut T,
    document: &'a mut Document,
    insertion_mode: InsertionMode,
    original_insertion_mode: InsertionMode,
    open_elements: OpenElements,
    active_formatting_elements: ActiveFormattingElements,
    current_token: Token,
    reprocess_token: bool,
    token_queue: VecDeque<Token>,
    foster_parenting: bool,
    frameset_ok: bool,
    form_element: Option<NodeId>,
    pending_table_character_tokens: String,
    ack_self_closing: bool,
    error_logger: Rc<RefCell<ErrorLogger>>,
    token_index: usize,
    parser_finished: bool,
}

impl<'a, T: TokenSource> Html5Parser<'a, T> {
    pub fn new(tokenizer: &'a mut T, document: &'a mut Document) -> Self {
        Self {
            tokenizer,
            document,
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::Initial,
            open_elements: OpenElements::new(),
            active_formatting_elements: ActiveFormattingElements::new(),
            current_token: Token::Eof,
            reprocess_token: false,
            token_queue: VecDeque::new(),
            foster_parenting: false,
            frameset_ok: true,
            form_element: None,
            pending_table_character_tokens: String::new(),
            ack_self_closing: false,
            error_logger: Rc::new(RefCell::new(ErrorLogger::new())),
            token_index: 0,
            parser_finished: false,
        }
    }

    /// Shared handle to the error log, e.g. for installing a hook before
    /// parsing starts.
    pub fn error_logger(&self) -> Rc<RefCell<ErrorLogger>> {
        Rc::clone(&self.error_logger)
    }

    /// Runs the parse to completion and returns the collected parse errors.
    /// The built tree is left in the document this parser borrows.
    pub fn parse(&mut self) -> Vec<ParseError> {
        loop {
            if self.parser_finished {
                break;
            }

            if self.reprocess_token {
                self.reprocess_token = false;
            } else if let Some(token) = self.token_queue.pop_front() {
                self.current_token = token;
                self.ack_self_closing = false;
            } else {
                self.current_token = self.tokenizer.next_token();
                self.token_index += 1;
                self.ack_self_closing = false;
            }

            log::trace!("[{:?}] {}", self.insertion_mode, self.current_token);
            self.dispatch();

            if !self.reprocess_token {
                if let Token::StartTag {
                    is_self_closing: true,
                    ..
                } = self.current_token
                {
                    if !self.ack_self_closing {
                        self.parse_error("self closing flag was not acknowledged");
                    }
                }
            }
        }

        self.open_elements.pop_all();
        self.active_formatting_elements.clear();
        self.pending_table_character_tokens.clear();

        self.error_logger.borrow().get_errors()
    }

    pub(crate) fn parse_error(&self, message: &str) {
        self.error_logger.borrow_mut().add_error(self.token_index, message);
    }

    /// Dispatches the current token under its effective mode: foreign
    /// content when the current node calls for it, the stored mode otherwise.
    fn dispatch(&mut self) {
        match self.effective_insertion_mode() {
            InsertionMode::InForeignContent => self.handle_in_foreign_content(),
            mode => self.dispatch_html(mode),
        }
    }

    fn dispatch_html(&mut self, mode: InsertionMode) {
        match mode {
            InsertionMode::Initial => self.handle_initial(),
            InsertionMode::BeforeHtml => self.handle_before_html(),
            InsertionMode::BeforeHead => self.handle_before_head(),
            InsertionMode::InHead => self.handle_in_head(),
            InsertionMode::InHeadNoscript => self.handle_in_head_noscript(),
            InsertionMode::AfterHead => self.handle_after_head(),
            InsertionMode::InBody => self.handle_in_body(),
            InsertionMode::Text => self.handle_text(),
            InsertionMode::InTable => self.handle_in_table(),
            InsertionMode::InTableText => self.handle_in_table_text(),
            InsertionMode::InCaption => self.handle_in_caption(),
            InsertionMode::InColumnGroup => self.handle_in_column_group(),
            InsertionMode::InTableBody => self.handle_in_table_body(),
            InsertionMode::InRow => self.handle_in_row(),
            InsertionMode::InCell => self.handle_in_cell(),
            InsertionMode::InSelect => self.handle_in_select(),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(),
            InsertionMode::AfterBody => self.handle_after_body(),
            InsertionMode::InFrameset => self.handle_in_frameset(),
            InsertionMode::AfterFrameset => self.handle_after_frameset(),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_frameset(),
            InsertionMode::InForeignContent => self.handle_in_foreign_content(),
        }
    }

    /// Recomputes the mode for this token only. The stored mode is never
    /// changed here; exiting foreign content needs no bookkeeping because
    /// this runs fresh for every token.
    fn effective_insertion_mode(&self) -> InsertionMode {
        let Some(current_id) = self.open_elements.current() else {
            return self.insertion_mode;
        };
        let Some(node) = self.document.get_node_by_id(current_id) else {
            return self.insertion_mode;
        };

        if node.is_namespace(Namespace::Html) {
            return self.insertion_mode;
        }
        if node.is_mathml_text_integration_point() {
            match &self.current_token {
                Token::StartTag { name, .. }
                    if !matches!(*name, TagName::Mglyph | TagName::Malignmark) =>
                {
                    return self.insertion_mode;
                }
                Token::Text { .. } | Token::Whitespace { .. } => return self.insertion_mode,
                _ => {}
            }
        }
        if node.is_namespace(Namespace::MathMl)
            && node.tag() == Some(TagName::AnnotationXml)
            && self.current_token.is_start_tag(TagName::Svg)
        {
            return self.insertion_mode;
        }
        if node.is_html_integration_point()
            && (self.current_token.is_any_start_tag() || self.current_token.is_text())
        {
            return self.insertion_mode;
        }
        if self.current_token.is_eof() {
            return self.insertion_mode;
        }

        InsertionMode::InForeignContent
    }

    /// Re-dispatches the current token under a new stored mode on the next
    /// loop iteration.
    fn reprocess_in(&mut self, mode: InsertionMode) {
        self.insertion_mode = mode;
        self.reprocess_token = true;
    }

    /// Acts as if `token` had been seen, then reprocesses the current token.
    /// The synthetic token runs first; the original is queued behind it.
    fn reprocess_with(&mut self, token: Token) {
        let original = std::mem::replace(&mut self.current_token, token);
        self.token_queue.push_front(original);
        self.reprocess_token = true;
    }

    fn stop_parsing(&mut self) {
        self.parser_finished = true;
    }

    fn current_node_tag(&self) -> Option<TagName> {
        self.open_elements
            .current()
            .and_then(|id| self.document.get_node_by_id(id))
            .and_then(|node| node.tag())
    }

    // ------------------------------------------------------------------
    // Mode handlers
    // ------------------------------------------------------------------

    fn handle_initial(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Whitespace { .. } => {
                // ignore
            }
            Token::Comment { value } => {
                self.insert_comment(&value, Some(NodeId::ROOT));
            }
            Token::DocType {
                name,
                force_quirks,
                pub_identifier,
                sys_identifier,
            } => {
                if name.as_deref() != Some("html")
                    || pub_identifier.is_some()
                    || sys_identifier
                        .as_deref()
                        .is_some_and(|sys| sys != "about:legacy-compat")
                {
                    self.parse_error("doctype not allowed in initial insertion mode");
                }
                let doctype_id = self.document.create_doctype(
                    name.as_deref().unwrap_or(""),
                    pub_identifier.as_deref().unwrap_or(""),
                    sys_identifier.as_deref().unwrap_or(""),
                );
                self.document.append(doctype_id, NodeId::ROOT);
                self.document.quirks_mode = identify_quirks_mode(
                    &name,
                    pub_identifier.as_deref(),
                    sys_identifier.as_deref(),
                    force_quirks,
                );
                self.insertion_mode = InsertionMode::BeforeHtml;
            }
            _ => {
                self.parse_error("not a doctype");
                self.document.quirks_mode = QuirksMode::Quirks;
                self.reprocess_in(InsertionMode::BeforeHtml);
            }
        }
    }

    fn handle_before_html(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in before html insertion mode");
            }
            Token::Comment { value } => {
                self.insert_comment(&value, Some(NodeId::ROOT));
            }
            Token::Whitespace { .. } => {
                // ignore
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.insert_html_root(&self.current_token.clone());
                self.insertion_mode = InsertionMode::BeforeHead;
            }
            Token::EndTag { name }
                if name.is_one_of(&[TagName::Head, TagName::Body, TagName::Html, TagName::Br]) =>
            {
                anything_else = true;
            }
            Token::EndTag { .. } => {
                self.parse_error("end tag not allowed in before html insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.insert_html_root(&Token::fake_start_tag(TagName::Html));
            self.reprocess_in(InsertionMode::BeforeHead);
        }
    }

    fn handle_before_head(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::Whitespace { .. } => {
                // ignore
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in before head insertion mode");
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::StartTag {
                name: TagName::Head,
                ..
            } => {
                self.insert_head_element(&self.current_token.clone());
                self.insertion_mode = InsertionMode::InHead;
            }
            Token::EndTag { name }
                if name.is_one_of(&[TagName::Head, TagName::Body, TagName::Html, TagName::Br]) =>
            {
                anything_else = true;
            }
            Token::EndTag { .. } => {
                self.parse_error("end tag not allowed in before head insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.insert_head_element(&Token::fake_start_tag(TagName::Head));
            self.reprocess_in(InsertionMode::InHead);
        }
    }

    fn handle_in_head(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in head insertion mode");
            }
            Token::StartTag { name, .. } => match name {
                TagName::Html => self.handle_in_body(),
                TagName::Base | TagName::Basefont | TagName::Bgsound | TagName::Link | TagName::Meta => {
                    self.insert_html_element(&self.current_token.clone());
                    self.open_elements.pop();
                    self.ack_self_closing = true;
                }
                TagName::Title => {
                    self.parse_rcdata();
                }
                TagName::Noframes | TagName::Style => {
                    self.parse_rawtext();
                }
                TagName::Noscript => {
                    self.insert_html_element(&self.current_token.clone());
                    self.insertion_mode = InsertionMode::InHeadNoscript;
                }
                TagName::Script => {
                    self.insert_html_element(&self.current_token.clone());
                    self.tokenizer.set_state(State::ScriptData);
                    self.original_insertion_mode = self.insertion_mode;
                    self.insertion_mode = InsertionMode::Text;
                }
                TagName::Head => {
                    self.parse_error("head tag not allowed in in head insertion mode");
                }
                _ => anything_else = true,
            },
            Token::EndTag { name } => match name {
                TagName::Head => {
                    self.open_elements.pop_head();
                    self.insertion_mode = InsertionMode::AfterHead;
                }
                TagName::Body | TagName::Html | TagName::Br => anything_else = true,
                _ => {
                    self.parse_error("end tag not allowed in in head insertion mode");
                }
            },
            _ => anything_else = true,
        }

        if anything_else {
            self.open_elements.pop_head();
            self.reprocess_in(InsertionMode::AfterHead);
        }
    }

    fn handle_in_head_noscript(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in head noscript insertion mode");
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::EndTag {
                name: TagName::Noscript,
            } => {
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InHead;
            }
            Token::Whitespace { .. } | Token::Comment { .. } => {
                self.handle_in_head();
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[
                    TagName::Basefont,
                    TagName::Bgsound,
                    TagName::Link,
                    TagName::Meta,
                    TagName::Noframes,
                    TagName::Style,
                ]) =>
            {
                self.handle_in_head();
            }
            Token::EndTag { name: TagName::Br } => {
                anything_else = true;
            }
            Token::StartTag { name, .. } if name.is_one_of(&[TagName::Head, TagName::Noscript]) => {
                self.parse_error("tag not allowed in in head noscript insertion mode");
            }
            Token::EndTag { .. } => {
                self.parse_error("end tag not allowed in in head noscript insertion mode");
            }
            _ => anything_else = true,
        }

        if anything_else {
            self.parse_error("token not allowed in in head noscript insertion mode");
            self.open_elements.pop();
            self.reprocess_in(InsertionMode::InHead);
        }
    }

    fn handle_after_head(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in after head insertion mode");
            }
            Token::StartTag { name, .. } => match name {
                TagName::Html => self.handle_in_body(),
                TagName::Body => {
                    self.insert_body_element(&self.current_token.clone());
                    self.frameset_ok = false;
                    self.insertion_mode = InsertionMode::InBody;
                }
                TagName::Frameset => {
                    self.insert_html_element(&self.current_token.clone());
                    self.insertion_mode = InsertionMode::InFrameset;
                }
                _ if name.is_one_of(&HEAD_CONTENT_TAGS) => {
                    self.parse_error("head-only tag found after the head was closed");
                    let Some(head_id) = self.open_elements.head_element() else {
                        return;
                    };
                    self.open_elements.push(head_id);
                    self.handle_in_head();
                    self.open_elements.remove(head_id);
                }
                TagName::Head => {
                    self.parse_error("head tag not allowed in after head insertion mode");
                }
                _ => anything_else = true,
            },
            Token::EndTag { name } => match name {
                TagName::Body | TagName::Html | TagName::Br => anything_else = true,
                _ => {
                    self.parse_error("end tag not allowed in after head insertion mode");
                }
            },
            _ => anything_else = true,
        }

        if anything_else {
            self.insert_body_element(&Token::fake_start_tag(TagName::Body));
            self.reprocess_in(InsertionMode::InBody);
        }
    }

    fn handle_in_body(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Text { value } => {
                if self.current_token.is_null() {
                    self.parse_error("null character not allowed in in body insertion mode");
                }
                let value = value.replace('\0', "");
                if !value.is_empty() {
                    self.reconstruct_formatting();
                    self.insert_text(&value);
                    self.frameset_ok = false;
                }
            }
            Token::Whitespace { value } => {
                self.reconstruct_formatting();
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in body insertion mode");
            }
            Token::StartTag {
                name: TagName::Html,
                attributes,
                ..
            } => {
                self.parse_error("html tag not allowed in in body insertion mode");
                if let Some(html_id) = self.open_elements.html_element() {
                    self.merge_missing_attributes(html_id, &attributes);
                }
            }
            Token::StartTag { name, .. } if name.is_one_of(&HEAD_CONTENT_TAGS) => {
                self.handle_in_head();
            }
            Token::StartTag {
                name: TagName::Body,
                attributes,
                ..
            } => {
                self.parse_error("body tag not allowed in in body insertion mode");
                if let Some(body_id) = self.open_elements.body_element() {
                    self.frameset_ok = false;
                    self.merge_missing_attributes(body_id, &attributes);
                }
            }
            Token::StartTag {
                name: TagName::Frameset,
                ..
            } => {
                self.parse_error("frameset tag not allowed in in body insertion mode");
                if self.open_elements.body_element().is_none() || !self.frameset_ok {
                    return;
                }
                // The one place the parser discards a node outright: the
                // detached body element is replaced by the frameset.
                if let Some(body_id) = self.open_elements.remove_body() {
                    log::warn!("replacing body element {body_id} with a frameset");
                    self.document.detach_node(body_id);
                }
                while self.open_elements.len() > 1 {
                    if self.open_elements.pop().is_none() {
                        break;
                    }
                }
                self.insert_html_element(&self.current_token.clone());
                self.insertion_mode = InsertionMode::InFrameset;
            }
            Token::Eof => {
                for &node_id in self.open_elements.iter() {
                    let still_acceptable = self
                        .document
                        .get_node_by_id(node_id)
                        .and_then(|node| node.tag())
                        .is_some_and(|tag| tag.is_one_of(&ACCEPTABLE_OPEN_AT_EOF));
                    if !still_acceptable {
                        self.parse_error("unexpected end of file with open elements");
                        break;
                    }
                }
                self.stop_parsing();
            }
            Token::EndTag {
                name: TagName::Body,
            } => {
                if !self.open_elements.is_in_scope(self.document, TagName::Body, Scope::Regular) {
                    self.parse_error("body end tag without body in scope");
                    return;
                }
                self.check_acceptable_open_elements();
                self.insertion_mode = InsertionMode::AfterBody;
            }
            Token::EndTag {
                name: TagName::Html,
            } => {
                if !self.open_elements.is_in_scope(self.document, TagName::Body, Scope::Regular) {
                    self.parse_error("html end tag without body in scope");
                    return;
                }
                self.check_acceptable_open_elements();
                self.reprocess_in(InsertionMode::AfterBody);
            }
            Token::StartTag { name, .. } if name.is_one_of(&BLOCK_START_TAGS) => {
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
            }
            Token::StartTag { name, .. } if name.is_one_of(&HEADING_TAGS) => {
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                if self.current_node_tag().is_some_and(|tag| tag.is_one_of(&HEADING_TAGS)) {
                    self.parse_error("heading tag inside another heading tag");
                    self.open_elements.pop();
                }
                self.insert_html_element(&self.current_token.clone());
            }
            Token::StartTag { name, .. } if name.is_one_of(&[TagName::Pre, TagName::Listing]) => {
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
                self.frameset_ok = false;
            }
            Token::StartTag {
                name: TagName::Form,
                ..
            } => {
                if self.form_element.is_some() {
                    self.parse_error("form tag while another form is open");
                    return;
                }
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                let node_id = self.insert_html_element(&self.current_token.clone());
                self.form_element = Some(node_id);
            }
            Token::StartTag {
                name: TagName::Li, ..
            } => {
                self.frameset_ok = false;
                self.close_open_list_items(&[TagName::Li]);
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
            }
            Token::StartTag { name, .. } if name.is_one_of(&[TagName::Dd, TagName::Dt]) => {
                self.frameset_ok = false;
                self.close_open_list_items(&[TagName::Dd, TagName::Dt]);
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
            }
            Token::StartTag {
                name: TagName::Plaintext,
                ..
            } => {
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
                self.tokenizer.set_state(State::PLAINTEXT);
            }
            Token::StartTag {
                name: TagName::Button,
                ..
            } => {
                if self.open_elements.is_in_scope(self.document, TagName::Button, Scope::Regular) {
                    self.parse_error("button tag while another button is open");
                    self.open_elements.generate_implied_end_tags(self.document, None);
                    self.open_elements.pop_until(self.document, TagName::Button);
                }
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
                self.frameset_ok = false;
            }
            Token::EndTag { name } if name.is_one_of(&BLOCK_END_TAGS) => {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Regular) {
                    self.parse_error("end tag without matching element in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, None);
                if self.current_node_tag() != Some(name) {
                    self.parse_error("end tag closes a different element");
                }
                self.open_elements.pop_until(self.document, name);
            }
            Token::EndTag {
                name: TagName::Form,
            } => {
                let form_id = self.form_element.take();
                let in_scope = form_id.is_some_and(|id| {
                    self.open_elements.contains(id)
                        && self.open_elements.is_in_scope(self.document, TagName::Form, Scope::Regular)
                });
                let Some(form_id) = form_id else {
                    self.parse_error("form end tag without open form");
                    return;
                };
                if !in_scope {
                    self.parse_error("form end tag without form in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, None);
                if self.open_elements.current() != Some(form_id) {
                    self.parse_error("form end tag closes a different element");
                }
                self.open_elements.remove(form_id);
            }
            Token::EndTag { name: TagName::P } => {
                if !self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.parse_error("p end tag without p in button scope");
                    self.insert_html_element(&Token::fake_start_tag(TagName::P));
                }
                self.close_p_element();
            }
            Token::EndTag { name: TagName::Li } => {
                if !self.open_elements.is_in_scope(self.document, TagName::Li, Scope::ListItem) {
                    self.parse_error("li end tag without li in list item scope");
                    return;
                }
                self.open_elements
                    .generate_implied_end_tags(self.document, Some(TagName::Li));
                if self.current_node_tag() != Some(TagName::Li) {
                    self.parse_error("li end tag closes a different element");
                }
                self.open_elements.pop_until(self.document, TagName::Li);
            }
            Token::EndTag { name } if name.is_one_of(&[TagName::Dd, TagName::Dt]) => {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Regular) {
                    self.parse_error("dd or dt end tag without matching element in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, Some(name));
                if self.current_node_tag() != Some(name) {
                    self.parse_error("dd or dt end tag closes a different element");
                }
                self.open_elements.pop_until(self.document, name);
            }
            Token::EndTag { name } if name.is_one_of(&HEADING_TAGS) => {
                let any_heading_open = HEADING_TAGS
                    .iter()
                    .any(|&h| self.open_elements.is_in_scope(self.document, h, Scope::Regular));
                if !any_heading_open {
                    self.parse_error("heading end tag without heading in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, None);
                if self.current_node_tag() != Some(name) {
                    self.parse_error("heading end tag closes a different element");
                }
                self.open_elements.pop_until_any(self.document, &HEADING_TAGS);
            }
            Token::StartTag { name: TagName::A, .. } => {
                if let Some(open_a) = self
                    .active_formatting_elements
                    .closest_in_scope(self.document, TagName::A)
                {
                    self.parse_error("a tag while another a is still active");
                    if self.run_adoption_agency(TagName::A) == AdoptionResult::ProcessAsAnyOther {
                        self.handle_any_other_end_tag(TagName::A);
                    }
                    self.active_formatting_elements.remove(open_a);
                    self.open_elements.remove(open_a);
                }
                self.reconstruct_formatting();
                let node_id = self.insert_html_element(&self.current_token.clone());
                self.active_formatting_elements.push(self.document, node_id);
            }
            Token::StartTag {
                name: TagName::Nobr,
                ..
            } => {
                self.reconstruct_formatting();
                if self.open_elements.is_in_scope(self.document, TagName::Nobr, Scope::Regular) {
                    self.parse_error("nobr tag while another nobr is open");
                    if self.run_adoption_agency(TagName::Nobr) == AdoptionResult::ProcessAsAnyOther {
                        self.handle_any_other_end_tag(TagName::Nobr);
                    }
                    self.reconstruct_formatting();
                }
                let node_id = self.insert_html_element(&self.current_token.clone());
                self.active_formatting_elements.push(self.document, node_id);
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&FORMATTING_HTML_ELEMENTS)
                    && !matches!(name, TagName::A | TagName::Nobr) =>
            {
                self.reconstruct_formatting();
                let node_id = self.insert_html_element(&self.current_token.clone());
                self.active_formatting_elements.push(self.document, node_id);
            }
            Token::EndTag { name } if name.is_one_of(&FORMATTING_HTML_ELEMENTS) => {
                if self.run_adoption_agency(name) == AdoptionResult::ProcessAsAnyOther {
                    self.handle_any_other_end_tag(name);
                }
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[TagName::Applet, TagName::Marquee, TagName::Object]) =>
            {
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
                self.active_formatting_elements.push_marker();
                self.frameset_ok = false;
            }
            Token::EndTag { name }
                if name.is_one_of(&[TagName::Applet, TagName::Marquee, TagName::Object]) =>
            {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Regular) {
                    self.parse_error("end tag without matching element in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, None);
                if self.current_node_tag() != Some(name) {
                    self.parse_error("end tag closes a different element");
                }
                self.open_elements.pop_until(self.document, name);
                self.active_formatting_elements.clear_to_last_marker();
            }
            Token::StartTag {
                name: TagName::Table,
                ..
            } => {
                if self.document.quirks_mode != QuirksMode::Quirks
                    && self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button)
                {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::EndTag { name: TagName::Br } => {
                self.parse_error("br end tag treated as br start tag");
                self.reconstruct_formatting();
                self.insert_html_element(&Token::fake_start_tag(TagName::Br));
                self.open_elements.pop();
                self.frameset_ok = false;
            }
            Token::StartTag { name, .. } if name.is_one_of(&VOID_START_TAGS) => {
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();
                self.ack_self_closing = true;
                self.frameset_ok = false;
            }
            Token::StartTag {
                name: TagName::Input,
                ref attributes,
                ..
            } => {
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();
                self.ack_self_closing = true;
                let hidden = attributes
                    .get("type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("hidden"));
                if !hidden {
                    self.frameset_ok = false;
                }
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[TagName::Param, TagName::Source, TagName::Track]) =>
            {
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();
                self.ack_self_closing = true;
            }
            Token::StartTag { name: TagName::Hr, .. } => {
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();
                self.ack_self_closing = true;
                self.frameset_ok = false;
            }
            Token::StartTag {
                name: TagName::Image,
                is_self_closing,
                attributes,
            } => {
                self.parse_error("image tag should be img");
                self.current_token = Token::StartTag {
                    name: TagName::Img,
                    is_self_closing,
                    attributes,
                };
                self.reprocess_token = true;
            }
            Token::StartTag {
                name: TagName::Textarea,
                ..
            } => {
                self.insert_html_element(&self.current_token.clone());
                self.tokenizer.set_state(State::RCDATA);
                self.original_insertion_mode = self.insertion_mode;
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::Text;
            }
            Token::StartTag { name: TagName::Xmp, .. } => {
                if self.open_elements.is_in_scope(self.document, TagName::P, Scope::Button) {
                    self.close_p_element();
                }
                self.reconstruct_formatting();
                self.frameset_ok = false;
                self.parse_rawtext();
            }
            Token::StartTag {
                name: TagName::Iframe,
                ..
            } => {
                self.frameset_ok = false;
                self.parse_rawtext();
            }
            Token::StartTag {
                name: TagName::Noembed,
                ..
            } => {
                self.parse_rawtext();
            }
            Token::StartTag {
                name: TagName::Select,
                ..
            } => {
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
                self.frameset_ok = false;
                self.insertion_mode = match self.insertion_mode {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                };
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[TagName::Optgroup, TagName::Option]) =>
            {
                if self.current_node_tag() == Some(TagName::Option) {
                    self.open_elements.pop();
                }
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
            }
            Token::StartTag { name, .. } if name.is_one_of(&[TagName::Rp, TagName::Rt]) => {
                if self.open_elements.is_in_scope(self.document, TagName::Ruby, Scope::Regular) {
                    self.open_elements.generate_implied_end_tags(self.document, None);
                    if self.current_node_tag() != Some(TagName::Ruby) {
                        self.parse_error("rp or rt tag outside a ruby element");
                    }
                }
                self.insert_html_element(&self.current_token.clone());
            }
            Token::StartTag {
                name: TagName::Math,
                ..
            } => {
                self.reconstruct_formatting();
                let mut token = self.current_token.clone();
                if let Token::StartTag { attributes, .. } = &mut token {
                    Self::adjust_mathml_attributes(attributes);
                    Self::adjust_foreign_attributes(attributes);
                }
                self.insert_foreign_element(&token, Namespace::MathMl);
                if matches!(token, Token::StartTag { is_self_closing: true, .. }) {
                    self.open_elements.pop();
                    self.ack_self_closing = true;
                }
            }
            Token::StartTag { name: TagName::Svg, .. } => {
                self.reconstruct_formatting();
                let mut token = self.current_token.clone();
                if let Token::StartTag { attributes, .. } = &mut token {
                    Self::adjust_svg_attributes(attributes);
                    Self::adjust_foreign_attributes(attributes);
                }
                self.insert_foreign_element(&token, Namespace::Svg);
                if matches!(token, Token::StartTag { is_self_closing: true, .. }) {
                    self.open_elements.pop();
                    self.ack_self_closing = true;
                }
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Frame,
                    TagName::Head,
                    TagName::Tbody,
                    TagName::Td,
                    TagName::Tfoot,
                    TagName::Th,
                    TagName::Thead,
                    TagName::Tr,
                ]) =>
            {
                self.parse_error("tag not allowed in in body insertion mode");
            }
            Token::StartTag { .. } => {
                self.reconstruct_formatting();
                self.insert_html_element(&self.current_token.clone());
            }
            Token::EndTag { name } => {
                self.handle_any_other_end_tag(name);
            }
        }
    }

    /// The "any other end tag" steps for body content, shared with the
    /// adoption agency's not-in-list exit.
    fn handle_any_other_end_tag(&mut self, subject: TagName) {
        let mut idx = self.open_elements.len();
        while idx > 0 {
            idx -= 1;
            let Some(node_id) = self.open_elements.get(idx) else {
                return;
            };
            let Some(node) = self.document.get_node_by_id(node_id) else {
                return;
            };
            if node.is_html_element(subject) {
                self.open_elements
                    .generate_implied_end_tags(self.document, Some(subject));
                if self.open_elements.current() != Some(node_id) {
                    self.parse_error("end tag closes a different element");
                }
                self.open_elements.pop_until_node(node_id);
                return;
            }
            if node.is_special() {
                self.parse_error("end tag without matching open element");
                return;
            }
        }
    }

    fn handle_text(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Text { value } | Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Eof => {
                self.parse_error("unexpected end of file in raw text element");
                self.open_elements.pop();
                self.reprocess_in(self.original_insertion_mode);
            }
            _ => {
                self.open_elements.pop();
                self.insertion_mode = self.original_insertion_mode;
            }
        }
    }

    fn handle_in_table(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::Text { .. } | Token::Whitespace { .. }
                if self.current_node_tag().is_some_and(|tag| {
                    tag.is_one_of(&[
                        TagName::Table,
                        TagName::Tbody,
                        TagName::Tfoot,
                        TagName::Thead,
                        TagName::Tr,
                    ])
                }) =>
            {
                self.pending_table_character_tokens.clear();
                self.original_insertion_mode = self.insertion_mode;
                self.reprocess_in(InsertionMode::InTableText);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in table insertion mode");
            }
            Token::StartTag { name, .. } => match name {
                TagName::Caption => {
                    self.clear_stack_back_to_table_context();
                    self.active_formatting_elements.push_marker();
                    self.insert_html_element(&self.current_token.clone());
                    self.insertion_mode = InsertionMode::InCaption;
                }
                TagName::Colgroup => {
                    self.clear_stack_back_to_table_context();
                    self.insert_html_element(&self.current_token.clone());
                    self.insertion_mode = InsertionMode::InColumnGroup;
                }
                TagName::Col => {
                    self.clear_stack_back_to_table_context();
                    self.reprocess_with(Token::fake_start_tag(TagName::Colgroup));
                }
                TagName::Tbody | TagName::Tfoot | TagName::Thead => {
                    self.clear_stack_back_to_table_context();
                    self.insert_html_element(&self.current_token.clone());
                    self.insertion_mode = InsertionMode::InTableBody;
                }
                TagName::Td | TagName::Th | TagName::Tr => {
                    self.clear_stack_back_to_table_context();
                    self.reprocess_with(Token::fake_start_tag(TagName::Tbody));
                }
                TagName::Table => {
                    self.parse_error("table tag inside an open table");
                    if self.open_elements.is_in_scope(self.document, TagName::Table, Scope::Table) {
                        self.open_elements.pop_until(self.document, TagName::Table);
                        self.reset_insertion_mode();
                        self.reprocess_token = true;
                    }
                }
                TagName::Style | TagName::Script => {
                    self.handle_in_head();
                }
                TagName::Input => {
                    let hidden = matches!(
                        &self.current_token,
                        Token::StartTag { attributes, .. }
                            if attributes.get("type").is_some_and(|v| v.eq_ignore_ascii_case("hidden"))
                    );
                    if hidden {
                        self.parse_error("hidden input inside table structure");
                        self.insert_html_element(&self.current_token.clone());
                        self.open_elements.pop();
                        self.ack_self_closing = true;
                    } else {
                        anything_else = true;
                    }
                }
                TagName::Form => {
                    self.parse_error("form tag inside table structure");
                    if self.form_element.is_none() {
                        let node_id = self.insert_html_element(&self.current_token.clone());
                        self.form_element = Some(node_id);
                        self.open_elements.pop();
                    }
                }
                _ => anything_else = true,
            },
            Token::EndTag { name } => match name {
                TagName::Table => {
                    if !self.open_elements.is_in_scope(self.document, TagName::Table, Scope::Table) {
                        self.parse_error("table end tag without table in scope");
                        return;
                    }
                    self.open_elements.pop_until(self.document, TagName::Table);
                    self.reset_insertion_mode();
                }
                TagName::Body
                | TagName::Caption
                | TagName::Col
                | TagName::Colgroup
                | TagName::Html
                | TagName::Tbody
                | TagName::Td
                | TagName::Tfoot
                | TagName::Th
                | TagName::Thead
                | TagName::Tr => {
                    self.parse_error("end tag not allowed in in table insertion mode");
                }
                _ => anything_else = true,
            },
            Token::Eof => {
                self.handle_in_body();
            }
            _ => anything_else = true,
        }

        if anything_else {
            self.parse_error("token relocated out of table structure");
            self.foster_parenting = true;
            self.handle_in_body();
            self.foster_parenting = false;
        }
    }

    fn handle_in_table_text(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Text { value } => {
                if self.current_token.is_null() {
                    self.parse_error("null character not allowed in table text");
                }
                self.pending_table_character_tokens.push_str(&value.replace('\0', ""));
            }
            Token::Whitespace { value } => {
                self.pending_table_character_tokens.push_str(&value);
            }
            _ => {
                // The run is over; decide for the run as a whole.
                let pending = std::mem::take(&mut self.pending_table_character_tokens);
                if !pending.is_empty() {
                    if pending.chars().all(is_html_whitespace) {
                        self.insert_text(&pending);
                    } else {
                        self.parse_error("non whitespace text inside table structure");
                        self.foster_parenting = true;
                        self.reconstruct_formatting();
                        self.insert_text(&pending);
                        self.foster_parenting = false;
                        self.frameset_ok = false;
                    }
                }
                self.reprocess_in(self.original_insertion_mode);
            }
        }
    }

    fn handle_in_caption(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::EndTag {
                name: TagName::Caption,
            } => {
                if !self.open_elements.is_in_scope(self.document, TagName::Caption, Scope::Table) {
                    self.parse_error("caption end tag without caption in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, None);
                if self.current_node_tag() != Some(TagName::Caption) {
                    self.parse_error("caption end tag closes a different element");
                }
                self.open_elements.pop_until(self.document, TagName::Caption);
                self.active_formatting_elements.clear_to_last_marker();
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Tbody,
                    TagName::Td,
                    TagName::Tfoot,
                    TagName::Th,
                    TagName::Thead,
                    TagName::Tr,
                ]) =>
            {
                self.parse_error("tag implicitly closes the open caption");
                if self.open_elements.is_in_scope(self.document, TagName::Caption, Scope::Table) {
                    self.reprocess_with(Token::fake_end_tag(TagName::Caption));
                }
            }
            Token::EndTag {
                name: TagName::Table,
            } => {
                self.parse_error("table end tag implicitly closes the open caption");
                if self.open_elements.is_in_scope(self.document, TagName::Caption, Scope::Table) {
                    self.reprocess_with(Token::fake_end_tag(TagName::Caption));
                }
            }
            Token::EndTag { name }
                if name.is_one_of(&[
                    TagName::Body,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Html,
                    TagName::Tbody,
                    TagName::Td,
                    TagName::Tfoot,
                    TagName::Th,
                    TagName::Thead,
                    TagName::Tr,
                ]) =>
            {
                self.parse_error("end tag not allowed in in caption insertion mode");
            }
            _ => {
                self.handle_in_body();
            }
        }
    }

    fn handle_in_column_group(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;
        match token {
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in column group insertion mode");
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::StartTag { name: TagName::Col, .. } => {
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();
                self.ack_self_closing = true;
            }
            Token::EndTag {
                name: TagName::Colgroup,
            } => {
                if self.current_node_tag() != Some(TagName::Colgroup) {
                    self.parse_error("colgroup end tag without open colgroup");
                    return;
                }
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::EndTag { name: TagName::Col } => {
                self.parse_error("col end tag has no meaning");
            }
            Token::Eof => {
                self.handle_in_body();
            }
            _ => anything_else = true,
        }

        if anything_else {
            if self.current_node_tag() != Some(TagName::Colgroup) {
                self.parse_error("token not allowed in in column group insertion mode");
                return;
            }
            self.open_elements.pop();
            self.reprocess_in(InsertionMode::InTable);
        }
    }

    fn handle_in_table_body(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::StartTag { name: TagName::Tr, .. } => {
                self.clear_stack_back_to_table_body_context();
                self.insert_html_element(&self.current_token.clone());
                self.insertion_mode = InsertionMode::InRow;
            }
            Token::StartTag { name, .. } if name.is_one_of(&[TagName::Td, TagName::Th]) => {
                self.parse_error("cell tag directly inside a table section");
                self.clear_stack_back_to_table_body_context();
                self.reprocess_with(Token::fake_start_tag(TagName::Tr));
            }
            Token::EndTag { name }
                if name.is_one_of(&[TagName::Tbody, TagName::Tfoot, TagName::Thead]) =>
            {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Table) {
                    self.parse_error("table section end tag without matching section in scope");
                    return;
                }
                self.clear_stack_back_to_table_body_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Tbody,
                    TagName::Tfoot,
                    TagName::Thead,
                ]) =>
            {
                self.close_table_section_then_reprocess();
            }
            Token::EndTag {
                name: TagName::Table,
            } => {
                self.close_table_section_then_reprocess();
            }
            Token::EndTag { name }
                if name.is_one_of(&[
                    TagName::Body,
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Html,
                    TagName::Td,
                    TagName::Th,
                    TagName::Tr,
                ]) =>
            {
                self.parse_error("end tag not allowed in in table body insertion mode");
            }
            _ => {
                self.handle_in_table();
            }
        }
    }

    fn close_table_section_then_reprocess(&mut self) {
        let any_section_open = [TagName::Tbody, TagName::Tfoot, TagName::Thead]
            .iter()
            .any(|&tag| self.open_elements.is_in_scope(self.document, tag, Scope::Table));
        if !any_section_open {
            self.parse_error("tag closes a table section that is not open");
            return;
        }
        self.clear_stack_back_to_table_body_context();
        self.open_elements.pop();
        self.reprocess_in(InsertionMode::InTable);
    }

    fn handle_in_row(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::StartTag { name, .. } if name.is_one_of(&[TagName::Td, TagName::Th]) => {
                self.clear_stack_back_to_table_row_context();
                self.insert_html_element(&self.current_token.clone());
                self.insertion_mode = InsertionMode::InCell;
                self.active_formatting_elements.push_marker();
            }
            Token::EndTag { name: TagName::Tr } => {
                if !self.open_elements.is_in_scope(self.document, TagName::Tr, Scope::Table) {
                    self.parse_error("tr end tag without tr in scope");
                    return;
                }
                self.clear_stack_back_to_table_row_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTableBody;
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Tbody,
                    TagName::Tfoot,
                    TagName::Thead,
                    TagName::Tr,
                ]) =>
            {
                self.close_row_then_reprocess();
            }
            Token::EndTag {
                name: TagName::Table,
            } => {
                self.close_row_then_reprocess();
            }
            Token::EndTag { name }
                if name.is_one_of(&[TagName::Tbody, TagName::Tfoot, TagName::Thead]) =>
            {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Table) {
                    self.parse_error("table section end tag without matching section in scope");
                    return;
                }
                self.close_row_then_reprocess();
            }
            Token::EndTag { name }
                if name.is_one_of(&[
                    TagName::Body,
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Html,
                    TagName::Td,
                    TagName::Th,
                ]) =>
            {
                self.parse_error("end tag not allowed in in row insertion mode");
            }
            _ => {
                self.handle_in_table();
            }
        }
    }

    fn close_row_then_reprocess(&mut self) {
        if !self.open_elements.is_in_scope(self.document, TagName::Tr, Scope::Table) {
            self.parse_error("tag closes a table row that is not open");
            return;
        }
        self.clear_stack_back_to_table_row_context();
        self.open_elements.pop();
        self.reprocess_in(InsertionMode::InTableBody);
    }

    fn handle_in_cell(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::EndTag { name } if name.is_one_of(&[TagName::Td, TagName::Th]) => {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Table) {
                    self.parse_error("cell end tag without matching cell in scope");
                    return;
                }
                self.open_elements.generate_implied_end_tags(self.document, None);
                if self.current_node_tag() != Some(name) {
                    self.parse_error("cell end tag closes a different element");
                }
                self.open_elements.pop_until(self.document, name);
                self.active_formatting_elements.clear_to_last_marker();
                self.insertion_mode = InsertionMode::InRow;
            }
            Token::StartTag { name, .. }
                if name.is_one_of(&[
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Tbody,
                    TagName::Td,
                    TagName::Tfoot,
                    TagName::Th,
                    TagName::Thead,
                    TagName::Tr,
                ]) =>
            {
                let cell_open = [TagName::Td, TagName::Th]
                    .iter()
                    .any(|&tag| self.open_elements.is_in_scope(self.document, tag, Scope::Table));
                if !cell_open {
                    self.parse_error("tag closes a table cell that is not open");
                    return;
                }
                self.close_cell();
                self.reprocess_token = true;
            }
            Token::EndTag { name }
                if name.is_one_of(&[
                    TagName::Body,
                    TagName::Caption,
                    TagName::Col,
                    TagName::Colgroup,
                    TagName::Html,
                ]) =>
            {
                self.parse_error("end tag not allowed in in cell insertion mode");
            }
            Token::EndTag { name }
                if name.is_one_of(&[
                    TagName::Table,
                    TagName::Tbody,
                    TagName::Tfoot,
                    TagName::Thead,
                    TagName::Tr,
                ]) =>
            {
                if !self.open_elements.is_in_scope(self.document, name, Scope::Table) {
                    self.parse_error("end tag without matching element in table scope");
                    return;
                }
                self.close_cell();
                self.reprocess_token = true;
            }
            _ => {
                self.handle_in_body();
            }
        }
    }

    /// Closes the open cell and switches back to row content.
    fn close_cell(&mut self) {
        self.open_elements.generate_implied_end_tags(self.document, None);
        if !self
            .current_node_tag()
            .is_some_and(|tag| tag.is_one_of(&[TagName::Td, TagName::Th]))
        {
            self.parse_error("current node should be a table cell");
        }
        self.open_elements
            .pop_until_any(self.document, &[TagName::Td, TagName::Th]);
        self.active_formatting_elements.clear_to_last_marker();
        self.insertion_mode = InsertionMode::InRow;
    }

    fn handle_in_select(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Text { value } => {
                if self.current_token.is_null() {
                    self.parse_error("null character not allowed in in select insertion mode");
                }
                let value = value.replace('\0', "");
                if !value.is_empty() {
                    self.insert_text(&value);
                }
            }
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in select insertion mode");
            }
            Token::StartTag { name, .. } => match name {
                TagName::Html => self.handle_in_body(),
                TagName::Option => {
                    if self.current_node_tag() == Some(TagName::Option) {
                        self.open_elements.pop();
                    }
                    self.insert_html_element(&self.current_token.clone());
                }
                TagName::Optgroup => {
                    if self.current_node_tag() == Some(TagName::Option) {
                        self.open_elements.pop();
                    }
                    if self.current_node_tag() == Some(TagName::Optgroup) {
                        self.open_elements.pop();
                    }
                    self.insert_html_element(&self.current_token.clone());
                }
                TagName::Select => {
                    self.parse_error("select tag inside an open select");
                    if self.open_elements.is_in_scope(self.document, TagName::Select, Scope::Select) {
                        self.open_elements.pop_until(self.document, TagName::Select);
                        self.reset_insertion_mode();
                    }
                }
                TagName::Input | TagName::Keygen | TagName::Textarea => {
                    self.parse_error("tag implicitly closes the open select");
                    if self.open_elements.is_in_scope(self.document, TagName::Select, Scope::Select) {
                        self.open_elements.pop_until(self.document, TagName::Select);
                        self.reset_insertion_mode();
                        self.reprocess_token = true;
                    }
                }
                TagName::Script => self.handle_in_head(),
                _ => {
                    self.parse_error("tag not allowed in in select insertion mode");
                }
            },
            Token::EndTag { name } => match name {
                TagName::Optgroup => {
                    if self.current_node_tag() == Some(TagName::Option)
                        && self.open_elements.len() >= 2
                    {
                        let below = self
                            .open_elements
                            .get(self.open_elements.len() - 2)
                            .and_then(|id| self.document.get_node_by_id(id))
                            .and_then(|node| node.tag());
                        if below == Some(TagName::Optgroup) {
                            self.open_elements.pop();
                        }
                    }
                    if self.current_node_tag() == Some(TagName::Optgroup) {
                        self.open_elements.pop();
                    } else {
                        self.parse_error("optgroup end tag without open optgroup");
                    }
                }
                TagName::Option => {
                    if self.current_node_tag() == Some(TagName::Option) {
                        self.open_elements.pop();
                    } else {
                        self.parse_error("option end tag without open option");
                    }
                }
                TagName::Select => {
                    if !self.open_elements.is_in_scope(self.document, TagName::Select, Scope::Select) {
                        self.parse_error("select end tag without select in scope");
                        return;
                    }
                    self.open_elements.pop_until(self.document, TagName::Select);
                    self.reset_insertion_mode();
                }
                _ => {
                    self.parse_error("end tag not allowed in in select insertion mode");
                }
            },
            Token::Eof => {
                self.handle_in_body();
            }
        }
    }

    fn handle_in_select_in_table(&mut self) {
        let token = self.current_token.clone();
        let table_parts = [
            TagName::Caption,
            TagName::Table,
            TagName::Tbody,
            TagName::Tfoot,
            TagName::Thead,
            TagName::Tr,
            TagName::Td,
            TagName::Th,
        ];
        match token {
            Token::StartTag { name, .. } if name.is_one_of(&table_parts) => {
                self.parse_error("table tag implicitly closes the open select");
                self.open_elements.pop_until(self.document, TagName::Select);
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::EndTag { name } if name.is_one_of(&table_parts) => {
                self.parse_error("table end tag inside an open select");
                if !self.open_elements.is_in_scope(self.document, name, Scope::Table) {
                    return;
                }
                self.open_elements.pop_until(self.document, TagName::Select);
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            _ => {
                self.handle_in_select();
            }
        }
    }

    fn handle_after_body(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Whitespace { .. } => {
                self.handle_in_body();
            }
            Token::Comment { value } => {
                let html_id = self.open_elements.html_element();
                self.insert_comment(&value, html_id);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in after body insertion mode");
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::EndTag {
                name: TagName::Html,
            } => {
                self.insertion_mode = InsertionMode::AfterAfterBody;
            }
            Token::Eof => {
                self.stop_parsing();
            }
            _ => {
                self.parse_error("token not allowed in after body insertion mode");
                self.reprocess_in(InsertionMode::InBody);
            }
        }
    }

    fn handle_in_frameset(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in in frameset insertion mode");
            }
            Token::StartTag { name, .. } => match name {
                TagName::Html => self.handle_in_body(),
                TagName::Frameset => {
                    self.insert_html_element(&self.current_token.clone());
                }
                TagName::Frame => {
                    self.insert_html_element(&self.current_token.clone());
                    self.open_elements.pop();
                    self.ack_self_closing = true;
                }
                TagName::Noframes => self.handle_in_head(),
                _ => {
                    self.parse_error("tag not allowed in in frameset insertion mode");
                }
            },
            Token::EndTag {
                name: TagName::Frameset,
            } => {
                if self.current_node_tag() == Some(TagName::Html) {
                    self.parse_error("frameset end tag on the root frameset");
                    return;
                }
                self.open_elements.pop();
                if self.current_node_tag() != Some(TagName::Frameset) {
                    self.insertion_mode = InsertionMode::AfterFrameset;
                }
            }
            Token::EndTag { .. } => {
                self.parse_error("end tag not allowed in in frameset insertion mode");
            }
            Token::Eof => {
                if self.current_node_tag() != Some(TagName::Html) {
                    self.parse_error("unexpected end of file inside a frameset");
                }
                self.stop_parsing();
            }
            _ => {
                self.parse_error("token not allowed in in frameset insertion mode");
            }
        }
    }

    fn handle_after_frameset(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in after frameset insertion mode");
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::EndTag {
                name: TagName::Html,
            } => {
                self.insertion_mode = InsertionMode::AfterAfterFrameset;
            }
            Token::StartTag {
                name: TagName::Noframes,
                ..
            } => {
                self.handle_in_head();
            }
            Token::Eof => {
                self.stop_parsing();
            }
            _ => {
                self.parse_error("token not allowed in after frameset insertion mode");
            }
        }
    }

    fn handle_after_after_body(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Comment { value } => {
                self.insert_comment(&value, Some(NodeId::ROOT));
            }
            Token::DocType { .. } | Token::Whitespace { .. } => {
                self.handle_in_body();
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::Eof => {
                self.stop_parsing();
            }
            _ => {
                self.parse_error("token not allowed after the document ended");
                self.reprocess_in(InsertionMode::InBody);
            }
        }
    }

    fn handle_after_after_frameset(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Comment { value } => {
                self.insert_comment(&value, Some(NodeId::ROOT));
            }
            Token::DocType { .. } | Token::Whitespace { .. } => {
                self.handle_in_body();
            }
            Token::StartTag {
                name: TagName::Html,
                ..
            } => {
                self.handle_in_body();
            }
            Token::StartTag {
                name: TagName::Noframes,
                ..
            } => {
                self.handle_in_head();
            }
            Token::Eof => {
                self.stop_parsing();
            }
            _ => {
                self.parse_error("token not allowed after the document ended");
            }
        }
    }

    fn handle_in_foreign_content(&mut self) {
        let token = self.current_token.clone();
        match token {
            Token::Whitespace { value } => {
                self.insert_text(&value);
            }
            Token::Text { value } => {
                if self.current_token.is_null() {
                    self.parse_error("null character in foreign content");
                }
                self.insert_text(&value.replace('\0', "\u{FFFD}"));
                self.frameset_ok = false;
            }
            Token::Comment { value } => {
                self.insert_comment(&value, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in foreign content");
            }
            Token::StartTag {
                name, ref attributes, ..
            } if name.is_one_of(&FOREIGN_BREAKOUT_TAGS)
                || (name == TagName::Font
                    && ["color", "face", "size"]
                        .iter()
                        .any(|attr| attributes.contains_key(*attr))) =>
            {
                self.parse_error("html tag not allowed in foreign content");
                self.pop_until_html_boundary();
                self.reprocess_token = true;
            }
            Token::EndTag { name } if name.is_one_of(&[TagName::Br, TagName::P]) => {
                self.parse_error("html end tag not allowed in foreign content");
                self.pop_until_html_boundary();
                self.reprocess_token = true;
            }
            Token::StartTag { .. } => {
                let namespace = self
                    .open_elements
                    .current()
                    .and_then(|id| self.document.get_node_by_id(id))
                    .and_then(|node| node.namespace())
                    .unwrap_or(Namespace::Html);

                let mut token = self.current_token.clone();
                if let Token::StartTag { name, attributes, .. } = &mut token {
                    match namespace {
                        Namespace::Svg => {
                            if let Some(&canonical) = SVG_ADJUSTMENTS_TAGS.get(name.as_str()) {
                                *name = TagName::from_name(canonical);
                            }
                            Self::adjust_svg_attributes(attributes);
                        }
                        Namespace::MathMl => {
                            Self::adjust_mathml_attributes(attributes);
                        }
                        Namespace::Html => {}
                    }
                    Self::adjust_foreign_attributes(attributes);
                }

                self.insert_foreign_element(&token, namespace);
                if matches!(token, Token::StartTag { is_self_closing: true, .. }) {
                    self.open_elements.pop();
                    self.ack_self_closing = true;
                }
            }
            Token::EndTag { name } => {
                self.foreign_content_end_tag(name);
            }
            Token::Eof => {
                // Effective-mode recomputation routes EOF through the stored
                // mode, so this arm is unreachable in practice.
                self.stop_parsing();
            }
        }
    }

    /// Pops foreign elements until the current node is an HTML element or an
    /// integration point, so the breakout token can be handled as HTML.
    fn pop_until_html_boundary(&mut self) {
        while let Some(current_id) = self.open_elements.current() {
            let Some(node) = self.document.get_node_by_id(current_id) else {
                break;
            };
            if node.is_namespace(Namespace::Html)
                || node.is_mathml_text_integration_point()
                || node.is_html_integration_point()
            {
                break;
            }
            if self.open_elements.pop().is_none() {
                break;
            }
        }
    }

    /// Foreign-content end tags match case-insensitively against the open
    /// elements; crossing into an HTML ancestor hands the token back to the
    /// stored mode.
    fn foreign_content_end_tag(&mut self, subject: TagName) {
        let matches_subject = |tag: Option<TagName>| {
            tag.is_some_and(|tag| tag.as_str().eq_ignore_ascii_case(subject.as_str()))
        };

        if !matches_subject(self.current_node_tag()) {
            self.parse_error("end tag does not match the current foreign element");
        }

        let mut idx = self.open_elements.len();
        while idx > 0 {
            idx -= 1;
            let Some(node_id) = self.open_elements.get(idx) else {
                return;
            };
            if idx == 0 {
                return;
            }
            let node_tag = self
                .document
                .get_node_by_id(node_id)
                .and_then(|node| node.tag());
            if matches_subject(node_tag) {
                self.open_elements.pop_until_node(node_id);
                return;
            }
            let below_is_html = self
                .open_elements
                .get(idx - 1)
                .and_then(|id| self.document.get_node_by_id(id))
                .is_some_and(|node| node.is_namespace(Namespace::Html));
            if below_is_html {
                self.dispatch_html(self.insertion_mode);
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    /// Closes an open `<p>`: implied end tags except p, then pop through p.
    fn close_p_element(&mut self) {
        self.open_elements
            .generate_implied_end_tags(self.document, Some(TagName::P));
        if self.current_node_tag() != Some(TagName::P) {
            self.parse_error("closing p closes a different element");
        }
        self.open_elements.pop_until(self.document, TagName::P);
    }

    /// The shared li/dd/dt step: close a still-open item of the same kind,
    /// stopping at special elements other than address, div and p.
    fn close_open_list_items(&mut self, item_tags: &[TagName]) {
        let mut idx = self.open_elements.len();
        while idx > 0 {
            idx -= 1;
            let Some(node_id) = self.open_elements.get(idx) else {
                return;
            };
            let Some(node) = self.document.get_node_by_id(node_id) else {
                return;
            };
            let Some(tag) = node.tag() else {
                return;
            };
            if tag.is_one_of(item_tags) {
                self.open_elements.generate_implied_end_tags(self.document, Some(tag));
                if self.current_node_tag() != Some(tag) {
                    self.parse_error("list item closed while other elements were open");
                }
                self.open_elements.pop_until(self.document, tag);
                return;
            }
            if node.is_special()
                && !tag.is_one_of(&[TagName::Address, TagName::Div, TagName::P])
            {
                return;
            }
        }
    }

    /// Reports a parse error if any open element is not in the set that is
    /// acceptable to still be open when body content ends.
    fn check_acceptable_open_elements(&mut self) {
        for &node_id in self.open_elements.iter() {
            let acceptable = self
                .document
                .get_node_by_id(node_id)
                .and_then(|node| node.tag())
                .is_some_and(|tag| tag.is_one_of(&ACCEPTABLE_OPEN_AT_EOF));
            if !acceptable {
                self.parse_error("body closed with unexpected elements still open");
                return;
            }
        }
    }

    fn clear_stack_back_to_table_context(&mut self) {
        while let Some(tag) = self.current_node_tag() {
            if tag.is_one_of(&[TagName::Table, TagName::Html]) {
                return;
            }
            if self.open_elements.pop().is_none() {
                return;
            }
        }
    }

    fn clear_stack_back_to_table_body_context(&mut self) {
        while let Some(tag) = self.current_node_tag() {
            if tag.is_one_of(&[TagName::Tbody, TagName::Tfoot, TagName::Thead, TagName::Html]) {
                return;
            }
            if self.open_elements.pop().is_none() {
                return;
            }
        }
    }

    fn clear_stack_back_to_table_row_context(&mut self) {
        while let Some(tag) = self.current_node_tag() {
            if tag.is_one_of(&[TagName::Tr, TagName::Html]) {
                return;
            }
            if self.open_elements.pop().is_none() {
                return;
            }
        }
    }

    /// Re-opens formatting elements whose entries survived a block-level
    /// interruption: clones every list entry after the last marker that is
    /// no longer on the stack, in list order.
    fn reconstruct_formatting(&mut self) {
        let Some(last) = self.active_formatting_elements.last() else {
            return;
        };
        match last {
            FormattingEntry::Marker => return,
            FormattingEntry::Element(node_id) if self.open_elements.contains(node_id) => return,
            FormattingEntry::Element(_) => {}
        }

        // Rewind to the first entry that needs reconstructing.
        let mut entry_index = self.active_formatting_elements.len() - 1;
        while entry_index > 0 {
            match self.active_formatting_elements.get(entry_index - 1) {
                Some(FormattingEntry::Element(id)) if !self.open_elements.contains(id) => {
                    entry_index -= 1;
                }
                _ => break,
            }
        }

        loop {
            let Some(FormattingEntry::Element(node_id)) =
                self.active_formatting_elements.get(entry_index)
            else {
                return;
            };
            let new_id = self.clone_element(node_id);
            self.insert_element_node(new_id);
            self.active_formatting_elements.replace(node_id, new_id);

            if entry_index + 1 >= self.active_formatting_elements.len() {
                return;
            }
            entry_index += 1;
        }
    }

    /// Switches the insertion mode back to what the open elements imply.
    /// Runs after a table (or select) has been torn down.
    fn reset_insertion_mode(&mut self) {
        let mut idx = self.open_elements.len();
        while idx > 0 {
            idx -= 1;
            let last = idx == 0;
            let Some(node_id) = self.open_elements.get(idx) else {
                break;
            };
            let Some(tag) = self.document.get_node_by_id(node_id).and_then(|n| n.tag()) else {
                continue;
            };

            let mode = match tag {
                TagName::Select => {
                    let mut mode = InsertionMode::InSelect;
                    let mut ancestor = idx;
                    while ancestor > 0 {
                        ancestor -= 1;
                        let ancestor_tag = self
                            .open_elements
                            .get(ancestor)
                            .and_then(|id| self.document.get_node_by_id(id))
                            .and_then(|node| node.tag());
                        if ancestor_tag == Some(TagName::Table) {
                            mode = InsertionMode::InSelectInTable;
                            break;
                        }
                    }
                    Some(mode)
                }
                TagName::Td | TagName::Th if !last => Some(InsertionMode::InCell),
                TagName::Tr => Some(InsertionMode::InRow),
                TagName::Tbody | TagName::Thead | TagName::Tfoot => Some(InsertionMode::InTableBody),
                TagName::Caption => Some(InsertionMode::InCaption),
                TagName::Colgroup => Some(InsertionMode::InColumnGroup),
                TagName::Table => Some(InsertionMode::InTable),
                TagName::Head if !last => Some(InsertionMode::InHead),
                TagName::Body => Some(InsertionMode::InBody),
                TagName::Frameset => Some(InsertionMode::InFrameset),
                TagName::Html => {
                    if self.open_elements.head_element().is_none() {
                        Some(InsertionMode::BeforeHead)
                    } else {
                        Some(InsertionMode::AfterHead)
                    }
                }
                _ => None,
            };

            if let Some(mode) = mode {
                self.insertion_mode = mode;
                return;
            }
            if last {
                break;
            }
        }
        self.insertion_mode = InsertionMode::InBody;
    }

    /// Generic raw text element parsing: insert the element, switch the
    /// tokenizer state, and collect character tokens in Text mode until the
    /// matching end tag.
    fn parse_rawtext(&mut self) {
        self.insert_html_element(&self.current_token.clone());
        self.tokenizer.set_state(State::RAWTEXT);
        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    fn parse_rcdata(&mut self) {
        self.insert_html_element(&self.current_token.clone());
        self.tokenizer.set_state(State::RCDATA);
        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    /// Copies attributes the element does not have yet. Used when a stray
    /// `<html>` or `<body>` tag supplies extra attributes.
    fn merge_missing_attributes(&mut self, node_id: NodeId, attributes: &HashMap<String, String>) {
        let missing: Vec<(String, String)> = {
            let Some(node) = self.document.get_node_by_id(node_id) else {
                return;
            };
            let Some(existing) = node.attributes() else {
                return;
            };
            attributes
                .iter()
                .filter(|(key, _)| !existing.contains_key(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };
        for (key, value) in missing {
            let _ = self.document.set_attribute(node_id, &key, &value);
        }
    }

    fn adjust_mathml_attributes(attributes: &mut HashMap<String, String>) {
        Self::rename_attributes(attributes, |name| {
            MATHML_ADJUSTMENTS.get(name).map(|adjusted| adjusted.to_string())
        });
    }

    fn adjust_svg_attributes(attributes: &mut HashMap<String, String>) {
        Self::rename_attributes(attributes, |name| {
            SVG_ADJUSTMENTS_ATTRIBUTES.get(name).map(|adjusted| adjusted.to_string())
        });
    }

    fn adjust_foreign_attributes(attributes: &mut HashMap<String, String>) {
        Self::rename_attributes(attributes, |name| {
            XML_ADJUSTMENTS.get(name).map(|(prefix, local)| {
                if prefix.is_empty() {
                    local.to_string()
                } else {
                    format!("{prefix}:{local}")
                }
            })
        });
    }

    fn rename_attributes<F>(attributes: &mut HashMap<String, String>, rename: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let renames: Vec<(String, String)> = attributes
            .keys()
            .filter_map(|key| rename(key).map(|new_key| (key.clone(), new_key)))
            .collect();
        for (old_key, new_key) in renames {
            if let Some(value) = attributes.remove(&old_key) {
                attributes.insert(new_key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenQueue;

    fn parse_tokens(tokens: Vec<Token>) -> (Document, Vec<ParseError>) {
        let mut document = Document::new();
        let mut tokenizer = TokenQueue::new(tokens);
        let errors = {
            let mut parser = Html5Parser::new(&mut tokenizer, &mut document);
            parser.parse()
        };
        (document, errors)
    }

    fn start(name: TagName) -> Token {
        Token::fake_start_tag(name)
    }

    fn end(name: TagName) -> Token {
        Token::fake_end_tag(name)
    }

    fn text(value: &str) -> Token {
        Token::Text {
            value: value.to_string(),
        }
    }

    fn doctype() -> Token {
        Token::DocType {
            name: Some("html".to_string()),
            force_quirks: false,
            pub_identifier: None,
            sys_identifier: None,
        }
    }

    /// Display depth of the first line containing `needle`, measured in
    /// characters before the element marker.
    fn depth_of(tree: &str, needle: &str) -> Option<usize> {
        tree.lines()
            .find(|line| line.contains(needle))
            .map(|line| line.chars().take_while(|&ch| ch != '<' && ch != '"').count())
    }

    #[test]
    fn empty_input_builds_html_head_body() {
        let (document, _) = parse_tokens(vec![]);
        let expected = "\
└─ Document
   └─ <html>
      ├─ <head>
      └─ <body>
";
        assert_eq!(document.to_string(), expected);
    }

    #[test]
    fn simple_document() {
        let (document, errors) = parse_tokens(vec![
            doctype(),
            start(TagName::Html),
            start(TagName::Head),
            end(TagName::Head),
            start(TagName::Body),
            start(TagName::P),
            text("hello"),
            end(TagName::P),
            end(TagName::Body),
            end(TagName::Html),
        ]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let expected = "\
└─ Document
   ├─ <!DOCTYPE html>
   └─ <html>
      ├─ <head>
      └─ <body>
         └─ <p>
            └─ \"hello\"
";
        assert_eq!(document.to_string(), expected);
    }

    #[test]
    fn doctype_selects_no_quirks() {
        let (document, errors) = parse_tokens(vec![doctype()]);
        assert!(errors.is_empty());
        assert_eq!(document.quirks_mode, QuirksMode::NoQuirks);
    }

    #[test]
    fn missing_doctype_is_quirks_and_error() {
        let (document, errors) = parse_tokens(vec![start(TagName::Div)]);
        assert_eq!(document.quirks_mode, QuirksMode::Quirks);
        assert!(!errors.is_empty());
    }

    #[test]
    fn stray_p_closed_before_block() {
        let (document, _) = parse_tokens(vec![
            start(TagName::P),
            text("one"),
            start(TagName::Div),
            text("two"),
        ]);
        let tree = document.to_string();
        // div must not be nested inside p
        assert_eq!(depth_of(&tree, "<p>"), depth_of(&tree, "<div>"));
    }

    #[test]
    fn li_closes_previous_li() {
        let (document, _) = parse_tokens(vec![
            start(TagName::Ul),
            start(TagName::Li),
            text("a"),
            start(TagName::Li),
            text("b"),
            end(TagName::Ul),
        ]);
        let tree = document.to_string();
        let li_depths: Vec<usize> = tree
            .lines()
            .filter(|line| line.contains("<li>"))
            .map(|line| line.chars().take_while(|&ch| ch != '<').count())
            .collect();
        assert_eq!(li_depths.len(), 2);
        assert_eq!(li_depths[0], li_depths[1], "both li elements at the same depth");
    }

    #[test]
    fn text_mode_returns_after_end_tag() {
        let (document, errors) = parse_tokens(vec![
            doctype(),
            start(TagName::Title),
            text("the title"),
            end(TagName::Title),
            start(TagName::Body),
        ]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(document.to_string().contains("<title>"));
        assert!(document.to_string().contains("\"the title\""));
    }

    #[test]
    fn rawtext_switches_tokenizer_state() {
        let mut document = Document::new();
        let mut tokenizer = TokenQueue::new(vec![start(TagName::Style)]);
        {
            let mut parser = Html5Parser::new(&mut tokenizer, &mut document);
            parser.parse();
        }
        assert_eq!(tokenizer.state(), State::RAWTEXT);
    }

    // With scripting off, noscript fallback content must stay parsed markup.
    #[test]
    fn noscript_in_body_stays_an_ordinary_element() {
        let mut document = Document::new();
        let mut tokenizer = TokenQueue::new(vec![
            doctype(),
            start(TagName::Body),
            start(TagName::Noscript),
            start(TagName::P),
            text("fallback"),
        ]);
        {
            let mut parser = Html5Parser::new(&mut tokenizer, &mut document);
            parser.parse();
        }
        assert_eq!(tokenizer.state(), State::Data);
        let tree = document.to_string();
        let noscript_depth = depth_of(&tree, "<noscript>").unwrap();
        let p_depth = depth_of(&tree, "<p>").unwrap();
        assert_eq!(p_depth, noscript_depth + 3, "p nested inside noscript");
        assert!(tree.contains("\"fallback\""));
    }

    #[test]
    fn eof_in_body_with_open_div_is_an_error() {
        let (_, errors) = parse_tokens(vec![start(TagName::Div)]);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("unexpected end of file")));
    }

    #[test]
    fn eof_in_body_with_open_p_is_acceptable() {
        let (_, errors) = parse_tokens(vec![doctype(), start(TagName::P), text("x")]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn reset_insertion_mode_after_table_teardown() {
        let (document, _) = parse_tokens(vec![
            start(TagName::Table),
            start(TagName::Tr),
            start(TagName::Td),
            text("cell"),
            end(TagName::Table),
            text("after"),
        ]);
        let tree = document.to_string();
        assert!(tree.contains("<td>"));
        assert!(tree.contains("\"after\""));
    }

    #[test]
    fn svg_tag_names_are_adjusted() {
        let (document, _) = parse_tokens(vec![
            start(TagName::Svg),
            start(TagName::from_name("clippath")),
        ]);
        assert!(document.to_string().contains("<clipPath>"));
    }

    #[test]
    fn foreign_breakout_pops_back_to_html() {
        let (document, errors) = parse_tokens(vec![
            start(TagName::Svg),
            start(TagName::from_name("circle")),
            start(TagName::Div),
            text("back in html"),
        ]);
        let tree = document.to_string();
        assert!(tree.contains("<div>"));
        assert!(!errors.is_empty());
        // div is a sibling of svg, not nested in it
        assert_eq!(depth_of(&tree, "<svg>"), depth_of(&tree, "<div>"));
    }

    #[test]
    fn select_in_table_closed_by_table_tag() {
        let (document, _) = parse_tokens(vec![
            start(TagName::Table),
            start(TagName::Tr),
            start(TagName::Td),
            start(TagName::Select),
            start(TagName::Td),
        ]);
        let tree = document.to_string();
        assert_eq!(tree.matches("<td>").count(), 2);
        assert_eq!(tree.matches("<select>").count(), 1);
    }
}
