//! End-to-end tree construction tests: token streams in, DOM trees out.

use test_case::test_case;

use shrike_html5::document::Document;
use shrike_html5::errors::ParseError;
use shrike_html5::parser::quirks::QuirksMode;
use shrike_html5::parser::Html5Parser;
use shrike_html5::tags::TagName;
use shrike_html5::tokenizer::token::Token;
use shrike_html5::tokenizer::TokenQueue;

fn parse(tokens: Vec<Token>) -> (Document, Vec<ParseError>) {
    let mut document = Document::new();
    let mut tokenizer = TokenQueue::new(tokens);
    let errors = Html5Parser::new(&mut tokenizer, &mut document).parse();
    (document, errors)
}

fn doctype() -> Token {
    Token::DocType {
        name: Some("html".to_string()),
        force_quirks: false,
        pub_identifier: None,
        sys_identifier: None,
    }
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

fn whitespace(value: &str) -> Token {
    Token::Whitespace {
        value: value.to_string(),
    }
}

/// Character depth of the first tree line containing `needle`.
fn depth_of(tree: &str, needle: &str) -> usize {
    tree.lines()
        .find(|line| line.contains(needle))
        .unwrap_or_else(|| panic!("{needle} not in tree:\n{tree}"))
        .chars()
        .take_while(|&ch| ch != '<' && ch != '"')
        .count()
}

#[test]
fn misnested_formatting_is_adopted() {
    // <p>1<b>2<i>3</b>4</i>5</p>
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::P),
        text("1"),
        start(TagName::B),
        text("2"),
        start(TagName::I),
        text("3"),
        end(TagName::B),
        text("4"),
        end(TagName::I),
        text("5"),
        end(TagName::P),
    ]);
    let expected = "\
└─ Document
   ├─ <!DOCTYPE html>
   └─ <html>
      ├─ <head>
      └─ <body>
         └─ <p>
            ├─ \"1\"
            ├─ <b>
            │  ├─ \"2\"
            │  └─ <i>
            │     └─ \"3\"
            ├─ <i>
            │  └─ \"4\"
            └─ \"5\"
";
    assert_eq!(document.to_string(), expected);
    assert!(!errors.is_empty(), "misnesting is a parse error");
}

#[test]
fn adoption_agency_moves_block_into_formatting_clone() {
    // <b>1<div>2</b>3</div>: the div is the furthest block, text "3" ends up
    // in the div outside any b.
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::B),
        text("1"),
        start(TagName::Div),
        text("2"),
        end(TagName::B),
        text("3"),
        end(TagName::Div),
    ]);
    let tree = document.to_string();
    assert_eq!(tree.matches("<b>").count(), 2, "b is cloned into the div");
    assert!(depth_of(&tree, "<div>") < depth_of(&tree, "\"2\""));
    assert!(depth_of(&tree, "\"3\"") > depth_of(&tree, "<div>"));
}

#[test]
fn unmatched_end_tags_terminate() {
    let mut tokens = vec![doctype()];
    for _ in 0..1000 {
        tokens.push(start(TagName::B));
    }
    for _ in 0..1000 {
        tokens.push(end(TagName::I));
    }
    let (_, errors) = parse(tokens);
    assert!(!errors.is_empty());
}

#[test]
fn repeated_misnesting_terminates() {
    let mut tokens = vec![doctype()];
    for _ in 0..20 {
        tokens.push(start(TagName::A));
        tokens.push(start(TagName::Div));
    }
    tokens.push(text("done"));
    let (document, _) = parse(tokens);
    assert!(document.to_string().contains("\"done\""));
}

#[test]
fn noahs_ark_caps_reconstructed_formatting() {
    // Five identical <b> entries collapse to three in the formatting list;
    // closing the p pops them off the stack, and the following text triggers
    // reconstruction of exactly three clones.
    let mut tokens = vec![doctype(), start(TagName::P)];
    for _ in 0..5 {
        tokens.push(start(TagName::B));
    }
    tokens.push(end(TagName::P));
    tokens.push(text("x"));
    let (document, _) = parse(tokens);
    let tree = document.to_string();
    assert_eq!(tree.matches("<b>").count(), 8, "5 originals plus 3 clones");
    let body_depth = depth_of(&tree, "<body>");
    let text_depth = depth_of(&tree, "\"x\"");
    // body > b > b > b > "x", three characters of depth per level
    assert_eq!(text_depth - body_depth, 4 * 3);
}

#[test]
fn non_whitespace_table_text_is_foster_parented() {
    // <table>X<tr><td>Y</td></tr></table>
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Table),
        text("X"),
        start(TagName::Tr),
        start(TagName::Td),
        text("Y"),
        end(TagName::Td),
        end(TagName::Tr),
        end(TagName::Table),
    ]);
    let expected = "\
└─ Document
   ├─ <!DOCTYPE html>
   └─ <html>
      ├─ <head>
      └─ <body>
         ├─ \"X\"
         └─ <table>
            └─ <tbody>
               └─ <tr>
                  └─ <td>
                     └─ \"Y\"
";
    assert_eq!(document.to_string(), expected);
    assert!(!errors.is_empty(), "fostered text is a parse error");
}

#[test]
fn whitespace_table_text_stays_in_the_table() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Table),
        whitespace("  "),
        end(TagName::Table),
    ]);
    let tree = document.to_string();
    assert!(depth_of(&tree, "\"  \"") > depth_of(&tree, "<table>"));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn mixed_table_text_run_is_fostered_as_one_node() {
    // A run that is not pure whitespace moves out of the table whole.
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::Table),
        whitespace(" "),
        text("X "),
        end(TagName::Table),
    ]);
    let tree = document.to_string();
    assert!(tree.contains("\" X \""), "single merged text node:\n{tree}");
    assert!(depth_of(&tree, "\" X \"") < depth_of(&tree, "<table>") + 3);
}

#[test]
fn implied_tbody_and_colgroup_are_synthesized() {
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::Table),
        start(TagName::Col),
        start(TagName::Tr),
        end(TagName::Table),
    ]);
    let tree = document.to_string();
    assert!(tree.contains("<colgroup>"));
    assert!(tree.contains("<tbody>"));
    assert!(depth_of(&tree, "<col>") > depth_of(&tree, "<colgroup>"));
    assert!(depth_of(&tree, "<tr>") > depth_of(&tree, "<tbody>"));
}

#[test]
fn li_elements_become_siblings() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Ul),
        start(TagName::Li),
        text("a"),
        start(TagName::Li),
        text("b"),
        start(TagName::Li),
        text("c"),
        end(TagName::Ul),
    ]);
    let tree = document.to_string();
    let depths: Vec<usize> = tree
        .lines()
        .filter(|line| line.contains("<li>"))
        .map(|line| line.chars().take_while(|&ch| ch != '<').count())
        .collect();
    assert_eq!(depths.len(), 3);
    assert!(depths.iter().all(|&d| d == depths[0]));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn dt_and_dd_close_each_other() {
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::Dl),
        start(TagName::Dt),
        text("term"),
        start(TagName::Dd),
        text("definition"),
        end(TagName::Dl),
    ]);
    let tree = document.to_string();
    assert_eq!(depth_of(&tree, "<dt>"), depth_of(&tree, "<dd>"));
}

#[test]
fn heading_start_tag_closes_open_heading() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::H1),
        text("one"),
        start(TagName::H2),
        text("two"),
        end(TagName::H2),
    ]);
    let tree = document.to_string();
    assert_eq!(depth_of(&tree, "<h1>"), depth_of(&tree, "<h2>"));
    assert!(!errors.is_empty());
}

#[test]
fn button_scope_shields_outer_p() {
    // The second <p> must not close the outer one through the button.
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::P),
        start(TagName::Button),
        start(TagName::P),
        text("inner"),
    ]);
    let tree = document.to_string();
    let p_depths: Vec<usize> = tree
        .lines()
        .filter(|line| line.contains("<p>"))
        .map(|line| line.chars().take_while(|&ch| ch != '<').count())
        .collect();
    assert_eq!(p_depths.len(), 2);
    assert!(p_depths[1] > p_depths[0], "inner p nests inside the button");
    assert!(depth_of(&tree, "<button>") > p_depths[0]);
}

#[test]
fn block_start_closes_open_p() {
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::P),
        text("a"),
        start(TagName::Blockquote),
        text("b"),
        end(TagName::Blockquote),
    ]);
    let tree = document.to_string();
    assert_eq!(depth_of(&tree, "<p>"), depth_of(&tree, "<blockquote>"));
}

#[test]
fn select_options_are_siblings() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Select),
        start(TagName::Option),
        text("a"),
        start(TagName::Option),
        text("b"),
        end(TagName::Select),
    ]);
    let tree = document.to_string();
    let depths: Vec<usize> = tree
        .lines()
        .filter(|line| line.contains("<option>"))
        .map(|line| line.chars().take_while(|&ch| ch != '<').count())
        .collect();
    assert_eq!(depths.len(), 2);
    assert_eq!(depths[0], depths[1]);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn table_cell_start_closes_select() {
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::Table),
        start(TagName::Tr),
        start(TagName::Td),
        start(TagName::Select),
        start(TagName::Td),
        text("second"),
    ]);
    let tree = document.to_string();
    assert_eq!(tree.matches("<td>").count(), 2);
    assert_eq!(tree.matches("<select>").count(), 1);
}

#[test]
fn svg_subtree_keeps_foreign_names() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Svg),
        start(TagName::from_name("clippath")),
        start(TagName::from_name("lineargradient")),
        end(TagName::from_name("lineargradient")),
        end(TagName::from_name("clippath")),
        end(TagName::Svg),
    ]);
    let tree = document.to_string();
    assert!(tree.contains("<clipPath>"), "svg tag names are re-cased:\n{tree}");
    assert!(tree.contains("<linearGradient>"));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn html_tag_breaks_out_of_foreign_content() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Svg),
        start(TagName::from_name("circle")),
        start(TagName::P),
        text("back"),
    ]);
    let tree = document.to_string();
    assert_eq!(depth_of(&tree, "<svg>"), depth_of(&tree, "<p>"));
    assert!(!errors.is_empty());
}

#[test]
fn mathml_text_integration_point_takes_html() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Math),
        start(TagName::Mtext),
        start(TagName::B),
        text("bold"),
        end(TagName::B),
        end(TagName::Mtext),
        end(TagName::Math),
    ]);
    let tree = document.to_string();
    assert!(depth_of(&tree, "<b>") > depth_of(&tree, "<mtext>"));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn foreign_object_is_an_html_integration_point() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Svg),
        start(TagName::from_name("foreignobject")),
        start(TagName::Div),
        text("html again"),
        end(TagName::Div),
        end(TagName::from_name("foreignobject")),
        end(TagName::Svg),
    ]);
    let tree = document.to_string();
    assert!(depth_of(&tree, "<div>") > depth_of(&tree, "<foreignObject>"));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn frameset_document() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Frameset),
        start(TagName::Frame),
        end(TagName::Frameset),
    ]);
    let tree = document.to_string();
    assert!(tree.contains("<frameset>"));
    assert!(tree.contains("<frame>"));
    assert!(!tree.contains("<body>"));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn frameset_after_body_content_is_ignored() {
    let (document, errors) = parse(vec![
        doctype(),
        start(TagName::Body),
        text("content"),
        start(TagName::Frameset),
    ]);
    let tree = document.to_string();
    assert!(tree.contains("<body>"));
    assert!(!tree.contains("<frameset>"));
    assert!(!errors.is_empty());
}

#[test]
fn stray_html_attributes_merge_into_root() {
    let mut attributes = std::collections::HashMap::new();
    attributes.insert("lang".to_string(), "en".to_string());
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::Html),
        start(TagName::Body),
        Token::StartTag {
            name: TagName::Html,
            is_self_closing: false,
            attributes,
        },
    ]);
    assert!(document.to_string().contains("<html lang=en>"));
}

#[test]
fn comment_before_doctype_is_a_root_child() {
    let (document, errors) = parse(vec![
        Token::Comment {
            value: "license".to_string(),
        },
        doctype(),
        start(TagName::P),
        end(TagName::P),
    ]);
    let tree = document.to_string();
    let comment_line = tree.lines().position(|l| l.contains("license"));
    let doctype_line = tree.lines().position(|l| l.contains("DOCTYPE"));
    assert!(comment_line < doctype_line);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn text_after_table_lands_in_body() {
    let (document, _) = parse(vec![
        doctype(),
        start(TagName::Table),
        start(TagName::Tr),
        start(TagName::Td),
        text("cell"),
        end(TagName::Table),
        text("after"),
    ]);
    let tree = document.to_string();
    assert_eq!(depth_of(&tree, "\"after\"") - 3, depth_of(&tree, "<body>"));
}

#[test_case(None, None => QuirksMode::NoQuirks ; "plain html doctype")]
#[test_case(Some("-//W3O//DTD W3 HTML Strict 3.0//EN//"), None => QuirksMode::Quirks ; "legacy public identifier")]
#[test_case(Some("-//W3C//DTD HTML 4.0 Transitional//EN"), None => QuirksMode::Quirks ; "html4 transitional prefix")]
#[test_case(Some("-//W3C//DTD XHTML 1.0 Transitional//EN"), None => QuirksMode::LimitedQuirks ; "xhtml transitional prefix")]
#[test_case(None, Some("http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd") => QuirksMode::Quirks ; "legacy system identifier")]
fn doctype_identifier_selects_quirks_mode(
    pub_identifier: Option<&str>,
    sys_identifier: Option<&str>,
) -> QuirksMode {
    let (document, _) = parse(vec![Token::DocType {
        name: Some("html".to_string()),
        force_quirks: false,
        pub_identifier: pub_identifier.map(str::to_string),
        sys_identifier: sys_identifier.map(str::to_string),
    }]);
    document.quirks_mode
}
