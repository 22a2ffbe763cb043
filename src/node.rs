pub mod arena;

use std::collections::HashMap;

use derive_more::Display;

use crate::tags::TagName;

/// Element namespaces the tree builder distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Html,
    MathMl,
    Svg,
}

impl Namespace {
    pub fn uri(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
            Namespace::Svg => "http://www.w3.org/2000/svg",
        }
    }
}

/// Stable handle into the document arena. Identity of an element anywhere in
/// the parser (open elements stack, active formatting list, tree) is
/// equality of its `NodeId`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Display)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum NodeData {
    /// The document root; exactly one per arena, always id 0.
    Document,
    DocType {
        name: String,
        pub_identifier: String,
        sys_identifier: String,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
    Element {
        name: TagName,
        namespace: Namespace,
        attributes: HashMap<String, String>,
    },
}

/// A DOM node. Owned by the arena; parent/children are handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn new_document() -> Self {
        Node {
            id: NodeId::default(),
            parent: None,
            children: vec![],
            data: NodeData::Document,
        }
    }

    pub fn new_element(name: TagName, attributes: HashMap<String, String>, namespace: Namespace) -> Self {
        Node {
            id: NodeId::default(),
            parent: None,
            children: vec![],
            data: NodeData::Element {
                name,
                namespace,
                attributes,
            },
        }
    }

    pub fn new_text(value: &str) -> Self {
        Node {
            id: NodeId::default(),
            parent: None,
            children: vec![],
            data: NodeData::Text {
                value: value.to_string(),
            },
        }
    }

    pub fn new_comment(value: &str) -> Self {
        Node {
            id: NodeId::default(),
            parent: None,
            children: vec![],
            data: NodeData::Comment {
                value: value.to_string(),
            },
        }
    }

    pub fn new_doctype(name: &str, pub_identifier: &str, sys_identifier: &str) -> Self {
        Node {
            id: NodeId::default(),
            parent: None,
            children: vec![],
            data: NodeData::DocType {
                name: name.to_string(),
                pub_identifier: pub_identifier.to_string(),
                sys_identifier: sys_identifier.to_string(),
            },
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    /// Mutable access to the character data of a text node.
    pub fn text_value_mut(&mut self) -> Option<&mut String> {
        match &mut self.data {
            NodeData::Text { value } => Some(value),
            _ => None,
        }
    }

    /// The tag name, for element nodes.
    pub fn tag(&self) -> Option<TagName> {
        match &self.data {
            NodeData::Element { name, .. } => Some(*name),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<Namespace> {
        match &self.data {
            NodeData::Element { namespace, .. } => Some(*namespace),
            _ => None,
        }
    }

    pub fn is_namespace(&self, namespace: Namespace) -> bool {
        self.namespace() == Some(namespace)
    }

    /// True when this element has the given tag in the HTML namespace.
    pub fn is_html_element(&self, tag: TagName) -> bool {
        self.tag() == Some(tag) && self.is_namespace(Namespace::Html)
    }

    pub fn attributes(&self) -> Option<&HashMap<String, String>> {
        match &self.data {
            NodeData::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Compares tag, namespace and attribute set. Used by the Noah's Ark
    /// clause; parents and children are irrelevant here.
    pub fn matches_tag_and_attrs(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (
                NodeData::Element {
                    name: name_a,
                    namespace: ns_a,
                    attributes: attrs_a,
                },
                NodeData::Element {
                    name: name_b,
                    namespace: ns_b,
                    attributes: attrs_b,
                },
            ) => name_a == name_b && ns_a == ns_b && attrs_a == attrs_b,
            _ => false,
        }
    }

    /// Returns true for formatting elements, the only ones tracked by the
    /// active formatting elements list.
    pub fn is_formatting(&self) -> bool {
        self.is_namespace(Namespace::Html)
            && self.tag().is_some_and(|tag| FORMATTING_HTML_ELEMENTS.contains(&tag))
    }

    /// Returns true for "special" elements: the block/structural set that
    /// terminates a furthest-block search and the generic end-tag walk.
    pub fn is_special(&self) -> bool {
        let Some(tag) = self.tag() else {
            return false;
        };
        match self.namespace() {
            Some(Namespace::Html) => SPECIAL_HTML_ELEMENTS.contains(&tag),
            Some(Namespace::MathMl) => SPECIAL_MATHML_ELEMENTS.contains(&tag),
            Some(Namespace::Svg) => SPECIAL_SVG_ELEMENTS.contains(&tag),
            None => false,
        }
    }

    /// MathML text integration points: `<mi>`, `<mo>`, `<mn>`, `<ms>`,
    /// `<mtext>`.
    pub fn is_mathml_text_integration_point(&self) -> bool {
        self.is_namespace(Namespace::MathMl)
            && self.tag().is_some_and(|tag| {
                matches!(
                    tag,
                    TagName::Mi | TagName::Mo | TagName::Mn | TagName::Ms | TagName::Mtext
                )
            })
    }

    /// HTML integration points: SVG `<foreignObject>`, `<desc>`, `<title>`,
    /// and MathML `<annotation-xml>` whose encoding is an HTML type.
    pub fn is_html_integration_point(&self) -> bool {
        match self.namespace() {
            Some(Namespace::Svg) => self.tag().is_some_and(|tag| {
                matches!(tag, TagName::ForeignObject | TagName::Desc | TagName::Title)
            }),
            Some(Namespace::MathMl) => {
                self.tag() == Some(TagName::AnnotationXml)
                    && self.attributes().is_some_and(|attrs| {
                        attrs.get("encoding").is_some_and(|encoding| {
                            encoding.eq_ignore_ascii_case("text/html")
                                || encoding.eq_ignore_ascii_case("application/xhtml+xml")
                        })
                    })
            }
            _ => false,
        }
    }
}

pub static FORMATTING_HTML_ELEMENTS: [TagName; 14] = [
    TagName::A,
    TagName::B,
    TagName::Big,
    TagName::Code,
    TagName::Em,
    TagName::Font,
    TagName::I,
    TagName::Nobr,
    TagName::S,
    TagName::Small,
    TagName::Strike,
    TagName::Strong,
    TagName::Tt,
    TagName::U,
];

pub static SPECIAL_HTML_ELEMENTS: [TagName; 82] = [
    TagName::Address,
    TagName::Applet,
    TagName::Area,
    TagName::Article,
    TagName::Aside,
    TagName::Base,
    TagName::Basefont,
    TagName::Bgsound,
    TagName::Blockquote,
    TagName::Body,
    TagName::Br,
    TagName::Button,
    TagName::Caption,
    TagName::Center,
    TagName::Col,
    TagName::Colgroup,
    TagName::Dd,
    TagName::Details,
    TagName::Dir,
    TagName::Div,
    TagName::Dl,
    TagName::Dt,
    TagName::Embed,
    TagName::Fieldset,
    TagName::Figcaption,
    TagName::Figure,
    TagName::Footer,
    TagName::Form,
    TagName::Frame,
    TagName::Frameset,
    TagName::H1,
    TagName::H2,
    TagName::H3,
    TagName::H4,
    TagName::H5,
    TagName::H6,
    TagName::Head,
    TagName::Header,
    TagName::Hgroup,
    TagName::Hr,
    TagName::Html,
    TagName::Iframe,
    TagName::Img,
    TagName::Input,
    TagName::Keygen,
    TagName::Li,
    TagName::Link,
    TagName::Listing,
    TagName::Main,
    TagName::Marquee,
    TagName::Menu,
    TagName::Meta,
    TagName::Nav,
    TagName::Noembed,
    TagName::Noframes,
    TagName::Noscript,
    TagName::Object,
    TagName::Ol,
    TagName::P,
    TagName::Param,
    TagName::Plaintext,
    TagName::Pre,
    TagName::Script,
    TagName::Search,
    TagName::Section,
    TagName::Select,
    TagName::Source,
    TagName::Style,
    TagName::Summary,
    TagName::Table,
    TagName::Tbody,
    TagName::Td,
    TagName::Textarea,
    TagName::Tfoot,
    TagName::Th,
    TagName::Thead,
    TagName::Title,
    TagName::Tr,
    TagName::Track,
    TagName::Ul,
    TagName::Wbr,
    TagName::Xmp,
];

pub static SPECIAL_MATHML_ELEMENTS: [TagName; 6] = [
    TagName::Mi,
    TagName::Mo,
    TagName::Mn,
    TagName::Ms,
    TagName::Mtext,
    TagName::AnnotationXml,
];

pub static SPECIAL_SVG_ELEMENTS: [TagName; 3] = [TagName::ForeignObject, TagName::Desc, TagName::Title];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_is_special() {
        let node = Node::new_element(TagName::Div, HashMap::new(), Namespace::Html);
        assert!(node.is_special());
        assert!(!node.is_formatting());
    }

    #[test]
    fn b_is_formatting() {
        let node = Node::new_element(TagName::B, HashMap::new(), Namespace::Html);
        assert!(node.is_formatting());
        assert!(!node.is_special());
    }

    #[test]
    fn special_is_namespace_aware() {
        // <title> is special in SVG but a plain head element in HTML.
        let svg_title = Node::new_element(TagName::Title, HashMap::new(), Namespace::Svg);
        assert!(svg_title.is_special());
        let mtext = Node::new_element(TagName::Mtext, HashMap::new(), Namespace::Svg);
        assert!(!mtext.is_special());
    }

    #[test]
    fn matches_tag_and_attrs_compares_structurally() {
        let mut attrs = HashMap::new();
        attrs.insert("href".to_string(), "x".to_string());
        let a1 = Node::new_element(TagName::A, attrs.clone(), Namespace::Html);
        let a2 = Node::new_element(TagName::A, attrs.clone(), Namespace::Html);
        assert!(a1.matches_tag_and_attrs(&a2));

        let a3 = Node::new_element(TagName::A, HashMap::new(), Namespace::Html);
        assert!(!a1.matches_tag_and_attrs(&a3));

        let svg_a = Node::new_element(TagName::A, attrs, Namespace::Svg);
        assert!(!a1.matches_tag_and_attrs(&svg_a));
    }

    #[test]
    fn annotation_xml_integration_point_depends_on_encoding() {
        let mut attrs = HashMap::new();
        attrs.insert("encoding".to_string(), "TEXT/HTML".to_string());
        let node = Node::new_element(TagName::AnnotationXml, attrs, Namespace::MathMl);
        assert!(node.is_html_integration_point());

        let plain = Node::new_element(TagName::AnnotationXml, HashMap::new(), Namespace::MathMl);
        assert!(!plain.is_html_integration_point());
    }

    #[test]
    fn mathml_text_integration_points() {
        for tag in [TagName::Mi, TagName::Mo, TagName::Mn, TagName::Ms, TagName::Mtext] {
            let node = Node::new_element(tag, HashMap::new(), Namespace::MathMl);
            assert!(node.is_mathml_text_integration_point());
        }
        let svg = Node::new_element(TagName::Mi, HashMap::new(), Namespace::Svg);
        assert!(!svg.is_mathml_text_integration_point());
    }
}
