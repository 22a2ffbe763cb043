//! Interned tag-name identity.
//!
//! Every tag comparison the parser makes goes through [`TagName`]: well-known
//! HTML, SVG and MathML names are enum variants (a small integer), anything
//! else is interned once into a process-wide registry and compared by its
//! [`Symbol`]. The registry is append-only: a name, once interned, keeps its
//! symbol for the lifetime of the process. Interned strings are leaked so
//! `as_str` can hand out `&'static str` uniformly; the well-known table is a
//! compile-time `phf` map and involves no locking at all. The runtime side is
//! guarded by a mutex and is safe to use from multiple parser instances on
//! different threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use lazy_static::lazy_static;

/// Handle for a tag name that is not in the well-known table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

struct Registry {
    by_name: HashMap<&'static str, u32>,
    names: Vec<&'static str>,
}

impl Registry {
    fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&idx) = self.by_name.get(name) {
            return Symbol(idx);
        }
        let leaked: &'static str = Box::leak(name.to_string().into_boxed_str());
        let idx = self.names.len() as u32;
        self.names.push(leaked);
        self.by_name.insert(leaked, idx);
        Symbol(idx)
    }

    fn resolve(&self, sym: Symbol) -> &'static str {
        self.names[sym.0 as usize]
    }
}

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry {
        by_name: HashMap::new(),
        names: Vec::new(),
    });
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        REGISTRY.lock().expect("tag registry poisoned").resolve(*self)
    }
}

macro_rules! known_tag_names {
    ($($konst:ident => $name:literal,)+) => {
        /// Interned identity of a tag name.
        ///
        /// Comparing two `TagName`s is an integer comparison; string-keyed
        /// dispatch chains never appear past the tokenizer boundary.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum TagName {
            $($konst,)+
            /// A name outside the well-known table, interned at runtime.
            Unknown(Symbol),
        }

        static KNOWN_TAG_NAMES: phf::Map<&'static str, TagName> = phf::phf_map! {
            $($name => TagName::$konst,)+
        };

        impl TagName {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(TagName::$konst => $name,)+
                    TagName::Unknown(sym) => sym.as_str(),
                }
            }
        }
    };
}

known_tag_names! {
    A => "a",
    Address => "address",
    AnnotationXml => "annotation-xml",
    Applet => "applet",
    Area => "area",
    Article => "article",
    Aside => "aside",
    B => "b",
    Base => "base",
    Basefont => "basefont",
    Bgsound => "bgsound",
    Big => "big",
    Blockquote => "blockquote",
    Body => "body",
    Br => "br",
    Button => "button",
    Caption => "caption",
    Center => "center",
    Code => "code",
    Col => "col",
    Colgroup => "colgroup",
    Dd => "dd",
    Desc => "desc",
    Details => "details",
    Dialog => "dialog",
    Dir => "dir",
    Div => "div",
    Dl => "dl",
    Dt => "dt",
    Em => "em",
    Embed => "embed",
    Fieldset => "fieldset",
    Figcaption => "figcaption",
    Figure => "figure",
    Font => "font",
    Footer => "footer",
    ForeignObject => "foreignObject",
    Form => "form",
    Frame => "frame",
    Frameset => "frameset",
    H1 => "h1",
    H2 => "h2",
    H3 => "h3",
    H4 => "h4",
    H5 => "h5",
    H6 => "h6",
    Head => "head",
    Header => "header",
    Hgroup => "hgroup",
    Hr => "hr",
    Html => "html",
    I => "i",
    Iframe => "iframe",
    Image => "image",
    Img => "img",
    Input => "input",
    Keygen => "keygen",
    Li => "li",
    Link => "link",
    Listing => "listing",
    Main => "main",
    Malignmark => "malignmark",
    Marquee => "marquee",
    Math => "math",
    Menu => "menu",
    Meta => "meta",
    Mglyph => "mglyph",
    Mi => "mi",
    Mn => "mn",
    Mo => "mo",
    Ms => "ms",
    Mtext => "mtext",
    Nav => "nav",
    Nobr => "nobr",
    Noembed => "noembed",
    Noframes => "noframes",
    Noscript => "noscript",
    Object => "object",
    Ol => "ol",
    Optgroup => "optgroup",
    Option => "option",
    P => "p",
    Param => "param",
    Plaintext => "plaintext",
    Pre => "pre",
    Rp => "rp",
    Rt => "rt",
    Ruby => "ruby",
    S => "s",
    Script => "script",
    Search => "search",
    Section => "section",
    Select => "select",
    Small => "small",
    Source => "source",
    Span => "span",
    Strike => "strike",
    Strong => "strong",
    Style => "style",
    Sub => "sub",
    Summary => "summary",
    Sup => "sup",
    Svg => "svg",
    Table => "table",
    Tbody => "tbody",
    Td => "td",
    Textarea => "textarea",
    Tfoot => "tfoot",
    Th => "th",
    Thead => "thead",
    Title => "title",
    Tr => "tr",
    Track => "track",
    Tt => "tt",
    U => "u",
    Ul => "ul",
    Var => "var",
    Wbr => "wbr",
    Xmp => "xmp",
}

impl TagName {
    /// Resolves a raw tag name to its interned identity. Well-known names
    /// never touch the runtime registry.
    pub fn from_name(name: &str) -> TagName {
        if let Some(&tag) = KNOWN_TAG_NAMES.get(name) {
            return tag;
        }
        TagName::Unknown(REGISTRY.lock().expect("tag registry poisoned").intern(name))
    }

    pub fn is_one_of(&self, set: &[TagName]) -> bool {
        set.contains(self)
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for TagName {
    fn from(name: &str) -> Self {
        TagName::from_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names_resolve_to_variants() {
        assert_eq!(TagName::from_name("div"), TagName::Div);
        assert_eq!(TagName::from_name("foreignObject"), TagName::ForeignObject);
        assert_eq!(TagName::Div.as_str(), "div");
    }

    #[test]
    fn unknown_names_are_interned_once() {
        let first = TagName::from_name("x-custom-widget");
        let second = TagName::from_name("x-custom-widget");
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "x-custom-widget");
    }

    #[test]
    fn unknown_names_differ() {
        assert_ne!(TagName::from_name("x-one"), TagName::from_name("x-two"));
        assert_ne!(TagName::from_name("x-one"), TagName::Div);
    }

    #[test]
    fn case_matters() {
        // Foreign-content re-casing depends on "altglyph" and "altGlyph"
        // being distinct identities.
        assert_ne!(TagName::from_name("altglyph"), TagName::from_name("altGlyph"));
    }
}
