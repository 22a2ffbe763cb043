#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    #[default]
    NoQuirks,
}

/// Returns the quirks mode a doctype token selects for the document.
pub fn identify_quirks_mode(
    name: &Option<String>,
    pub_identifier: Option<&str>,
    sys_identifier: Option<&str>,
    force_quirks: bool,
) -> QuirksMode {
    if force_quirks || name.as_ref().map_or("", |s| &s[..]).to_uppercase() != "HTML" {
        return QuirksMode::Quirks;
    }

    if let Some(pub_id) = pub_identifier {
        let pub_id = pub_id.to_lowercase();
        if QUIRKS_PUB_IDENTIFIER_EQ
            .iter()
            .any(|&entry| entry.to_lowercase() == pub_id)
        {
            return QuirksMode::Quirks;
        }
        if QUIRKS_PUB_IDENTIFIER_PREFIX
            .iter()
            .any(|&prefix| pub_id.starts_with(&prefix.to_lowercase()))
        {
            return QuirksMode::Quirks;
        }

        if sys_identifier.is_none()
            && QUIRKS_PUB_IDENTIFIER_PREFIX_MISSING_SYS
                .iter()
                .any(|&prefix| pub_id.starts_with(&prefix.to_lowercase()))
        {
            return QuirksMode::Quirks;
        }

        if LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX
            .iter()
            .any(|&prefix| pub_id.starts_with(&prefix.to_lowercase()))
        {
            return QuirksMode::LimitedQuirks;
        }

        if sys_identifier.is_some()
            && LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX_WITH_SYS
                .iter()
                .any(|&prefix| pub_id.starts_with(&prefix.to_lowercase()))
        {
            return QuirksMode::LimitedQuirks;
        }
    }

    if let Some(sys_id) = sys_identifier {
        let sys_id = sys_id.to_lowercase();
        if QUIRKS_SYS_IDENTIFIER_EQ
            .iter()
            .any(|&entry| entry.to_lowercase() == sys_id)
        {
            return QuirksMode::Quirks;
        }
    }

    QuirksMode::NoQuirks
}

static QUIRKS_PUB_IDENTIFIER_EQ: &[&str] = &[
    "-//W3O//DTD W3 HTML Strict 3.0//EN//",
    "-/W3C/DTD HTML 4.0 Transitional/EN",
    "HTML",
];

static QUIRKS_PUB_IDENTIFIER_PREFIX: &[&str] = &[
    "+//Silmaril//dtd html Pro v0r11 19970101//",
    "-//AS//DTD HTML 3.0 asWedit + extensions//",
    "-//AdvaSoft Ltd//DTD HTML 3.0 asWedit + extensions//",
    "-//IETF//DTD HTML 2.0 Level 1//",
    "-//IETF//DTD HTML 2.0 Level 2//",
    "-//IETF//DTD HTML 2.0 Strict Level 1//",
    "-//IETF//DTD HTML 2.0 Strict Level 2//",
    "-//IETF//DTD HTML 2.0 Strict//",
    "-//IETF//DTD HTML 2.0//",
    "-//IETF//DTD HTML 2.1E//",
    "-//IETF//DTD HTML 3.0//",
    "-//IETF//DTD HTML 3.2 Final//",
    "-//IETF//DTD HTML 3.2//",
    "-//IETF//DTD HTML 3//",
    "-//IETF//DTD HTML Level 0//",
    "-//IETF//DTD HTML Level 1//",
    "-//IETF//DTD HTML Level 2//",
    "-//IETF//DTD HTML Level 3//",
    "-//IETF//DTD HTML Strict Level 0//",
    "-//IETF//DTD HTML Strict Level 1//",
    "-//IETF//DTD HTML Strict Level 2//",
    "-//IETF//DTD HTML Strict Level 3//",
    "-//IETF//DTD HTML Strict//",
    "-//IETF//DTD HTML//",
    "-//Metrius//DTD Metrius Presentational//",
    "-//Microsoft//DTD Internet Explorer 2.0 HTML Strict//",
    "-//Microsoft//DTD Internet Explorer 2.0 HTML//",
    "-//Microsoft//DTD Internet Explorer 2.0 Tables//",
    "-//Microsoft//DTD Internet Explorer 3.0 HTML Strict//",
    "-//Microsoft//DTD Internet Explorer 3.0 HTML//",
    "-//Microsoft//DTD Internet Explorer 3.0 Tables//",
    "-//Netscape Comm. Corp.//DTD HTML//",
    "-//Netscape Comm. Corp.//DTD Strict HTML//",
    "-//O'Reilly and Associates//DTD HTML 2.0//",
    "-//O'Reilly and Associates//DTD HTML Extended 1.0//",
    "-//O'Reilly and Associates//DTD HTML Extended Relaxed 1.0//",
    "-//SQ//DTD HTML 2.0 HoTMetaL + extensions//",
    "-//SoftQuad Software//DTD HoTMetaL PRO 6.0::19990601::extensions to HTML 4.0//",
    "-//SoftQuad//DTD HoTMetaL PRO 4.0::19971010::extensions to HTML 4.0//",
    "-//Spyglass//DTD HTML 2.0 Extended//",
    "-//Sun Microsystems Corp.//DTD HotJava HTML//",
    "-//Sun Microsystems Corp.//DTD HotJava Strict HTML//",
    "-//W3C//DTD HTML 3 1995-03-24//",
    "-//W3C//DTD HTML 3.2 Draft//",
    "-//W3C//DTD HTML 3.2 Final//",
    "-//W3C//DTD HTML 3.2//",
    "-//W3C//DTD HTML 3.2S Draft//",
    "-//W3C//DTD HTML 4.0 Frameset//",
    "-//W3C//DTD HTML 4.0 Transitional//",
    "-//W3C//DTD HTML Experimental 19960712//",
    "-//W3C//DTD HTML Experimental 970421//",
    "-//W3C//DTD W3 HTML//",
    "-//W3O//DTD W3 HTML 3.0//",
    "-//WebTechs//DTD Mozilla HTML 2.0//",
    "-//WebTechs//DTD Mozilla HTML//",
];

static QUIRKS_PUB_IDENTIFIER_PREFIX_MISSING_SYS: &[&str] = &[
    "-//W3C//DTD HTML 4.01 Frameset//",
    "-//W3C//DTD HTML 4.01 Transitional//",
];

static QUIRKS_SYS_IDENTIFIER_EQ: &[&str] =
    &["http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd"];

static LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX: &[&str] = &[
    "-//W3C//DTD XHTML 1.0 Frameset//",
    "-//W3C//DTD XHTML 1.0 Transitional//",
];

static LIMITED_QUIRKS_PUB_IDENTIFIER_PREFIX_WITH_SYS: &[&str] = &[
    "-//W3C//DTD HTML 4.01 Frameset//",
    "-//W3C//DTD HTML 4.01 Transitional//",
];
