// src/tag.rs
//
// Tag classification and serialization.
//
// - `classify` turns one raw `<...>` span into a `Token`: an ordinary tag
//   (open / close / self-closing) with a parsed, ordered attribute list, or a
//   passthrough island (comment, doctype, CDATA, processing instruction, other
//   `<!...>` declaration, `<svg>` / `</svg>`) kept as opaque text.
// - Tag names are lower-cased. Attribute names are lower-cased unless they are
//   one of the camelCase SVG attribute names, which keep their spelling.
// - Every token keeps its raw span. Only tags the rewriter touches are ever
//   re-serialized; everything else goes back out byte-for-byte.

use memchr::memchr;
use std::fmt;

/* =============================== Core sets =============================== */

/// camelCase SVG attribute names that survive parsing with their case intact.
pub const SVG_CAMEL_ATTRS: &[&str] = &[
    "attributeName", "attributeType", "baseFrequency", "baseProfile", "calcMode",
    "clipPathUnits", "contentScriptType", "contentStyleType", "diffuseConstant", "edgeMode",
    "externalResourcesRequired", "filterRes", "filterUnits", "glyphRef", "gradientTransform",
    "gradientUnits", "kernelMatrix", "kernelUnitLength", "keyPoints", "keySplines", "keyTimes",
    "lengthAdjust", "limitingConeAngle", "markerHeight", "markerUnits", "markerWidth",
    "maskContentUnits", "maskUnits", "numOctaves", "pathLength", "patternContentUnits",
    "patternTransform", "patternUnits", "pointsAtX", "pointsAtY", "pointsAtZ", "preserveAlpha",
    "preserveAspectRatio", "primitiveUnits", "refX", "refY", "repeatCount", "repeatDur",
    "requiredExtensions", "requiredFeatures", "specularConstant", "specularExponent",
    "spreadMethod", "startOffset", "stdDeviation", "stitchTiles", "surfaceScale",
    "systemLanguage", "tableValues", "targetX", "targetY", "textLength", "viewBox",
    "viewTarget", "xChannelSelector", "yChannelSelector", "zoomAndPan",
];

pub fn is_void(name: &str) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ],
    )
}

fn matches_ignore_ascii_case(name: &str, set: &[&str]) -> bool {
    set.iter().any(|s| name.eq_ignore_ascii_case(s))
}

#[inline]
fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

#[inline]
fn is_quote(b: u8) -> bool {
    b == b'"' || b == b'\''
}

/// Apply the attribute case rule to a raw attribute name.
pub fn normalize_attr_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if SVG_CAMEL_ATTRS.contains(&trimmed) {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/* ============================== Attributes =============================== */

/// Attribute list in source order. Re-inserting a name overwrites the value
/// in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name="value"` pairs out of the inside of a tag.
    ///
    /// Tolerates single quotes, unquoted values, bare (valueless) names and
    /// unterminated quotes. Unquoted values end at whitespace, `>`, or a `/`
    /// that starts the self-closing terminator.
    pub fn parse(s: &str) -> Self {
        let b = s.as_bytes();
        let n = b.len();
        let mut attrs = Attributes::new();
        let mut i = 0usize;

        loop {
            while i < n && (is_ws(b[i]) || b[i] == b'/') {
                i += 1;
            }
            if i >= n || b[i] == b'>' {
                break;
            }

            // Stray quoted junk where a name should be.
            if is_quote(b[i]) {
                i = match memchr(b[i], &b[i + 1..]) {
                    Some(off) => i + 1 + off + 1,
                    None => n,
                };
                continue;
            }
            if b[i] == b'=' {
                i += 1;
                continue;
            }

            let name_start = i;
            while i < n && !is_ws(b[i]) && !matches!(b[i], b'=' | b'>' | b'/') && !is_quote(b[i]) {
                i += 1;
            }
            let name = normalize_attr_name(&s[name_start..i]);

            let mut j = i;
            while j < n && is_ws(b[j]) {
                j += 1;
            }
            if j >= n || b[j] != b'=' {
                attrs.insert(name, String::new());
                continue;
            }

            i = j + 1;
            while i < n && is_ws(b[i]) {
                i += 1;
            }
            let value = if i < n && is_quote(b[i]) {
                let q = b[i];
                let start = i + 1;
                match memchr(q, &b[start..]) {
                    Some(off) => {
                        i = start + off + 1;
                        &s[start..start + off]
                    }
                    None => {
                        i = n;
                        &s[start..]
                    }
                }
            } else {
                let start = i;
                while i < n && !is_ws(b[i]) && b[i] != b'>' && !starts_self_closing(b, i) {
                    i += 1;
                }
                &s[start..i]
            };
            attrs.insert(name, value.to_string());
        }
        attrs
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// `/` followed only by whitespace up to the end of the tag body.
fn starts_self_closing(b: &[u8], i: usize) -> bool {
    b[i] == b'/' && b[i + 1..].iter().all(|&c| is_ws(c))
}

/* ================================ Tokens ================================= */

/// How a self-closing tag spelled its terminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlashStyle {
    /// `<br/>`
    Tight,
    /// `<br />`
    Spaced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing(SlashStyle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassthroughKind {
    Comment,
    Doctype,
    CData,
    ProcessingInstruction,
    /// Any other `<!...>` markup declaration.
    Declaration,
    SvgStart { self_closing: bool },
    SvgEnd,
}

/// An ordinary element tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag<'a> {
    pub kind: TagKind,
    pub name: String,
    pub attributes: Attributes,
    pub raw: &'a str,
}

impl Tag<'_> {
    /// True when this tag starts an element that a later close tag ends:
    /// a non-void open tag.
    pub fn opens_element(&self) -> bool {
        self.kind == TagKind::Open && !is_void(&self.name)
    }

    /// A void open tag written without a slash, e.g. `<br>` or `<img ...>`.
    /// XHTML may still follow it with an explicit `</br>`.
    pub fn is_void_open(&self) -> bool {
        self.kind == TagKind::Open && is_void(&self.name)
    }
}

/// Markup carried through untouched. `head + info + tail` is always the raw
/// span: `head` is the marker (`<!--`, `<!DOCTYPE`, `<?xml`, `<svg`, ...),
/// `tail` the terminator that was actually present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Passthrough<'a> {
    pub kind: PassthroughKind,
    pub head: &'a str,
    pub info: &'a str,
    pub tail: &'a str,
}

impl<'a> Passthrough<'a> {
    /// Split `span` into marker / info / terminator, falling back to a
    /// shorter terminator (and finally to none) if the span is too short.
    fn split(kind: PassthroughKind, span: &'a str, head_end: usize, tails: &[&'static str]) -> Self {
        for &tail in tails {
            if span.len() >= head_end + tail.len() && span.ends_with(tail) {
                return Self {
                    kind,
                    head: &span[..head_end],
                    info: &span[head_end..span.len() - tail.len()],
                    tail,
                };
            }
        }
        Self {
            kind,
            head: span,
            info: "",
            tail: "",
        }
    }

    pub fn write_to(&self, out: &mut String) {
        out.push_str(self.head);
        out.push_str(self.info);
        out.push_str(self.tail);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Tag(Tag<'a>),
    Passthrough(Passthrough<'a>),
}

/* =============================== Classifier ============================== */

/// Classify one raw span produced by the scanner.
///
/// Spans that carry no tag name at all (`<>`, `< >`, `</>`) come back as
/// `Token::Text`.
pub fn classify(span: &str) -> Token<'_> {
    if span.starts_with("<!--") {
        return Token::Passthrough(Passthrough::split(
            PassthroughKind::Comment,
            span,
            4,
            &["-->", ""],
        ));
    }

    let b = span.as_bytes();
    let n = b.len();
    let mut i = 1usize;
    while i < n && is_ws(b[i]) {
        i += 1;
    }
    let is_close = i < n && b[i] == b'/';
    if is_close {
        i += 1;
        while i < n && is_ws(b[i]) {
            i += 1;
        }
    }
    let name_start = i;
    while i < n && !is_ws(b[i]) && !matches!(b[i], b'>' | b'/') && !is_quote(b[i]) {
        i += 1;
    }
    let name = span[name_start..i].to_lowercase();
    if name.is_empty() {
        return Token::Text(span);
    }

    if name.starts_with("![cdata[") {
        return Token::Passthrough(Passthrough::split(
            PassthroughKind::CData,
            span,
            "<![CDATA[".len(),
            &["]]>", ""],
        ));
    }
    if name == "!doctype" {
        return Token::Passthrough(Passthrough::split(PassthroughKind::Doctype, span, i, &[">", ""]));
    }
    if name.starts_with('!') {
        return Token::Passthrough(Passthrough::split(
            PassthroughKind::Declaration,
            span,
            i,
            &[">", ""],
        ));
    }
    if name.starts_with('?') {
        return Token::Passthrough(Passthrough::split(
            PassthroughKind::ProcessingInstruction,
            span,
            i,
            &["?>", ">", ""],
        ));
    }

    let body_end = if span.ends_with('>') { n - 1 } else { n };
    let body = &span[i.min(body_end)..body_end];
    let slash = self_closing_style(span, i.min(body_end), body_end);

    if name == "svg" {
        let kind = if is_close {
            PassthroughKind::SvgEnd
        } else {
            PassthroughKind::SvgStart {
                self_closing: slash.is_some(),
            }
        };
        return Token::Passthrough(Passthrough::split(kind, span, i, &[">", ""]));
    }

    let (kind, attributes) = if is_close {
        (TagKind::Close, Attributes::new())
    } else {
        let kind = slash.map_or(TagKind::Open, TagKind::SelfClosing);
        (kind, Attributes::parse(body))
    };

    Token::Tag(Tag {
        kind,
        name,
        attributes,
        raw: span,
    })
}

/// Detect a trailing `/` in `span[from..to]` and whether whitespace precedes it.
fn self_closing_style(span: &str, from: usize, to: usize) -> Option<SlashStyle> {
    let b = span.as_bytes();
    let mut j = to;
    while j > from && is_ws(b[j - 1]) {
        j -= 1;
    }
    if j == from || b[j - 1] != b'/' {
        return None;
    }
    // The slash itself is at j - 1; look at what comes right before it.
    if j >= 2 && is_ws(b[j - 2]) {
        Some(SlashStyle::Spaced)
    } else {
        Some(SlashStyle::Tight)
    }
}

/* =============================== Serializer ============================== */

/// Write an element tag with the given name and attributes.
pub fn write_tag(out: &mut String, kind: TagKind, name: &str, attrs: &Attributes) {
    out.push('<');
    if kind == TagKind::Close {
        out.push('/');
        out.push_str(name);
        out.push('>');
        return;
    }
    out.push_str(name);
    for (key, value) in attrs.iter() {
        // Values holding a double quote (and no single quote) came from a
        // single-quoted source attribute.
        let q = if value.contains('"') && !value.contains('\'') { '\'' } else { '"' };
        out.push(' ');
        out.push_str(key);
        out.push('=');
        out.push(q);
        out.push_str(value);
        out.push(q);
    }
    match kind {
        TagKind::SelfClosing(SlashStyle::Tight) => out.push_str("/>"),
        TagKind::SelfClosing(SlashStyle::Spaced) => out.push_str(" />"),
        _ => out.push('>'),
    }
}

/// Serialized form of a tag, mostly useful for diagnostics.
pub struct TagDisplay<'t> {
    pub kind: TagKind,
    pub name: &'t str,
    pub attrs: &'t Attributes,
}

impl fmt::Display for TagDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        write_tag(&mut s, self.kind, self.name, self.attrs);
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(span: &str) -> Tag<'_> {
        match classify(span) {
            Token::Tag(t) => t,
            other => panic!("expected a tag, got {other:?}"),
        }
    }

    fn passthrough(span: &str) -> Passthrough<'_> {
        match classify(span) {
            Token::Passthrough(p) => p,
            other => panic!("expected passthrough, got {other:?}"),
        }
    }

    fn pairs(attrs: &Attributes) -> Vec<(&str, &str)> {
        attrs.iter().collect()
    }

    #[test]
    fn open_close_and_self_closing() {
        let t = tag("<P class=\"a\">");
        assert_eq!(t.kind, TagKind::Open);
        assert_eq!(t.name, "p");
        assert_eq!(pairs(&t.attributes), vec![("class", "a")]);

        let t = tag("< / span >");
        assert_eq!(t.kind, TagKind::Close);
        assert_eq!(t.name, "span");

        assert_eq!(tag("<br/>").kind, TagKind::SelfClosing(SlashStyle::Tight));
        assert_eq!(tag("<br />").kind, TagKind::SelfClosing(SlashStyle::Spaced));
        assert_eq!(
            tag("<img src=\"a.png\" alt=\"\"/>").kind,
            TagKind::SelfClosing(SlashStyle::Tight)
        );
    }

    #[test]
    fn name_stops_at_newline_and_quote() {
        assert_eq!(tag("<span\nclass=\"x\">").name, "span");
        assert_eq!(tag("<a\"b\">").name, "a");
    }

    #[test]
    fn void_open_tag_does_not_open_an_element() {
        assert!(tag("<br>").is_void_open());
        assert!(!tag("<br/>").is_void_open());
        assert!(!tag("<p>").is_void_open());
        assert!(!tag("<br>").opens_element());
        assert!(tag("<div>").opens_element());
        assert!(!tag("<div/>").opens_element());
    }

    #[test]
    fn attribute_quoting_styles() {
        let t = tag("<a href=foo.html title='it \"is\"' data-x = \"1\" hidden>");
        assert_eq!(
            pairs(&t.attributes),
            vec![
                ("href", "foo.html"),
                ("title", "it \"is\""),
                ("data-x", "1"),
                ("hidden", ""),
            ]
        );
    }

    #[test]
    fn unquoted_value_keeps_inner_slash() {
        let t = tag("<img src=images/a.png/>");
        assert_eq!(t.attributes.get("src"), Some("images/a.png"));
        assert_eq!(t.kind, TagKind::SelfClosing(SlashStyle::Tight));
    }

    #[test]
    fn duplicate_attribute_overwrites_in_place() {
        let t = tag("<p class=\"a\" id=\"b\" CLASS=\"c\">");
        assert_eq!(pairs(&t.attributes), vec![("class", "c"), ("id", "b")]);
    }

    #[test]
    fn svg_camel_case_names_survive() {
        let attrs = Attributes::parse(" viewBox=\"0 0 1 1\" Width=\"3\" preserveAspectRatio=\"none\"");
        assert_eq!(
            pairs(&attrs),
            vec![("viewBox", "0 0 1 1"), ("width", "3"), ("preserveAspectRatio", "none")]
        );
    }

    #[test]
    fn unterminated_quote_takes_rest() {
        let attrs = Attributes::parse(" title=\"never closed");
        assert_eq!(attrs.get("title"), Some("never closed"));
    }

    #[test]
    fn junk_does_not_loop() {
        let attrs = Attributes::parse(" = \"x\" 'y' =z");
        assert_eq!(pairs(&attrs), vec![("z", "")]);
    }

    #[test]
    fn empty_name_is_text() {
        assert_eq!(classify("<>"), Token::Text("<>"));
        assert_eq!(classify("< >"), Token::Text("< >"));
        assert_eq!(classify("</>"), Token::Text("</>"));
    }

    #[test]
    fn passthrough_kinds() {
        let p = passthrough("<!-- c -->");
        assert_eq!(p.kind, PassthroughKind::Comment);
        assert_eq!(p.info, " c ");

        let p = passthrough("<!DOCTYPE html>");
        assert_eq!(p.kind, PassthroughKind::Doctype);
        assert_eq!((p.head, p.info, p.tail), ("<!DOCTYPE", " html", ">"));

        let p = passthrough("<?xml version=\"1.0\"?>");
        assert_eq!(p.kind, PassthroughKind::ProcessingInstruction);
        assert_eq!((p.head, p.info, p.tail), ("<?xml", " version=\"1.0\"", "?>"));

        assert_eq!(passthrough("<![CDATA[x]]>").kind, PassthroughKind::CData);
        assert_eq!(passthrough("<!ENTITY nbsp \"&#160;\">").kind, PassthroughKind::Declaration);
        assert_eq!(
            passthrough("<svg viewBox=\"0 0 1 1\">").kind,
            PassthroughKind::SvgStart { self_closing: false }
        );
        assert_eq!(
            passthrough("<svg/>").kind,
            PassthroughKind::SvgStart { self_closing: true }
        );
        assert_eq!(passthrough("</SVG>").kind, PassthroughKind::SvgEnd);
    }

    #[test]
    fn passthrough_pieces_rebuild_the_span() {
        for span in [
            "<!-- c -->",
            "<!-->",
            "<!--->",
            "<!-- open",
            "<!doctype html>",
            "<?xml?>",
            "<?php echo 1 ?>",
            "<![CDATA[ ]]>",
            "<![CDATA[",
            "<svg xmlns=\"http://www.w3.org/2000/svg\">",
            "</ svg >",
        ] {
            let p = passthrough(span);
            let mut out = String::new();
            p.write_to(&mut out);
            assert_eq!(out, span);
        }
    }

    #[test]
    fn serializer_forms() {
        let mut attrs = Attributes::new();
        attrs.insert("id".into(), "y".into());
        attrs.insert("title".into(), "say \"hi\"".into());

        let mut out = String::new();
        write_tag(&mut out, TagKind::Open, "div", &attrs);
        assert_eq!(out, "<div id=\"y\" title='say \"hi\"'>");

        let empty = Attributes::new();
        assert_eq!(
            TagDisplay { kind: TagKind::SelfClosing(SlashStyle::Spaced), name: "br", attrs: &empty }
                .to_string(),
            "<br />"
        );
        assert_eq!(
            TagDisplay { kind: TagKind::SelfClosing(SlashStyle::Tight), name: "br", attrs: &empty }
                .to_string(),
            "<br/>"
        );
        assert_eq!(
            TagDisplay { kind: TagKind::Close, name: "div", attrs: &attrs }.to_string(),
            "</div>"
        );
    }
}
