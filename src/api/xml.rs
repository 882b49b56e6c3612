//! Minimal owned XML tree for YouTrack responses.
//!
//! Responses are small, so they are read fully into an [`Element`] tree with
//! `quick-xml` and then walked by the record constructors. The module also
//! holds the escaping helpers used by the request body builders.

use std::borrow::Cow;
use std::fmt::Write as _;

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while reading an XML document.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying reader rejected the input.
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// The document ended while elements were still open.
    #[error("unexpected end of document inside <{0}>")]
    Unclosed(String),

    /// The document contained no element at all.
    #[error("document has no root element")]
    NoRoot,
}

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its attributes (in document order) and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element with the given tag name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value, or an empty string when it is missing.
    pub fn attr_or_empty(&self, name: &str) -> String {
        self.attr(name).unwrap_or_default().to_string()
    }

    /// Interpret an attribute as a boolean (`"true"`, case-insensitive).
    pub fn attr_bool(&self, name: &str) -> bool {
        self.attr(name)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Iterate over the direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// The first direct child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    /// All direct child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |el| el.name == name)
    }

    /// Text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }

    /// All elements with the given name at any depth, in document order.
    ///
    /// Includes `self` when it matches.
    pub fn descendants_named(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.name == name {
            found.push(self);
        }
        for el in self.elements() {
            el.collect_named(name, found);
        }
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Serialize this element back to markup.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, escape_attr(value));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(&escape_text(t)),
                Node::Element(el) => el.write_to(out),
            }
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// Parse a complete document and return its root element.
///
/// Whitespace-only text between elements is dropped.
pub fn parse(input: &[u8]) -> Result<Element, XmlError> {
    let mut reader = Reader::from_reader(input);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let el = element_from_start(&start)?;
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text.unescape()?;
                    if !text.trim().is_empty() {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut el = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

/// Escape text content (`&`, `<`, `>`).
pub fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}

/// Escape an attribute value for use inside double quotes.
///
/// Line breaks and tabs become numeric references so they survive attribute
/// value normalization on the server.
pub fn escape_attr(value: &str) -> String {
    let escaped = escape(value);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped.into_owned();
    }
    escaped
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
        .replace('\t', "&#x9;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attributes_and_children() {
        let root = parse(
            br#"<issue id="ABC-1"><field name="summary"><value>Crash &amp; burn</value></field></issue>"#,
        )
        .unwrap();

        assert_eq!(root.name, "issue");
        assert_eq!(root.attr("id"), Some("ABC-1"));
        let field = root.child("field").unwrap();
        assert_eq!(field.attr("name"), Some("summary"));
        assert_eq!(field.child_text("value").as_deref(), Some("Crash & burn"));
    }

    #[test]
    fn test_parse_skips_declaration_and_whitespace() {
        let root = parse(b"<?xml version=\"1.0\"?>\n<list>\n  <user login=\"a\"/>\n  <user login=\"b\"/>\n</list>")
            .unwrap();
        assert_eq!(root.children.len(), 2);
        let logins: Vec<_> = root.elements().filter_map(|u| u.attr("login")).collect();
        assert_eq!(logins, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_keeps_padding_inside_values() {
        let root = parse(b"<issue><field name=\"description\"><value>  indented code\n</value></field></issue>")
            .unwrap();
        let field = root.child("field").unwrap();
        assert_eq!(field.child_text("value").as_deref(), Some("  indented code\n"));
    }

    #[test]
    fn test_parse_rejects_mismatched_tags() {
        assert!(parse(b"<a><b></a>").is_err());
    }

    #[test]
    fn test_parse_rejects_unclosed_document() {
        assert!(matches!(parse(b"<a><b/>"), Err(XmlError::Unclosed(name)) if name == "a"));
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        assert!(matches!(parse(b"   "), Err(XmlError::NoRoot)));
    }

    #[test]
    fn test_descendants_named_searches_all_levels() {
        let root = parse(b"<r><item id=\"1\"/><group><item id=\"2\"/></group></r>").unwrap();
        let ids: Vec<_> = root
            .descendants_named("item")
            .iter()
            .filter_map(|e| e.attr("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_to_xml_escapes() {
        let mut el = Element::new("comment");
        el.attributes.push(("text".into(), "a \"b\"\nc".into()));
        el.children.push(Node::Text("1 < 2".into()));
        assert_eq!(el.to_xml(), "<comment text=\"a &quot;b&quot;&#xA;c\">1 &lt; 2</comment>");
    }

    #[test]
    fn test_escape_text_leaves_quotes() {
        assert_eq!(escape_text("a & \"b\" <c>"), "a &amp; \"b\" &lt;c&gt;");
    }

    #[test]
    fn test_escape_attr_numeric_references() {
        assert_eq!(escape_attr("x\ty\r\nz"), "x&#x9;y&#xD;&#xA;z");
        assert_eq!(escape_attr("plain"), "plain");
    }
}
