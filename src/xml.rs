//! Minimal XML node tree built from quick-xml events.
//!
//! Only what XLIFF catalogs need: elements, attributes, text, CDATA, comments
//! and processing instructions. Text and attribute values are stored exactly as
//! they appear on disk (still escaped), so inner markup is written back
//! byte for byte.

use std::borrow::Cow;

use lazy_static::lazy_static;
use quick_xml::{
    Reader,
    escape::{escape, partial_escape, unescape},
    events::{BytesStart, Event},
};
use regex::Regex;

use crate::error::Error;

lazy_static! {
    static ref XML_DECLARATION: Regex = Regex::new(r"(?s)^<\?xml[ \t\r\n].*?\?>[ \t\r\n]*").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Raw (escaped) character data.
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for text nodes made of XML whitespace only.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(raw) if is_xml_whitespace(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// `(name, raw value)` in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Written as `<name/>` when it has no children.
    pub self_closing: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Adds an attribute, escaping `value`.
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((name.to_string(), escape(value).into_owned()));
        self
    }

    /// Adds an attribute whose value is already escaped.
    pub fn with_raw_attr(mut self, name: &str, raw_value: &str) -> Self {
        self.attributes
            .push((name.to_string(), raw_value.to_string()));
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Adds a text child, escaping `text`.
    pub fn with_text(mut self, text: &str) -> Self {
        self.children
            .push(Node::Text(partial_escape(text).into_owned()));
        self
    }

    /// Adds a text child that is already escaped.
    pub fn with_raw_text(mut self, raw: &str) -> Self {
        self.children.push(Node::Text(raw.to_string()));
        self
    }

    /// Unescaped value of attribute `name`.
    pub fn attr(&self, name: &str) -> Result<Option<String>, Error> {
        self.raw_attr(name)
            .map(|raw| unescape(raw).map(Cow::into_owned))
            .transpose()
            .map_err(Error::from)
    }

    pub fn raw_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn child_named(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |el| el.name == name)
    }

    /// All descendant elements called `name`, in document order. Matching
    /// elements are not searched further.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_descendants(self, name, &mut found);
        found
    }

    /// Children written back exactly as parsed.
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, &mut out);
        }
        out
    }

    /// Unescaped character content of the direct text and CDATA children.
    pub fn text_content(&self) -> Result<String, Error> {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(raw) => out.push_str(&unescape(raw)?),
                Node::CData(raw) => out.push_str(raw),
                _ => {}
            }
        }
        Ok(out)
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

fn collect_descendants<'a>(el: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        if child.name == name {
            found.push(child);
        } else {
            collect_descendants(child, name, found);
        }
    }
}

/// A parsed document: optional prolog, root element and trailing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The `<?xml …?>` declaration plus the whitespace after it.
    pub header: Option<String>,
    pub root: Element,
    /// Raw content after the root element.
    pub trailing: Option<String>,
}

/// Parses a complete document with exactly one root element.
pub fn parse_document(input: &str) -> Result<Document, Error> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let (header, body) = match XML_DECLARATION.find(input) {
        Some(m) => (Some(m.as_str().to_string()), &input[m.end()..]),
        None => (None, input),
    };

    let nodes = parse_nodes(body)?;
    let root_index = nodes
        .iter()
        .position(|n| matches!(n, Node::Element(_)))
        .ok_or_else(|| Error::malformed("document has no root element"))?;

    let mut trailing = String::new();
    for node in &nodes[root_index + 1..] {
        if matches!(node, Node::Element(_)) {
            return Err(Error::malformed("document has more than one root element"));
        }
        write_node(node, &mut trailing);
    }

    let root = match nodes.into_iter().nth(root_index) {
        Some(Node::Element(root)) => root,
        _ => return Err(Error::malformed("document has no root element")),
    };

    Ok(Document {
        header,
        root,
        trailing: (!trailing.is_empty()).then_some(trailing),
    })
}

/// Parses inner markup such as the content of a `<source>` element.
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, Error> {
    parse_nodes(markup)
}

fn parse_nodes(input: &str) -> Result<Vec<Node>, Error> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    // The bottom of the stack collects top level nodes.
    let mut stack: Vec<Element> = vec![Element::new("")];

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from_start(&e, false)?),
            Event::Empty(e) => {
                let el = element_from_start(&e, true)?;
                push_child(&mut stack, Node::Element(el));
            }
            Event::End(e) => {
                if stack.len() < 2 {
                    return Err(Error::malformed(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                if let Some(el) = stack.pop() {
                    push_child(&mut stack, Node::Element(el));
                }
            }
            Event::Text(e) => {
                let raw = std::str::from_utf8(&e)?;
                push_text(&mut stack, raw);
            }
            Event::CData(e) => {
                let raw = std::str::from_utf8(&e)?.to_string();
                push_child(&mut stack, Node::CData(raw));
            }
            Event::Comment(e) => {
                let raw = std::str::from_utf8(&e)?.to_string();
                push_child(&mut stack, Node::Comment(raw));
            }
            Event::PI(e) => {
                let raw = std::str::from_utf8(&e)?.to_string();
                push_child(&mut stack, Node::ProcessingInstruction(raw));
            }
            Event::DocType(e) => {
                let raw = std::str::from_utf8(&e)?.to_string();
                push_child(&mut stack, Node::DocType(raw));
            }
            // Declarations are captured textually by `parse_document`.
            Event::Decl(_) => {}
            Event::Eof => break,
        }
    }

    if stack.len() > 1 {
        let unclosed = stack.last().map(|el| el.name.clone()).unwrap_or_default();
        return Err(Error::malformed(format!("unclosed element <{}>", unclosed)));
    }
    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

fn element_from_start(e: &BytesStart, self_closing: bool) -> Result<Element, Error> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = std::str::from_utf8(&attr.value)?.to_string();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        self_closing,
    })
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

// Adjacent text events are merged into one node.
fn push_text(stack: &mut [Element], raw: &str) {
    if let Some(parent) = stack.last_mut() {
        if let Some(Node::Text(prev)) = parent.children.last_mut() {
            prev.push_str(raw);
        } else {
            parent.children.push(Node::Text(raw.to_string()));
        }
    }
}

/// Writes a node exactly as stored.
pub fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(el) => write_element(el, out),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(raw) => {
            out.push_str("<![CDATA[");
            out.push_str(raw);
            out.push_str("]]>");
        }
        Node::Comment(raw) => {
            out.push_str("<!--");
            out.push_str(raw);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(raw) => {
            out.push_str("<?");
            out.push_str(raw);
            out.push_str("?>");
        }
        Node::DocType(raw) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(raw.trim_start());
            out.push('>');
        }
    }
}

pub fn write_element(el: &Element, out: &mut String) {
    write_start_tag(el, out);
    if el.children.is_empty() && el.self_closing {
        return;
    }
    for child in &el.children {
        write_node(child, out);
    }
    write_end_tag(el, out);
}

/// Writes `<name attrs>` or `<name attrs/>` for childless self-closing elements.
pub fn write_start_tag(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        if value.contains('"') {
            out.push_str(&value.replace('"', "&quot;"));
        } else {
            out.push_str(value);
        }
        out.push('"');
    }
    if el.children.is_empty() && el.self_closing {
        out.push_str("/>");
    } else {
        out.push('>');
    }
}

pub fn write_end_tag(el: &Element, out: &mut String) {
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

pub fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_markup(nodes: &[Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            write_node(node, &mut out);
        }
        out
    }

    #[test]
    fn test_parse_document_captures_header_and_trailing() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<xliff version=\"1.2\">\n  <file/>\n</xliff>\n";
        let doc = parse_document(xml).unwrap();
        assert_eq!(
            doc.header.as_deref(),
            Some("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n")
        );
        assert_eq!(doc.root.name, "xliff");
        assert_eq!(doc.root.attr("version").unwrap().as_deref(), Some("1.2"));
        assert_eq!(doc.trailing.as_deref(), Some("\n"));
        assert!(doc.root.child_named("file").unwrap().self_closing);
    }

    #[test]
    fn test_header_stops_at_xml_whitespace() {
        let doc = parse_document("<?xml version=\"1.0\"?>\n\u{a0}<root/>").unwrap();
        assert_eq!(doc.header.as_deref(), Some("<?xml version=\"1.0\"?>\n"));
        assert_eq!(doc.root.name, "root");
    }

    #[test]
    fn test_stylesheet_instruction_is_not_a_header() {
        let doc = parse_document("<?xml-stylesheet href=\"a.xsl\"?>\n<root/>").unwrap();
        assert!(doc.header.is_none());
        assert_eq!(doc.root.name, "root");
    }

    #[test]
    fn test_parse_document_without_header() {
        let doc = parse_document("<root/>").unwrap();
        assert!(doc.header.is_none());
        assert!(doc.trailing.is_none());
    }

    #[test]
    fn test_parse_document_errors() {
        assert!(matches!(
            parse_document("   "),
            Err(Error::MalformedCatalog(_))
        ));
        assert!(parse_document("<a><b></a>").is_err());
        assert!(matches!(
            parse_document("<a></a><b></b>"),
            Err(Error::MalformedCatalog(_))
        ));
        assert!(parse_document("<a>").is_err());
    }

    #[test]
    fn test_fragment_roundtrip_is_exact() {
        let markup = "Hello <x id=\"INTERPOLATION\" equiv-text=\"{{ name }}\"/>, you &amp; me <b>bold</b><!-- c --><![CDATA[<raw>]]>";
        let nodes = parse_fragment(markup).unwrap();
        assert_eq!(to_markup(&nodes), markup);
    }

    #[test]
    fn test_fragment_unclosed_is_rejected() {
        assert!(parse_fragment("text <b>bold").is_err());
    }

    #[test]
    fn test_text_content_unescapes() {
        let nodes = parse_fragment("<note>Tom &amp; Jerry</note>").unwrap();
        let note = nodes[0].as_element().unwrap();
        assert_eq!(note.text_content().unwrap(), "Tom & Jerry");
        assert_eq!(note.inner_markup(), "Tom &amp; Jerry");
    }

    #[test]
    fn test_built_elements_escape_values() {
        let el = Element::new("note")
            .with_attr("from", "a\"b")
            .with_text("x < y");
        let mut out = String::new();
        write_node(&Node::Element(el), &mut out);
        assert_eq!(out, "<note from=\"a&quot;b\">x &lt; y</note>");
    }

    #[test]
    fn test_descendants_named() {
        let nodes =
            parse_fragment("<body><group><unit id=\"a\"/></group><unit id=\"b\"/></body>").unwrap();
        let body = nodes[0].as_element().unwrap();
        let ids: Vec<String> = body
            .descendants_named("unit")
            .iter()
            .map(|u| u.attr("id").unwrap().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
