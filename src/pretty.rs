//! Indentation and whitespace policy for catalog output.
//!
//! Structural elements are laid out one child per line with two spaces per
//! level. `source` and `target` hold user visible text and are only touched
//! according to [`FormatOptions`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::Error,
    options::FormatOptions,
    xml::{self, Element, Node},
};

lazy_static! {
    static ref XML_WHITESPACE_RUN: Regex = Regex::new(r"[ \t\r\n]+").unwrap();
}

const INDENT: &str = "  ";

/// Renders a whole document: prolog, laid out root element, trailing content.
pub fn render_document(
    header: Option<&str>,
    root: &Element,
    trailing: Option<&str>,
    opts: FormatOptions,
) -> String {
    let mut out = String::new();
    if let Some(header) = header {
        out.push_str(header);
    }
    render_element(root, 0, opts, &mut out);
    if let Some(trailing) = trailing {
        out.push_str(trailing);
    }
    out
}

fn is_segment(el: &Element) -> bool {
    el.name == "source" || el.name == "target"
}

fn render_element(el: &Element, depth: usize, opts: FormatOptions, out: &mut String) {
    if is_segment(el) {
        render_segment(el, depth, opts, out);
        return;
    }

    let significant: Vec<&Node> = el.children.iter().filter(|c| !c.is_blank_text()).collect();
    if significant.is_empty() {
        write_empty(el, out);
        return;
    }

    // Text bearing elements are written as they are.
    if significant
        .iter()
        .any(|c| matches!(c, Node::Text(_) | Node::CData(_)))
    {
        xml::write_element(el, out);
        return;
    }

    xml::write_start_tag(el, out);
    for child in significant {
        newline(depth + 1, out);
        match child {
            Node::Element(child) => render_element(child, depth + 1, opts, out),
            other => xml::write_node(other, out),
        }
    }
    newline(depth, out);
    xml::write_end_tag(el, out);
}

fn render_segment(el: &Element, depth: usize, opts: FormatOptions, out: &mut String) {
    if el.children.is_empty() {
        write_empty(el, out);
        return;
    }
    xml::write_start_tag(el, out);
    out.push_str(&segment_inner(&el.children, depth, opts));
    xml::write_end_tag(el, out);
}

fn write_empty(el: &Element, out: &mut String) {
    let bare = Element {
        children: Vec::new(),
        ..el.clone()
    };
    xml::write_element(&bare, out);
}

fn newline(depth: usize, out: &mut String) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Lays out the content of a segment element sitting at `depth`.
fn segment_inner(children: &[Node], depth: usize, opts: FormatOptions) -> String {
    let collapsed;
    let nodes: &[Node] = if opts.collapse_whitespace {
        collapsed = collapse_nodes(children);
        &collapsed
    } else {
        children
    };

    let mut out = String::new();
    if opts.pretty_nested_tags && is_tag_only(nodes) {
        write_block(nodes, depth, &mut out);
    } else {
        for node in nodes {
            xml::write_node(node, &mut out);
        }
    }
    out
}

/// At least one element and nothing but whitespace around it.
fn is_tag_only(nodes: &[Node]) -> bool {
    nodes.iter().any(|n| matches!(n, Node::Element(_)))
        && nodes
            .iter()
            .all(|n| matches!(n, Node::Element(_)) || n.is_blank_text())
}

fn write_block(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes.iter().filter(|n| !n.is_blank_text()) {
        newline(depth + 1, out);
        match node {
            Node::Element(el) if is_tag_only(&el.children) => {
                xml::write_start_tag(el, out);
                write_block(&el.children, depth + 1, out);
                xml::write_end_tag(el, out);
            }
            other => xml::write_node(other, out),
        }
    }
    newline(depth, out);
}

fn collapse_nodes(nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(raw) => Node::Text(collapse_whitespace(raw)),
            Node::Element(el) => Node::Element(Element {
                children: collapse_nodes(&el.children),
                ..el.clone()
            }),
            other => other.clone(),
        })
        .collect()
}

/// Replaces every run of XML whitespace with a single space.
pub fn collapse_whitespace(text: &str) -> String {
    XML_WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

fn is_xml_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Normalizes freshly extracted segment markup: collapses whitespace and
/// trims the outer text when configured. Inline tags are kept as they are.
pub fn normalize_markup(markup: &str, opts: FormatOptions) -> Result<String, Error> {
    if !opts.collapse_whitespace && !opts.trim {
        return Ok(markup.to_string());
    }
    let mut nodes = xml::parse_fragment(markup)?;
    if opts.collapse_whitespace {
        nodes = collapse_nodes(&nodes);
    }
    if opts.trim {
        if let Some(Node::Text(first)) = nodes.first_mut() {
            *first = first.trim_start_matches(is_xml_ws).to_string();
        }
        if let Some(Node::Text(last)) = nodes.last_mut() {
            *last = last.trim_end_matches(is_xml_ws).to_string();
        }
        nodes.retain(|n| !matches!(n, Node::Text(t) if t.is_empty()));
    }

    let mut out = String::new();
    for node in &nodes {
        xml::write_node(node, &mut out);
    }
    Ok(out)
}

/// The form two segments are compared in, so layout alone never counts as a change.
pub fn comparison_form(markup: &str, opts: FormatOptions) -> Result<String, Error> {
    let nodes = xml::parse_fragment(markup)?;
    Ok(segment_inner(&nodes, 0, opts))
}

/// Replaces leading and trailing XML whitespace of `text` with single spaces
/// wherever `model` has leading or trailing whitespace.
pub fn pad_like(text: &str, model: &str) -> String {
    let core = text.trim_matches(is_xml_ws);
    let lead = if model.starts_with(is_xml_ws) { " " } else { "" };
    let tail = if model.ends_with(is_xml_ws) { " " } else { "" };
    format!("{}{}{}", lead, core, tail)
}

/// Trims XML whitespace only; non-breaking spaces are content.
pub fn trim_xml_whitespace(text: &str) -> &str {
    text.trim_matches(is_xml_ws)
}
