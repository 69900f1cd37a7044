//! XLIFF 2.0: `xliff > file > unit > segment`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::Error,
    formats::{CatalogFormat, extra_attributes, required_attr, segment_element},
    options::FormatOptions,
    pretty,
    types::{Location, TranslationFile, TranslationUnit},
    xml::{self, Element},
};

const NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:2.0";
const KNOWN_UNIT_ATTRIBUTES: [&str; 1] = ["id"];

lazy_static! {
    static ref LINE_SPEC: Regex = Regex::new(r"^(\d+)(?:,(\d+))?$").unwrap();
}

pub struct Format;

impl CatalogFormat for Format {
    fn parse(input: &str) -> Result<TranslationFile, Error> {
        let doc = xml::parse_document(input)?;
        let root = &doc.root;
        let file = root
            .child_named("file")
            .ok_or_else(|| Error::malformed("missing <file> element"))?;

        let mut catalog =
            TranslationFile::new(required_attr(root, "srcLang")?, root.attr("trgLang")?);

        for unit in file.descendants_named("unit") {
            catalog.add_unit(parse_unit(unit)?);
        }
        catalog.xml_header = doc.header;
        catalog.trailing_whitespace = doc.trailing;
        Ok(catalog)
    }

    fn serialize(file: &TranslationFile, opts: FormatOptions) -> Result<String, Error> {
        let mut file_el = Element::new("file")
            .with_attr("id", "ngi18n")
            .with_attr("original", "ng.template");
        for unit in &file.units {
            file_el.children.push(unit_element(unit)?.into());
        }

        let mut root = Element::new("xliff")
            .with_attr("version", "2.0")
            .with_attr("xmlns", NAMESPACE)
            .with_attr("srcLang", &file.source_lang);
        if let Some(target_lang) = &file.target_lang {
            root = root.with_attr("trgLang", target_lang);
        }
        let root = root.with_child(file_el);

        Ok(pretty::render_document(
            file.xml_header.as_deref(),
            &root,
            file.trailing_whitespace.as_deref(),
            opts,
        ))
    }
}

fn parse_unit(unit: &Element) -> Result<TranslationUnit, Error> {
    let id = required_attr(unit, "id")?;
    // Only the first segment of a unit is read.
    let segment = unit
        .descendants_named("segment")
        .into_iter()
        .next()
        .ok_or_else(|| Error::malformed(format!("unit `{}` has no <segment>", id)))?;
    let source = segment
        .child_named("source")
        .ok_or_else(|| Error::malformed(format!("unit `{}` has no <source>", id)))?;

    let mut result = TranslationUnit::new(id, source.inner_markup());
    result.target = segment.child_named("target").map(Element::inner_markup);
    result.state = segment.attr("state")?;

    if let Some(notes) = unit.child_named("notes") {
        for note in notes.children_named("note") {
            match note.attr("category")?.as_deref() {
                Some("location") => result.locations.push(parse_location(&note.text_content()?)),
                Some("description") => result.description = Some(note.inner_markup()),
                Some("meaning") => result.meaning = Some(note.inner_markup()),
                _ => {}
            }
        }
    }

    result.additional_attributes = extra_attributes(unit, &KNOWN_UNIT_ATTRIBUTES);
    Ok(result)
}

/// Parses `file`, `file:start` or `file:start,end`.
pub fn parse_location(text: &str) -> Location {
    if let Some((file, lines)) = text.rsplit_once(':')
        && let Some(caps) = LINE_SPEC.captures(lines.trim())
    {
        let start = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let end = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        if start.is_some() {
            return Location {
                file: file.to_string(),
                line_start: start,
                line_end: end,
            };
        }
    }
    Location {
        file: text.to_string(),
        line_start: None,
        line_end: None,
    }
}

pub fn format_location(location: &Location) -> String {
    match (location.line_start, location.line_end) {
        (Some(start), Some(end)) if end != start => format!("{}:{},{}", location.file, start, end),
        (Some(start), _) => format!("{}:{}", location.file, start),
        (None, _) => location.file.clone(),
    }
}

fn unit_element(unit: &TranslationUnit) -> Result<Element, Error> {
    let mut el = Element::new("unit").with_attr("id", &unit.id);
    for (name, raw) in &unit.additional_attributes {
        el = el.with_raw_attr(name, raw);
    }

    let mut notes = Element::new("notes");
    for location in &unit.locations {
        notes = notes.with_child(note("location", &format_location(location)));
    }
    if let Some(description) = &unit.description {
        notes = notes.with_child(note("description", description));
    }
    if let Some(meaning) = &unit.meaning {
        notes = notes.with_child(note("meaning", meaning));
    }
    if !notes.children.is_empty() {
        el = el.with_child(notes);
    }

    let mut segment = Element::new("segment");
    if let Some(state) = &unit.state {
        segment = segment.with_attr("state", state);
    }
    segment = segment.with_child(segment_element("source", &unit.source)?);
    if let Some(target) = &unit.target {
        segment = segment.with_child(segment_element("target", target)?);
    }
    Ok(el.with_child(segment))
}

fn note(category: &str, text: &str) -> Element {
    Element::new("note")
        .with_attr("category", category)
        .with_raw_text(text)
}
