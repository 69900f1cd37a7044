//! XLIFF 1.2: `xliff > file > body > trans-unit`.

use crate::{
    error::Error,
    formats::{CatalogFormat, extra_attributes, required_attr, segment_element},
    options::FormatOptions,
    pretty,
    types::{Location, TranslationFile, TranslationUnit},
    xml::{self, Element},
};

const NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";
const KNOWN_UNIT_ATTRIBUTES: [&str; 2] = ["id", "datatype"];

pub struct Format;

impl CatalogFormat for Format {
    fn parse(input: &str) -> Result<TranslationFile, Error> {
        let doc = xml::parse_document(input)?;
        let file = doc
            .root
            .child_named("file")
            .ok_or_else(|| Error::malformed("missing <file> element"))?;

        let mut catalog = TranslationFile::new(
            required_attr(file, "source-language")?,
            file.attr("target-language")?,
        );
        catalog.xml_header = doc.header;
        catalog.trailing_whitespace = doc.trailing;

        for unit in file.descendants_named("trans-unit") {
            catalog.add_unit(parse_unit(unit)?);
        }
        Ok(catalog)
    }

    fn serialize(file: &TranslationFile, opts: FormatOptions) -> Result<String, Error> {
        let mut body = Element::new("body");
        for unit in &file.units {
            body.children.push(unit_element(unit)?.into());
        }

        let mut file_el = Element::new("file").with_attr("source-language", &file.source_lang);
        if let Some(target_lang) = &file.target_lang {
            file_el = file_el.with_attr("target-language", target_lang);
        }
        let file_el = file_el
            .with_attr("datatype", "plaintext")
            .with_attr("original", "ng2.template")
            .with_child(body);

        let root = Element::new("xliff")
            .with_attr("version", "1.2")
            .with_attr("xmlns", NAMESPACE)
            .with_child(file_el);

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
    let source = unit
        .child_named("source")
        .ok_or_else(|| Error::malformed(format!("trans-unit `{}` has no <source>", id)))?;

    let mut result = TranslationUnit::new(id, source.inner_markup());
    if let Some(target) = unit.child_named("target") {
        result.target = Some(target.inner_markup());
        result.state = target.attr("state")?;
    }

    for note in unit.children_named("note") {
        match note.attr("from")?.as_deref() {
            Some("meaning") => result.meaning = Some(note.inner_markup()),
            Some("description") => result.description = Some(note.inner_markup()),
            _ => {}
        }
    }

    for group in unit.children_named("context-group") {
        if let Some(location) = parse_context_group(group, &result.id)? {
            result.locations.push(location);
        }
    }

    result.additional_attributes = extra_attributes(unit, &KNOWN_UNIT_ATTRIBUTES);
    Ok(result)
}

fn parse_context_group(group: &Element, unit_id: &str) -> Result<Option<Location>, Error> {
    let mut file = None;
    let mut line = None;
    for context in group.children_named("context") {
        match context.attr("context-type")?.as_deref() {
            Some("sourcefile") => file = Some(context.text_content()?),
            Some("linenumber") => {
                let text = context.text_content()?;
                let number = text.trim().parse::<u32>().map_err(|_| {
                    Error::malformed(format!(
                        "trans-unit `{}` has an invalid line number `{}`",
                        unit_id, text
                    ))
                })?;
                line = Some(number);
            }
            _ => {}
        }
    }
    Ok(file.map(|file| Location {
        file,
        line_start: line,
        line_end: None,
    }))
}

fn unit_element(unit: &TranslationUnit) -> Result<Element, Error> {
    let mut el = Element::new("trans-unit")
        .with_attr("id", &unit.id)
        .with_attr("datatype", "html");
    for (name, raw) in &unit.additional_attributes {
        el = el.with_raw_attr(name, raw);
    }

    el = el.with_child(segment_element("source", &unit.source)?);
    if let Some(target) = &unit.target {
        let mut target_el = segment_element("target", target)?;
        if let Some(state) = &unit.state {
            target_el = target_el.with_attr("state", state);
        }
        el = el.with_child(target_el);
    }

    for location in &unit.locations {
        let mut group = Element::new("context-group")
            .with_attr("purpose", "location")
            .with_child(
                Element::new("context")
                    .with_attr("context-type", "sourcefile")
                    .with_text(&location.file),
            );
        if let Some(line) = location.line_start {
            group = group.with_child(
                Element::new("context")
                    .with_attr("context-type", "linenumber")
                    .with_text(&line.to_string()),
            );
        }
        el = el.with_child(group);
    }

    if let Some(description) = &unit.description {
        el = el.with_child(note("description", description));
    }
    if let Some(meaning) = &unit.meaning {
        el = el.with_child(note("meaning", meaning));
    }
    Ok(el)
}

fn note(from: &str, text: &str) -> Element {
    Element::new("note")
        .with_attr("priority", "1")
        .with_attr("from", from)
        .with_raw_text(text)
}
