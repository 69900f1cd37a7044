//! Core, dialect-agnostic catalog types.
//! Parsers decode into these; serializers encode these.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// A complete translation catalog (one `.xlf` file).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationFile {
    /// Ordered list of all units; drives serialized order.
    #[serde(default)]
    pub units: Vec<TranslationUnit>,

    /// Language of the `source` segments.
    pub source_lang: String,

    /// Language of the `target` segments. Absent for a catalog mirroring the source language.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub target_lang: Option<String>,

    /// The `<?xml …?>` prolog including the whitespace that followed it, kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub xml_header: Option<String>,

    /// Whatever followed the root element's end tag, kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub trailing_whitespace: Option<String>,
}

impl TranslationFile {
    pub fn new(source_lang: impl Into<String>, target_lang: Option<String>) -> Self {
        TranslationFile {
            units: Vec::new(),
            source_lang: source_lang.into(),
            target_lang,
            xml_header: None,
            trailing_whitespace: None,
        }
    }

    /// An empty catalog for `target_lang` that inherits language, prolog and
    /// trailing whitespace from `source`.
    pub fn empty_target_for(source: &TranslationFile, target_lang: Option<String>) -> Self {
        TranslationFile {
            units: Vec::new(),
            source_lang: source.source_lang.clone(),
            target_lang,
            xml_header: source.xml_header.clone(),
            trailing_whitespace: source.trailing_whitespace.clone(),
        }
    }

    /// Looks a unit up by id. Part of the public model API; the merge itself
    /// keeps its own position index.
    pub fn find_unit(&self, id: &str) -> Option<&TranslationUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.id.as_str())
    }

    /// Appends a unit at the end of the catalog.
    pub fn add_unit(&mut self, unit: TranslationUnit) {
        self.units.push(unit);
    }

    /// Replaces the unit currently stored under `id`, keeping its position.
    ///
    /// The replacement may carry a different id (fuzzy matches rename units).
    /// Meant for callers editing a catalog; [`crate::Merger`] applies the same
    /// contract through its own position index.
    pub fn replace_unit(&mut self, id: &str, unit: TranslationUnit) -> Result<(), Error> {
        let slot = self
            .units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::UnitNotFound(id.to_string()))?;
        *slot = unit;
        Ok(())
    }

    /// Whether this catalog tracks the source language itself (e.g. `en` → `en`).
    pub fn is_source_language_mirror(&self) -> bool {
        match &self.target_lang {
            None => true,
            Some(target) => is_same_language(&self.source_lang, target),
        }
    }
}

/// One localizable message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUnit {
    pub id: String,

    /// Raw inner markup of the source segment, inline placeholder tags included.
    pub source: String,

    /// Raw inner markup of the target segment. `None` means not yet translated.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub target: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub state: Option<String>,

    /// Raw (escaped) text of the meaning note.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub meaning: Option<String>,

    /// Raw (escaped) text of the description note.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub locations: Vec<Location>,

    /// Unrecognized attributes of the unit element as `(name, raw value)`, in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub additional_attributes: Vec<(String, String)>,
}

impl TranslationUnit {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        TranslationUnit {
            id: id.into(),
            source: source.into(),
            target: None,
            state: None,
            meaning: None,
            description: None,
            locations: Vec::new(),
            additional_attributes: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// A unit is untranslated while it still carries the initial state and its
    /// target is either missing or a plain copy of the source.
    pub fn is_untranslated(&self, initial_state: &str) -> bool {
        self.state.as_deref() == Some(initial_state)
            && self.target.as_ref().is_none_or(|t| *t == self.source)
    }
}

impl Display for TranslationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TranslationUnit {{ id: {}, source: {}, target: {:?}, state: {:?} }}",
            self.id, self.source, self.target, self.state
        )
    }
}

/// A source code reference of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub line_start: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub line_end: Option<u32>,
}

impl Location {
    pub fn new(file: impl Into<String>, line_start: u32, line_end: Option<u32>) -> Self {
        Location {
            file: file.into(),
            line_start: Some(line_start),
            line_end,
        }
    }
}

/// Compares two language tags as BCP 47 identifiers, falling back to a
/// case-insensitive comparison when either does not parse.
pub fn is_same_language(a: &str, b: &str) -> bool {
    let canonical = |tag: &str| tag.trim().replace('_', "-");
    let (a, b) = (canonical(a), canonical(b));
    match (
        a.parse::<LanguageIdentifier>(),
        b.parse::<LanguageIdentifier>(),
    ) {
        (Ok(a_id), Ok(b_id)) => a_id == b_id,
        _ => a.eq_ignore_ascii_case(&b),
    }
}
