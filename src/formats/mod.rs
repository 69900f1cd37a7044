pub mod xlf1;
pub mod xlf2;

use std::{fmt::Display, str::FromStr};

use crate::{
    error::Error,
    options::FormatOptions,
    types::TranslationFile,
    xml::{self, Element},
};

// Reexporting the formats for easier access
pub use xlf1::Format as Xlf1Format;
pub use xlf2::Format as Xlf2Format;

/// Conversion between catalog text and [`TranslationFile`].
pub trait CatalogFormat {
    /// Parses a complete catalog document.
    fn parse(input: &str) -> Result<TranslationFile, Error>;

    /// Renders `file` as a complete document, prolog and trailing content included.
    fn serialize(file: &TranslationFile, opts: FormatOptions) -> Result<String, Error>;
}

/// The supported XLIFF dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// XLIFF 1.2 (`trans-unit`, `body`, `context-group`).
    Xlf1,
    /// XLIFF 2.0 (`unit`, `segment`, `notes`).
    Xlf2,
}

impl Dialect {
    /// State label given to new units when none is configured.
    pub fn default_initial_state(&self) -> &'static str {
        match self {
            Dialect::Xlf1 => "new",
            Dialect::Xlf2 => "initial",
        }
    }

    pub fn parse(&self, input: &str) -> Result<TranslationFile, Error> {
        match self {
            Dialect::Xlf1 => Xlf1Format::parse(input),
            Dialect::Xlf2 => Xlf2Format::parse(input),
        }
    }

    pub fn serialize(&self, file: &TranslationFile, opts: FormatOptions) -> Result<String, Error> {
        match self {
            Dialect::Xlf1 => Xlf1Format::serialize(file, opts),
            Dialect::Xlf2 => Xlf2Format::serialize(file, opts),
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Xlf1 => write!(f, "xlf"),
            Dialect::Xlf2 => write!(f, "xlf2"),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlf" | "xlf1" | "xliff" | "1.2" => Ok(Dialect::Xlf1),
            "xlf2" | "xliff2" | "2.0" => Ok(Dialect::Xlf2),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

/// Builds a `source`/`target` element around stored inner markup.
pub(crate) fn segment_element(name: &str, markup: &str) -> Result<Element, Error> {
    let mut el = Element::new(name);
    el.children = xml::parse_fragment(markup)?;
    Ok(el)
}

/// Attributes of a unit element that are carried through untouched.
pub(crate) fn extra_attributes(unit: &Element, known: &[&str]) -> Vec<(String, String)> {
    unit.attributes
        .iter()
        .filter(|(name, _)| !known.contains(&name.as_str()))
        .cloned()
        .collect()
}

pub(crate) fn required_attr(el: &Element, name: &str) -> Result<String, Error> {
    el.attr(name)?.ok_or_else(|| {
        Error::malformed(format!("<{}> is missing the `{}` attribute", el.name, name))
    })
}
