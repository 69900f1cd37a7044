//! All error types for the xlfmerge crate.
//!
//! These are returned from every fallible operation (parsing, serialization, merging, I/O).

use quick_xml::{escape::EscapeError, events::attributes::AttrError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] AttrError),

    #[error("XML escape error: {0}")]
    XmlEscape(#[from] EscapeError),

    #[error("invalid UTF-8 in catalog: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed catalog: {0}")]
    MalformedCatalog(String),

    #[error("translation unit `{0}` not found")]
    UnitNotFound(String),

    #[error("unknown dialect `{0}`")]
    UnknownDialect(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new malformed-catalog error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedCatalog(message.into())
    }
}
