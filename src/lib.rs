#![forbid(unsafe_code)]
//! Keeps XLIFF translation catalogs in step with freshly extracted messages.
//!
//! Given the catalog produced by a message extractor and an existing,
//! partially translated catalog, `xlfmerge` produces the updated catalog:
//! translations survive source edits and id churn, new messages are added,
//! obsolete ones are removed, and the output layout is stable across runs.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlfmerge::{Dialect, MergeOptions, merge_catalog_files};
//!
//! let options = MergeOptions::default();
//! let report = merge_catalog_files(
//!     "src/locale/messages.xlf",
//!     "src/locale/messages.de.xlf",
//!     Some("de"),
//!     Dialect::Xlf1,
//!     &options,
//! )?;
//! println!("{} added, {} removed", report.added, report.removed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Supported Formats
//!
//! - **XLIFF 1.2**: `trans-unit` catalogs with `context-group` locations
//! - **XLIFF 2.0**: `unit`/`segment` catalogs with categorized notes
//!
//! # Features
//!
//! - Fuzzy matching of renamed messages by edit distance
//! - Source-language catalogs tracked through the same merge
//! - Configurable whitespace handling and nested tag layout
//! - Three ordering strategies for new units

pub mod error;
pub mod formats;
pub mod fuzzy;
pub mod io;
pub mod lexdist;
pub mod merger;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod pretty;
pub mod sort;
pub mod types;
pub mod xml;

// Re-export most used types for easy consumption
pub use crate::{
    error::Error,
    formats::{CatalogFormat, Dialect},
    lexdist::{InsertionPoint, LexDist, find_lex_closest_index},
    merger::{MergeOutcome, MergeReport, Merger},
    options::{FormatOptions, IncludeContext, MergeOptions, NewTargets, SortStrategy},
    pipeline::{
        format_source_catalog, merge_catalog_files, merge_catalogs, merge_catalogs_with_report,
        merge_translation_files,
    },
    types::{Location, TranslationFile, TranslationUnit},
};
