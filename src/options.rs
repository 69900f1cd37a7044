//! Options controlling normalization, merging, sorting and output layout.
//!
//! `MergeOptions` deserializes from the camelCase JSON shape used by build
//! tool configuration, e.g. `{"fuzzyMatch": false, "includeContext": "sourceFileOnly"}`.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::Error, formats::Dialect};

/// All recognized merge options. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct MergeOptions {
    /// Match units whose id changed by source text similarity.
    pub fuzzy_match: bool,
    /// Collapse runs of whitespace inside source/target text to one space.
    pub collapse_whitespace: bool,
    /// Trim leading and trailing whitespace of extracted source text.
    pub trim: bool,
    /// Lay out tag-only source/target content as indented block content.
    pub pretty_nested_tags: bool,
    /// Which location information is written.
    pub include_context: IncludeContext,
    /// Whether meaning and description notes are written.
    pub include_meaning_and_description: bool,
    /// Target text of units that appear for the first time.
    pub new_translation_targets_blank: NewTargets,
    /// State for new and invalidated units; dialect default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_state_label: Option<String>,
    /// Unit ordering applied after merging.
    pub sort: SortStrategy,
    /// Extracted units whose id starts with one of these prefixes are dropped.
    pub remove_ids_with_prefix: Vec<String>,
    /// When non-empty, only extracted units whose id starts with one of these prefixes are kept.
    pub include_ids_with_prefix: Vec<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            fuzzy_match: true,
            collapse_whitespace: true,
            trim: false,
            pretty_nested_tags: false,
            include_context: IncludeContext::All,
            include_meaning_and_description: true,
            new_translation_targets_blank: NewTargets::Source,
            initial_state_label: None,
            sort: SortStrategy::StableAppendNew,
            remove_ids_with_prefix: Vec::new(),
            include_ids_with_prefix: Vec::new(),
        }
    }
}

impl MergeOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_fuzzy_match(mut self, fuzzy_match: bool) -> Self {
        self.fuzzy_match = fuzzy_match;
        self
    }

    pub fn with_collapse_whitespace(mut self, collapse_whitespace: bool) -> Self {
        self.collapse_whitespace = collapse_whitespace;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_pretty_nested_tags(mut self, pretty_nested_tags: bool) -> Self {
        self.pretty_nested_tags = pretty_nested_tags;
        self
    }

    pub fn with_include_context(mut self, include_context: IncludeContext) -> Self {
        self.include_context = include_context;
        self
    }

    pub fn with_include_meaning_and_description(mut self, include: bool) -> Self {
        self.include_meaning_and_description = include;
        self
    }

    pub fn with_new_translation_targets(mut self, new_targets: NewTargets) -> Self {
        self.new_translation_targets_blank = new_targets;
        self
    }

    pub fn with_initial_state_label(mut self, label: Option<String>) -> Self {
        self.initial_state_label = label;
        self
    }

    pub fn with_sort(mut self, sort: SortStrategy) -> Self {
        self.sort = sort;
        self
    }

    /// The state assigned to new or invalidated units for `dialect`.
    pub fn initial_state_for(&self, dialect: Dialect) -> String {
        self.initial_state_label
            .clone()
            .unwrap_or_else(|| dialect.default_initial_state().to_string())
    }

    /// The layout subset of these options, as consumed by the format codecs.
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            collapse_whitespace: self.collapse_whitespace,
            trim: self.trim,
            pretty_nested_tags: self.pretty_nested_tags,
        }
    }

    /// Applies the id prefix filters to an extracted unit id.
    pub fn keeps_id(&self, id: &str) -> bool {
        if self
            .remove_ids_with_prefix
            .iter()
            .any(|prefix| id.starts_with(prefix.as_str()))
        {
            return false;
        }
        self.include_ids_with_prefix.is_empty()
            || self
                .include_ids_with_prefix
                .iter()
                .any(|prefix| id.starts_with(prefix.as_str()))
    }
}

/// Whitespace and layout policy for serialized catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub collapse_whitespace: bool,
    pub trim: bool,
    pub pretty_nested_tags: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        MergeOptions::default().format_options()
    }
}

/// Location output policy. Configured as `true`, `false` or `"sourceFileOnly"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FlagOrMode", into = "FlagOrMode")]
pub enum IncludeContext {
    /// Source file and line numbers.
    All,
    /// Source file without line numbers.
    SourceFileOnly,
    /// No locations at all.
    None,
}

impl TryFrom<FlagOrMode> for IncludeContext {
    type Error = String;

    fn try_from(value: FlagOrMode) -> Result<Self, Self::Error> {
        match value {
            FlagOrMode::Flag(true) => Ok(IncludeContext::All),
            FlagOrMode::Flag(false) => Ok(IncludeContext::None),
            FlagOrMode::Mode(mode) if mode == "sourceFileOnly" => Ok(IncludeContext::SourceFileOnly),
            FlagOrMode::Mode(mode) => Err(format!(
                "includeContext must be true, false or \"sourceFileOnly\", got \"{}\"",
                mode
            )),
        }
    }
}

impl From<IncludeContext> for FlagOrMode {
    fn from(value: IncludeContext) -> Self {
        match value {
            IncludeContext::All => FlagOrMode::Flag(true),
            IncludeContext::None => FlagOrMode::Flag(false),
            IncludeContext::SourceFileOnly => FlagOrMode::Mode("sourceFileOnly".to_string()),
        }
    }
}

/// Target policy for brand-new units. Configured as `false`, `true` or `"omit"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FlagOrMode", into = "FlagOrMode")]
pub enum NewTargets {
    /// Copy the source text into the target.
    Source,
    /// Empty target (source-language catalogs still copy the source).
    Blank,
    /// No target element at all.
    Omit,
}

impl TryFrom<FlagOrMode> for NewTargets {
    type Error = String;

    fn try_from(value: FlagOrMode) -> Result<Self, Self::Error> {
        match value {
            FlagOrMode::Flag(false) => Ok(NewTargets::Source),
            FlagOrMode::Flag(true) => Ok(NewTargets::Blank),
            FlagOrMode::Mode(mode) if mode == "omit" => Ok(NewTargets::Omit),
            FlagOrMode::Mode(mode) => Err(format!(
                "newTranslationTargetsBlank must be true, false or \"omit\", got \"{}\"",
                mode
            )),
        }
    }
}

impl From<NewTargets> for FlagOrMode {
    fn from(value: NewTargets) -> Self {
        match value {
            NewTargets::Source => FlagOrMode::Flag(false),
            NewTargets::Blank => FlagOrMode::Flag(true),
            NewTargets::Omit => FlagOrMode::Mode("omit".to_string()),
        }
    }
}

/// Wire shape shared by the boolean-or-keyword options.
#[doc(hidden)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagOrMode {
    Flag(bool),
    Mode(String),
}

/// Ordering policy applied to the merged units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortStrategy {
    /// Ordinal ascending by id.
    IdAsc,
    /// Existing order kept, new units appended.
    #[default]
    StableAppendNew,
    /// Existing order kept, new units placed next to their lexically closest id.
    StableAlphabetNew,
}

impl Display for SortStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortStrategy::IdAsc => write!(f, "idAsc"),
            SortStrategy::StableAppendNew => write!(f, "stableAppendNew"),
            SortStrategy::StableAlphabetNew => write!(f, "stableAlphabetNew"),
        }
    }
}

impl FromStr for SortStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "idAsc" => Ok(SortStrategy::IdAsc),
            "stableAppendNew" => Ok(SortStrategy::StableAppendNew),
            "stableAlphabetNew" => Ok(SortStrategy::StableAlphabetNew),
            other => Err(Error::InvalidOption(format!(
                "unknown sort strategy `{}`",
                other
            ))),
        }
    }
}
