//! End-to-end entry points: parse, normalize, merge, sort and serialize.

use std::path::Path;

use tracing::info;

use crate::{
    error::Error,
    formats::Dialect,
    io,
    merger::{MergeOutcome, MergeReport, Merger},
    normalize::normalize_source,
    options::MergeOptions,
    sort::sort_units,
    types::TranslationFile,
};

/// Merges an extracted catalog into an existing target catalog.
///
/// # Parameters
/// - `incoming_text`: The freshly extracted catalog.
/// - `existing_target_text`: The current content of the target catalog.
/// - `dialect`: The XLIFF dialect of both documents.
/// - `options`: Merge and layout options.
///
/// # Returns
///
/// The updated target catalog text, or an `Error` if either document is malformed.
pub fn merge_catalogs(
    incoming_text: &str,
    existing_target_text: &str,
    dialect: Dialect,
    options: &MergeOptions,
) -> Result<String, Error> {
    merge_catalogs_with_report(incoming_text, existing_target_text, dialect, options)
        .map(|(text, _)| text)
}

/// Like [`merge_catalogs`], also returning what the merge did.
pub fn merge_catalogs_with_report(
    incoming_text: &str,
    existing_target_text: &str,
    dialect: Dialect,
    options: &MergeOptions,
) -> Result<(String, MergeReport), Error> {
    let incoming = dialect.parse(incoming_text)?;
    let dest = dialect.parse(existing_target_text)?;
    let outcome = merge_translation_files(&incoming, &dest, dialect, options)?;
    let text = dialect.serialize(&outcome.file, options.format_options())?;
    Ok((text, outcome.report))
}

/// Model level merge: normalizes `incoming`, reconciles it with `dest` and
/// applies the configured sort strategy.
///
/// `dest` is treated as the source-language catalog when it has no target
/// language or its target language equals its source language.
pub fn merge_translation_files(
    incoming: &TranslationFile,
    dest: &TranslationFile,
    dialect: Dialect,
    options: &MergeOptions,
) -> Result<MergeOutcome, Error> {
    let source = normalize_source(incoming, options)?;
    let is_source_lang = dest.is_source_language_mirror();

    let mut merger = Merger::new(options, &source, options.initial_state_for(dialect));
    let mut outcome = merger.merge_with_mapping(dest, is_source_lang)?;
    sort_units(
        &mut outcome.file.units,
        options.sort,
        &outcome.report.new_unit_ids,
    );

    info!(
        target_lang = dest.target_lang.as_deref().unwrap_or(dest.source_lang.as_str()),
        matched = outcome.report.matched,
        fuzzy_matched = outcome.report.fuzzy_matched,
        added = outcome.report.added,
        removed = outcome.report.removed,
        "merged catalog"
    );
    Ok(outcome)
}

/// Rewrites an extracted catalog in the normalized layout.
pub fn format_source_catalog(
    incoming_text: &str,
    dialect: Dialect,
    options: &MergeOptions,
) -> Result<String, Error> {
    let incoming = dialect.parse(incoming_text)?;
    let normalized = normalize_source(&incoming, options)?;
    dialect.serialize(&normalized, options.format_options())
}

/// Merges the extracted catalog at `source_path` into the catalog at
/// `target_path` and writes the result back to `target_path`.
///
/// # Parameters
/// - `source_path`: Path of the extracted catalog; it must exist.
/// - `target_path`: Path of the target catalog; a missing file starts empty.
/// - `target_lang`: Target language used when the target file does not exist yet.
/// - `dialect`: The XLIFF dialect of both files.
/// - `options`: Merge and layout options.
///
/// # Returns
///
/// The report of the merge, or an `Error` if reading, parsing or writing fails.
pub fn merge_catalog_files<P: AsRef<Path>, Q: AsRef<Path>>(
    source_path: P,
    target_path: Q,
    target_lang: Option<&str>,
    dialect: Dialect,
    options: &MergeOptions,
) -> Result<MergeReport, Error> {
    let target_path = target_path.as_ref();
    let incoming = dialect.parse(&io::read_to_string(source_path)?)?;
    let dest = match io::read_to_string_if_exists(target_path)? {
        Some(text) => dialect.parse(&text)?,
        None => TranslationFile::empty_target_for(&incoming, target_lang.map(str::to_string)),
    };

    let outcome = merge_translation_files(&incoming, &dest, dialect, options)?;
    io::write_catalog(
        target_path,
        &dialect.serialize(&outcome.file, options.format_options())?,
    )?;
    Ok(outcome.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::SortStrategy, types::TranslationUnit};

    fn file(target_lang: Option<&str>, units: &[(&str, &str)]) -> TranslationFile {
        let mut file = TranslationFile::new("en", target_lang.map(str::to_string));
        for (id, source) in units {
            file.add_unit(TranslationUnit::new(*id, *source));
        }
        file
    }

    #[test]
    fn test_source_language_catalog_gets_final_state() {
        let incoming = file(None, &[("a", "A")]);
        let dest = file(Some("en"), &[]);
        let outcome =
            merge_translation_files(&incoming, &dest, Dialect::Xlf1, &MergeOptions::default())
                .unwrap();
        assert_eq!(outcome.file.units[0].state.as_deref(), Some("final"));
    }

    #[test]
    fn test_dialect_picks_initial_state() {
        let incoming = file(None, &[("a", "A")]);
        let dest = file(Some("de"), &[]);
        let options = MergeOptions::default();
        let v1 = merge_translation_files(&incoming, &dest, Dialect::Xlf1, &options).unwrap();
        let v2 = merge_translation_files(&incoming, &dest, Dialect::Xlf2, &options).unwrap();
        assert_eq!(v1.file.units[0].state.as_deref(), Some("new"));
        assert_eq!(v2.file.units[0].state.as_deref(), Some("initial"));

        let custom = MergeOptions::default().with_initial_state_label(Some("needs-translation".into()));
        let out = merge_translation_files(&incoming, &dest, Dialect::Xlf1, &custom).unwrap();
        assert_eq!(out.file.units[0].state.as_deref(), Some("needs-translation"));
    }

    #[test]
    fn test_sort_is_applied_after_merge() {
        let incoming = file(None, &[("c", "C"), ("a", "A"), ("b", "B")]);
        let dest = file(Some("de"), &[("c", "C")]);
        let options = MergeOptions::default().with_sort(SortStrategy::IdAsc);
        let outcome = merge_translation_files(&incoming, &dest, Dialect::Xlf1, &options).unwrap();
        assert_eq!(outcome.file.unit_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_target_is_reported() {
        let incoming = "<xliff version=\"1.2\"><file source-language=\"en\"><body/></file></xliff>";
        let err = merge_catalogs(incoming, "<xliff", Dialect::Xlf1, &MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::XmlParse(_) | Error::MalformedCatalog(_)));
    }
}
