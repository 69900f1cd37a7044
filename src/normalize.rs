//! Prepares a freshly extracted catalog for merging.

use tracing::debug;

use crate::{
    error::Error,
    options::{IncludeContext, MergeOptions},
    pretty,
    types::{Location, TranslationFile, TranslationUnit},
};

/// Applies the id filters, the whitespace policy and the context and note
/// policies to every extracted unit.
pub fn normalize_source(
    file: &TranslationFile,
    options: &MergeOptions,
) -> Result<TranslationFile, Error> {
    let mut normalized = TranslationFile::empty_target_for(file, file.target_lang.clone());
    for unit in &file.units {
        if !options.keeps_id(&unit.id) {
            debug!(id = %unit.id, "skipping unit filtered by id prefix");
            continue;
        }
        normalized.add_unit(normalize_unit(unit, options)?);
    }
    Ok(normalized)
}

fn normalize_unit(unit: &TranslationUnit, options: &MergeOptions) -> Result<TranslationUnit, Error> {
    let mut unit = unit.clone();
    unit.source = pretty::normalize_markup(&unit.source, options.format_options())?;
    unit.locations = filter_locations(unit.locations, options.include_context);
    if !options.include_meaning_and_description {
        unit.meaning = None;
        unit.description = None;
    }
    Ok(unit)
}

fn filter_locations(locations: Vec<Location>, policy: IncludeContext) -> Vec<Location> {
    match policy {
        IncludeContext::All => locations,
        IncludeContext::None => Vec::new(),
        IncludeContext::SourceFileOnly => {
            let mut files: Vec<Location> = Vec::new();
            for location in locations {
                if files.iter().all(|l| l.file != location.file) {
                    files.push(Location {
                        file: location.file,
                        line_start: None,
                        line_end: None,
                    });
                }
            }
            files
        }
    }
}
