//! Reconciles a fresh extraction with an existing catalog.
//!
//! Units are matched by id first. Units left over on both sides are then
//! paired by source similarity, lowest score first. Previous units that found
//! no partner are dropped at the very end, so they stay available as fuzzy
//! candidates until every incoming unit has been placed.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, BinaryHeap, HashMap, HashSet},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    error::Error,
    fuzzy::{self, Candidate},
    options::{MergeOptions, NewTargets},
    pretty,
    types::{TranslationFile, TranslationUnit},
};

/// State given to every unit of a source-language catalog.
pub const FINAL_STATE: &str = "final";

/// Counters and id bookkeeping of one merge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Incoming units that found a previous unit with the same id.
    pub matched: usize,
    /// Incoming units paired with a previous unit by source similarity.
    pub fuzzy_matched: usize,
    /// Incoming units appended as new.
    pub added: usize,
    /// Previous units dropped as obsolete.
    pub removed: usize,
    /// Ids of the appended units, in append order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub new_unit_ids: Vec<String>,
    /// Previous id to incoming id, for every fuzzy match across ids.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub id_mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub file: TranslationFile,
    pub report: MergeReport,
}

pub struct Merger<'a> {
    options: &'a MergeOptions,
    source: &'a TranslationFile,
    initial_state: String,
    id_mapping: BTreeMap<String, String>,
}

impl<'a> Merger<'a> {
    /// `source` is the extracted catalog, already normalized.
    pub fn new(
        options: &'a MergeOptions,
        source: &'a TranslationFile,
        initial_state: impl Into<String>,
    ) -> Self {
        Merger {
            options,
            source,
            initial_state: initial_state.into(),
            id_mapping: BTreeMap::new(),
        }
    }

    /// Old id to new id of every unit renamed by the last merge.
    pub fn id_mapping(&self) -> &BTreeMap<String, String> {
        &self.id_mapping
    }

    /// Produces the updated version of `dest`. `dest` itself is not modified.
    pub fn merge_with_mapping(
        &mut self,
        dest: &TranslationFile,
        is_source_lang: bool,
    ) -> Result<MergeOutcome, Error> {
        self.id_mapping.clear();
        let source = self.source;
        let mut slots = Slots::new(dest);
        let mut report = MergeReport::default();

        let incoming_ids: HashSet<&str> = source.unit_ids().collect();
        for (position, unit) in dest.units.iter().enumerate() {
            slots.obsolete[position] = !incoming_ids.contains(unit.id.as_str());
        }

        let mut pending: Vec<&TranslationUnit> = Vec::new();
        for incoming in &source.units {
            match slots.position_of(&incoming.id) {
                Some(position) => {
                    let merged = self.handle(incoming, Some(slots.get(position)), is_source_lang)?;
                    slots.replace(&incoming.id, merged)?;
                    report.matched += 1;
                }
                None => pending.push(incoming),
            }
        }

        if self.options.fuzzy_match {
            self.assign_fuzzy(&pending, &mut slots, &mut report, is_source_lang)?;
        } else {
            for incoming in pending {
                let created = self.handle(incoming, None, is_source_lang)?;
                slots.append(created, &mut report);
            }
        }

        report.id_mapping = self.id_mapping.clone();
        let units = slots.finish(&mut report);
        Ok(MergeOutcome {
            file: TranslationFile {
                units,
                ..TranslationFile::empty_target_for(dest, dest.target_lang.clone())
            },
            report,
        })
    }

    /// Greedy global-minimum pairing of the unmatched incoming units with the
    /// obsolete previous units.
    fn assign_fuzzy(
        &mut self,
        pending: &[&TranslationUnit],
        slots: &mut Slots,
        report: &mut MergeReport,
        is_source_lang: bool,
    ) -> Result<(), Error> {
        let pool: Vec<(usize, &TranslationUnit)> = slots
            .units
            .iter()
            .enumerate()
            .filter(|(position, _)| slots.obsolete[*position])
            .collect();
        let mut lists: Vec<CandidateList> = pending
            .iter()
            .map(|incoming| CandidateList::new(fuzzy::candidates(incoming, pool.iter().copied())))
            .collect();

        let mut heap = BinaryHeap::with_capacity(pending.len());
        for (index, list) in lists.iter().enumerate() {
            heap.push(Reverse(QueueEntry {
                score: list.best_score(),
                index,
            }));
        }

        while let Some(Reverse(entry)) = heap.pop() {
            let list = &mut lists[entry.index];
            let best = list.best(&slots.obsolete);
            let score = best.map_or(f64::INFINITY, |c| c.score);
            // The best candidate was taken by someone else since this entry was queued.
            if score.total_cmp(&entry.score) != Ordering::Equal {
                heap.push(Reverse(QueueEntry {
                    score,
                    index: entry.index,
                }));
                continue;
            }

            let incoming = pending[entry.index];
            match best {
                Some(candidate) => {
                    let previous = slots.get(candidate.position);
                    debug!(
                        incoming = %incoming.id,
                        previous = %previous.id,
                        score = candidate.score,
                        "fuzzy matched unit"
                    );
                    let previous_id = previous.id.clone();
                    let merged = self.handle(incoming, Some(previous), is_source_lang)?;
                    if previous_id != incoming.id {
                        self.id_mapping
                            .insert(previous_id.clone(), incoming.id.clone());
                    }
                    slots.replace(&previous_id, merged)?;
                    report.fuzzy_matched += 1;
                }
                None => {
                    let created = self.handle(incoming, None, is_source_lang)?;
                    slots.append(created, report);
                }
            }
        }
        Ok(())
    }

    /// Reconciles one incoming unit with its previous version, if any.
    fn handle(
        &self,
        incoming: &TranslationUnit,
        dest: Option<&TranslationUnit>,
        is_source_lang: bool,
    ) -> Result<TranslationUnit, Error> {
        let Some(dest) = dest else {
            return Ok(self.create(incoming, is_source_lang));
        };

        let mut unit = dest.clone();
        let format = self.options.format_options();
        let incoming_form = pretty::comparison_form(&incoming.source, format)?;
        let dest_form = pretty::comparison_form(&dest.source, format)?;

        if incoming_form != dest_form {
            let whitespace_only = pretty::trim_xml_whitespace(&incoming_form)
                == pretty::trim_xml_whitespace(&dest_form);
            let mirrors_source =
                is_source_lang && dest.target.as_deref() == Some(dest.source.as_str());
            let sync_target = mirrors_source || dest.is_untranslated(&self.initial_state);
            let omit = self.options.new_translation_targets_blank == NewTargets::Omit;

            if sync_target && !(dest.target.is_none() && omit) {
                unit.target = Some(incoming.source.clone());
            } else if whitespace_only && let Some(target) = &dest.target {
                trace!(id = %incoming.id, "re-padding target after whitespace change");
                unit.target = Some(pretty::pad_like(target, &incoming.source));
            }

            unit.state = if is_source_lang {
                Some(FINAL_STATE.to_string())
            } else if whitespace_only {
                dest.state.clone()
            } else {
                Some(self.initial_state.clone())
            };
            unit.source = incoming.source.clone();
        }

        unit.id = incoming.id.clone();
        unit.locations = incoming.locations.clone();
        unit.meaning = incoming.meaning.clone();
        unit.description = incoming.description.clone();
        Ok(unit)
    }

    fn create(&self, incoming: &TranslationUnit, is_source_lang: bool) -> TranslationUnit {
        let mut unit = incoming.clone();
        unit.target = match self.options.new_translation_targets_blank {
            NewTargets::Omit => None,
            NewTargets::Blank if !is_source_lang => Some(String::new()),
            _ => Some(incoming.source.clone()),
        };
        unit.state = Some(if is_source_lang {
            FINAL_STATE.to_string()
        } else {
            self.initial_state.clone()
        });
        unit
    }
}

/// The output under construction: previous units in their original
/// positions, flags for units not (yet) claimed, and appended new units.
struct Slots {
    units: Vec<TranslationUnit>,
    obsolete: Vec<bool>,
    positions: HashMap<String, usize>,
    appended: Vec<TranslationUnit>,
}

impl Slots {
    fn new(dest: &TranslationFile) -> Self {
        let mut positions = HashMap::with_capacity(dest.units.len());
        for (position, unit) in dest.units.iter().enumerate() {
            positions.entry(unit.id.clone()).or_insert(position);
        }
        Slots {
            units: dest.units.clone(),
            obsolete: vec![false; dest.units.len()],
            positions,
            appended: Vec::new(),
        }
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    fn get(&self, position: usize) -> &TranslationUnit {
        &self.units[position]
    }

    /// Puts `unit` where the previous unit called `id` was and claims that slot.
    fn replace(&mut self, id: &str, unit: TranslationUnit) -> Result<(), Error> {
        let position = self
            .position_of(id)
            .ok_or_else(|| Error::UnitNotFound(id.to_string()))?;
        self.units[position] = unit;
        self.obsolete[position] = false;
        Ok(())
    }

    fn append(&mut self, unit: TranslationUnit, report: &mut MergeReport) {
        report.added += 1;
        report.new_unit_ids.push(unit.id.clone());
        self.appended.push(unit);
    }

    fn finish(self, report: &mut MergeReport) -> Vec<TranslationUnit> {
        let mut units = Vec::with_capacity(self.units.len() + self.appended.len());
        for (unit, obsolete) in self.units.into_iter().zip(self.obsolete) {
            if obsolete {
                debug!(id = %unit.id, "dropping obsolete unit");
                report.removed += 1;
            } else {
                units.push(unit);
            }
        }
        units.extend(self.appended);
        units
    }
}

/// Candidates of one pending unit with a cursor past the consumed ones.
struct CandidateList {
    candidates: Vec<Candidate>,
    next: usize,
}

impl CandidateList {
    fn new(candidates: Vec<Candidate>) -> Self {
        CandidateList {
            candidates,
            next: 0,
        }
    }

    fn best_score(&self) -> f64 {
        self.candidates
            .first()
            .map_or(f64::INFINITY, |c| c.score)
    }

    /// Skips candidates that have been claimed already.
    fn best(&mut self, unclaimed: &[bool]) -> Option<Candidate> {
        while let Some(candidate) = self.candidates.get(self.next) {
            if unclaimed[candidate.position] {
                return Some(*candidate);
            }
            self.next += 1;
        }
        None
    }
}

/// Heap key: lowest score first, then incoming order.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    score: f64,
    index: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.index.cmp(&other.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn catalog(units: Vec<TranslationUnit>) -> TranslationFile {
        let mut file = TranslationFile::new("en", Some("de".to_string()));
        for unit in units {
            file.add_unit(unit);
        }
        file
    }

    fn merge(
        options: &MergeOptions,
        source: &TranslationFile,
        dest: &TranslationFile,
        is_source_lang: bool,
    ) -> MergeOutcome {
        Merger::new(options, source, "new")
            .merge_with_mapping(dest, is_source_lang)
            .unwrap()
    }

    #[test]
    fn test_new_unit_copies_source() {
        let source = catalog(vec![TranslationUnit::new("ID2", "source val2")]);
        let dest = catalog(vec![]);
        let outcome = merge(&MergeOptions::default(), &source, &dest, false);
        let unit = &outcome.file.units[0];
        assert_eq!(unit.target.as_deref(), Some("source val2"));
        assert_eq!(unit.state.as_deref(), Some("new"));
        assert_eq!(outcome.report.added, 1);
        assert_eq!(outcome.report.new_unit_ids, vec!["ID2"]);
    }

    #[test]
    fn test_new_unit_target_policies() {
        let source = catalog(vec![TranslationUnit::new("ID2", "val")]);
        let dest = catalog(vec![]);

        let blank = MergeOptions::default().with_new_translation_targets(NewTargets::Blank);
        let outcome = merge(&blank, &source, &dest, false);
        assert_eq!(outcome.file.units[0].target.as_deref(), Some(""));
        let outcome = merge(&blank, &source, &dest, true);
        assert_eq!(outcome.file.units[0].target.as_deref(), Some("val"));
        assert_eq!(outcome.file.units[0].state.as_deref(), Some(FINAL_STATE));

        let omit = MergeOptions::default().with_new_translation_targets(NewTargets::Omit);
        let outcome = merge(&omit, &source, &dest, false);
        assert_eq!(outcome.file.units[0].target, None);
    }

    #[test]
    fn test_untranslated_target_follows_source() {
        let source = catalog(vec![TranslationUnit::new("ID1", "new")]);
        let dest = catalog(vec![
            TranslationUnit::new("ID1", "old")
                .with_target("old")
                .with_state("new"),
        ]);
        let unit = &merge(&MergeOptions::default(), &source, &dest, false)
            .file
            .units[0];
        assert_eq!(unit.source, "new");
        assert_eq!(unit.target.as_deref(), Some("new"));
        assert_eq!(unit.state.as_deref(), Some("new"));
    }

    #[test]
    fn test_translated_target_is_kept() {
        let source = catalog(vec![TranslationUnit::new("ID1", "new")]);
        let dest = catalog(vec![
            TranslationUnit::new("ID1", "old")
                .with_target("translated val")
                .with_state("translated"),
        ]);
        let unit = &merge(&MergeOptions::default(), &source, &dest, false)
            .file
            .units[0];
        assert_eq!(unit.source, "new");
        assert_eq!(unit.target.as_deref(), Some("translated val"));
    }

    #[test]
    fn test_whitespace_change_repads_target_and_keeps_state() {
        let options = MergeOptions::default().with_collapse_whitespace(false);
        let source = catalog(vec![TranslationUnit::new("ID1", " hello ")]);
        let dest = catalog(vec![
            TranslationUnit::new("ID1", "hello")
                .with_target("hallo")
                .with_state("translated"),
        ]);
        let unit = &merge(&options, &source, &dest, false).file.units[0];
        assert_eq!(unit.source, " hello ");
        assert_eq!(unit.target.as_deref(), Some(" hallo "));
        assert_eq!(unit.state.as_deref(), Some("translated"));
    }

    #[test]
    fn test_source_language_mirror() {
        let source = catalog(vec![TranslationUnit::new("ID1", "new text")]);
        let dest = catalog(vec![
            TranslationUnit::new("ID1", "old text")
                .with_target("old text")
                .with_state("final"),
        ]);
        let unit = &merge(&MergeOptions::default(), &source, &dest, true)
            .file
            .units[0];
        assert_eq!(unit.target.as_deref(), Some("new text"));
        assert_eq!(unit.state.as_deref(), Some(FINAL_STATE));
    }

    #[test]
    fn test_locations_and_notes_come_from_extraction() {
        let mut incoming = TranslationUnit::new("ID1", "same");
        incoming.locations = vec![Location::new("new.html", 4, None)];
        incoming.meaning = Some("m".to_string());
        let mut previous = TranslationUnit::new("ID1", "same")
            .with_target("gleich")
            .with_state("translated");
        previous.locations = vec![Location::new("old.html", 1, None)];
        previous.description = Some("stale".to_string());

        let source = catalog(vec![incoming]);
        let dest = catalog(vec![previous]);
        let unit = &merge(&MergeOptions::default(), &source, &dest, false)
            .file
            .units[0];
        assert_eq!(unit.locations, vec![Location::new("new.html", 4, None)]);
        assert_eq!(unit.meaning.as_deref(), Some("m"));
        assert_eq!(unit.description, None);
        assert_eq!(unit.state.as_deref(), Some("translated"));
    }

    #[test]
    fn test_fuzzy_matching_pairs_renamed_units() {
        let source = catalog(vec![
            TranslationUnit::new("a1", "aaaaaaaaaaa1"),
            TranslationUnit::new("a2", "aaaaaaaaaaa2"),
            TranslationUnit::new("b", "bbbbbbb"),
            TranslationUnit::new("c", "ccccccc"),
        ]);
        let dest = catalog(vec![
            TranslationUnit::new("1.1", "aaaaaaaaaa11")
                .with_target("aaa1")
                .with_state("translated"),
            TranslationUnit::new("1.2", "aaaaaaaaaa22")
                .with_target("aaa2")
                .with_state("translated"),
            TranslationUnit::new("2", "bbbbbb1")
                .with_target("bbb1")
                .with_state("translated"),
            TranslationUnit::new("3", "ccccccc")
                .with_target("ccc1")
                .with_state("translated"),
        ]);
        let options = MergeOptions::default();
        let mut merger = Merger::new(&options, &source, "new");
        let outcome = merger.merge_with_mapping(&dest, false).unwrap();

        let summary: Vec<(&str, &str, &str)> = outcome
            .file
            .units
            .iter()
            .map(|u| {
                (
                    u.id.as_str(),
                    u.target.as_deref().unwrap(),
                    u.state.as_deref().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a1", "aaa1", "new"),
                ("a2", "aaa2", "new"),
                ("b", "bbb1", "new"),
                ("c", "ccc1", "translated"),
            ]
        );
        assert_eq!(outcome.report.fuzzy_matched, 4);
        assert_eq!(outcome.report.removed, 0);
        assert_eq!(merger.id_mapping().get("1.1").map(String::as_str), Some("a1"));
        assert_eq!(merger.id_mapping().get("3").map(String::as_str), Some("c"));
    }

    #[test]
    fn test_fuzzy_disabled_appends_and_removes() {
        let source = catalog(vec![TranslationUnit::new("a1", "aaaaaaaaaaa1")]);
        let dest = catalog(vec![
            TranslationUnit::new("1.1", "aaaaaaaaaa11")
                .with_target("aaa1")
                .with_state("translated"),
        ]);
        let options = MergeOptions::default().with_fuzzy_match(false);
        let outcome = merge(&options, &source, &dest, false);
        assert_eq!(outcome.file.unit_ids().collect::<Vec<_>>(), vec!["a1"]);
        assert_eq!(outcome.file.units[0].target.as_deref(), Some("aaaaaaaaaaa1"));
        assert_eq!(outcome.report.removed, 1);
        assert_eq!(outcome.report.added, 1);
    }

    #[test]
    fn test_candidate_is_consumed_once() {
        // Both incoming units are closest to the same previous unit.
        let source = catalog(vec![
            TranslationUnit::new("x", "abcdefghij"),
            TranslationUnit::new("y", "abcdefghiz"),
        ]);
        let dest = catalog(vec![
            TranslationUnit::new("old", "abcdefghij")
                .with_target("ABC")
                .with_state("translated"),
        ]);
        let outcome = merge(&MergeOptions::default(), &source, &dest, false);
        let ids: Vec<&str> = outcome.file.unit_ids().collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(outcome.file.units[0].target.as_deref(), Some("ABC"));
        assert_eq!(outcome.file.units[1].target.as_deref(), Some("abcdefghiz"));
        assert_eq!(outcome.report.fuzzy_matched, 1);
        assert_eq!(outcome.report.added, 1);
    }

    fn competing_merge(first: (&str, &str), second: (&str, &str)) -> MergeOutcome {
        let source = catalog(vec![
            TranslationUnit::new(first.0, first.1),
            TranslationUnit::new(second.0, second.1),
        ]);
        let dest = catalog(vec![
            TranslationUnit::new("old", "abcdefghij")
                .with_target("T")
                .with_state("translated"),
        ]);
        merge(&MergeOptions::default(), &source, &dest, false)
    }

    #[test]
    fn test_equal_fuzzy_scores_go_to_first_incoming_unit() {
        let outcome = competing_merge(("p", "abcdefghiX"), ("q", "abcdefghiY"));
        let p = outcome.file.find_unit("p").unwrap();
        let q = outcome.file.find_unit("q").unwrap();
        assert_eq!(p.target.as_deref(), Some("T"));
        assert_eq!(p.state.as_deref(), Some("new"));
        assert_eq!(q.target.as_deref(), Some("abcdefghiY"));
        assert_eq!(q.state.as_deref(), Some("new"));
        assert_eq!(outcome.file.unit_ids().collect::<Vec<_>>(), vec!["p", "q"]);
        assert_eq!(outcome.report.fuzzy_matched, 1);
        assert_eq!(outcome.report.new_unit_ids, vec!["q".to_string()]);
        assert_eq!(outcome.report.id_mapping.get("old").map(String::as_str), Some("p"));
    }

    #[test]
    fn test_equal_fuzzy_scores_follow_incoming_order() {
        let outcome = competing_merge(("q", "abcdefghiY"), ("p", "abcdefghiX"));
        let q = outcome.file.find_unit("q").unwrap();
        let p = outcome.file.find_unit("p").unwrap();
        assert_eq!(q.target.as_deref(), Some("T"));
        assert_eq!(p.target.as_deref(), Some("abcdefghiX"));
        assert_eq!(outcome.file.unit_ids().collect::<Vec<_>>(), vec!["q", "p"]);
        assert_eq!(outcome.report.fuzzy_matched, 1);
        assert_eq!(outcome.report.new_unit_ids, vec!["p".to_string()]);
    }

    #[test]
    fn test_obsolete_units_are_removed() {
        let source = catalog(vec![TranslationUnit::new("keep", "Keep")]);
        let dest = catalog(vec![
            TranslationUnit::new("gone", "Something else entirely")
                .with_target("Weg")
                .with_state("translated"),
            TranslationUnit::new("keep", "Keep")
                .with_target("Behalten")
                .with_state("translated"),
        ]);
        let outcome = merge(&MergeOptions::default(), &source, &dest, false);
        assert_eq!(outcome.file.unit_ids().collect::<Vec<_>>(), vec!["keep"]);
        assert_eq!(outcome.report.removed, 1);
        assert_eq!(outcome.report.matched, 1);
    }

    #[test]
    fn test_identical_catalogs_are_unchanged() {
        let file = catalog(vec![
            TranslationUnit::new("a", "A").with_target("Ä").with_state("translated"),
            TranslationUnit::new("b", "B").with_target("B").with_state("new"),
        ]);
        let outcome = merge(&MergeOptions::default(), &file, &file, false);
        assert_eq!(outcome.file, file);
        assert_eq!(outcome.report.matched, 2);
    }

    #[test]
    fn test_queue_entry_order() {
        let low = QueueEntry { score: 0.1, index: 5 };
        let tie = QueueEntry { score: 0.1, index: 7 };
        let inf = QueueEntry {
            score: f64::INFINITY,
            index: 0,
        };
        assert!(low < tie);
        assert!(tie < inf);
    }
}
