//! Edit distance scoring used to pair renamed units with their previous entry.

use crate::{pretty::trim_xml_whitespace, types::TranslationUnit};

/// Scores at or above this are not considered a match.
pub const FUZZY_THRESHOLD: f64 = 0.2;

/// Number of single character insertions, deletions and substitutions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let (m, n) = (a.chars().count(), b.chars().count());
    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Distance between the trimmed sources relative to the incoming length.
/// `None` when the incoming source is blank.
pub fn score(dest_source: &str, incoming_source: &str) -> Option<f64> {
    let incoming = trim_xml_whitespace(incoming_source);
    let len = incoming.chars().count();
    if len == 0 {
        return None;
    }
    let distance = levenshtein(trim_xml_whitespace(dest_source), incoming);
    Some(distance as f64 / len as f64)
}

/// A previous unit that an unmatched incoming unit may be paired with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position of the previous unit in its catalog.
    pub position: usize,
    pub score: f64,
}

/// All units of `pool` scoring below [`FUZZY_THRESHOLD`] against `incoming`,
/// best first. Equal scores keep pool order.
pub fn candidates<'a>(
    incoming: &TranslationUnit,
    pool: impl IntoIterator<Item = (usize, &'a TranslationUnit)>,
) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = pool
        .into_iter()
        .filter_map(|(position, unit)| {
            score(&unit.source, &incoming.source)
                .filter(|score| *score < FUZZY_THRESHOLD)
                .map(|score| Candidate { position, score })
        })
        .collect();
    found.sort_by(|a, b| a.score.total_cmp(&b.score));
    found
}
