use std::collections::HashSet;

use crate::{lexdist::closest_to, options::SortStrategy, types::TranslationUnit};

/// Reorders merged units. `new_ids` are the ids appended by the merge, in
/// append order.
pub fn sort_units(units: &mut Vec<TranslationUnit>, strategy: SortStrategy, new_ids: &[String]) {
    match strategy {
        SortStrategy::IdAsc => units.sort_by(|a, b| a.id.cmp(&b.id)),
        // The merge already keeps previous order and appends new units.
        SortStrategy::StableAppendNew => {}
        SortStrategy::StableAlphabetNew => place_new_units(units, new_ids),
    }
}

/// Moves every new unit next to its lexicographically closest neighbour,
/// one at a time in the order they appear in `units`.
fn place_new_units(units: &mut Vec<TranslationUnit>, new_ids: &[String]) {
    let fresh: HashSet<&str> = new_ids.iter().map(String::as_str).collect();
    let (mut placed, added): (Vec<TranslationUnit>, Vec<TranslationUnit>) = units
        .drain(..)
        .partition(|unit| !fresh.contains(unit.id.as_str()));

    let mut keys: Vec<String> = placed.iter().map(|u| u.id.to_lowercase()).collect();
    for unit in added {
        let key = unit.id.to_lowercase();
        let at = closest_to(&key, &keys).insert_at();
        keys.insert(at, key);
        placed.insert(at, unit);
    }
    *units = placed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexdist::find_lex_closest_index;

    fn units(ids: &[&str]) -> Vec<TranslationUnit> {
        ids.iter().map(|id| TranslationUnit::new(*id, *id)).collect()
    }

    fn ids(units: &[TranslationUnit]) -> Vec<&str> {
        units.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_id_asc_is_ordinal() {
        let mut list = units(&["b", "B", "a", "10", "9"]);
        sort_units(&mut list, SortStrategy::IdAsc, &[]);
        assert_eq!(ids(&list), vec!["10", "9", "B", "a", "b"]);
    }

    #[test]
    fn test_stable_append_new_keeps_order() {
        let mut list = units(&["z", "a", "new"]);
        sort_units(&mut list, SortStrategy::StableAppendNew, &["new".to_string()]);
        assert_eq!(ids(&list), vec!["z", "a", "new"]);
    }

    #[test]
    fn test_stable_alphabet_new_places_by_neighbour() {
        let mut list = units(&["IDc0", "IDc1", "IDa", "IDg", "IDd", "IDe5"]);
        let new_ids = vec!["IDd".to_string(), "IDe5".to_string()];
        sort_units(&mut list, SortStrategy::StableAlphabetNew, &new_ids);
        // IDd goes after IDc1, and IDe5 then follows IDd.
        assert_eq!(
            ids(&list),
            vec!["IDc0", "IDc1", "IDd", "IDe5", "IDa", "IDg"]
        );
    }

    #[test]
    fn test_stable_alphabet_new_into_empty_catalog() {
        let mut list = units(&["b", "a"]);
        let new_ids = vec!["b".to_string(), "a".to_string()];
        sort_units(&mut list, SortStrategy::StableAlphabetNew, &new_ids);
        assert_eq!(ids(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_stable_alphabet_new_ignores_case() {
        let mut list = units(&["IDc0", "IDc1", "IDa", "IDg", "idD", "ide5"]);
        let new_ids = vec!["idD".to_string(), "ide5".to_string()];
        sort_units(&mut list, SortStrategy::StableAlphabetNew, &new_ids);
        assert_eq!(
            ids(&list),
            vec!["IDc0", "IDc1", "idD", "ide5", "IDa", "IDg"]
        );
    }

    #[test]
    fn test_stable_alphabet_new_matches_closest_index() {
        let existing = ["IDc0", "IDc1", "IDa", "IDg"];
        let mut list = units(&existing);
        list.push(TranslationUnit::new("IDb", "IDb"));
        sort_units(&mut list, SortStrategy::StableAlphabetNew, &["IDb".to_string()]);

        let at = find_lex_closest_index("IDb", &existing, |s| *s).insert_at();
        assert_eq!(list[at].id, "IDb");
        assert_eq!(list.len(), 5);
    }
}
