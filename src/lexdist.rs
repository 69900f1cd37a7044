//! Signed lexicographic distance between identifiers.
//!
//! A [`LexDist`] holds the per-position character code differences of two
//! strings. Its sign agrees with plain string ordering and earlier positions
//! weigh more than later ones, which makes "closest id" searches behave like
//! alphabetical neighbourhood.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexDist {
    diffs: Vec<i64>,
}

impl LexDist {
    /// `b - a`, position by position; the shorter string is padded with zeros.
    pub fn from_difference(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let len = a.len().max(b.len());
        let code = |s: &[char], i: usize| s.get(i).map_or(0, |c| *c as i64);
        LexDist {
            diffs: (0..len).map(|i| code(&b, i) - code(&a, i)).collect(),
        }
    }

    pub fn diffs(&self) -> &[i64] {
        &self.diffs
    }

    /// True when the first nonzero difference is negative, i.e. `a > b`.
    pub fn is_negative(&self) -> bool {
        self.diffs
            .iter()
            .find(|d| **d != 0)
            .is_some_and(|d| *d < 0)
    }

    /// Compares magnitudes. Once a vector's leading sign is known, every later
    /// term counts in that direction, so the first differing position decides.
    pub fn smaller_than(&self, other: &LexDist) -> bool {
        let len = self.diffs.len().max(other.diffs.len());
        let mut sign_self = 0;
        let mut sign_other = 0;
        for i in 0..len {
            let this = self.diffs.get(i).copied().unwrap_or(0);
            let that = other.diffs.get(i).copied().unwrap_or(0);
            if sign_self == 0 {
                sign_self = this.signum();
            }
            if sign_other == 0 {
                sign_other = that.signum();
            }
            match (sign_self * this).cmp(&(sign_other * that)) {
                Ordering::Less => return true,
                Ordering::Greater => return false,
                Ordering::Equal => {}
            }
        }
        false
    }

    /// Drops trailing zero entries.
    pub fn normalize(mut self) -> Self {
        while self.diffs.last() == Some(&0) {
            self.diffs.pop();
        }
        self
    }
}

/// Where a new item goes relative to its nearest neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    pub index: usize,
    /// Insert before `index` rather than after it.
    pub before: bool,
}

impl InsertionPoint {
    /// The position to pass to `Vec::insert`.
    pub fn insert_at(&self) -> usize {
        if self.before { self.index } else { self.index + 1 }
    }
}

/// Finds the item whose key is lexicographically closest to `id`, comparing
/// case-insensitively. Ties go to the first occurrence. An empty slice yields
/// index 0, before.
pub fn find_lex_closest_index<T, F>(id: &str, items: &[T], key: F) -> InsertionPoint
where
    F: Fn(&T) -> &str,
{
    closest_to(
        &id.to_lowercase(),
        items.iter().map(|item| key(item).to_lowercase()),
    )
}

/// [`find_lex_closest_index`] over keys that are already lowercase.
pub(crate) fn closest_to<K>(id: &str, keys: impl IntoIterator<Item = K>) -> InsertionPoint
where
    K: AsRef<str>,
{
    let mut best: Option<(usize, LexDist)> = None;
    for (index, key) in keys.into_iter().enumerate() {
        let dist = LexDist::from_difference(id, key.as_ref());
        let closer = match &best {
            None => true,
            Some((_, current)) => dist.smaller_than(current),
        };
        if closer {
            best = Some((index, dist));
        }
    }

    match best {
        None => InsertionPoint {
            index: 0,
            before: true,
        },
        Some((index, dist)) => InsertionPoint {
            index,
            before: !dist.is_negative(),
        },
    }
}
