//! Word frequencies on top of [`AvlTreeMap`].
//!
//! Counting only inserts and bumps the value through the cursor returned on
//! insertion. Selection walks the map with [`AvlTreeMap::traverse`] and
//! hands back cursors into the map, so no entry is copied.
//!
//! ```
//! use avl_dict::frequency::{count_words, most_frequent, Selection};
//!
//! let counts = count_words("the cat saw the other cat, the end");
//! let top: Vec<_> = most_frequent(&counts, 2, Selection::Exact)
//!     .iter()
//!     .map(|cursor| (cursor.key().as_str(), *cursor.value()))
//!     .collect();
//! assert_eq!(top, [("the", 3), ("cat", 2)]);
//! ```

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;

use tracing::debug;

use crate::map::{AvlTreeMap, Cursor, Order};

/// Number of occurrences per word.
pub type WordCounts = AvlTreeMap<String, usize>;

/// How to treat entries tied with the last selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Return at most `limit` entries; ties at the boundary are cut by key order.
    #[default]
    Exact,
    /// Also return every entry whose value equals the value of the last
    /// selected entry, so no tie group is split.
    WithTies,
}

/// Counts the words of a text.
///
/// A word is a maximal run of ASCII letters; every other character separates
/// words. Words are case-sensitive, so `Cat` and `cat` are counted apart.
pub fn count_words(text: &str) -> WordCounts {
    let mut counts = WordCounts::new();
    add_words(&mut counts, text);
    counts
}

/// Adds the words of a text to existing counts.
pub fn add_words(counts: &mut WordCounts, text: &str) {
    for word in text
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
    {
        let (inserted, mut cursor) = counts.insert_with_cursor(word.to_owned(), 1);
        if !inserted {
            *cursor.value_mut() += 1;
        }
    }
}

/// Counts the words read from a buffered reader, line by line.
pub fn count_words_in<R: BufRead>(reader: R) -> io::Result<WordCounts> {
    let mut counts = WordCounts::new();
    let mut num_lines = 0usize;
    for line in reader.lines() {
        add_words(&mut counts, &line?);
        num_lines += 1;
    }
    debug!(num_lines, "counted words");
    Ok(counts)
}

/// Counts the words of a text file.
pub fn count_words_in_file<P: AsRef<Path>>(path: P) -> io::Result<WordCounts> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading words");
    count_words_in(BufReader::new(File::open(path)?))
}

/// Returns cursors to the `limit` entries with the largest values,
/// largest first, ties in ascending key order.
pub fn most_frequent<K, V: Ord>(
    map: &AvlTreeMap<K, V>,
    limit: usize,
    selection: Selection,
) -> Vec<Cursor<'_, K, V>> {
    select(map, limit, selection, |lhs, rhs| rhs.cmp(lhs))
}

/// Returns cursors to the `limit` entries with the smallest values,
/// smallest first, ties in ascending key order.
pub fn least_frequent<K, V: Ord>(
    map: &AvlTreeMap<K, V>,
    limit: usize,
    selection: Selection,
) -> Vec<Cursor<'_, K, V>> {
    select(map, limit, selection, |lhs, rhs| lhs.cmp(rhs))
}

fn select<'a, K, V, F>(
    map: &'a AvlTreeMap<K, V>,
    limit: usize,
    selection: Selection,
    rank: F,
) -> Vec<Cursor<'a, K, V>>
where
    V: Ord,
    F: Fn(&V, &V) -> Ordering,
{
    if limit == 0 {
        return Vec::new();
    }

    // In-order visit plus a stable sort keeps tied entries in key order.
    let mut entries = Vec::new();
    let _ = map.traverse(Order::Inorder, |cursor| {
        entries.push(cursor);
        ControlFlow::<()>::Continue(())
    });
    entries.sort_by(|lhs, rhs| rank(lhs.value(), rhs.value()));

    if entries.len() > limit {
        let boundary = entries[limit - 1].value();
        let end = match selection {
            Selection::Exact => limit,
            Selection::WithTies => {
                limit
                    + entries[limit..]
                        .iter()
                        .take_while(|cursor| cursor.value() == boundary)
                        .count()
            }
        };
        entries.truncate(end);
    }
    debug!(limit, selected = entries.len(), ?selection, "selected entries");
    entries
}
