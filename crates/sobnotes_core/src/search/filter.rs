//! Multi-token substring filter over notes.
//!
//! # Responsibility
//! - Tokenize free-text queries.
//! - Select notes where any token occurs in title, body or tags.
//!
//! # Invariants
//! - Blank queries select the full collection.
//! - Matches keep collection order.
//! - Matching is case-insensitive and stateless; callers may run it per keystroke.

use crate::model::note::Note;

/// Splits a query on whitespace and lower-cases each token.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Returns the notes matching `query`, in collection order.
///
/// A note matches when at least one token is a substring of its
/// [`Note::search_haystack`].
pub fn filter<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    matching_indices(notes, query)
        .into_iter()
        .map(|index| &notes[index])
        .collect()
}

/// Returns collection positions of the notes matching `query`.
///
/// The controller keeps these positions as its list view instead of
/// holding references into the collection.
pub fn matching_indices(notes: &[Note], query: &str) -> Vec<usize> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return (0..notes.len()).collect();
    }

    notes
        .iter()
        .enumerate()
        .filter(|(_, note)| {
            let hay = note.search_haystack();
            tokens.iter().any(|token| hay.contains(token.as_str()))
        })
        .map(|(index, _)| index)
        .collect()
}
