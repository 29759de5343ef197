//! Case-insensitive, fold-aware line search.

use tracing::debug;

use crate::document::{Document, Line};
use crate::viewport::ViewState;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchState {
    pub term: String,
    /// Set when the last search ran off the end of the document. The next
    /// search then starts over from the first line.
    pub not_found: bool,
}

impl SearchState {
    /// Finds the next line containing the term after `cursor_line`, opens any
    /// folds hiding it and moves the view onto it.
    pub fn find_next(
        &mut self,
        doc: &mut Document,
        view: &mut ViewState,
        cursor_line: Option<usize>,
        capacity: usize,
    ) -> Option<usize> {
        let start = if self.not_found {
            0
        } else {
            cursor_line.map_or(0, |line| line + 1)
        };

        let Some(found) = find_from(doc, start, &self.term) else {
            debug!(term = %self.term, start, "search exhausted");
            self.not_found = true;
            return None;
        };

        let opened = doc.reveal(found);
        view.jump_to(doc, found, capacity);
        self.not_found = false;
        debug!(term = %self.term, start, found, opened, "search matched");
        Some(found)
    }
}

/// Index of the first line at or after `start` whose content contains
/// `term`, ignoring case.
pub fn find_from(doc: &Document, start: usize, term: &str) -> Option<usize> {
    let needle = term.to_lowercase();
    doc.lines()
        .get(start..)?
        .iter()
        .find(|line| line.content().to_lowercase().contains(&needle))
        .map(Line::index)
}
