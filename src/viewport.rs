//! Maps the visible part of a [`Document`] onto terminal rows.

use crate::document::{Document, Line};

/// Rows taken by the border and the status line.
pub const CHROME_ROWS: usize = 2;
/// Fold glyph plus separator.
pub const GUTTER_WIDTH: usize = 2;
const ELLIPSIS: &str = "...";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: usize::from(width),
            height: usize::from(height),
        }
    }

    /// Rows available for document lines.
    pub fn rows(&self) -> usize {
        self.height.saturating_sub(CHROME_ROWS)
    }

    /// Columns available for line content.
    pub fn text_width(&self) -> usize {
        self.width.saturating_sub(GUTTER_WIDTH)
    }
}

/// The lines rendered in one frame, top to bottom.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleRows {
    rows: Vec<usize>,
    longest: usize,
    more_below: bool,
}

impl VisibleRows {
    pub fn collect(doc: &Document, view_top: usize, capacity: usize) -> Self {
        let mut visible = doc
            .lines()
            .iter()
            .skip(view_top)
            .filter(|line| !line.is_hidden());

        let rows: Vec<usize> = visible.by_ref().take(capacity).map(Line::index).collect();
        let more_below = visible.next().is_some();
        let longest = rows
            .iter()
            .filter_map(|&i| doc.line(i))
            .map(|line| line.content().chars().count())
            .max()
            .unwrap_or(0);

        Self {
            rows,
            longest,
            more_below,
        }
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Row of the last rendered line, `None` when nothing renders.
    pub fn last_row(&self) -> Option<usize> {
        self.rows.len().checked_sub(1)
    }

    pub fn line_at(&self, row: usize) -> Option<usize> {
        self.rows.get(row).copied()
    }

    /// Character length of the longest rendered line.
    pub fn longest(&self) -> usize {
        self.longest
    }

    pub fn more_below(&self) -> bool {
        self.more_below
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub cursor_row: usize,
    pub view_top: usize,
    pub scroll_x: usize,
}

impl ViewState {
    pub fn move_up(&mut self, doc: &Document) {
        if self.cursor_row > 0 {
            self.cursor_row -= 1;
            return;
        }
        self.view_top = doc.previous_visible(self.view_top).unwrap_or(0);
    }

    pub fn move_down(&mut self, doc: &Document, visible: &VisibleRows, capacity: usize) {
        let Some(last) = visible.last_row() else {
            return;
        };

        if self.cursor_row + 1 < capacity {
            self.cursor_row = (self.cursor_row + 1).min(last);
        } else if visible.more_below() {
            if let Some(next) = doc.next_visible(self.view_top) {
                self.view_top = next;
            }
            self.cursor_row = last;
        }
    }

    pub fn scroll_left(&mut self) {
        self.scroll_x = self.scroll_x.saturating_sub(1);
    }

    pub fn scroll_right(&mut self) {
        self.scroll_x += 1;
    }

    /// Puts `index` under the cursor, as high in the window as the end of the
    /// document allows.
    pub fn jump_to(&mut self, doc: &Document, index: usize, capacity: usize) {
        self.view_top = index;
        self.cursor_row = 0;

        let below = doc
            .lines()
            .iter()
            .skip(index)
            .filter(|line| !line.is_hidden())
            .take(capacity)
            .count();

        for _ in below..capacity {
            match doc.previous_visible(self.view_top) {
                Some(prev) => {
                    self.view_top = prev;
                    self.cursor_row += 1;
                }
                None => break,
            }
        }
    }

    /// Lays out the next frame, first pulling the view back into a valid
    /// position if the last operation stranded it.
    pub fn settle(&mut self, doc: &Document, viewport: Viewport) -> VisibleRows {
        let capacity = viewport.rows();
        let mut visible = VisibleRows::collect(doc, self.view_top, capacity);

        let stranded = match visible.last_row() {
            Some(last) => self.cursor_row > last,
            None => *self != Self::default(),
        };
        if stranded {
            *self = Self::default();
            visible = VisibleRows::collect(doc, self.view_top, capacity);
        }

        if self.scroll_x > 0 && visible.longest() + GUTTER_WIDTH < viewport.width + self.scroll_x {
            self.scroll_x = (visible.longest() + GUTTER_WIDTH).saturating_sub(viewport.width);
        }

        visible
    }
}

/// Slice of `content` shown between `scroll_x` and the right edge.
pub fn window_text(content: &str, scroll_x: usize, available: usize) -> String {
    let len = content.chars().count();
    if len.saturating_sub(scroll_x) > available {
        content
            .chars()
            .skip(scroll_x)
            .take(available.saturating_sub(ELLIPSIS.len()))
            .chain(ELLIPSIS.chars())
            .take(available)
            .collect()
    } else {
        content.chars().skip(scroll_x).collect()
    }
}
