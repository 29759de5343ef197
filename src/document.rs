//! Indentation-keyed line tree and its fold state.
//!
//! A [`Document`] never changes shape after [`Document::build`]: lines keep
//! their index and fold capability for the life of the session. Only the
//! `is_folded` and `hidden` flags move, and only through the operations here.

use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    content: String,
    indentation: usize,
    index: usize,
    can_fold: bool,
    is_folded: bool,
    hidden: bool,
}

impl Line {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn indentation(&self) -> usize {
        self.indentation
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True when the next line is indented deeper than this one.
    pub fn can_fold(&self) -> bool {
        self.can_fold
    }

    pub fn is_folded(&self) -> bool {
        self.is_folded
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn glyph(&self) -> char {
        match (self.can_fold, self.is_folded) {
            (true, true) => '+',
            (true, false) => '-',
            _ => ' ',
        }
    }
}

/// Leading whitespace in columns. A tab always counts as `tab_width`.
pub fn measure_indent(line: &str, tab_width: usize) -> usize {
    line.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(tab_width),
            _ => None,
        })
        .sum()
}

#[derive(Clone, Debug, Default)]
pub struct Document {
    lines: Vec<Line>,
    smallest_indent: Option<usize>,
}

impl Document {
    pub fn build<I, S>(source: I, tab_width: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lines: Vec<Line> = Vec::new();
        let mut smallest_indent: Option<usize> = None;

        for (index, content) in source.into_iter().enumerate() {
            let content = content.into();
            let indentation = measure_indent(&content, tab_width);

            if let Some(prev) = lines.last_mut() {
                prev.can_fold = prev.indentation < indentation;
            }

            smallest_indent = Some(smallest_indent.map_or(indentation, |s| s.min(indentation)));

            lines.push(Line {
                content,
                indentation,
                index,
                can_fold: false,
                is_folded: false,
                hidden: false,
            });
        }

        Self {
            lines,
            smallest_indent,
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Minimum indentation across the document, 0 when empty.
    pub fn smallest_indent(&self) -> usize {
        self.smallest_indent.unwrap_or(0)
    }

    pub fn previous_visible(&self, index: usize) -> Option<usize> {
        (0..index.min(self.lines.len()))
            .rev()
            .find(|&i| !self.lines[i].hidden)
    }

    pub fn next_visible(&self, index: usize) -> Option<usize> {
        self.lines
            .iter()
            .skip(index.saturating_add(1))
            .find(|line| !line.hidden)
            .map(Line::index)
    }

    /// Nearest visible, foldable line at or before `index`.
    pub fn fold_target(&self, index: usize) -> Option<usize> {
        let end = index.min(self.lines.len().checked_sub(1)?);
        (0..=end)
            .rev()
            .find(|&i| !self.lines[i].hidden && self.lines[i].can_fold)
    }

    /// Flips the fold owning `index` and cascades the new state over its
    /// descendants. Sub-trees under an independently folded line keep their
    /// own hidden flags. Returns the index of the line that was toggled.
    pub fn toggle_fold(&mut self, index: usize) -> Option<usize> {
        let target = self.fold_target(index)?;
        let folded = !self.lines[target].is_folded;
        let depth = self.lines[target].indentation;
        self.lines[target].is_folded = folded;

        let mut suppressed: Option<usize> = None;
        let mut touched = 0usize;
        for line in &mut self.lines[target + 1..] {
            if let Some(sub_depth) = suppressed {
                if line.indentation > sub_depth {
                    continue;
                }
                suppressed = None;
            }

            if line.indentation <= depth {
                break;
            }

            if line.is_folded {
                suppressed = Some(line.indentation);
            }
            line.hidden = folded;
            touched += 1;
        }

        trace!(line = target, folded, touched, "toggled fold");
        Some(target)
    }

    /// Folds (or unfolds) everything below the top level. Nested fold state
    /// is not preserved.
    pub fn set_all(&mut self, folded: bool) {
        let smallest = self.smallest_indent();
        for line in &mut self.lines {
            if line.can_fold {
                line.is_folded = folded;
            }
            if line.indentation > smallest {
                line.hidden = folded;
            }
        }
        trace!(folded, "set all folds");
    }

    /// Opens the folded ancestors of `index` until it is visible. Sibling
    /// branches are left alone. Returns how many folds were opened.
    pub fn reveal(&mut self, index: usize) -> usize {
        let mut opened = 0;

        while self.lines.get(index).is_some_and(|line| line.hidden) {
            let mut depth = self.lines[index].indentation;
            let mut progressed = false;

            for i in (0..index).rev() {
                if self.lines[i].indentation >= depth {
                    continue;
                }
                depth = self.lines[i].indentation;

                if self.lines[i].is_folded && !self.lines[i].hidden {
                    self.toggle_fold(i);
                    opened += 1;
                    progressed = true;
                }

                if depth == 0 {
                    break;
                }
            }

            if !progressed {
                break;
            }
        }

        opened
    }
}
