//! Paints a [`Session`] into a ratatui cell buffer.

use ratatui::buffer::Buffer;
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use crate::session::{Mode, Session};
use crate::viewport::{window_text, Viewport, GUTTER_WIDTH};

const SEPARATOR: char = '│';
const SEARCH_COLUMN: usize = 20;
/// Status width reserved for the line number, the search label and the
/// format name.
const SEARCH_RESERVED: usize = 48;
const NOT_FOUND_STATUS: &str = "Not found";

pub fn draw(session: &mut Session, frame: &mut Frame<'_>) {
    let area = frame.size();
    session.layout(Viewport::new(area.width, area.height));
    paint(session, frame.buffer_mut());
}

/// Draws the last laid out frame of `session`. Call [`Session::layout`] first.
pub fn paint(session: &Session, buf: &mut Buffer) {
    let viewport = session.viewport();
    let width = viewport.width;
    let tab = session.tab_size();
    let plain = Style::default();

    for (row, &index) in session.visible().rows().iter().enumerate() {
        let Some(line) = session.document().line(index) else {
            continue;
        };
        let text = window_text(line.content(), session.view().scroll_x, viewport.text_width());
        let out = format!("{}{SEPARATOR}{text}", line.glyph());
        put_str(buf, 0, row, &out, plain, tab);
    }

    let Some(status_row) = viewport.height.checked_sub(1) else {
        return;
    };
    if let Some(border_row) = status_row.checked_sub(1) {
        let border = format!("─┴{}", "─".repeat(width.saturating_sub(GUTTER_WIDTH)));
        put_str(buf, 0, border_row, &border, plain, tab);
    }

    let right = format!("Format: {}", session.format());
    put_str(
        buf,
        width.saturating_sub(right.chars().count()),
        status_row,
        &right,
        plain,
        tab,
    );

    if session.mode() == Mode::Searching {
        let term = truncate_left(&session.search().term, width.saturating_sub(SEARCH_RESERVED));
        put_str(
            buf,
            SEARCH_COLUMN,
            status_row,
            &format!("Search: {term}▏"),
            plain,
            tab,
        );
    } else if session.search().not_found {
        put_str(buf, SEARCH_COLUMN, status_row, NOT_FOUND_STATUS, plain, tab);
    }

    let line_number = session.cursor_line().map_or(0, |line| line + 1);
    let left = format!("Line: {}", group_thousands(line_number));
    put_str(buf, 0, status_row, &left, plain, tab);

    if session.debug() {
        paint_debug(session, buf);
    }

    if session.visible().line_at(session.view().cursor_row).is_some() {
        if let Some(cell) = cell_mut(buf, 0, session.view().cursor_row) {
            cell.set_style(Style::default().add_modifier(Modifier::REVERSED));
        }
    }
}

fn paint_debug(session: &Session, buf: &mut Buffer) {
    let viewport = session.viewport();
    let view = session.view();
    let overlay = Style::default().fg(Color::White).bg(Color::Black);
    let cursor_line = session
        .cursor_line()
        .map_or_else(|| "-".to_string(), |line| line.to_string());

    let messages = [
        format!("Size: ({}, {})", viewport.width, viewport.height),
        format!("View: ({}, {})", view.scroll_x, view.view_top),
        format!("Cursor: {}, ({cursor_line})", view.cursor_row),
    ];
    for (offset, msg) in messages.iter().enumerate() {
        let x = viewport.width.saturating_sub(msg.chars().count());
        put_str(buf, x, offset + 1, msg, overlay, session.tab_size());
    }
}

fn cell_mut(buf: &mut Buffer, x: usize, y: usize) -> Option<&mut ratatui::buffer::Cell> {
    let x = u16::try_from(x).ok()?;
    let y = u16::try_from(y).ok()?;
    let area = buf.area;
    if x < area.left() || x >= area.right() || y < area.top() || y >= area.bottom() {
        return None;
    }
    Some(buf.get_mut(x, y))
}

/// Writes `text` cell by cell, advancing by each character's display width.
/// Tabs are expanded to `tab` blank cells.
fn put_str(buf: &mut Buffer, x: usize, y: usize, text: &str, style: Style, tab: usize) {
    let mut x = x;
    for c in text.chars() {
        if c == '\t' {
            for _ in 0..tab {
                if let Some(cell) = cell_mut(buf, x, y) {
                    cell.set_char(' ').set_style(style);
                }
                x += 1;
            }
            continue;
        }

        let Some(cell) = cell_mut(buf, x, y) else {
            return;
        };
        cell.set_char(c).set_style(style);
        x += c.width().unwrap_or(0);
    }
}

/// Keeps the tail of `term`, marking the cut with a leading ellipsis.
fn truncate_left(term: &str, available: usize) -> String {
    let len = term.chars().count();
    if len <= available {
        return term.to_string();
    }
    let tail: String = term.chars().skip(len - available).collect();
    format!("...{tail}")
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::format::Format;
    use crate::session::Input;
    use ratatui::layout::Rect;

    fn screen(session: &mut Session, width: u16, height: u16) -> Vec<String> {
        session.layout(Viewport::new(width, height));
        let mut buf = Buffer::empty(Rect::new(0, 0, width, height));
        paint(session, &mut buf);
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn session(lines: &[&str]) -> Session {
        Session::new(Document::build(lines.iter().copied(), 2), Format::Json, 2)
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn truncates_search_term_from_the_left() {
        assert_eq!(truncate_left("abc", 5), "abc");
        assert_eq!(truncate_left("abcdefgh", 3), "...fgh");
    }

    #[test]
    fn paints_gutter_content_and_status() {
        let mut s = session(&["{", "  \"a\": 1", "}"]);
        let rows = screen(&mut s, 30, 6);
        assert_eq!(rows[0], "-│{");
        assert_eq!(rows[1], " │  \"a\": 1");
        assert_eq!(rows[2], " │}");
        assert_eq!(rows[4], format!("─┴{}", "─".repeat(28)));
        assert!(rows[5].starts_with("Line: 1"));
        assert!(rows[5].ends_with("Format: json"));
    }

    #[test]
    fn folded_line_shows_plus_and_hides_children() {
        let mut s = session(&["{", "  \"a\": 1", "}"]);
        screen(&mut s, 30, 6);
        s.handle(Input::Char(' '));
        let rows = screen(&mut s, 30, 6);
        assert_eq!(rows[0], "+│{");
        assert_eq!(rows[1], " │}");
        assert_eq!(rows[2], "");
    }

    #[test]
    fn long_lines_are_truncated_with_ellipsis() {
        let long = "x".repeat(40);
        let mut s = session(&[&long]);
        let rows = screen(&mut s, 20, 4);
        assert_eq!(rows[0], format!(" │{}...", "x".repeat(15)));
    }

    #[test]
    fn cursor_cell_is_reversed() {
        let mut s = session(&["a", "b"]);
        s.layout(Viewport::new(20, 5));
        s.handle(Input::Down);
        s.layout(Viewport::new(20, 5));
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 5));
        paint(&s, &mut buf);
        assert!(buf.get(0, 1).modifier.contains(Modifier::REVERSED));
        assert!(!buf.get(0, 0).modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn search_prompt_and_not_found() {
        let mut s = session(&["alpha"]);
        screen(&mut s, 60, 5);
        for input in [Input::StartSearch, Input::Char('z')] {
            s.handle(input);
        }
        let rows = screen(&mut s, 60, 5);
        assert_eq!(
            &rows[4][20..],
            format!("Search: z▏{}Format: json", " ".repeat(18))
        );

        s.handle(Input::Enter);
        let rows = screen(&mut s, 60, 5);
        assert!(rows[4].contains("Not found"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut s = session(&["a", "  b"]);
        screen(&mut s, 1, 1);
        screen(&mut s, 0, 0);
        s.handle(Input::Char('d'));
        screen(&mut s, 3, 2);
    }
}
