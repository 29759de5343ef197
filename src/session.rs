//! Interactive state: the document, the view onto it, the search, and the
//! Viewing/Searching machine that routes input between them.

use tracing::debug;

use crate::document::Document;
use crate::format::Format;
use crate::search::SearchState;
use crate::viewport::{ViewState, Viewport, VisibleRows};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Viewing,
    Searching,
}

/// Terminal-independent input events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Backspace,
    Esc,
    Interrupt,
    StartSearch,
    FindNext,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    document: Document,
    format: Format,
    tab_size: usize,
    view: ViewState,
    search: SearchState,
    mode: Mode,
    debug: bool,
    viewport: Viewport,
    visible: VisibleRows,
}

impl Session {
    pub fn new(document: Document, format: Format, tab_size: usize) -> Self {
        Self {
            document,
            format,
            tab_size,
            view: ViewState::default(),
            search: SearchState::default(),
            mode: Mode::Viewing,
            debug: false,
            viewport: Viewport::default(),
            visible: VisibleRows::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn visible(&self) -> &VisibleRows {
        &self.visible
    }

    /// Logical index of the line under the cursor in the last laid out frame.
    pub fn cursor_line(&self) -> Option<usize> {
        self.visible.line_at(self.view.cursor_row)
    }

    /// Lays out the frame for a terminal of the given size.
    pub fn layout(&mut self, viewport: Viewport) -> &VisibleRows {
        self.viewport = viewport;
        self.visible = self.view.settle(&self.document, viewport);
        &self.visible
    }

    pub fn handle(&mut self, input: Input) -> Flow {
        match self.mode {
            Mode::Viewing => self.handle_viewing(input),
            Mode::Searching => {
                self.handle_searching(input);
                Flow::Continue
            }
        }
    }

    fn handle_searching(&mut self, input: Input) {
        match input {
            Input::Char(c) => self.search.term.push(c),
            Input::Esc => self.mode = Mode::Viewing,
            Input::Backspace => {
                if self.search.term.pop().is_none() {
                    self.mode = Mode::Viewing;
                }
            }
            Input::Enter => {
                self.mode = Mode::Viewing;
                self.find_next();
            }
            _ => {}
        }
    }

    fn handle_viewing(&mut self, input: Input) -> Flow {
        if !matches!(input, Input::StartSearch | Input::FindNext | Input::Char('n')) {
            self.search.not_found = false;
        }

        match input {
            Input::Esc | Input::Interrupt | Input::Char('q') => return Flow::Quit,
            Input::Up | Input::Char('k') => self.view.move_up(&self.document),
            Input::Down | Input::Char('j') => {
                self.view
                    .move_down(&self.document, &self.visible, self.viewport.rows());
            }
            Input::Left | Input::Char('h') => self.view.scroll_left(),
            Input::Right | Input::Char('l') => self.view.scroll_right(),
            Input::Char(' ') => {
                if let Some(line) = self.cursor_line() {
                    self.document.toggle_fold(line);
                }
            }
            Input::Char('f') => self.document.set_all(true),
            Input::Char('u') => self.document.set_all(false),
            Input::Char('d') => self.debug = !self.debug,
            Input::StartSearch => {
                self.mode = Mode::Searching;
                if self.search.not_found {
                    self.search.term.clear();
                    self.search.not_found = false;
                }
            }
            Input::FindNext | Input::Char('n') => self.find_next(),
            _ => {}
        }

        Flow::Continue
    }

    fn find_next(&mut self) {
        let cursor_line = self.cursor_line();
        let found = self.search.find_next(
            &mut self.document,
            &mut self.view,
            cursor_line,
            self.viewport.rows(),
        );
        debug!(?found, "find next");
    }
}
