//! Render engine.
//!
//! Drawing is split in two steps. [`compose`] turns the current snapshot,
//! the visible overlay and the terminal size into a [`Screen`], a plain
//! model of styled rows that tests can inspect directly. [`draw`] then blits
//! a `Screen` onto a ratatui [`Frame`].
//!
//! ## Layout
//!
//! ```text
//! ┌ title ─────────────────────────────┐  1 row
//! │ info block (job/folder/executor)   │  5 rows
//! │ status block (status and timings)  │  7 rows
//! │ stage list (only with stage data)  │  ≥3 rows
//! ├ divider ───────────────────────────┤  1 row
//! └ footer ────────────────────────────┘  1 row
//! ```

pub mod dashboard;
pub mod overlay;
pub mod theme;

use std::time::Instant;

use ratatui::layout::{Alignment, Rect, Size};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use crate::data::Snapshot;
use crate::events::KeyMap;
use crate::modal::Overlay;

pub use dashboard::Dashboard;
pub use overlay::OverlayBox;
pub use theme::{Theme, ThemeChoice};

/// Minimum width for the dashboard layout.
pub const MIN_WIDTH: u16 = 60;
/// Minimum height with a stage list to show.
pub const MIN_HEIGHT: u16 = 20;
/// Minimum height when there are no stages.
pub const MIN_HEIGHT_NO_STAGES: u16 = 16;
/// Smallest area in which the resize notice itself can be drawn.
pub const NOTICE_MIN_WIDTH: u16 = 24;
pub const NOTICE_MIN_HEIGHT: u16 = 3;

const ELLIPSIS: char = '…';

/// Everything a frame is composed from, apart from the overlay and size.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub snapshot: &'a Snapshot,
    pub keymap: &'a KeyMap,
    pub theme: &'a Theme,
    /// A side effect is being carried out on the main thread.
    pub busy: bool,
    pub sound_enabled: bool,
    pub now: Instant,
}

/// A composed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// The terminal is below the minimum size; only the resize notice is shown.
    TooSmall(Notice),
    Dashboard(Dashboard),
}

impl Screen {
    /// Plain text of every row, top to bottom, overlay last.
    pub fn rows(&self) -> Vec<String> {
        match self {
            Screen::TooSmall(notice) => notice.lines.iter().map(line_text).collect(),
            Screen::Dashboard(dashboard) => dashboard.rows(),
        }
    }

    pub fn is_too_small(&self) -> bool {
        matches!(self, Screen::TooSmall(_))
    }
}

/// The centered "resize window" notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub lines: Vec<Line<'static>>,
    pub style: Style,
}

/// Size the terminal must have for the dashboard layout.
pub fn required_size(has_stages: bool) -> Size {
    let height = if has_stages {
        MIN_HEIGHT
    } else {
        MIN_HEIGHT_NO_STAGES
    };
    Size::new(MIN_WIDTH, height)
}

/// Whether `size` is too small for the dashboard.
pub fn is_too_small(size: Size, has_stages: bool) -> bool {
    let required = required_size(has_stages);
    size.width < required.width || size.height < required.height
}

/// Whether `size` cannot even hold the resize notice.
pub fn is_unrenderable(size: Size) -> bool {
    size.width < NOTICE_MIN_WIDTH || size.height < NOTICE_MIN_HEIGHT
}

/// Compose one frame for a terminal of `size`.
pub fn compose(view: &View<'_>, overlay: &Overlay, size: Size) -> Screen {
    let has_stages = view.snapshot.visible_stages().is_some();
    if *overlay == Overlay::TerminalTooSmall || is_too_small(size, has_stages) {
        return Screen::TooSmall(overlay::notice(view, size, required_size(has_stages)));
    }
    Screen::Dashboard(dashboard::compose(view, overlay, size))
}

/// Draw a composed frame.
pub fn draw(frame: &mut Frame, screen: &Screen, theme: &Theme) {
    let area = frame.area();
    match screen {
        Screen::TooSmall(notice) => {
            let height = (notice.lines.len() as u16).min(area.height);
            let y = area.y + area.height.saturating_sub(height) / 2;
            let centered = Rect::new(area.x, y, area.width, height);
            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(notice.lines.clone())
                    .alignment(Alignment::Center)
                    .style(notice.style),
                centered,
            );
        }
        Screen::Dashboard(dashboard) => dashboard::draw(frame, dashboard, theme, area),
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Concatenated content of a line's spans.
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
