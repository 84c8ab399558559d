//! Modal boxes drawn over the dashboard, and the resize notice.

use ratatui::layout::{Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::{truncate, Notice, Theme, View};
use crate::events::{key_label, Action};
use crate::modal::{ConfirmKind, Overlay};

/// A centered box with a title and a few lines of text.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
    pub title: String,
    pub lines: Vec<Line<'static>>,
    pub accent: Color,
}

/// The box for a blocking overlay, if `overlay` is drawn as one.
pub(super) fn boxed(view: &View<'_>, overlay: &Overlay) -> Option<OverlayBox> {
    match overlay {
        Overlay::Help => Some(help(view)),
        Overlay::Paused => Some(paused(view)),
        Overlay::Confirm(kind) => Some(confirm(view, *kind)),
        Overlay::None | Overlay::TerminalTooSmall | Overlay::Transient(_) => None,
    }
}

fn dim(text: String) -> Line<'static> {
    Line::styled(text, Style::default().add_modifier(Modifier::DIM))
}

fn help(view: &View<'_>) -> OverlayBox {
    let keymap = view.keymap;
    let mut lines = vec![Line::from(Span::styled("Keyboard Shortcuts", view.theme.header)), Line::from("")];

    for action in Action::CONFIGURABLE {
        let keys: Vec<String> = keymap.keys_for(action).iter().map(key_label).collect();
        let keys = if keys.is_empty() {
            "-".to_string()
        } else {
            keys.join("/")
        };
        lines.push(Line::from(format!("  {:<10} {}", keys, action.description())));
    }
    lines.push(Line::from(format!("  {:<10} {}", "Ctrl+C", Action::Interrupt.description())));
    lines.push(Line::from(""));
    lines.push(dim(format!(
        "Press {} or {} to close",
        keymap.primary_label(Action::Help),
        keymap.primary_label(Action::Resume)
    )));

    OverlayBox {
        title: " Help ".to_string(),
        lines,
        accent: view.theme.highlight,
    }
}

fn paused(view: &View<'_>) -> OverlayBox {
    let keymap = view.keymap;
    OverlayBox {
        title: " Paused ".to_string(),
        lines: vec![
            Line::styled("Polling is paused", Style::default().add_modifier(Modifier::BOLD)),
            Line::from("Data on screen is not refreshed."),
            Line::from(""),
            dim(format!(
                "press {} or {} to resume",
                keymap.primary_label(Action::Pause),
                keymap.primary_label(Action::Resume)
            )),
        ],
        accent: view.theme.warning,
    }
}

fn confirm(view: &View<'_>, kind: ConfirmKind) -> OverlayBox {
    let keymap = view.keymap;
    let (title, question, action) = match kind {
        ConfirmKind::Abort => {
            let number = view
                .snapshot
                .build
                .as_deref()
                .and_then(|b| b.number)
                .map(|n| format!(" #{}", n))
                .unwrap_or_default();
            (" Abort ", format!("Abort build{}?", number), Action::Abort)
        }
        ConfirmKind::Quit => (" Quit ", "Quit the dashboard?".to_string(), Action::Quit),
    };
    OverlayBox {
        title: title.to_string(),
        lines: vec![
            Line::styled(question, Style::default().add_modifier(Modifier::BOLD)),
            Line::from(""),
            Line::from(format!(
                "press {} again to confirm, {} to cancel",
                keymap.primary_label(action),
                keymap.primary_label(Action::Resume)
            )),
        ],
        accent: view.theme.critical,
    }
}

/// The "resize window" notice for a terminal of `size`.
pub(super) fn notice(view: &View<'_>, size: Size, required: Size) -> Notice {
    let width = size.width as usize;
    let text = [
        "Terminal too small".to_string(),
        format!("{}x{}, need {}x{}", size.width, size.height, required.width, required.height),
        format!("Resize or press {} to quit", view.keymap.primary_label(Action::Quit)),
    ];
    Notice {
        lines: text.iter().map(|t| Line::from(truncate(t, width))).collect(),
        style: Style::default().fg(view.theme.warning),
    }
}

pub(super) fn draw(frame: &mut Frame, overlay: &OverlayBox, theme: &Theme, area: Rect) {
    let content_width = overlay.lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let width = (content_width + 4).max(overlay.title.len() as u16 + 4).min(area.width.saturating_sub(4));
    let height = (overlay.lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let box_area = Rect::new(x, y, width, height);

    let block = Block::default()
        .title(overlay.title.clone())
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(overlay.accent));

    // Clear the area behind the box
    frame.render_widget(Clear, box_area);
    frame.render_widget(Paragraph::new(overlay.lines.clone()).block(block), box_area);
}
