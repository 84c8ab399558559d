//! The main dashboard: title, info, status, stage list and footer.

use ratatui::layout::{Constraint, Layout, Rect, Size};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::overlay::{self, OverlayBox};
use super::{line_text, truncate, Theme, View};
use crate::data::duration::format_duration;
use crate::data::{BuildRecord, StageRecord};
use crate::events::Action;
use crate::modal::Overlay;

const NO_DATA: &str = "NO DATA";
const LABEL_WIDTH: usize = 11;
const INDEX_WIDTH: usize = 5;
const DURATION_WIDTH: usize = 10;
const STATUS_WIDTH: usize = 20;

/// Rows used by everything except the stage list (title, two blocks, divider, footer).
const FIXED_ROWS: u16 = 1 + 5 + 7 + 1 + 1;

/// Composed dashboard rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub title: Line<'static>,
    pub info: Vec<Line<'static>>,
    pub status: Vec<Line<'static>>,
    /// `None` when there are no stages; the bordered zone is then left out.
    pub stages: Option<Vec<Line<'static>>>,
    /// Drawn in place of the stage zone while the stage topic has never been fetched.
    pub stages_note: Option<Line<'static>>,
    pub footer: Line<'static>,
    pub overlay: Option<OverlayBox>,
}

impl Dashboard {
    /// Plain text of every row, top to bottom, overlay last.
    pub fn rows(&self) -> Vec<String> {
        let mut rows = vec![line_text(&self.title)];
        rows.extend(self.info.iter().map(line_text));
        rows.extend(self.status.iter().map(line_text));
        if let Some(stages) = &self.stages {
            rows.extend(stages.iter().map(line_text));
        }
        if let Some(note) = &self.stages_note {
            rows.push(line_text(note));
        }
        rows.push(line_text(&self.footer));
        if let Some(overlay) = &self.overlay {
            rows.push(overlay.title.clone());
            rows.extend(overlay.lines.iter().map(line_text));
        }
        rows
    }
}

pub(super) fn compose(view: &View<'_>, overlay: &Overlay, size: Size) -> Dashboard {
    let inner = size.width.saturating_sub(4) as usize;
    let build = view.snapshot.build.as_deref();

    let stages = view.snapshot.visible_stages().map(|stages| {
        let rows = size.height.saturating_sub(FIXED_ROWS + 2).max(1) as usize;
        stage_rows(stages, rows, inner, view.theme)
    });

    Dashboard {
        title: title(build, inner + 2, view.theme),
        info: info(build, inner, view.theme),
        status: status(build, inner, view.theme),
        stages,
        stages_note: view.snapshot.stages.is_none().then(|| {
            Line::from(vec![
                Span::styled(format!(" {:<LABEL_WIDTH$}", "Stages:"), view.theme.header),
                Span::styled(NO_DATA, Style::default().add_modifier(Modifier::DIM)),
            ])
        }),
        footer: footer(view, overlay, size.width as usize),
        overlay: overlay::boxed(view, overlay),
    }
}

fn title(build: Option<&BuildRecord>, width: usize, theme: &Theme) -> Line<'static> {
    let mut spans = vec![Span::styled(" JOBWATCH ", theme.title), Span::raw(" ")];
    match build {
        Some(build) => {
            let number = build.number.map(|n| format!(" #{}", n)).unwrap_or_default();
            let budget = width.saturating_sub(11 + number.chars().count());
            spans.push(Span::styled(
                truncate(&build.job_name, budget),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(number));
        }
        None => spans.push(Span::styled(NO_DATA, Style::default().add_modifier(Modifier::DIM))),
    }
    Line::from(spans)
}

fn no_data() -> Vec<Line<'static>> {
    vec![Line::styled(NO_DATA, Style::default().add_modifier(Modifier::DIM))]
}

fn field(label: &str, value: &str, width: usize, theme: &Theme, style: Style) -> Line<'static> {
    let value = if value.is_empty() { "-" } else { value };
    Line::from(vec![
        Span::styled(format!("{:<LABEL_WIDTH$}", label), theme.header),
        Span::styled(truncate(value, width.saturating_sub(LABEL_WIDTH)), style),
    ])
}

fn info(build: Option<&BuildRecord>, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let Some(build) = build else {
        return no_data();
    };
    vec![
        field("Job:", &build.job_name, width, theme, Style::default()),
        field("Folder:", &build.folder_path, width, theme, Style::default()),
        field("Executor:", &build.executor, width, theme, Style::default()),
    ]
}

fn status(build: Option<&BuildRecord>, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let Some(build) = build else {
        return no_data();
    };
    let plain = Style::default();
    vec![
        field("Status:", build.status.label(), width, theme, theme.status_style(build.status)),
        field("Started:", &build.started, width, theme, plain),
        field("Ended:", &build.ended, width, theme, plain),
        field("Elapsed:", &build.elapsed, width, theme, plain),
        field("Estimated:", &build.estimated, width, theme, plain),
    ]
}

/// One row per stage, keeping the most recent stages when they do not all fit.
fn stage_rows(stages: &[StageRecord], rows: usize, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let name_width = width.saturating_sub(INDEX_WIDTH + DURATION_WIDTH + STATUS_WIDTH + 2).max(8);

    let (skipped, shown) = if stages.len() > rows {
        // One row goes to the marker
        let keep = rows.saturating_sub(1);
        (stages.len() - keep, &stages[stages.len() - keep..])
    } else {
        (0, stages)
    };

    let mut lines = Vec::with_capacity(rows);
    if skipped > 0 {
        lines.push(Line::styled(
            format!("  … {} earlier stages", skipped),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    for (offset, stage) in shown.iter().enumerate() {
        let index = skipped + offset + 1;
        lines.push(Line::from(vec![
            Span::styled(format!("{:>3}. ", index), Style::default().add_modifier(Modifier::DIM)),
            Span::raw(format!("{:<name_width$} ", truncate(&stage.name, name_width))),
            Span::raw(format!(
                "{:>DURATION_WIDTH$} ",
                truncate(&stage.duration, DURATION_WIDTH)
            )),
            Span::styled(
                truncate(stage.status.label(), STATUS_WIDTH),
                theme.status_style(stage.status),
            ),
        ]));
    }
    lines
}

/// Cut a line to `width` characters, ending it with an ellipsis when anything was dropped.
fn fit(spans: Vec<Span<'static>>, width: usize) -> Line<'static> {
    let total: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    if total <= width {
        return Line::from(spans);
    }

    let mut remaining = width;
    let mut fitted = Vec::with_capacity(spans.len());
    for span in spans {
        let count = span.content.chars().count();
        if count < remaining {
            remaining -= count;
            fitted.push(span);
            continue;
        }
        if remaining > 0 {
            let mut cut: String = span.content.chars().take(remaining - 1).collect();
            cut.push('…');
            fitted.push(Span::styled(cut, span.style));
        }
        break;
    }
    Line::from(fitted)
}

fn footer(view: &View<'_>, overlay: &Overlay, width: usize) -> Line<'static> {
    let theme = view.theme;
    let snapshot = view.snapshot;
    let separator = || Span::styled(" │ ", Style::default().fg(theme.border));

    let mut spans = Vec::new();
    if view.busy {
        spans.push(Span::styled(
            " ⟳ Server interaction in progress… ",
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        ));
        spans.push(separator());
    }

    if let Overlay::Transient(message) = overlay {
        spans.push(Span::styled(
            format!(" {} ", message),
            Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD),
        ));
        return fit(spans, width);
    }

    let server = snapshot.server.as_deref();
    let (label, reachable) = match server {
        Some(s) if s.reachable && s.authenticated => ("● ONLINE", Some(true)),
        Some(s) if s.reachable => ("● UNAUTHORIZED", Some(false)),
        Some(_) => ("● UNREACHABLE", Some(false)),
        None => ("● NO DATA", None),
    };
    spans.push(Span::styled(format!(" {}", label), theme.server_style(reachable)));
    spans.push(separator());

    let updated = match snapshot.build_updated {
        Some(at) => {
            let age = format_duration(view.now.saturating_duration_since(at));
            if snapshot.build_error.is_some() {
                format!("Updated {} ago (stale)", age)
            } else {
                format!("Updated {} ago", age)
            }
        }
        None => "Waiting for data".to_string(),
    };
    spans.push(Span::styled(updated, Style::default().add_modifier(Modifier::DIM)));
    spans.push(separator());

    spans.push(Span::raw(if view.sound_enabled { "♪ on" } else { "♪ off" }));
    spans.push(separator());

    spans.push(Span::styled(
        format!("{}:help", view.keymap.primary_label(Action::Help)),
        Style::default().add_modifier(Modifier::DIM),
    ));
    fit(spans, width)
}

fn block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, theme.header))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border))
}

pub(super) fn draw(frame: &mut Frame, dashboard: &Dashboard, theme: &Theme, area: Rect) {
    let mut constraints = vec![
        Constraint::Length(1), // Title
        Constraint::Length(5), // Info
        Constraint::Length(7), // Status
    ];
    if dashboard.stages.is_some() {
        constraints.push(Constraint::Min(3));
    } else {
        constraints.push(Constraint::Min(0));
    }
    constraints.push(Constraint::Length(1)); // Divider
    constraints.push(Constraint::Length(1)); // Footer
    let chunks = Layout::vertical(constraints).split(area);

    frame.render_widget(Paragraph::new(dashboard.title.clone()), chunks[0]);
    frame.render_widget(
        Paragraph::new(dashboard.info.clone()).block(block(" Info ", theme)),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new(dashboard.status.clone()).block(block(" Status ", theme)),
        chunks[2],
    );
    if let Some(stages) = &dashboard.stages {
        frame.render_widget(
            Paragraph::new(stages.clone()).block(block(" Stages ", theme)),
            chunks[3],
        );
    } else if let Some(note) = &dashboard.stages_note {
        frame.render_widget(Paragraph::new(note.clone()), chunks[3]);
    }
    frame.render_widget(
        Paragraph::new("─".repeat(chunks[4].width as usize))
            .style(Style::default().fg(theme.border)),
        chunks[4],
    );
    frame.render_widget(Paragraph::new(dashboard.footer.clone()), chunks[5]);

    if let Some(overlay) = &dashboard.overlay {
        overlay::draw(frame, overlay, theme, area);
    }
}
