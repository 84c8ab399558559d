//! Theme configuration for the dashboard.
//!
//! Supports light and dark themes with automatic terminal detection.

use std::fmt;
use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;
use serde::{Deserialize, Serialize};

use crate::data::BuildStatus;

/// Color and style theme for the dashboard.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Accent color for titles and the help box.
    pub highlight: Color,
    /// Color for in-progress and attention states.
    pub warning: Color,
    /// Color for failures and unreachable server.
    pub critical: Color,
    /// Color for success and online server.
    pub healthy: Color,
    /// Color for queued and informational states.
    pub info: Color,
    /// Color for borders and dividers.
    pub border: Color,
    /// Style for block titles and labels.
    pub header: Style,
    /// Style for the title bar.
    pub title: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            info: Color::LightBlue,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            title: Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Rgb(176, 120, 0),
            critical: Color::Red,
            healthy: Color::Green,
            info: Color::Blue,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            title: Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Resolve a configured choice. Auto-detection queries the terminal.
    pub fn from_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Auto => Self::auto_detect(),
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::Light => Self::light(),
        }
    }

    /// Get style for a build or stage status
    pub fn status_style(&self, status: BuildStatus) -> Style {
        match status {
            BuildStatus::Success => Style::default().fg(self.healthy),
            BuildStatus::Failure => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
            BuildStatus::Running => Style::default().fg(self.warning),
            BuildStatus::PausedForInput => {
                Style::default().fg(self.warning).add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK)
            }
            BuildStatus::Unstable => Style::default().fg(Color::Magenta),
            BuildStatus::Queued => Style::default().fg(self.info),
            BuildStatus::Aborted | BuildStatus::NotRun => {
                Style::default().fg(self.border).add_modifier(Modifier::DIM)
            }
            BuildStatus::NotFound | BuildStatus::Unknown => Style::default().add_modifier(Modifier::DIM),
        }
    }

    /// Style for the server connectivity indicator.
    pub fn server_style(&self, reachable: Option<bool>) -> Style {
        match reachable {
            Some(true) => Style::default().fg(self.healthy).add_modifier(Modifier::BOLD),
            Some(false) => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
            None => Style::default().add_modifier(Modifier::DIM),
        }
    }
}

/// Theme selection as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Auto,
    Dark,
    Light,
}

impl FromStr for ThemeChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ThemeChoice::Auto),
            "dark" => Ok(ThemeChoice::Dark),
            "light" => Ok(ThemeChoice::Light),
            other => anyhow::bail!("unknown theme {:?} (expected auto, dark or light)", other),
        }
    }
}

impl fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThemeChoice::Auto => "auto",
            ThemeChoice::Dark => "dark",
            ThemeChoice::Light => "light",
        })
    }
}
