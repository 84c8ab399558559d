use std::fmt;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use thiserror::Error;

/// Logical actions the operator can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Arm or confirm quitting the dashboard.
    Quit,
    /// Cancel confirmations and close overlays.
    Resume,
    /// Arm or confirm aborting the build.
    Abort,
    /// Toggle polling pause.
    Pause,
    /// Toggle the help overlay.
    Help,
    /// Open the build in an external viewer.
    Open,
    /// Toggle sound notifications.
    Sound,
    /// Leave the dashboard and show the build log.
    Logs,
    /// Ctrl+C. Not configurable.
    Interrupt,
}

impl Action {
    /// Configurable actions, in help-overlay order.
    pub const CONFIGURABLE: [Action; 8] = [
        Action::Quit,
        Action::Resume,
        Action::Abort,
        Action::Pause,
        Action::Help,
        Action::Open,
        Action::Sound,
        Action::Logs,
    ];

    /// Returns a short description for the help overlay.
    pub fn description(&self) -> &'static str {
        match self {
            Action::Quit => "Quit (press twice)",
            Action::Resume => "Resume / cancel",
            Action::Abort => "Abort build (press twice)",
            Action::Pause => "Pause / resume polling",
            Action::Help => "Toggle help",
            Action::Open => "Open build in browser",
            Action::Sound => "Toggle sound",
            Action::Logs => "Show build logs",
            Action::Interrupt => "Exit immediately",
        }
    }
}

/// Error returned for an unrecognised key name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown key name: {0:?}")]
pub struct KeyParseError(pub String);

/// Parse a key name from configuration (e.g. "q", "esc", "f1").
pub fn parse_key(name: &str) -> Result<KeyCode, KeyParseError> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(c));
    }

    let lower = name.trim().to_ascii_lowercase();
    let code = match lower.as_str() {
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "delete" | "del" => KeyCode::Delete,
        f if f.starts_with('f') => match f[1..].parse::<u8>() {
            Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
            _ => return Err(KeyParseError(name.to_string())),
        },
        _ => return Err(KeyParseError(name.to_string())),
    };
    Ok(code)
}

/// Format a key code for display in the UI.
pub fn key_label(code: &KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        other => format!("{:?}", other),
    }
}

/// Mapping from logical actions to the keys that trigger them.
///
/// Built once at session start and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: Vec<(Action, Vec<KeyCode>)>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            bindings: vec![
                (Action::Quit, vec![KeyCode::Char('q')]),
                (Action::Resume, vec![KeyCode::Esc]),
                (Action::Abort, vec![KeyCode::Char('a')]),
                (Action::Pause, vec![KeyCode::Char('p')]),
                (Action::Help, vec![KeyCode::Char('h'), KeyCode::Char('?')]),
                (Action::Open, vec![KeyCode::Char('o')]),
                (Action::Sound, vec![KeyCode::Char('s')]),
                (Action::Logs, vec![KeyCode::Char('l')]),
            ],
        }
    }
}

impl KeyMap {
    /// Build a keymap from explicit bindings. Later bindings never override earlier ones.
    pub fn new(bindings: Vec<(Action, Vec<KeyCode>)>) -> Self {
        Self { bindings }
    }

    /// Build a keymap from configured key names.
    pub fn from_names<'a, I, S>(bindings: I) -> Result<Self, KeyParseError>
    where
        I: IntoIterator<Item = (Action, &'a [S])>,
        S: AsRef<str> + 'a,
    {
        let bindings = bindings
            .into_iter()
            .map(|(action, names)| {
                let keys = names
                    .iter()
                    .map(|n| parse_key(n.as_ref()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((action, keys))
            })
            .collect::<Result<Vec<_>, KeyParseError>>()?;
        Ok(Self { bindings })
    }

    /// Look up the action bound to a key.
    pub fn action_for(&self, code: &KeyCode) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(_, keys)| keys.contains(code))
            .map(|(action, _)| *action)
    }

    /// Keys bound to an action.
    pub fn keys_for(&self, action: Action) -> &[KeyCode] {
        self.bindings
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or(&[])
    }

    /// Display label of the first key bound to an action, e.g. "q".
    pub fn primary_label(&self, action: Action) -> String {
        self.keys_for(action).first().map(key_label).unwrap_or_else(|| "?".to_string())
    }
}

impl fmt::Display for KeyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (action, keys)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let labels: Vec<String> = keys.iter().map(key_label).collect();
            write!(f, "{:?}={}", action, labels.join("/"))?;
        }
        Ok(())
    }
}

/// Converts raw key events into actions.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    keymap: KeyMap,
}

impl InputDispatcher {
    pub fn new(keymap: KeyMap) -> Self {
        Self { keymap }
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    /// Map a key event to at most one action. Releases and unmapped keys are ignored.
    pub fn dispatch(&self, key: KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Interrupt);
        }
        self.keymap.action_for(&key.code)
    }
}

/// Source of terminal events for the render loop.
pub trait InputSource {
    /// Wait up to `timeout` for one event.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>>;
}

/// Reads events from the real terminal via crossterm.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        poll_event(timeout)
    }
}

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
