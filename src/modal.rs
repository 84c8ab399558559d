//! Overlay state and the transitions driven by operator actions.
//!
//! [`ModalState::transition`] is a pure function of the current state and
//! an [`Action`]; it returns the next state plus an [`Effect`] for the
//! session to carry out. Nothing here touches the terminal, the network or
//! the worker threads.
//!
//! Only one overlay is visible at a time, chosen by fixed precedence:
//!
//! ```text
//! TerminalTooSmall > Help > Paused > Confirm > Transient > None
//! ```
//!
//! Armed confirmations never time out. They stay armed until confirmed with
//! the same key or cancelled with Resume.

use std::time::{Duration, Instant};

use crate::events::Action;

/// Input wait while a blocking overlay is shown; the overlay is static until a key arrives.
pub const BLOCKING_WAIT: Duration = Duration::from_secs(60 * 60);

/// Destructive action awaiting a second press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Abort,
    Quit,
}

impl ConfirmKind {
    fn action(self) -> Action {
        match self {
            ConfirmKind::Abort => Action::Abort,
            ConfirmKind::Quit => Action::Quit,
        }
    }
}

/// The overlay drawn on top of (or instead of) the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    TerminalTooSmall,
    Help,
    Paused,
    Confirm(ConfirmKind),
    Transient(String),
}

/// A self-clearing notification banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transient {
    pub message: String,
    pub expires_at: Instant,
}

/// What the session should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Abort,
    Quit,
    OpenExternal,
    ShowLogs,
    ToggleSound,
    Interrupt,
}

/// Overlay flags owned by the render loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    help: bool,
    paused: bool,
    armed: Option<ConfirmKind>,
    transient: Option<Transient>,
}

impl ModalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_help_shown(&self) -> bool {
        self.help
    }

    /// The confirmation currently awaiting a second press.
    pub fn armed(&self) -> Option<ConfirmKind> {
        self.armed
    }

    pub fn transient(&self) -> Option<&Transient> {
        self.transient.as_ref()
    }

    /// Apply one action.
    pub fn transition(mut self, action: Action) -> (Self, Effect) {
        if action == Action::Interrupt {
            return (self, Effect::Interrupt);
        }
        if action == Action::Resume {
            self.help = false;
            self.paused = false;
            self.armed = None;
            return (self, Effect::None);
        }

        if let Some(kind) = self.armed {
            return match action {
                a if a == kind.action() => {
                    self.armed = None;
                    let effect = match kind {
                        ConfirmKind::Abort => Effect::Abort,
                        ConfirmKind::Quit => Effect::Quit,
                    };
                    (self, effect)
                }
                Action::Abort => {
                    self.armed = Some(ConfirmKind::Abort);
                    (self, Effect::None)
                }
                Action::Quit => {
                    self.armed = Some(ConfirmKind::Quit);
                    (self, Effect::None)
                }
                _ => (self, Effect::None),
            };
        }

        if self.paused {
            match action {
                Action::Pause => self.paused = false,
                Action::Help => self.help = !self.help,
                _ => {}
            }
            return (self, Effect::None);
        }

        let effect = match action {
            Action::Help => {
                self.help = !self.help;
                Effect::None
            }
            Action::Pause => {
                self.paused = !self.paused;
                Effect::None
            }
            Action::Abort => {
                self.help = false;
                self.armed = Some(ConfirmKind::Abort);
                Effect::None
            }
            Action::Quit => {
                self.help = false;
                self.armed = Some(ConfirmKind::Quit);
                Effect::None
            }
            Action::Open => Effect::OpenExternal,
            Action::Sound => Effect::ToggleSound,
            Action::Logs => Effect::ShowLogs,
            Action::Resume | Action::Interrupt => Effect::None,
        };
        (self, effect)
    }

    /// Show a banner until `now + ttl`.
    pub fn notify(&mut self, message: impl Into<String>, now: Instant, ttl: Duration) {
        self.transient = Some(Transient {
            message: message.into(),
            expires_at: now + ttl,
        });
    }

    /// Drop the banner once it has expired.
    pub fn expire(&mut self, now: Instant) {
        if self.transient.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.transient = None;
        }
    }

    /// The single overlay to draw, by precedence.
    pub fn visible(&self, now: Instant, terminal_too_small: bool) -> Overlay {
        if terminal_too_small {
            Overlay::TerminalTooSmall
        } else if self.help && self.armed.is_none() {
            Overlay::Help
        } else if self.paused {
            Overlay::Paused
        } else if let Some(kind) = self.armed {
            Overlay::Confirm(kind)
        } else if let Some(t) = self.transient.as_ref().filter(|t| now < t.expires_at) {
            Overlay::Transient(t.message.clone())
        } else {
            Overlay::None
        }
    }

    /// How long the render loop should wait for input this tick.
    pub fn input_timeout(&self, tick: Duration) -> Duration {
        if self.help || self.paused || self.armed.is_some() {
            BLOCKING_WAIT
        } else {
            tick
        }
    }
}
