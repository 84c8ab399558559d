//! Audible notification on build status transitions.
//!
//! Playback happens on a short-lived thread so the render loop never waits
//! on audio. Failures are logged and otherwise ignored.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::data::BuildStatus;

/// Sound asset played when the build enters `status`, if any.
pub fn sound_asset(status: BuildStatus) -> Option<&'static str> {
    match status {
        BuildStatus::Success => Some("success.wav"),
        BuildStatus::Failure => Some("failure.wav"),
        BuildStatus::Aborted => Some("aborted.wav"),
        BuildStatus::Unstable => Some("unstable.wav"),
        BuildStatus::PausedForInput => Some("input.wav"),
        BuildStatus::Running
        | BuildStatus::Queued
        | BuildStatus::NotFound
        | BuildStatus::NotRun
        | BuildStatus::Unknown => None,
    }
}

/// Something that can play an audio file to completion.
pub trait Player: Send + Sync {
    fn play(&self, path: &Path) -> Result<()>;
}

/// Plays audio through the first available system command-line player.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    candidates: Vec<&'static str>,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        let candidates = if cfg!(target_os = "macos") {
            vec!["afplay"]
        } else {
            vec!["paplay", "aplay", "pw-play"]
        };
        Self { candidates }
    }
}

impl Player for CommandPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        for program in &self.candidates {
            let status = Command::new(program)
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(s) if s.success() => return Ok(()),
                Ok(s) => bail!("{} exited with {}", program, s),
                Err(e) => debug!(program, error = %e, "audio player unavailable"),
            }
        }
        bail!("no audio player found (tried {})", self.candidates.join(", "))
    }
}

/// Plays a sound once per build status change.
pub struct SoundNotifier {
    enabled: bool,
    sound_dir: PathBuf,
    last_notified: Option<BuildStatus>,
    player: Arc<dyn Player>,
}

impl SoundNotifier {
    /// Create a notifier playing assets from `sound_dir`.
    pub fn new(enabled: bool, sound_dir: PathBuf, player: Arc<dyn Player>) -> Self {
        Self {
            enabled,
            sound_dir,
            last_notified: None,
            player,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip sound on or off, returning the new setting.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    #[cfg(test)]
    fn last_notified(&self) -> Option<BuildStatus> {
        self.last_notified
    }

    /// Observe the current status, starting playback if it is a new, audible status.
    ///
    /// Returns the playback thread when one was started.
    pub fn observe(&mut self, status: BuildStatus) -> Option<JoinHandle<()>> {
        if !self.enabled || self.last_notified == Some(status) {
            return None;
        }
        let asset = sound_asset(status)?;
        self.last_notified = Some(status);

        let path = self.sound_dir.join(asset);
        let player = self.player.clone();
        let spawned = thread::Builder::new().name("sound".to_string()).spawn(move || {
            if !path.is_file() {
                debug!(path = %path.display(), "sound asset missing");
                return;
            }
            if let Err(e) = player.play(&path) {
                warn!(path = %path.display(), error = %e, "sound playback failed");
            }
        });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "could not start sound thread");
                None
            }
        }
    }
}

impl fmt::Debug for SoundNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundNotifier")
            .field("enabled", &self.enabled)
            .field("sound_dir", &self.sound_dir)
            .field("last_notified", &self.last_notified)
            .finish()
    }
}
