//! Settings loading.
//!
//! Settings come from an optional TOML file and `JOBWATCH_*` environment
//! variables, in that order of precedence (environment wins):
//!
//! ```toml
//! tick = "100ms"
//! sound = true
//! sound_dir = "/usr/share/jobwatch/sounds"
//! theme = "dark"
//!
//! [intervals]
//! build = "1s"
//! stages = "2s"
//! server = "5s"
//!
//! [keys]
//! quit = ["q", "f10"]
//! help = ["h", "?"]
//! ```
//!
//! Nested keys use `__` in the environment, e.g. `JOBWATCH_INTERVALS__BUILD=500ms`.
//! Key lists accept comma-separated values: `JOBWATCH_KEYS__QUIT=q,f10`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::data::duration::parse_duration;
use crate::events::{key_label, Action, KeyMap};
use crate::ui::ThemeChoice;

/// Settings file read from the working directory when no path is given.
pub const DEFAULT_FILE: &str = "jobwatch.toml";

const ENV_PREFIX: &str = "JOBWATCH";

/// Raw settings as written in the file or environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fast refresh tick of the render loop.
    pub tick: String,
    pub intervals: Intervals,
    /// Lifetime of transient banners.
    pub transient_ttl: String,
    /// Whether sound notifications start enabled.
    pub sound: bool,
    pub sound_dir: PathBuf,
    pub theme: ThemeChoice,
    /// Tracing output file. Nothing is logged without one.
    pub log_file: Option<PathBuf>,
    pub keys: Keys,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick: "100ms".to_string(),
            intervals: Intervals::default(),
            transient_ttl: "3s".to_string(),
            sound: false,
            sound_dir: PathBuf::from("sounds"),
            theme: ThemeChoice::Auto,
            log_file: None,
            keys: Keys::default(),
        }
    }
}

/// Per-topic fetch intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub build: String,
    pub stages: String,
    pub server: String,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            build: "1s".to_string(),
            stages: "2s".to_string(),
            server: "5s".to_string(),
        }
    }
}

/// Key names bound to each action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keys {
    pub quit: Vec<String>,
    pub resume: Vec<String>,
    pub abort: Vec<String>,
    pub pause: Vec<String>,
    pub help: Vec<String>,
    pub open: Vec<String>,
    pub sound: Vec<String>,
    pub logs: Vec<String>,
}

impl Default for Keys {
    fn default() -> Self {
        let keys = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            quit: keys(&["q"]),
            resume: keys(&["esc"]),
            abort: keys(&["a"]),
            pause: keys(&["p"]),
            help: keys(&["h", "?"]),
            open: keys(&["o"]),
            sound: keys(&["s"]),
            logs: keys(&["l"]),
        }
    }
}

impl Keys {
    fn for_action(&self, action: Action) -> &[String] {
        match action {
            Action::Quit => &self.quit,
            Action::Resume => &self.resume,
            Action::Abort => &self.abort,
            Action::Pause => &self.pause,
            Action::Help => &self.help,
            Action::Open => &self.open,
            Action::Sound => &self.sound,
            Action::Logs => &self.logs,
            Action::Interrupt => &[],
        }
    }

    /// Build the keymap, rejecting unknown names, unbound actions and keys bound to two actions.
    pub fn keymap(&self) -> Result<KeyMap> {
        let keymap = KeyMap::from_names(
            Action::CONFIGURABLE
                .iter()
                .map(|action| (*action, self.for_action(*action))),
        )?;

        let mut seen = HashSet::new();
        for action in Action::CONFIGURABLE {
            if keymap.keys_for(action).is_empty() {
                bail!("no key bound to {}", format!("{:?}", action).to_lowercase());
            }
            for key in keymap.keys_for(action) {
                if !seen.insert(*key) {
                    bail!("key {} is bound to more than one action", key_label(key));
                }
            }
        }
        Ok(keymap)
    }
}

fn environment() -> Environment {
    let mut env = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .try_parsing(true);
    for key in ["quit", "resume", "abort", "pause", "help", "open", "sound", "logs"] {
        env = env.with_list_parse_key(&format!("keys.{}", key));
    }
    env
}

impl Settings {
    /// Load settings from `path` (or [`DEFAULT_FILE`] if present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::new(DEFAULT_FILE, FileFormat::Toml).required(false),
        };
        let config = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("loading settings")?;
        config.try_deserialize().context("invalid settings")
    }

    /// Validate and convert into the values the session runs with.
    pub fn resolve(&self) -> Result<SessionConfig> {
        let positive = |name: &str, value: &str| -> Result<Duration> {
            let duration = parse_duration(value).with_context(|| format!("invalid {}", name))?;
            if duration.is_zero() {
                bail!("{} must be greater than zero", name);
            }
            Ok(duration)
        };

        let sound_dir = std::path::absolute(&self.sound_dir)
            .with_context(|| format!("resolving sound_dir {}", self.sound_dir.display()))?;

        Ok(SessionConfig {
            tick: positive("tick", &self.tick)?,
            build_interval: positive("intervals.build", &self.intervals.build)?,
            stages_interval: positive("intervals.stages", &self.intervals.stages)?,
            server_interval: positive("intervals.server", &self.intervals.server)?,
            transient_ttl: parse_duration(&self.transient_ttl).context("invalid transient_ttl")?,
            sound: self.sound,
            sound_dir,
            theme: self.theme,
            keymap: self.keys.keymap().context("invalid keys")?,
        })
    }
}

/// Validated session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub tick: Duration,
    pub build_interval: Duration,
    pub stages_interval: Duration,
    pub server_interval: Duration,
    pub transient_ttl: Duration,
    pub sound: bool,
    pub sound_dir: PathBuf,
    pub theme: ThemeChoice,
    pub keymap: KeyMap,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            build_interval: Duration::from_secs(1),
            stages_interval: Duration::from_secs(2),
            server_interval: Duration::from_secs(5),
            transient_ttl: Duration::from_secs(3),
            sound: false,
            sound_dir: PathBuf::from("sounds"),
            theme: ThemeChoice::Auto,
            keymap: KeyMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    use crossterm::event::KeyCode;
    use tempfile::TempDir;

    fn no_env() -> Environment {
        environment().source(Some(HashMap::new()))
    }

    #[test]
    fn test_defaults_resolve() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(Settings::load_with(Some(&missing), no_env()).is_err());

        let resolved = Settings::default().resolve().unwrap();
        assert_eq!(resolved.tick, Duration::from_millis(100));
        assert_eq!(resolved.server_interval, Duration::from_secs(5));
        assert_eq!(resolved.keymap, KeyMap::default());
        assert!(resolved.sound_dir.is_absolute());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobwatch.toml");
        fs::write(
            &path,
            r#"
tick = "250ms"
sound = true
theme = "light"

[intervals]
build = "500ms"

[keys]
quit = ["x", "f10"]
"#,
        )
        .unwrap();

        let settings = Settings::load_with(Some(&path), no_env()).unwrap();
        assert_eq!(settings.intervals.stages, "2s");
        let resolved = settings.resolve().unwrap();
        assert_eq!(resolved.tick, Duration::from_millis(250));
        assert_eq!(resolved.build_interval, Duration::from_millis(500));
        assert!(resolved.sound);
        assert_eq!(resolved.theme, ThemeChoice::Light);
        assert_eq!(resolved.keymap.keys_for(Action::Quit), &[KeyCode::Char('x'), KeyCode::F(10)]);
        assert_eq!(resolved.keymap.keys_for(Action::Abort), &[KeyCode::Char('a')]);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobwatch.toml");
        fs::write(&path, "[intervals]\nserver = \"10s\"\n").unwrap();

        let env = environment().source(Some(HashMap::from([
            ("JOBWATCH_INTERVALS__SERVER".to_string(), "30s".to_string()),
            ("JOBWATCH_KEYS__HELP".to_string(), "f1,?".to_string()),
        ])));
        let resolved = Settings::load_with(Some(&path), env).unwrap().resolve().unwrap();
        assert_eq!(resolved.server_interval, Duration::from_secs(30));
        assert_eq!(resolved.keymap.keys_for(Action::Help), &[KeyCode::F(1), KeyCode::Char('?')]);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut settings = Settings::default();
        settings.intervals.stages = "0s".to_string();
        let err = settings.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("intervals.stages must be greater than zero"));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut settings = Settings::default();
        settings.keys.open = vec!["a".to_string()];
        let err = settings.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("bound to more than one action"));
    }

    #[test]
    fn test_empty_binding_rejected() {
        let mut settings = Settings::default();
        settings.keys.quit = Vec::new();
        let err = settings.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("no key bound to quit"));

        let mut settings = Settings::default();
        settings.keys.resume = Vec::new();
        let err = settings.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("no key bound to resume"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut settings = Settings::default();
        settings.keys.logs = vec!["hyper-l".to_string()];
        assert!(settings.resolve().is_err());
    }
}
