//! Directory-backed build source.
//!
//! An external exporter keeps a directory up to date with the state of one
//! build:
//!
//! ```text
//! <dir>/build.json     BuildRecord
//! <dir>/stages.json    [StageRecord]
//! <dir>/server.json    ServerStatus
//! <dir>/console.log    full build log
//! ```
//!
//! Abort requests are handed back to the exporter by writing the build
//! number to `<dir>/abort.request`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use super::{BuildActions, BuildFeeds, Fetch, JsonFile};
use crate::data::{BuildRecord, ServerStatus, StageRecord};

const BUILD_FILE: &str = "build.json";
const STAGES_FILE: &str = "stages.json";
const SERVER_FILE: &str = "server.json";
const CONSOLE_FILE: &str = "console.log";
const ABORT_FILE: &str = "abort.request";

/// A build exported to a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct BuildDirectory {
    root: PathBuf,
}

impl BuildDirectory {
    /// Create a source for the given directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the directory being monitored.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetchers for the build, stage and server documents.
    pub fn feeds(&self) -> BuildFeeds {
        BuildFeeds {
            build: Box::new(JsonFile::<BuildRecord>::new(self.root.join(BUILD_FILE))),
            stages: Box::new(JsonFile::<Vec<StageRecord>>::new(self.root.join(STAGES_FILE))),
            server: Box::new(JsonFile::<ServerStatus>::new(self.root.join(SERVER_FILE))),
        }
    }

    fn current_build(&self) -> Result<BuildRecord> {
        JsonFile::<BuildRecord>::new(self.root.join(BUILD_FILE)).fetch()
    }
}

impl BuildActions for BuildDirectory {
    fn abort(&mut self) -> Result<u64> {
        let build = self.current_build()?;
        let number = build.number.ok_or_else(|| anyhow!("build has no number yet"))?;
        if build.status.is_finished() {
            bail!("build #{} already finished ({})", number, build.status);
        }

        let path = self.root.join(ABORT_FILE);
        fs::write(&path, format!("{}\n", number))
            .with_context(|| format!("writing {}", path.display()))?;
        info!(number, path = %path.display(), "abort requested");
        Ok(number)
    }

    fn open_external(&mut self) -> Result<()> {
        let build = self.current_build()?;
        let url = build.url.filter(|u| !u.is_empty()).ok_or_else(|| anyhow!("build has no URL"))?;

        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Command::new(opener)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launching {}", opener))?;
        info!(%url, "opened build in browser");
        Ok(())
    }

    fn show_logs(&mut self) -> Result<()> {
        let path = self.root.join(CONSOLE_FILE);
        let log = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(&log)?;
        stdout.flush()?;
        Ok(())
    }
}
