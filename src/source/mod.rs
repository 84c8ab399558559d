//! Collaborator abstraction for fetching build data and acting on the build.
//!
//! The dashboard never talks to the job server itself. It is handed one
//! [`Fetch`] implementation per topic and a [`BuildActions`] implementation
//! for the side effects (abort, open, logs).

mod build_dir;
mod channel;
mod file;

pub use build_dir::BuildDirectory;
pub use channel::ChannelFeed;
pub use file::JsonFile;

use anyhow::Result;

use crate::data::{BuildRecord, ServerStatus, StageRecord};

/// Trait for fetching the latest value of one topic.
///
/// Implementations may block (e.g. on network I/O); they are always called
/// from a dedicated worker thread.
///
/// # Example
///
/// ```
/// use jobwatch::{Fetch, ServerStatus};
///
/// let mut fetch = || -> anyhow::Result<ServerStatus> {
///     Ok(ServerStatus { reachable: true, authenticated: true })
/// };
/// assert!(fetch.fetch().unwrap().reachable);
/// ```
pub trait Fetch<T>: Send {
    /// Fetch a complete, fresh value.
    fn fetch(&mut self) -> Result<T>;

    /// Returns a human-readable description of where the value comes from.
    fn description(&self) -> &str {
        "callback"
    }
}

impl<T, F> Fetch<T> for F
where
    F: FnMut() -> Result<T> + Send,
{
    fn fetch(&mut self) -> Result<T> {
        self()
    }
}

/// Side effects the operator can trigger from the dashboard.
pub trait BuildActions: Send {
    /// Abort the monitored build, returning its build number.
    fn abort(&mut self) -> Result<u64>;

    /// Open the monitored build in an external viewer.
    fn open_external(&mut self) -> Result<()>;

    /// Show the full build log. Called after the dashboard has released the terminal.
    fn show_logs(&mut self) -> Result<()>;
}

/// The fetchers for each topic of a monitored build.
pub struct BuildFeeds {
    pub build: Box<dyn Fetch<BuildRecord>>,
    pub stages: Box<dyn Fetch<Vec<StageRecord>>>,
    pub server: Box<dyn Fetch<ServerStatus>>,
}

impl std::fmt::Debug for BuildFeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildFeeds")
            .field("build", &self.build.description())
            .field("stages", &self.stages.description())
            .field("server", &self.server.description())
            .finish()
    }
}
