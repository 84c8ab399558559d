//! Build and stage status categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status category of a build or stage.
///
/// Server strings are mapped leniently; anything unrecognised becomes
/// [`BuildStatus::Unknown`] rather than failing deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Running,
    Success,
    Failure,
    Queued,
    Aborted,
    Unstable,
    PausedForInput,
    NotFound,
    NotRun,
    #[default]
    Unknown,
}

impl BuildStatus {
    /// Parse a server status string, case-insensitively.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "RUNNING" | "IN_PROGRESS" | "BUILDING" => BuildStatus::Running,
            "SUCCESS" | "SUCCEEDED" => BuildStatus::Success,
            "FAILURE" | "FAILED" => BuildStatus::Failure,
            "QUEUED" => BuildStatus::Queued,
            "ABORTED" => BuildStatus::Aborted,
            "UNSTABLE" => BuildStatus::Unstable,
            "PAUSED_PENDING_INPUT" | "PAUSED" => BuildStatus::PausedForInput,
            "NOT_FOUND" => BuildStatus::NotFound,
            "NOT_BUILT" | "NOT_EXECUTED" | "NOT_RUN" | "SKIPPED" => BuildStatus::NotRun,
            _ => BuildStatus::Unknown,
        }
    }

    /// Returns the display label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            BuildStatus::Running => "RUNNING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::Queued => "QUEUED",
            BuildStatus::Aborted => "ABORTED",
            BuildStatus::Unstable => "UNSTABLE",
            BuildStatus::PausedForInput => "PAUSED_PENDING_INPUT",
            BuildStatus::NotFound => "NOT_FOUND",
            BuildStatus::NotRun => "NOT_RUN",
            BuildStatus::Unknown => "UNKNOWN",
        }
    }

    /// True once the build can no longer change status.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BuildStatus::Success
                | BuildStatus::Failure
                | BuildStatus::Aborted
                | BuildStatus::Unstable
                | BuildStatus::NotRun
        )
    }
}

impl From<String> for BuildStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.label().to_string()
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
