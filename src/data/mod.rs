//! Data models for the monitored build and the per-topic store that holds them.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "1s", "500ms")
//! - [`status`]: The closed set of build/stage status categories
//! - [`store`]: Lock-guarded per-topic holders ([`TopicStore`], [`SharedDataStore`])
//!
//! ## Data Flow
//!
//! ```text
//! Fetch<T> (worker thread)
//!        │ set() / set_error()
//!        ▼
//! TopicStore<T>  ──┐
//! TopicStore<T>  ──┼──▶ SharedDataStore::snapshot() ──▶ render loop
//! TopicStore<T>  ──┘
//! ```

pub mod duration;
pub mod status;
pub mod store;

use serde::{Deserialize, Serialize};

pub use status::BuildStatus;
pub use store::{SharedDataStore, Snapshot, Topic, TopicStore};

/// The primary status record of the monitored build.
///
/// Timing fields are pre-formatted text as delivered by the server side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRecord {
    /// Display name of the job.
    pub job_name: String,
    /// Parent folder path of the job on the server.
    pub folder_path: String,
    /// Host or executor running the build.
    pub executor: String,
    /// Build number, if the build has been assigned one.
    pub number: Option<u64>,
    /// Browser URL of the build.
    pub url: Option<String>,
    pub started: String,
    pub ended: String,
    pub elapsed: String,
    pub estimated: String,
    pub status: BuildStatus,
}

/// One stage (sub-item) of the monitored build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageRecord {
    pub name: String,
    /// Formatted duration text.
    pub duration: String,
    pub status: BuildStatus,
}

/// Liveness of the job server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerStatus {
    pub reachable: bool,
    pub authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_record_defaults_missing_fields() {
        let record: BuildRecord =
            serde_json::from_str(r#"{"job_name": "deploy", "status": "IN_PROGRESS"}"#).unwrap();
        assert_eq!(record.job_name, "deploy");
        assert_eq!(record.status, BuildStatus::Running);
        assert!(record.number.is_none());
        assert!(record.folder_path.is_empty());
    }

    #[test]
    fn test_stage_list_parses() {
        let stages: Vec<StageRecord> = serde_json::from_str(
            r#"[
                {"name": "Checkout", "duration": "2s", "status": "SUCCESS"},
                {"name": "Test", "duration": "1m 4s", "status": "FAILED"}
            ]"#,
        )
        .unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[1].status, BuildStatus::Failure);
    }
}
