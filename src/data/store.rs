//! Per-topic storage shared between polling workers and the render loop.
//!
//! Each topic has its own lock; there is no lock spanning topics. A render
//! frame may therefore combine values fetched at slightly different times.
//! Within a topic a write always replaces the whole value, so readers never
//! observe a partially updated record.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::{BuildRecord, ServerStatus, StageRecord};

/// Names of the independently refreshed topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The primary build status record.
    Build,
    /// The stage (sub-item) list.
    Stages,
    /// Server liveness.
    Server,
}

impl Topic {
    /// Returns the display label for this topic.
    pub fn label(&self) -> &'static str {
        match self {
            Topic::Build => "build",
            Topic::Stages => "stages",
            Topic::Server => "server",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<Arc<T>>,
    last_error: Option<String>,
    updated_at: Option<Instant>,
    dirty: bool,
}

/// Latest successfully fetched value of one topic.
#[derive(Debug)]
pub struct TopicStore<T> {
    topic: Topic,
    interval: Duration,
    slot: RwLock<Slot<T>>,
}

impl<T> TopicStore<T> {
    /// Create an empty store refreshed every `interval`.
    pub fn new(topic: Topic, interval: Duration) -> Self {
        Self {
            topic,
            interval,
            slot: RwLock::new(Slot {
                value: None,
                last_error: None,
                updated_at: None,
                dirty: false,
            }),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace the stored value and clear any recorded fetch error.
    pub fn set(&self, value: T) {
        let value = Arc::new(value);
        let mut slot = self.slot.write();
        slot.value = Some(value);
        slot.last_error = None;
        slot.updated_at = Some(Instant::now());
        slot.dirty = true;
    }

    /// Record a failed fetch. The previous value is kept.
    pub fn set_error(&self, error: String) {
        self.slot.write().last_error = Some(error);
    }

    /// The latest value, or `None` if no fetch has succeeded yet.
    pub fn get_snapshot(&self) -> Option<Arc<T>> {
        self.slot.read().value.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.slot.read().last_error.clone()
    }

    /// When the value was last replaced.
    pub fn updated_at(&self) -> Option<Instant> {
        self.slot.read().updated_at
    }

    /// Returns whether the value changed since the previous call, clearing the marker.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.slot.write().dirty)
    }
}

/// The three topic stores of a monitored build.
#[derive(Debug, Clone)]
pub struct SharedDataStore {
    pub build: Arc<TopicStore<BuildRecord>>,
    pub stages: Arc<TopicStore<Vec<StageRecord>>>,
    pub server: Arc<TopicStore<ServerStatus>>,
}

impl SharedDataStore {
    /// Create empty stores with the given fetch intervals.
    pub fn new(build: Duration, stages: Duration, server: Duration) -> Self {
        Self {
            build: Arc::new(TopicStore::new(Topic::Build, build)),
            stages: Arc::new(TopicStore::new(Topic::Stages, stages)),
            server: Arc::new(TopicStore::new(Topic::Server, server)),
        }
    }

    /// Read every topic once. Each read takes only that topic's lock.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            build: self.build.get_snapshot(),
            stages: self.stages.get_snapshot(),
            server: self.server.get_snapshot(),
            build_updated: self.build.updated_at(),
            build_error: self.build.last_error(),
        }
    }
}

/// Values of all topics as seen by one render frame.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub build: Option<Arc<BuildRecord>>,
    pub stages: Option<Arc<Vec<StageRecord>>>,
    pub server: Option<Arc<ServerStatus>>,
    pub build_updated: Option<Instant>,
    pub build_error: Option<String>,
}

impl Snapshot {
    /// Stages to lay out, or `None` when the stage list has nothing to show.
    pub fn visible_stages(&self) -> Option<&[StageRecord]> {
        self.stages.as_deref().map(Vec::as_slice).filter(|s| !s.is_empty())
    }
}
