//! Background polling workers.
//!
//! One OS thread per topic repeatedly calls its [`Fetch`] and writes the
//! result into the topic's [`TopicStore`]. Workers share a [`Control`] with
//! the render loop; stop and pause are plain flags checked between sleep
//! increments, so shutdown latency is bounded by [`SLEEP_INCREMENT`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::data::{Topic, TopicStore};
use crate::source::Fetch;

/// Longest uninterrupted sleep of a worker.
pub const SLEEP_INCREMENT: Duration = Duration::from_millis(100);

/// Flags written by the render loop and read by every worker.
#[derive(Debug, Default)]
pub struct Control {
    stop: AtomicBool,
    paused: AtomicBool,
}

impl Control {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all workers to finish after their current increment.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Suspend or resume fetching. Paused workers keep their cadence but skip the fetch.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

/// Handle to a running polling thread.
#[derive(Debug)]
pub struct PollingWorker {
    topic: Topic,
    handle: Option<JoinHandle<()>>,
}

impl PollingWorker {
    /// Spawn a worker polling `fetch` into `store` at the store's interval.
    pub fn spawn<T>(
        store: Arc<TopicStore<T>>,
        mut fetch: Box<dyn Fetch<T>>,
        control: Arc<Control>,
    ) -> io::Result<Self>
    where
        T: Send + Sync + 'static,
    {
        let topic = store.topic();
        let handle = thread::Builder::new()
            .name(format!("poll-{}", topic))
            .spawn(move || run(&store, fetch.as_mut(), &control))?;

        Ok(Self {
            topic,
            handle: Some(handle),
        })
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the thread to exit. Only returns promptly once [`Control::stop`] was called.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(topic = %self.topic, "polling worker panicked");
            }
        }
    }
}

/// Worker loop: fetch, store, sleep, until stopped.
pub fn run<T>(store: &TopicStore<T>, fetch: &mut dyn Fetch<T>, control: &Control) {
    let topic = store.topic();
    info!(%topic, source = fetch.description(), interval = ?store.interval(), "polling started");

    while !control.is_stopped() {
        if !control.is_paused() {
            match fetch.fetch() {
                Ok(value) => {
                    debug!(%topic, "fetched");
                    store.set(value);
                }
                Err(e) => {
                    warn!(%topic, error = %e, "fetch failed");
                    store.set_error(format!("{:#}", e));
                }
            }
        }
        sleep_interval(store.interval(), control);
    }

    info!(%topic, "polling stopped");
}

/// Sleep for `interval` in increments, returning early once stop is requested.
fn sleep_interval(interval: Duration, control: &Control) {
    let deadline = Instant::now() + interval;
    loop {
        if control.is_stopped() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(SLEEP_INCREMENT.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    fn recording_fetch(calls: Arc<Mutex<Vec<Instant>>>) -> Box<dyn Fetch<u32>> {
        Box::new(move || -> anyhow::Result<u32> {
            let mut calls = calls.lock();
            calls.push(Instant::now());
            Ok(calls.len() as u32)
        })
    }

    #[test]
    fn test_worker_respects_interval_bounds() {
        let interval = Duration::from_millis(200);
        let store = Arc::new(TopicStore::new(Topic::Build, interval));
        let control = Arc::new(Control::new());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut worker =
            PollingWorker::spawn(store.clone(), recording_fetch(calls.clone()), control.clone())
                .unwrap();
        thread::sleep(Duration::from_millis(1_100));
        control.stop();
        worker.join();

        let calls = calls.lock();
        assert!(calls.len() >= 3, "too few fetches: {}", calls.len());
        for pair in calls.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= interval, "fetched again after {:?}", gap);
            assert!(gap < interval + SLEEP_INCREMENT * 3, "gap too long: {:?}", gap);
        }
        assert_eq!(*store.get_snapshot().unwrap() as usize, calls.len());
    }

    #[test]
    fn test_stop_latency_is_bounded_by_increment() {
        let store = Arc::new(TopicStore::new(Topic::Server, Duration::from_secs(60)));
        let control = Arc::new(Control::new());
        let fetch: Box<dyn Fetch<u32>> = Box::new(|| -> anyhow::Result<u32> { Ok(1) });

        let mut worker = PollingWorker::spawn(store.clone(), fetch, control.clone()).unwrap();
        thread::sleep(Duration::from_millis(50));

        let stop_requested = Instant::now();
        control.stop();
        worker.join();
        assert!(stop_requested.elapsed() < SLEEP_INCREMENT * 3);
        assert!(worker.is_finished());
        assert!(store.get_snapshot().is_some());
    }

    #[test]
    fn test_failed_fetch_keeps_previous_value() {
        let store = TopicStore::new(Topic::Stages, Duration::from_millis(10));
        store.set(5u32);
        let control = Control::new();

        let mut attempts = 0;
        let mut fetch = || -> anyhow::Result<u32> {
            attempts += 1;
            if attempts >= 3 {
                control.stop();
            }
            Err(anyhow!("server unreachable"))
        };
        run(&store, &mut fetch, &control);

        assert_eq!(*store.get_snapshot().unwrap(), 5);
        assert_eq!(store.last_error().as_deref(), Some("server unreachable"));
    }

    #[test]
    fn test_paused_worker_skips_fetch() {
        let store = Arc::new(TopicStore::new(Topic::Build, Duration::from_millis(20)));
        let control = Arc::new(Control::new());
        control.set_paused(true);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut worker =
            PollingWorker::spawn(store.clone(), recording_fetch(calls.clone()), control.clone())
                .unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(calls.lock().is_empty());

        control.set_paused(false);
        thread::sleep(Duration::from_millis(150));
        control.stop();
        worker.join();
        assert!(!calls.lock().is_empty());
    }
}
