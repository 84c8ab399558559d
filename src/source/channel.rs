//! Channel-based fetcher.
//!
//! Receives values via a tokio watch channel. This is useful when the
//! records are produced by an async client elsewhere in the process and
//! pushed rather than pulled.

use anyhow::{bail, Result};
use tokio::sync::watch;

use super::Fetch;

/// A fetcher that returns the latest value published on a channel.
///
/// # Example
///
/// ```
/// use jobwatch::{ChannelFeed, Fetch, ServerStatus};
///
/// let (tx, mut feed) = ChannelFeed::create("server-status");
/// tx.send_replace(Some(ServerStatus { reachable: true, authenticated: true }));
/// assert!(feed.fetch().unwrap().reachable);
/// ```
#[derive(Debug)]
pub struct ChannelFeed<T> {
    receiver: watch::Receiver<Option<T>>,
    description: String,
}

impl<T> ChannelFeed<T> {
    /// Create a new channel feed.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of a watch channel
    /// * `source_description` - A description of where values come from
    pub fn new(receiver: watch::Receiver<Option<T>>, source_description: &str) -> Self {
        let description = format!("channel: {}", source_description);
        Self {
            receiver,
            description,
        }
    }

    /// Create a channel pair for publishing values to a ChannelFeed.
    ///
    /// Returns (sender, feed); nothing is available until the first publish.
    pub fn create(source_description: &str) -> (watch::Sender<Option<T>>, Self) {
        let (tx, rx) = watch::channel(None);
        let feed = Self::new(rx, source_description);
        (tx, feed)
    }
}

impl<T> Fetch<T> for ChannelFeed<T>
where
    T: Clone + Send + Sync,
{
    fn fetch(&mut self) -> Result<T> {
        match self.receiver.borrow_and_update().as_ref() {
            Some(value) => Ok(value.clone()),
            None => bail!("nothing published on {} yet", self.description),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
