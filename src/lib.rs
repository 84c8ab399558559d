//! # jobwatch
//!
//! A live terminal dashboard for one running build on a remote job server.
//!
//! The dashboard polls three independent topics (the build record, its
//! stage list and server liveness) on background threads, and redraws a
//! fixed-zone dashboard every tick. Operators can pause polling, abort the
//! build (with a two-press confirmation), open it in a browser, switch to
//! its log, and toggle sound notifications on status changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  worker threads (one per topic)          main thread         │
//! │  ┌──────────┐                       ┌─────────────────────┐  │
//! │  │  source  │ Fetch<T>              │ app::MonitorSession │  │
//! │  │ (fetch)  │──┐                    │   events ──▶ modal  │  │
//! │  └──────────┘  ▼                    │     │          │    │  │
//! │         ┌────────────┐  snapshot()  │     ▼          ▼    │  │
//! │  worker │    data    │─────────────▶│   ui (compose/draw) │  │
//! │         │ TopicStore │              │   sound             │  │
//! │         └────────────┘              └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: The [`Fetch`] and [`BuildActions`] collaborator traits, with
//!   a directory-backed implementation ([`BuildDirectory`]) and a channel feed
//! - **[`data`]**: Build records, status categories and the per-topic [`SharedDataStore`]
//! - **[`worker`]**: [`PollingWorker`] threads and their stop/pause [`Control`] flags
//! - **[`events`]**: Keymap and the [`InputDispatcher`] turning keys into [`Action`]s
//! - **[`modal`]**: The overlay state machine ([`ModalState`])
//! - **[`ui`]**: Frame composition and ratatui drawing
//! - **[`sound`]**: [`SoundNotifier`] for status transitions
//! - **[`config`]**: Settings file and environment loading
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a build exported to a directory
//! jobwatch ./build-state
//!
//! # With sound and a debug log
//! RUST_LOG=debug jobwatch ./build-state --sound --log-file jobwatch.log
//! ```
//!
//! ### As a library with your own fetchers
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use jobwatch::{
//!     BuildDirectory, BuildFeeds, BuildRecord, ChannelFeed, CommandPlayer, MonitorSession,
//!     ServerStatus, SessionConfig, StageRecord, TerminalInput, Theme,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = BuildDirectory::new("./build-state");
//! let (liveness, server) = ChannelFeed::<ServerStatus>::create("liveness");
//! liveness.send_replace(Some(ServerStatus { reachable: true, authenticated: true }));
//!
//! let feeds = BuildFeeds {
//!     build: Box::new(|| -> anyhow::Result<BuildRecord> { Ok(BuildRecord::default()) }),
//!     stages: Box::new(|| -> anyhow::Result<Vec<StageRecord>> { Ok(Vec::new()) }),
//!     server: Box::new(server),
//! };
//!
//! let mut session = MonitorSession::new(
//!     SessionConfig::default(),
//!     Theme::dark(),
//!     Box::new(dir),
//!     Arc::new(CommandPlayer::default()),
//! );
//! session.start(feeds)?;
//!
//! let mut terminal = ratatui::init();
//! let exit = session.run(&mut terminal, &mut TerminalInput);
//! ratatui::restore();
//! println!("{:?}", exit?);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod modal;
pub mod sound;
pub mod source;
pub mod ui;
pub mod worker;

// Re-export main types for convenience
pub use app::{Exit, MonitorSession, SessionError};
pub use config::{SessionConfig, Settings};
pub use data::{
    BuildRecord, BuildStatus, ServerStatus, SharedDataStore, Snapshot, StageRecord, Topic,
    TopicStore,
};
pub use events::{Action, InputDispatcher, InputSource, KeyMap, TerminalInput};
pub use modal::{ModalState, Overlay};
pub use sound::{CommandPlayer, Player, SoundNotifier};
pub use source::{BuildActions, BuildDirectory, BuildFeeds, ChannelFeed, Fetch, JsonFile};
pub use ui::{Theme, ThemeChoice};
pub use worker::{Control, PollingWorker};
