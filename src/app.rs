//! The monitoring session: worker lifecycle and the render/input loop.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::Event;
use ratatui::backend::Backend;
use ratatui::Terminal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::data::{SharedDataStore, Snapshot};
use crate::events::{Action, InputDispatcher, InputSource};
use crate::modal::{Effect, ModalState};
use crate::sound::{Player, SoundNotifier};
use crate::source::{BuildActions, BuildFeeds};
use crate::ui::{self, Theme, View, NOTICE_MIN_HEIGHT, NOTICE_MIN_WIDTH};
use crate::worker::{Control, PollingWorker};

/// Input wait while the terminal is below minimum size.
pub const RESIZE_POLL: Duration = Duration::from_secs(1);

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Quit was confirmed.
    Quit,
    /// The operator asked for the build log; print it after the terminal is restored.
    ShowLogs,
    /// Quit while the terminal was too small, skipping confirmation.
    ImmediateQuit,
    /// Ctrl+C.
    Interrupted,
}

impl Exit {
    /// Process exit status for this outcome.
    pub fn code(&self) -> i32 {
        match self {
            Exit::Quit | Exit::ShowLogs => 0,
            Exit::ImmediateQuit => 1,
            Exit::Interrupted => 130,
        }
    }
}

/// Failures that end a session without a normal exit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(
        "terminal too small to render ({width}x{height}, need at least {}x{})",
        NOTICE_MIN_WIDTH,
        NOTICE_MIN_HEIGHT
    )]
    TerminalTooSmall { width: u16, height: u16 },
}

/// A live dashboard over one monitored build.
///
/// Create with [`MonitorSession::new`], hand the topic fetchers to
/// [`MonitorSession::start`], then drive it with [`MonitorSession::run`].
/// Workers are stopped and joined on [`MonitorSession::shutdown`] or drop.
pub struct MonitorSession {
    config: SessionConfig,
    store: SharedDataStore,
    control: Arc<Control>,
    workers: Vec<PollingWorker>,
    modal: ModalState,
    dispatcher: InputDispatcher,
    notifier: SoundNotifier,
    theme: Theme,
    actions: Box<dyn BuildActions>,
    busy: bool,
}

impl MonitorSession {
    pub fn new(
        config: SessionConfig,
        theme: Theme,
        actions: Box<dyn BuildActions>,
        player: Arc<dyn Player>,
    ) -> Self {
        let store = SharedDataStore::new(
            config.build_interval,
            config.stages_interval,
            config.server_interval,
        );
        let dispatcher = InputDispatcher::new(config.keymap.clone());
        let notifier = SoundNotifier::new(config.sound, config.sound_dir.clone(), player);
        Self {
            config,
            store,
            control: Arc::new(Control::new()),
            workers: Vec::new(),
            modal: ModalState::new(),
            dispatcher,
            notifier,
            theme,
            actions,
            busy: false,
        }
    }

    /// Spawn one polling worker per topic.
    pub fn start(&mut self, feeds: BuildFeeds) -> Result<()> {
        let BuildFeeds {
            build,
            stages,
            server,
        } = feeds;

        let spawned = [
            PollingWorker::spawn(self.store.build.clone(), build, self.control.clone()),
            PollingWorker::spawn(self.store.stages.clone(), stages, self.control.clone()),
            PollingWorker::spawn(self.store.server.clone(), server, self.control.clone()),
        ];
        for worker in spawned {
            self.workers.push(worker.context("spawning polling worker")?);
        }
        info!(workers = self.workers.len(), keymap = %self.config.keymap, "monitoring started");
        Ok(())
    }

    pub fn store(&self) -> &SharedDataStore {
        &self.store
    }

    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    pub fn workers(&self) -> &[PollingWorker] {
        &self.workers
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn sound_enabled(&self) -> bool {
        self.notifier.is_enabled()
    }

    /// The build collaborator, e.g. to show logs once the terminal is restored.
    pub fn actions_mut(&mut self) -> &mut dyn BuildActions {
        self.actions.as_mut()
    }

    /// Run the render/input loop until the session exits.
    pub fn run<B, I>(&mut self, terminal: &mut Terminal<B>, input: &mut I) -> Result<Exit>
    where
        B: Backend,
        I: InputSource,
    {
        loop {
            if let Some(exit) = self.tick(terminal, input)? {
                info!(?exit, "session ended");
                return Ok(exit);
            }
        }
    }

    /// One loop iteration: draw a frame, wait for at most one key and act on it.
    pub fn tick<B, I>(&mut self, terminal: &mut Terminal<B>, input: &mut I) -> Result<Option<Exit>>
    where
        B: Backend,
        I: InputSource,
    {
        let now = Instant::now();
        self.modal.expire(now);

        let snapshot = self.store.snapshot();
        if self.store.build.take_dirty() {
            if let Some(build) = &snapshot.build {
                // Playback runs detached
                let _ = self.notifier.observe(build.status);
            }
        }

        let size = terminal.size()?;
        if ui::is_unrenderable(size) {
            return Err(SessionError::TerminalTooSmall {
                width: size.width,
                height: size.height,
            }
            .into());
        }
        let too_small = ui::is_too_small(size, snapshot.visible_stages().is_some());
        self.draw(terminal, &snapshot, too_small, now)?;

        let timeout = if too_small {
            RESIZE_POLL
        } else {
            self.modal.input_timeout(self.config.tick)
        };
        let Some(Event::Key(key)) = input.next_event(timeout)? else {
            // Timeouts and resizes just redraw
            return Ok(None);
        };
        let Some(action) = self.dispatcher.dispatch(key) else {
            return Ok(None);
        };
        debug!(?action, too_small, "key");

        if too_small {
            return Ok(match action {
                Action::Quit | Action::Interrupt => Some(Exit::ImmediateQuit),
                _ => None,
            });
        }
        self.apply(action, terminal)
    }

    fn draw<B: Backend>(
        &self,
        terminal: &mut Terminal<B>,
        snapshot: &Snapshot,
        too_small: bool,
        now: Instant,
    ) -> Result<()> {
        let overlay = self.modal.visible(now, too_small);
        let view = View {
            snapshot,
            keymap: self.dispatcher.keymap(),
            theme: &self.theme,
            busy: self.busy,
            sound_enabled: self.notifier.is_enabled(),
            now,
        };
        let screen = ui::compose(&view, &overlay, terminal.size()?);
        terminal.draw(|frame| ui::draw(frame, &screen, &self.theme))?;
        Ok(())
    }

    /// Feed one action through the modal state machine and carry out its effect.
    fn apply<B: Backend>(&mut self, action: Action, terminal: &mut Terminal<B>) -> Result<Option<Exit>> {
        let (modal, effect) = std::mem::take(&mut self.modal).transition(action);
        self.modal = modal;
        self.control.set_paused(self.modal.is_paused());

        let message = match effect {
            Effect::None => return Ok(None),
            Effect::Quit => return Ok(Some(Exit::Quit)),
            Effect::ShowLogs => return Ok(Some(Exit::ShowLogs)),
            Effect::Interrupt => return Ok(Some(Exit::Interrupted)),
            Effect::ToggleSound => {
                let on = self.notifier.toggle();
                info!(on, "sound toggled");
                format!("Sound notification {}", if on { "ON" } else { "OFF" })
            }
            Effect::Abort => match self.with_busy(terminal, |actions| actions.abort())? {
                Ok(number) => format!("Aborted build #{}", number),
                Err(e) => {
                    warn!(error = %e, "abort failed");
                    format!("Failed to abort build: {:#}", e)
                }
            },
            Effect::OpenExternal => match self.with_busy(terminal, |actions| actions.open_external())? {
                Ok(()) => return Ok(None),
                Err(e) => {
                    warn!(error = %e, "open failed");
                    format!("Failed to open build: {:#}", e)
                }
            },
        };
        self.modal.notify(message, Instant::now(), self.config.transient_ttl);
        Ok(None)
    }

    /// Run a side effect with the busy indicator drawn first.
    ///
    /// The outer result is a drawing failure; the inner one is the side effect's.
    fn with_busy<B, T, F>(&mut self, terminal: &mut Terminal<B>, f: F) -> Result<Result<T>>
    where
        B: Backend,
        F: FnOnce(&mut dyn BuildActions) -> Result<T>,
    {
        self.busy = true;
        let snapshot = self.store.snapshot();
        let drawn = self.draw(terminal, &snapshot, false, Instant::now());
        let result = drawn.map(|()| f(self.actions.as_mut()));
        self.busy = false;
        result
    }

    /// Stop all workers and wait for them to exit.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.control.stop();
        for worker in &mut self.workers {
            worker.join();
            debug!(topic = %worker.topic(), "worker joined");
        }
        info!("workers stopped");
        self.workers.clear();
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for MonitorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorSession")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .field("modal", &self.modal)
            .field("notifier", &self.notifier)
            .field("busy", &self.busy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::thread;

    use anyhow::anyhow;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use parking_lot::Mutex;
    use ratatui::backend::TestBackend;

    use crate::data::{BuildRecord, BuildStatus, ServerStatus, StageRecord};
    use crate::modal::{ConfirmKind, Overlay, BLOCKING_WAIT};

    /// Replays a fixed list of events, then reports timeouts.
    #[derive(Default)]
    struct Script {
        events: VecDeque<Event>,
        timeouts: Vec<Duration>,
    }

    impl Script {
        fn keys(codes: &[KeyCode]) -> Self {
            Self {
                events: codes
                    .iter()
                    .map(|c| Event::Key(KeyEvent::new(*c, KeyModifiers::NONE)))
                    .collect(),
                timeouts: Vec::new(),
            }
        }

        fn push(&mut self, code: KeyCode) {
            self.events.push_back(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
        }
    }

    impl InputSource for Script {
        fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
            self.timeouts.push(timeout);
            Ok(self.events.pop_front())
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl BuildActions for Recorder {
        fn abort(&mut self) -> Result<u64> {
            self.calls.lock().push("abort");
            if self.fail {
                Err(anyhow!("server said no"))
            } else {
                Ok(7)
            }
        }

        fn open_external(&mut self) -> Result<()> {
            self.calls.lock().push("open");
            if self.fail {
                Err(anyhow!("no browser"))
            } else {
                Ok(())
            }
        }

        fn show_logs(&mut self) -> Result<()> {
            self.calls.lock().push("logs");
            Ok(())
        }
    }

    struct Silent;

    impl Player for Silent {
        fn play(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            build_interval: Duration::from_millis(20),
            stages_interval: Duration::from_millis(20),
            server_interval: Duration::from_millis(20),
            ..SessionConfig::default()
        }
    }

    fn session(recorder: &Recorder) -> MonitorSession {
        MonitorSession::new(config(), Theme::dark(), Box::new(recorder.clone()), Arc::new(Silent))
    }

    fn terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(width, height)).unwrap()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn drive(
        session: &mut MonitorSession,
        terminal: &mut Terminal<TestBackend>,
        script: &mut Script,
        ticks: usize,
    ) -> Option<Exit> {
        for _ in 0..ticks {
            if let Some(exit) = session.tick(terminal, script).unwrap() {
                return Some(exit);
            }
        }
        None
    }

    fn running_build() -> BuildRecord {
        BuildRecord {
            job_name: "nightly".to_string(),
            number: Some(7),
            status: BuildStatus::Running,
            ..Default::default()
        }
    }

    fn feeds() -> BuildFeeds {
        BuildFeeds {
            build: Box::new(|| -> Result<BuildRecord> { Ok(running_build()) }),
            stages: Box::new(|| -> Result<Vec<StageRecord>> {
                Ok(vec![StageRecord {
                    name: "compile".to_string(),
                    duration: "12s".to_string(),
                    status: BuildStatus::Success,
                }])
            }),
            server: Box::new(|| -> Result<ServerStatus> {
                Ok(ServerStatus {
                    reachable: true,
                    authenticated: true,
                })
            }),
        }
    }

    #[test]
    fn test_single_abort_press_only_arms() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(80, 24);
        let mut script = Script::keys(&[KeyCode::Char('a')]);

        assert_eq!(drive(&mut session, &mut terminal, &mut script, 2), None);
        assert!(recorder.calls.lock().is_empty());
        assert_eq!(session.modal().armed(), Some(ConfirmKind::Abort));
        assert!(screen_text(&terminal).contains("press a again to confirm"));
        assert_eq!(*script.timeouts.last().unwrap(), BLOCKING_WAIT);
    }

    #[test]
    fn test_double_abort_press_aborts_once() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(80, 24);
        let mut script = Script::keys(&[KeyCode::Char('a'), KeyCode::Char('a')]);

        drive(&mut session, &mut terminal, &mut script, 3);
        assert_eq!(*recorder.calls.lock(), vec!["abort"]);
        assert_eq!(session.modal().armed(), None);
        assert!(screen_text(&terminal).contains("Aborted build #7"));
    }

    #[test]
    fn test_resume_cancels_armed_abort() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(80, 24);
        let mut script = Script::keys(&[KeyCode::Char('a'), KeyCode::Esc, KeyCode::Char('a')]);

        drive(&mut session, &mut terminal, &mut script, 4);
        assert!(recorder.calls.lock().is_empty());
        assert_eq!(session.modal().armed(), Some(ConfirmKind::Abort));
    }

    #[test]
    fn test_failed_side_effects_become_banners() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut session = session(&recorder);
        let mut terminal = terminal(100, 24);
        let mut script = Script::keys(&[KeyCode::Char('a'), KeyCode::Char('a')]);

        drive(&mut session, &mut terminal, &mut script, 3);
        assert!(screen_text(&terminal).contains("Failed to abort build: server said no"));

        script.push(KeyCode::Char('o'));
        drive(&mut session, &mut terminal, &mut script, 2);
        assert!(screen_text(&terminal).contains("Failed to open build: no browser"));
        assert_eq!(*recorder.calls.lock(), vec!["abort", "open"]);
    }

    #[test]
    fn test_sound_toggle_shows_banner() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(80, 24);
        let mut script = Script::keys(&[KeyCode::Char('s')]);

        drive(&mut session, &mut terminal, &mut script, 2);
        assert!(session.sound_enabled());
        assert!(screen_text(&terminal).contains("Sound notification ON"));
        assert_eq!(
            session.modal().visible(Instant::now(), false),
            Overlay::Transient("Sound notification ON".to_string())
        );
    }

    #[test]
    fn test_exit_paths() {
        let recorder = Recorder::default();
        let mut terminal = terminal(80, 24);

        let mut script = Script::keys(&[KeyCode::Char('q'), KeyCode::Char('q')]);
        assert_eq!(drive(&mut session(&recorder), &mut terminal, &mut script, 3), Some(Exit::Quit));

        let mut script = Script::keys(&[KeyCode::Char('l')]);
        assert_eq!(drive(&mut session(&recorder), &mut terminal, &mut script, 1), Some(Exit::ShowLogs));

        let mut script = Script::default();
        script.events.push_back(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert_eq!(
            drive(&mut session(&recorder), &mut terminal, &mut script, 1),
            Some(Exit::Interrupted)
        );
        assert_eq!(Exit::Interrupted.code(), 130);
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn test_pause_reaches_workers() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(80, 24);
        let mut script = Script::keys(&[KeyCode::Char('p')]);

        drive(&mut session, &mut terminal, &mut script, 2);
        assert!(session.control().is_paused());
        assert!(screen_text(&terminal).contains("Polling is paused"));

        script.push(KeyCode::Esc);
        drive(&mut session, &mut terminal, &mut script, 1);
        assert!(!session.control().is_paused());
    }

    #[test]
    fn test_failing_topic_does_not_block_others() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let stage_fetches = Arc::new(Mutex::new(0u32));
        let counter = stage_fetches.clone();
        session
            .start(BuildFeeds {
                build: Box::new(|| -> Result<BuildRecord> { Err(anyhow!("connection refused")) }),
                stages: Box::new(move || -> Result<Vec<StageRecord>> {
                    *counter.lock() += 1;
                    Ok(vec![StageRecord {
                        name: "package".to_string(),
                        ..Default::default()
                    }])
                }),
                server: Box::new(|| -> Result<ServerStatus> {
                    Ok(ServerStatus {
                        reachable: false,
                        authenticated: false,
                    })
                }),
            })
            .unwrap();

        let mut terminal = terminal(80, 24);
        let mut script = Script::default();
        for _ in 0..10 {
            drive(&mut session, &mut terminal, &mut script, 1);
            thread::sleep(Duration::from_millis(30));
        }
        drive(&mut session, &mut terminal, &mut script, 1);

        assert!(*stage_fetches.lock() >= 5);
        assert_eq!(session.store().build.last_error().as_deref(), Some("connection refused"));
        let text = screen_text(&terminal);
        assert!(text.contains("package"));
        assert!(text.contains("UNREACHABLE"));
        assert!(text.contains("NO DATA"));
    }

    #[test]
    fn test_resize_recovers_without_restarting_workers() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        session.start(feeds()).unwrap();
        thread::sleep(Duration::from_millis(60));

        let mut terminal = terminal(40, 10);
        let mut script = Script::keys(&[KeyCode::Char('a')]);
        drive(&mut session, &mut terminal, &mut script, 1);

        let text = screen_text(&terminal);
        assert!(text.contains("Terminal too small"));
        assert!(!text.contains("nightly"));
        assert_eq!(script.timeouts, vec![RESIZE_POLL]);
        // Keys other than quit are ignored while too small
        assert_eq!(session.modal().armed(), None);

        terminal.backend_mut().resize(80, 24);
        let updated_before = session.store().stages.updated_at();
        thread::sleep(Duration::from_millis(60));
        drive(&mut session, &mut terminal, &mut script, 1);

        let text = screen_text(&terminal);
        assert!(text.contains("nightly"));
        assert!(text.contains("compile"));
        assert_eq!(session.workers().len(), 3);
        assert!(session.workers().iter().all(|w| !w.is_finished()));
        assert!(session.store().stages.updated_at() > updated_before);
    }

    #[test]
    fn test_quit_while_too_small_skips_confirmation() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(30, 8);
        let mut script = Script::keys(&[KeyCode::Char('q')]);

        assert_eq!(drive(&mut session, &mut terminal, &mut script, 1), Some(Exit::ImmediateQuit));
        assert_eq!(Exit::ImmediateQuit.code(), 1);
    }

    #[test]
    fn test_unrenderable_terminal_is_fatal() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        let mut terminal = terminal(20, 2);
        let mut script = Script::default();

        let err = session.tick(&mut terminal, &mut script).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::TerminalTooSmall {
                width: 20,
                height: 2
            })
        );
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        session.start(feeds()).unwrap();
        assert_eq!(session.workers().len(), 3);

        session.shutdown();
        assert!(session.control().is_stopped());
        assert!(session.workers().is_empty());
    }

    #[derive(Default)]
    struct Jukebox {
        played: Mutex<Vec<std::path::PathBuf>>,
    }

    impl Player for Jukebox {
        fn play(&self, path: &Path) -> Result<()> {
            self.played.lock().push(path.to_path_buf());
            Ok(())
        }
    }

    fn wait_for_plays(player: &Jukebox, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while player.played.lock().len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_sound_plays_on_fresh_build_data_only() {
        let dir = tempfile::TempDir::new().unwrap();
        for asset in ["success.wav", "failure.wav"] {
            std::fs::write(dir.path().join(asset), b"RIFF").unwrap();
        }
        let player = Arc::new(Jukebox::default());
        let config = SessionConfig {
            sound: true,
            sound_dir: dir.path().to_path_buf(),
            ..config()
        };
        let recorder = Recorder::default();
        let mut session =
            MonitorSession::new(config, Theme::dark(), Box::new(recorder), player.clone());
        let mut terminal = terminal(80, 24);
        let mut script = Script::default();

        let record = |status| BuildRecord {
            status,
            ..running_build()
        };
        session.store().build.set(record(BuildStatus::Success));
        drive(&mut session, &mut terminal, &mut script, 2);
        assert!(!session.store().build.take_dirty());
        wait_for_plays(&player, 1);

        session.store().build.set(record(BuildStatus::Failure));
        drive(&mut session, &mut terminal, &mut script, 1);
        wait_for_plays(&player, 2);
        thread::sleep(Duration::from_millis(50));

        let played = player.played.lock();
        assert_eq!(played.len(), 2);
        assert!(played[0].ends_with("success.wav"));
        assert!(played[1].ends_with("failure.wav"));
    }

    #[test]
    fn test_actions_are_reachable_after_exit() {
        let recorder = Recorder::default();
        let mut session = session(&recorder);
        session.actions_mut().show_logs().unwrap();
        assert_eq!(*recorder.calls.lock(), vec!["logs"]);
    }
}
