//! Rebuild Coordinator: turns component changes into the cheapest rebuild
//! that covers them.
//!
//! ```text
//!          changed(paths)
//!   Idle ─────────────────▶ Rebuilding
//!    ▲                        │ pause watcher
//!    │                        │ drop compiled units + entries + listing
//!    │                        │ reload index, compute affected documents
//!    │                        │ Targeted? ─fail─▶ Full (clean + regenerate)
//!    │                        │ rebundle affected
//!    └────── resume watcher ◀─┘
//! ```

mod host;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

pub use host::{Host, HostError};

use crate::deps::PathSet;
use crate::hydrate::DocumentId;
use crate::logger::{status_error, status_success};
use crate::plugin::Session;
use crate::utils::path::normalize_path;
use crate::utils::plural_count;
use crate::watch::{WatchControl, WatchEvents};
use crate::{core, debug, log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Rebuilding,
}

/// What a rebuild ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Regenerated this many affected documents individually.
    Targeted(usize),
    /// Cleaned and regenerated everything.
    Full,
    /// Every strategy failed; output may be stale until the next change.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
    Targeted,
    Full,
}

#[derive(Debug, Clone, Copy)]
pub struct RebuildOptions {
    /// Allow per-document regeneration.
    pub targeted: bool,
    /// Bound for each blocking host or bundler call.
    pub timeout: Duration,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            targeted: true,
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct RebuildCoordinator<H: Host, W: WatchControl> {
    state: State,
    watcher: W,
    rebuilder: Rebuilder<H>,
}

/// The steps between pause and resume; holds no watcher.
struct Rebuilder<H: Host> {
    host: Arc<H>,
    session: Arc<Session>,
    options: RebuildOptions,
}

impl<H: Host, W: WatchControl> RebuildCoordinator<H, W> {
    pub fn new(host: Arc<H>, watcher: W, session: Arc<Session>, options: RebuildOptions) -> Self {
        Self {
            state: State::Idle,
            watcher,
            rebuilder: Rebuilder {
                host,
                session,
                options,
            },
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Consume change batches until `stop` fires or the watcher closes,
    /// then close the watcher.
    pub async fn run(mut self, mut events: WatchEvents, mut stop: oneshot::Receiver<()>) {
        debug!("rebuild"; "coordinator started");
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                batch = events.next_batch() => match batch {
                    Some(changes) => {
                        for change in &changes {
                            debug!("watch"; "{}", change);
                        }
                        let paths: Vec<PathBuf> = changes.into_iter().map(|c| c.path).collect();
                        self.on_change(&paths).await;
                    }
                    None => break,
                },
            }
        }
        self.watcher.close();
        debug!("rebuild"; "coordinator stopped");
    }

    /// Handle one batch of changed paths. The watcher is resumed on every path.
    pub async fn on_change(&mut self, changed: &[PathBuf]) -> Outcome {
        self.state = State::Rebuilding;
        self.watcher.pause();
        core::begin_rebuild();

        let outcome = self.rebuilder.rebuild(changed).await;

        if let Err(e) = self.watcher.resume() {
            log!("watch"; "failed to resume watcher: {}", e);
        }
        core::end_rebuild();
        self.state = State::Idle;

        match outcome {
            Outcome::Targeted(n) => status_success(&format!("rebuilt {}", plural_count(n, "document"))),
            Outcome::Full => status_success("rebuilt site"),
            Outcome::Failed => status_error("rebuild failed", "see the log above"),
        }
        outcome
    }
}

impl<H: Host> Rebuilder<H> {
    async fn rebuild(&self, changed: &[PathBuf]) -> Outcome {
        self.session.invalidate_compiled();
        self.session.hydrator().clear_entries();
        self.host.invalidate_listing();

        let affected = self.affected(changed);
        debug!("rebuild"; "{} affected", plural_count(affected.len(), "document"));

        for strategy in self.plan(&affected) {
            match self.attempt(strategy, &affected).await {
                Ok(outcome) => {
                    if !affected.is_empty() {
                        self.rebundle(&affected).await;
                    }
                    return outcome;
                }
                Err(HostError::Unsupported) => {
                    debug!("rebuild"; "targeted regenerate unsupported, falling back");
                }
                Err(e) => log!("rebuild"; "{:?} rebuild failed: {}", strategy, e),
            }
        }
        Outcome::Failed
    }

    /// Documents importing any changed path, from the freshest on-disk index.
    fn affected(&self, changed: &[PathBuf]) -> Vec<PathBuf> {
        let recorder = self.session.recorder();
        recorder.reload();

        let mut affected: Vec<PathBuf> = changed
            .iter()
            .flat_map(|path| recorder.affected_by(&normalize_path(path)))
            .collect::<PathSet>()
            .into_iter()
            .collect();
        affected.sort();
        affected
    }

    fn plan(&self, affected: &[PathBuf]) -> Vec<Strategy> {
        if affected.is_empty() || !self.options.targeted {
            vec![Strategy::Full]
        } else {
            vec![Strategy::Targeted, Strategy::Full]
        }
    }

    async fn attempt(&self, strategy: Strategy, affected: &[PathBuf]) -> Result<Outcome, HostError> {
        match strategy {
            Strategy::Targeted => {
                if !self.host.supports_targeted_regenerate() {
                    return Err(HostError::Unsupported);
                }
                for document in affected {
                    let document = document.clone();
                    self.blocking(move |host| host.regenerate(Some(&document)))
                        .await?;
                }
                Ok(Outcome::Targeted(affected.len()))
            }
            Strategy::Full => {
                self.blocking(|host| host.clean()).await?;
                self.blocking(|host| host.regenerate(None)).await?;
                Ok(Outcome::Full)
            }
        }
    }

    async fn rebundle(&self, affected: &[PathBuf]) {
        let docs: Vec<DocumentId> = affected.iter().map(|p| DocumentId::from_path(p)).collect();
        let hydrator = Arc::clone(self.session.hydrator());
        let task = tokio::task::spawn_blocking(move || hydrator.rebundle(&docs));

        match tokio::time::timeout(self.options.timeout, task).await {
            Ok(Ok(n)) => debug!("rebuild"; "rebundled {}", plural_count(n, "document")),
            Ok(Err(e)) => log!("rebuild"; "rebundle task failed: {}", e),
            Err(_) => log!("rebuild"; "rebundle timed out"),
        }
    }

    /// Run a blocking host call off the runtime, bounded by the timeout.
    ///
    /// A timed-out call keeps running on its thread; it is still treated as
    /// a failure so the next strategy can proceed.
    async fn blocking<F>(&self, call: F) -> Result<(), HostError>
    where
        F: FnOnce(&H) -> Result<(), HostError> + Send + 'static,
    {
        let host = Arc::clone(&self.host);
        let task = tokio::task::spawn_blocking(move || call(&host));

        match tokio::time::timeout(self.options.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(HostError::failed(e)),
            Err(_) => Err(HostError::TimedOut(self.options.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionMode;
    use crate::hydrate::ComponentRef;
    use crate::hydrate::builder::tests::FakeBundler;
    use crate::plugin::session::tests::session;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Regenerate(Option<PathBuf>),
        Clean,
        InvalidateListing,
    }

    #[derive(Default)]
    struct MockHost {
        targeted: bool,
        fail_targeted: bool,
        fail_full: bool,
        slow: Option<Duration>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockHost {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    impl Host for MockHost {
        fn supports_targeted_regenerate(&self) -> bool {
            self.targeted
        }

        fn regenerate(&self, document: Option<&Path>) -> Result<(), HostError> {
            self.calls.lock().push(Call::Regenerate(document.map(Path::to_path_buf)));
            if let Some(delay) = self.slow {
                std::thread::sleep(delay);
            }
            match document {
                Some(_) if self.fail_targeted => Err(HostError::Failed("render error".into())),
                None if self.fail_full => Err(HostError::Failed("disk full".into())),
                _ => Ok(()),
            }
        }

        fn clean(&self) -> Result<(), HostError> {
            self.calls.lock().push(Call::Clean);
            Ok(())
        }

        fn invalidate_listing(&self) {
            self.calls.lock().push(Call::InvalidateListing);
        }
    }

    #[derive(Default)]
    struct MockWatcher {
        active: Arc<AtomicBool>,
        pauses: Arc<AtomicUsize>,
        resumes: Arc<AtomicUsize>,
    }

    impl WatchControl for MockWatcher {
        fn pause(&mut self) {
            self.active.store(false, Ordering::SeqCst);
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }

        fn resume(&mut self) -> notify::Result<()> {
            self.active.store(true, Ordering::SeqCst);
            self.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) {
            self.active.store(false, Ordering::SeqCst);
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        dir: TempDir,
        session: Arc<Session>,
        bundler: Arc<FakeBundler>,
        button: PathBuf,
        post: PathBuf,
    }

    /// `post.mdx` imports `components/Button.jsx`, recorded on disk.
    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let bundler = Arc::new(FakeBundler::default());
        let session = Arc::new(session(dir.path(), bundler.clone(), ExecutionMode::Server));
        let button = normalize_path(&dir.path().join("source/components/Button.jsx"));
        let post = normalize_path(&dir.path().join("source/post.mdx"));

        let doc = DocumentId::from_path(&post);
        session.hydrator().hydrate(
            &doc,
            &[ComponentRef {
                id: doc.placeholder(0),
                specifier: "./components/Button.jsx".into(),
                resolved: Some(button.clone()),
            }],
            "",
        );
        session
            .recorder()
            .record(&post, &crate::deps::path_set([button.clone()]));

        Fixture {
            dir,
            session,
            bundler,
            button,
            post,
        }
    }

    fn coordinator(
        f: &Fixture,
        host: MockHost,
        options: RebuildOptions,
    ) -> (RebuildCoordinator<MockHost, MockWatcher>, Arc<MockHost>, MockWatcher) {
        let host = Arc::new(host);
        let watcher = MockWatcher::default();
        let probe = MockWatcher {
            active: Arc::clone(&watcher.active),
            pauses: Arc::clone(&watcher.pauses),
            resumes: Arc::clone(&watcher.resumes),
        };
        let coordinator =
            RebuildCoordinator::new(Arc::clone(&host), watcher, Arc::clone(&f.session), options);
        (coordinator, host, probe)
    }

    #[tokio::test]
    async fn untracked_change_falls_through_to_full() {
        let f = fixture();
        let host = MockHost {
            targeted: true,
            ..Default::default()
        };
        let (mut c, host, watcher) = coordinator(&f, host, RebuildOptions::default());

        let outcome = c.on_change(&[f.dir.path().join("source/components/New.jsx")]).await;
        assert_eq!(outcome, Outcome::Full);
        assert_eq!(
            host.calls(),
            [Call::InvalidateListing, Call::Clean, Call::Regenerate(None)]
        );
        // No affected set: no targeted rebundle
        assert_eq!(f.bundler.calls.load(Ordering::SeqCst), 1);
        assert!(watcher.is_active());
        assert_eq!(c.state(), State::Idle);
    }

    #[tokio::test]
    async fn tracked_change_regenerates_only_affected() {
        let f = fixture();
        let host = MockHost {
            targeted: true,
            ..Default::default()
        };
        let (mut c, host, watcher) = coordinator(&f, host, RebuildOptions::default());

        let outcome = c.on_change(&[f.button.clone()]).await;
        assert_eq!(outcome, Outcome::Targeted(1));
        assert_eq!(
            host.calls(),
            [Call::InvalidateListing, Call::Regenerate(Some(f.post.clone()))]
        );
        assert_eq!(f.bundler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(watcher.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.resumes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn directory_change_matches_contained_components() {
        let f = fixture();
        let host = MockHost {
            targeted: true,
            ..Default::default()
        };
        let (mut c, _host, _) = coordinator(&f, host, RebuildOptions::default());

        let outcome = c.on_change(&[f.dir.path().join("source/components")]).await;
        assert_eq!(outcome, Outcome::Targeted(1));
    }

    #[tokio::test]
    async fn unsupported_targeted_falls_back_and_still_rebundles() {
        let f = fixture();
        let (mut c, host, _) = coordinator(&f, MockHost::default(), RebuildOptions::default());

        let outcome = c.on_change(&[f.button.clone()]).await;
        assert_eq!(outcome, Outcome::Full);
        assert_eq!(
            host.calls(),
            [Call::InvalidateListing, Call::Clean, Call::Regenerate(None)]
        );
        assert_eq!(f.bundler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn targeted_disabled_by_option() {
        let f = fixture();
        let host = MockHost {
            targeted: true,
            ..Default::default()
        };
        let options = RebuildOptions {
            targeted: false,
            ..Default::default()
        };
        let (mut c, _host, _) = coordinator(&f, host, options);
        assert_eq!(c.on_change(&[f.button.clone()]).await, Outcome::Full);
    }

    #[tokio::test]
    async fn targeted_failure_falls_back_to_full() {
        let f = fixture();
        let host = MockHost {
            targeted: true,
            fail_targeted: true,
            ..Default::default()
        };
        let (mut c, host, _) = coordinator(&f, host, RebuildOptions::default());

        assert_eq!(c.on_change(&[f.button.clone()]).await, Outcome::Full);
        assert!(host.calls().contains(&Call::Clean));
    }

    #[tokio::test]
    async fn full_failure_still_resumes_watcher() {
        let f = fixture();
        let host = MockHost {
            fail_full: true,
            ..Default::default()
        };
        let (mut c, _host, watcher) = coordinator(&f, host, RebuildOptions::default());

        assert_eq!(c.on_change(&[f.button.clone()]).await, Outcome::Failed);
        assert!(watcher.is_active());
        assert_eq!(c.state(), State::Idle);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let f = fixture();
        let host = MockHost {
            targeted: true,
            slow: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let options = RebuildOptions {
            targeted: true,
            timeout: Duration::from_millis(50),
        };
        let (mut c, _host, watcher) = coordinator(&f, host, options);

        assert_eq!(c.on_change(&[f.button.clone()]).await, Outcome::Failed);
        assert!(watcher.is_active());
    }

    #[tokio::test]
    async fn rebuild_drops_caches_and_entries() {
        let f = fixture();
        f.session.compile(&f.post, "# cached").unwrap();
        assert!(f.session.hydrator().settings().entry_dir.exists());
        let (mut c, _host, _) = coordinator(&f, MockHost::default(), RebuildOptions::default());

        c.on_change(&[f.dir.path().join("unrelated.txt")]).await;
        assert_eq!(f.session.compiled_len(), 0);
        assert!(!f.session.hydrator().settings().entry_dir.exists());
    }

    #[tokio::test]
    async fn index_reloaded_from_disk() {
        let f = fixture();
        let other = normalize_path(&f.dir.path().join("source/other.mdx"));
        // Another process recorded `other.mdx` since this one last wrote
        let mut index = f.session.recorder().snapshot();
        index.record(&other, [&f.button]);
        crate::deps::DependencyStore::new(f.dir.path().join("public/deps.json"), None)
            .try_save(&index)
            .unwrap();

        let host = MockHost {
            targeted: true,
            ..Default::default()
        };
        let (mut c, _host, _) = coordinator(&f, host, RebuildOptions::default());
        assert_eq!(c.on_change(&[f.button.clone()]).await, Outcome::Targeted(2));
    }

    #[tokio::test]
    async fn run_stops_on_signal_and_closes_watcher() {
        let f = fixture();
        let watch_root = f.dir.path().join("source/components");
        std::fs::create_dir_all(&watch_root).unwrap();
        let (watcher, events) = crate::watch::ComponentWatcher::start(&watch_root).unwrap();
        let host = Arc::new(MockHost::default());
        let c = RebuildCoordinator::new(host, watcher, Arc::clone(&f.session), RebuildOptions::default());

        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(c.run(events, rx));
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
