//! The MDX plugin: renderer registration and lifecycle hooks.
//!
//! - `after_init` restores the dependency index (output copy, else root mirror)
//! - `after_generate` starts the watcher and rebuild coordinator, once, in serve mode
//! - `on_exit` stops the coordinator and closes the watcher

mod renderer;
pub(crate) mod session;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

pub use renderer::MdxRenderer;
pub use session::Session;

use crate::config::SiteConfig;
use crate::core::ExecutionMode;
use crate::rebuild::{RebuildCoordinator, RebuildOptions};
use crate::site::{RendererOptions, Site, SitePlugin};
use crate::watch::ComponentWatcher;
use crate::{debug, log};

/// How long `on_exit` waits for the coordinator to finish a rebuild.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// A running coordinator task.
pub(crate) struct WatchHandle {
    stop: oneshot::Sender<()>,
    done: channel::Receiver<()>,
}

pub struct MdxPlugin {
    session: Arc<Session>,
    components: PathBuf,
    rebuild: RebuildOptions,
    watch: bool,
}

impl MdxPlugin {
    pub fn new(config: &SiteConfig, mode: ExecutionMode) -> Self {
        Self::with_session(Arc::new(Session::from_config(config, mode)), config)
    }

    pub fn with_session(session: Arc<Session>, config: &SiteConfig) -> Self {
        Self {
            session,
            components: config.build.components.clone(),
            rebuild: RebuildOptions {
                targeted: config.serve.targeted,
                timeout: config.serve.timeout(),
            },
            watch: config.serve.watch,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn is_watching(&self) -> bool {
        self.session.watch.lock().is_some()
    }

    fn start_watching(&self, site: &Arc<Site>, runtime: &Handle) {
        let mut slot = self.session.watch.lock();
        if slot.is_some() {
            return;
        }

        let (watcher, events) = match ComponentWatcher::start(&self.components) {
            Ok(started) => started,
            Err(e) => {
                log!("watch"; "failed to watch {}: {}", self.components.display(), e);
                return;
            }
        };

        let coordinator = RebuildCoordinator::new(
            Arc::clone(site),
            watcher,
            Arc::clone(&self.session),
            self.rebuild,
        );
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = channel::bounded(1);
        runtime.spawn(async move {
            coordinator.run(events, stop_rx).await;
            let _ = done_tx.send(());
        });

        log!("watch"; "watching {}", self.components.display());
        *slot = Some(WatchHandle {
            stop: stop_tx,
            done: done_rx,
        });
    }
}

impl SitePlugin for MdxPlugin {
    fn name(&self) -> &'static str {
        "mdx"
    }

    fn install(&self, site: &mut Site) {
        site.register_renderer(
            "mdx",
            "html",
            Arc::new(MdxRenderer::new(Arc::clone(&self.session))),
            RendererOptions { layout: true },
        );
    }

    fn after_init(&self, _site: &Site) {
        let recorder = self.session.recorder();
        recorder.reload();
        debug!("deps"; "restored {} component(s)", recorder.len());
    }

    fn after_generate(&self, site: &Arc<Site>) {
        if !self.session.mode().is_server() || !self.watch {
            return;
        }
        match Handle::try_current() {
            Ok(runtime) => self.start_watching(site, &runtime),
            Err(_) => log!("watch"; "no async runtime, component watching disabled"),
        }
    }

    fn on_exit(&self) {
        let Some(handle) = self.session.watch.lock().take() else {
            return;
        };
        let _ = handle.stop.send(());
        if handle.done.recv_timeout(STOP_GRACE).is_err() {
            log!("watch"; "coordinator did not stop in time");
        }
    }
}
