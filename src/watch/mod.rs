//! File Watcher for the components directory.
//!
//! ```text
//! notify callback ──std mpsc──▶ bridge thread ──tokio mpsc──▶ WatchEvents (debounce) ──▶ coordinator
//! ```
//!
//! Pausing closes the underlying notify watcher; resuming recreates it.
//! Events that still arrive while paused are dropped in the callback.

mod debouncer;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use debouncer::Debouncer;
pub use types::{Change, ChangeKind};

type NotifySender = std_mpsc::Sender<notify::Result<notify::Event>>;

/// Pause/resume/close contract the rebuild coordinator drives.
pub trait WatchControl: Send {
    /// Stop delivering events until [`resume`](Self::resume).
    fn pause(&mut self);
    fn resume(&mut self) -> notify::Result<()>;
    /// Stop for good, releasing the OS handle.
    fn close(&mut self);
    fn is_active(&self) -> bool;
}

/// Recursive notify watcher on one directory tree.
pub struct ComponentWatcher {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    tx: Option<NotifySender>,
    paused: Arc<AtomicBool>,
}

impl ComponentWatcher {
    /// Start watching `root` and return the event stream.
    pub fn start(root: &Path) -> notify::Result<(Self, WatchEvents)> {
        let (notify_tx, notify_rx) = std_mpsc::channel();
        let (async_tx, async_rx) = mpsc::channel::<notify::Event>(64);

        // Bridge: notify does not speak async
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        let mut watcher = Self {
            root: root.to_path_buf(),
            watcher: None,
            tx: Some(notify_tx),
            paused: Arc::new(AtomicBool::new(false)),
        };
        watcher.open()?;

        Ok((
            watcher,
            WatchEvents {
                rx: async_rx,
                debouncer: Debouncer::new(),
            },
        ))
    }

    fn open(&mut self) -> notify::Result<()> {
        let Some(tx) = self.tx.clone() else {
            return Err(notify::Error::generic("watcher is closed"));
        };
        let paused = Arc::clone(&self.paused);
        let mut watcher = notify::recommended_watcher(move |res| {
            if !paused.load(Ordering::SeqCst) {
                let _ = tx.send(res);
            }
        })?;

        if self.root.exists() {
            watcher.watch(&self.root, RecursiveMode::Recursive)?;
            crate::debug!("watch"; "watching {}", self.root.display());
        } else {
            crate::log!("watch"; "{} does not exist, nothing to watch", self.root.display());
        }
        self.watcher = Some(watcher);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl WatchControl for ComponentWatcher {
    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
        self.watcher = None;
    }

    fn resume(&mut self) -> notify::Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        self.open()
    }

    fn close(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
        self.watcher = None;
        // Dropping the last sender ends the bridge thread and the event stream
        self.tx = None;
    }

    fn is_active(&self) -> bool {
        self.watcher.is_some() && !self.paused.load(Ordering::SeqCst)
    }
}

/// Debounced change stream.
pub struct WatchEvents {
    rx: mpsc::Receiver<notify::Event>,
    debouncer: Debouncer,
}

impl WatchEvents {
    /// Wait for the next debounced batch. `None` once the watcher is closed.
    pub async fn next_batch(&mut self) -> Option<Vec<Change>> {
        loop {
            tokio::select! {
                biased;
                event = self.rx.recv() => match event {
                    Some(event) => self.debouncer.add_event(&event),
                    None => return None,
                },
                _ = tokio::time::sleep(self.debouncer.sleep_duration()) => {
                    if let Some(batch) = self.debouncer.take_if_ready() {
                        return Some(batch);
                    }
                }
            }
        }
    }
}
