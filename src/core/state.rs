//! Process-wide flags for serve mode and the Ctrl+C handler.
//!
//! - serving: the initial generate finished; requests get real files
//! - rebuilding: the coordinator is between watcher pause and resume
//! - shutdown: Ctrl+C received; generate stops early, requests get 503

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam::channel::Sender;
use tiny_http::Server;

static SERVING: AtomicBool = AtomicBool::new(false);
static REBUILDING: AtomicBool = AtomicBool::new(false);
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// What Ctrl+C has to wake up once `serve` is running.
struct ShutdownTargets {
    server: Arc<Server>,
    session: Sender<()>,
}

static TARGETS: OnceLock<ShutdownTargets> = OnceLock::new();

pub fn is_serving() -> bool {
    SERVING.load(Ordering::SeqCst)
}

pub fn set_serving() {
    SERVING.store(true, Ordering::SeqCst);
}

pub fn is_rebuilding() -> bool {
    REBUILDING.load(Ordering::Acquire)
}

pub fn begin_rebuild() {
    REBUILDING.store(true, Ordering::Release);
}

pub fn end_rebuild() {
    REBUILDING.store(false, Ordering::Release);
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Install the Ctrl+C handler. Call once, first thing in `main`.
///
/// Before [`register_server`] Ctrl+C exits immediately. Afterwards it
/// unblocks the request loop and tells the serve session to run the exit
/// hooks, which close the watcher.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        match TARGETS.get() {
            Some(targets) => {
                crate::log!("serve"; "shutting down...");
                let _ = targets.session.send(());
                targets.server.unblock();
            }
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))
}

pub fn register_server(server: Arc<Server>, session: Sender<()>) {
    let _ = TARGETS.set(ShutdownTargets { server, session });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serving_is_sticky() {
        set_serving();
        assert!(is_serving());
        set_serving();
        assert!(is_serving());
    }
}
