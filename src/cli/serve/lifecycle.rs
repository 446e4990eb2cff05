//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::Receiver;
use tiny_http::Server;
use tokio::runtime::{self, Handle, Runtime};

use crate::core::{is_shutdown, set_serving};
use crate::log;
use crate::site::Site;
use crate::utils::plural_count;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// How long shutdown waits for the session thread and runtime tasks.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Runtime hosting the watcher bridge and the rebuild coordinator.
pub fn runtime() -> Result<Runtime> {
    runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("mdxr-watch")
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}

/// Run the initial generate, start watching, then wait for Ctrl+C and
/// give plugins their exit hook.
pub fn spawn_session(site: Arc<Site>, runtime: Handle, shutdown: Receiver<()>) -> JoinHandle<()> {
    thread::spawn(move || {
        let _guard = runtime.enter();

        match site.generate(None) {
            Ok(report) if !report.is_success() => {
                log!("serve"; "{} failed, serving the rest", plural_count(report.failed.len(), "document"));
            }
            Ok(_) => {}
            Err(e) => log!("serve"; "initial generate failed: {:#}", e),
        }

        if !is_shutdown() {
            site.after_generate();
            set_serving();
            let _ = shutdown.recv();
        }
        site.exit();
    })
}

/// Wait for the session thread to finish its exit hooks (bounded).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    let deadline = SHUTDOWN_GRACE * 4;
    let step = Duration::from_millis(50);
    let mut waited = Duration::ZERO;

    while waited < deadline {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(step);
        waited += step;
    }
    log!("serve"; "exit hooks did not finish in time");
}
