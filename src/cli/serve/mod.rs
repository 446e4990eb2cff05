//! Development server: initial generate, static file serving and the
//! component watcher.
//!
//! The HTTP server binds first so requests made during the initial generate
//! get a loading page instead of a refused connection.

mod lifecycle;
mod path;
mod response;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel;
use tiny_http::{Request, Server};

use crate::cli::build::load_site;
use crate::config::SiteConfig;
use crate::core::{self, ExecutionMode};
use crate::log;

/// Request handler threads.
const REQUEST_THREADS: usize = 4;

pub fn serve_site(config: &SiteConfig) -> Result<()> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    core::register_server(Arc::clone(&server), shutdown_tx);
    log!("serve"; "http://{}", addr);

    let runtime = lifecycle::runtime()?;
    let site = Arc::new(load_site(config, ExecutionMode::Server));
    if config.build.clean {
        site.clean()?;
    }
    site.init();

    let session = lifecycle::spawn_session(Arc::clone(&site), runtime.handle().clone(), shutdown_rx);
    run_request_loop(&server, &config.build.output)?;
    lifecycle::wait_for_shutdown(session);

    runtime.shutdown_timeout(lifecycle::SHUTDOWN_GRACE);
    Ok(())
}

fn run_request_loop(server: &Server, root: &Path) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let root = root.to_path_buf();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &root) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

fn handle_request(request: Request, root: &Path) -> Result<()> {
    if core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if !core::is_serving() {
        return response::respond_loading(request);
    }

    match path::resolve_path(request.url(), root) {
        Some(file) => response::respond_file(request, &file),
        // A full rebuild cleans the output first; the page is coming back
        None if core::is_rebuilding() => response::respond_loading(request),
        None => response::respond_not_found(request, &not_found_page(root)),
    }
}

fn not_found_page(root: &Path) -> PathBuf {
    root.join("404.html")
}
