//! Terminal output: colored module prefixes, the serve-mode rebuild status
//! block and the generate progress line.
//!
//! ```ignore
//! log!("deps"; "restored {} component(s)", n);
//! debug!("watch"; "watching {}", root.display());
//!
//! let progress = ProgressLine::new("mdx", documents.len());
//! progress.inc();
//! progress.finish();
//! ```
//!
//! While a progress line is on screen, `log!` prints above it and redraws it.

use std::io::{StdoutLock, Write, stdout};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Progress lines currently pinned to the bottom of the terminal.
static PINNED: AtomicUsize = AtomicUsize::new(0);

/// Set from `--verbose`.
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let mut out = stdout().lock();
    let pinned = PINNED.load(Ordering::SeqCst);
    if pinned > 0 {
        erase_above(&mut out, pinned);
    } else {
        execute!(out, Clear(ClearType::UntilNewLine)).ok();
    }

    writeln!(out, "{} {message}", prefix(module)).ok();
    // Leave room for the progress line to redraw itself
    for _ in 0..pinned {
        writeln!(out).ok();
    }
    out.flush().ok();
}

fn prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" => tag.bright_blue().bold().to_string(),
        "watch" | "rebuild" => tag.bright_green().bold().to_string(),
        "hydrate" | "deps" => tag.bright_cyan().bold().to_string(),
        "error" => tag.bright_red().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

/// Move up `lines` and clear everything below.
fn erase_above(out: &mut StdoutLock<'_>, lines: usize) {
    let lines = u16::try_from(lines).unwrap_or(u16::MAX);
    execute!(out, cursor::MoveUp(lines), Clear(ClearType::FromCursorDown)).ok();
}

fn erase_line(out: &mut StdoutLock<'_>) {
    execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
}

// ============================================================================
// Rebuild status
// ============================================================================

/// Serve-mode status block. Each report replaces the previous one, so a
/// long session shows only the latest rebuild result.
pub struct WatchStatus {
    /// Lines printed by the last report.
    shown: usize,
}

static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self { shown: 0 }
    }

    pub fn success(&mut self, message: &str) {
        self.show(&format!("{} {message}", "✓".green()));
    }

    /// `detail` goes on the following lines, e.g. the failing document.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let mut text = format!("{} {summary}", "✗".red());
        if !detail.is_empty() {
            text.push('\n');
            text.push_str(detail);
        }
        self.show(&text);
    }

    fn show(&mut self, text: &str) {
        let mut out = stdout().lock();
        if self.shown > 0 {
            erase_above(&mut out, self.shown);
        }
        let stamp = format!("[{}]", clock(unix_now()));
        writeln!(out, "{} {text}", stamp.dimmed()).ok();
        out.flush().ok();
        self.shown = text.lines().count().max(1);
    }
}

pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// `HH:MM:SS` (UTC) of a unix timestamp.
fn clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

// ============================================================================
// Progress line
// ============================================================================

/// In-place counter: `[generate] mdx(42/69)`.
///
/// Safe to bump from rayon workers; a redraw is skipped when another
/// thread is already drawing.
pub struct ProgressLine {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
    drawing: Mutex<()>,
}

impl ProgressLine {
    pub fn new(label: &'static str, total: usize) -> Self {
        PINNED.store(1, Ordering::SeqCst);
        let progress = Self {
            label,
            total,
            done: AtomicUsize::new(0),
            drawing: Mutex::new(()),
        };
        progress.draw(false);
        progress
    }

    pub fn inc(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.drawing.try_lock() {
            self.draw(false);
        }
    }

    fn line(&self) -> String {
        format!("{}({}/{})", self.label, self.done.load(Ordering::Relaxed), self.total)
    }

    fn draw(&self, last: bool) {
        let mut out = stdout().lock();
        erase_line(&mut out);
        let text = format!("{} {}", prefix("generate"), self.line());
        if last {
            writeln!(out, "{text}").ok();
        } else {
            write!(out, "{text}").ok();
        }
        out.flush().ok();
    }

    /// Keep the final counts on screen.
    pub fn finish(self) {
        PINNED.store(0, Ordering::SeqCst);
        {
            let _guard = self.drawing.lock();
            self.draw(true);
        }
        // Drop would erase the line just printed
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        PINNED.store(0, Ordering::SeqCst);
        let mut out = stdout().lock();
        erase_line(&mut out);
        out.flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_detail_lines() {
        let mut status = WatchStatus::new();
        assert_eq!(status.shown, 0);
        status.error("rebuild failed", "post.mdx\n3:1: unclosed <Card>");
        assert_eq!(status.shown, 3);
        status.success("rebuilt site");
        assert_eq!(status.shown, 1);
    }

    #[test]
    fn clock_wraps_days() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(86_400 + 3_661), "01:01:01");
    }

    #[test]
    fn progress_counts() {
        let progress = ProgressLine::new("mdx", 2);
        progress.inc();
        assert_eq!(progress.line(), "mdx(1/2)");
        progress.finish();
    }
}
