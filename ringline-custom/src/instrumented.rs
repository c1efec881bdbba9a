//! Per-command latency callbacks and optional built-in histogram tracking.
//!
//! Instrumentation only observes [`Custom`](crate::Custom)'s single-command
//! dispatch; it never alters a command's reply or the returned error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ringline_custom::{CommandResult, Custom, Operator, PipelineExec};
//!
//! fn example<O: Operator, E: PipelineExec>(op: Arc<O>, exec: Arc<E>) -> Custom<O, E> {
//!     Custom::builder(op, exec)
//!         .on_result(|r: &CommandResult| {
//!             println!("command {:?} took {}ns", r.command, r.latency_ns);
//!         })
//!         .build()
//! }
//! ```

use std::sync::Arc;

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Cmd;

/// Callback type for per-command result notifications.
pub(crate) type ResultCallback = Arc<dyn Fn(&CommandResult) + Send + Sync>;

// ── Types ───────────────────────────────────────────────────────────────

/// The type of Redis command that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Get,
    Set,
    Del,
    Ping,
    Other,
}

impl CommandType {
    pub fn of(cmd: &Cmd) -> Self {
        let Some(name) = cmd.args().first() else {
            return CommandType::Other;
        };
        [
            (&b"GET"[..], CommandType::Get),
            (&b"SET"[..], CommandType::Set),
            (&b"DEL"[..], CommandType::Del),
            (&b"PING"[..], CommandType::Ping),
        ]
        .into_iter()
        .find(|(known, _)| name.eq_ignore_ascii_case(known))
        .map_or(CommandType::Other, |(_, ty)| ty)
    }
}

/// Result metadata for a completed command, passed to the `on_result` callback.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command type.
    pub command: CommandType,
    /// Latency in nanoseconds (dispatch → operator returned).
    pub latency_ns: u64,
    /// For GET: `Some(true)` = hit, `Some(false)` = miss. `None` for others.
    pub hit: Option<bool>,
    /// Whether the command succeeded (no dispatch error, no error reply).
    pub success: bool,
}

impl CommandResult {
    pub(crate) fn new(cmd: &Cmd, dispatch_ok: bool, latency_ns: u64) -> Self {
        let command = CommandType::of(cmd);
        let success = dispatch_ok && cmd.err().is_none();
        let hit = match (command, cmd.val()) {
            (CommandType::Get, Some(v)) if success => Some(!v.is_nil()),
            _ => None,
        };
        Self {
            command,
            latency_ns,
            hit,
            success,
        }
    }
}

// ── ClientMetrics ───────────────────────────────────────────────────────

/// Built-in histogram-based metrics, available when the `metrics` feature is
/// enabled. Not registered globally; the caller decides how to expose them.
///
/// All fields are atomic so a shared façade can record without locking.
#[cfg(feature = "metrics")]
pub struct ClientMetrics {
    /// Overall request latency histogram.
    pub latency: histogram::AtomicHistogram,
    /// GET latency histogram.
    pub get_latency: histogram::AtomicHistogram,
    /// SET latency histogram.
    pub set_latency: histogram::AtomicHistogram,
    /// DEL latency histogram.
    pub del_latency: histogram::AtomicHistogram,
    /// Total requests completed.
    pub requests: AtomicU64,
    /// Total errors.
    pub errors: AtomicU64,
    /// Total GET hits.
    pub hits: AtomicU64,
    /// Total GET misses.
    pub misses: AtomicU64,
}

#[cfg(feature = "metrics")]
impl ClientMetrics {
    pub(crate) fn new() -> Self {
        Self {
            latency: latency_histogram(),
            get_latency: latency_histogram(),
            set_latency: latency_histogram(),
            del_latency: latency_histogram(),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub(crate) fn record(&self, result: &CommandResult) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let _ = self.latency.increment(result.latency_ns);

        if !result.success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        match result.command {
            CommandType::Get => {
                let _ = self.get_latency.increment(result.latency_ns);
                match result.hit {
                    Some(true) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                    }
                    Some(false) => {
                        self.misses.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {}
                }
            }
            CommandType::Set => {
                let _ = self.set_latency.increment(result.latency_ns);
            }
            CommandType::Del => {
                let _ = self.del_latency.increment(result.latency_ns);
            }
            _ => {}
        }
    }
}

#[cfg(feature = "metrics")]
fn latency_histogram() -> histogram::AtomicHistogram {
    histogram::AtomicHistogram::new(7, 64).unwrap()
}
