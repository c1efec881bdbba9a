//! Custom pipelining façade for ringline Redis clients.
//!
//! [`Custom`] exposes one object through which callers issue ad-hoc commands,
//! dispatch prepared commands, and open plain or "transactional" pipeline
//! scopes. It does no dispatching of its own: every command goes through an
//! injected [`Operator`], and every prepared batch through an injected
//! [`PipelineExec`]. Wire encoding, connections, clustering and retries all
//! live in those collaborators.
//!
//! - [`Cmd`] is a command plus its reply slot.
//! - [`Cmdable`] and [`StatefulCmdable`] provide typed command helpers on top
//!   of a single `process` method. `Custom` implements both.
//! - [`Pipeliner`] is a queueing scope; [`Pipeline`] is the standard one.
//! - [`Context`] carries cancellation and deadlines through every call.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ringline_custom::{Cmd, Context, Custom, Error, Operator, Pipeline, Value};
//!
//! struct Echo {
//!     exec: Arc<fn(&Context, &mut [Cmd]) -> Result<(), Error>>,
//! }
//!
//! impl Operator for Echo {
//!     type Pipeline = Pipeline<fn(&Context, &mut [Cmd]) -> Result<(), Error>>;
//!
//!     async fn process(&self, cx: &Context, cmd: &mut Cmd) -> Result<(), Error> {
//!         cx.check()?;
//!         let last = cmd.args().last().cloned().unwrap_or_default();
//!         cmd.set_val(Value::BulkString(last));
//!         Ok(())
//!     }
//!
//!     fn pipeline(&self) -> Self::Pipeline {
//!         Pipeline::new(self.exec.clone())
//!     }
//! }
//! ```

mod cmd;
mod cmdable;
mod context;
mod custom;
mod instrumented;
mod pipeline;

pub use cmd::{Cmd, IntoArg, Value, set_cmds_err};
pub use cmdable::{Cmdable, StatefulCmdable};
pub use context::Context;
pub use custom::{Custom, CustomBuilder, Operator};
#[cfg(feature = "metrics")]
pub use instrumented::ClientMetrics;
pub use instrumented::{CommandResult, CommandType};
pub use pipeline::{Pipeline, PipelineExec, Pipeliner};

use std::io;
use std::sync::Arc;

// ── Error ───────────────────────────────────────────────────────────────

/// Errors surfaced by operators, executors and contexts.
///
/// The façade never creates or rewrites these; it returns whatever its
/// collaborators produced. Cloneable so one batch failure can be stored on
/// every command in the batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The connection was closed before a response was received.
    #[error("connection closed")]
    ConnectionClosed,

    /// The server returned a Redis error response.
    #[error("redis error: {0}")]
    Redis(String),

    /// The response type did not match the expected type for the command.
    #[error("unexpected response")]
    UnexpectedResponse,

    /// The operator could not encode or decode the exchange.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error during dispatch.
    #[error("io error: {0}")]
    Io(Arc<io::Error>),

    /// The context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The command has no reply yet.
    #[error("command not executed")]
    NotExecuted,

    /// Any other collaborator error, passed through opaquely.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl Error {
    /// Wrap an arbitrary collaborator error.
    pub fn other<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(Arc::new(e))
    }

    /// Returns true for context cancellation or deadline expiry.
    pub fn is_context(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::ConnectionClosed.to_string(), "connection closed");
        assert_eq!(Error::Redis("ERR x".into()).to_string(), "redis error: ERR x");
        assert_eq!(Error::Cancelled.to_string(), "context cancelled");
        assert_eq!(
            Error::DeadlineExceeded.to_string(),
            "context deadline exceeded"
        );
        assert_eq!(Error::NotExecuted.to_string(), "command not executed");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(&err, Error::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(err.to_string(), "io error: pipe");
    }

    #[test]
    fn test_other_is_opaque() {
        let err = Error::other(io::Error::other("boom"));
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_context());
        assert!(Error::Cancelled.is_context());
        assert!(Error::DeadlineExceeded.is_context());
    }
}
