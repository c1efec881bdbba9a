//! The custom pipelining façade.
//!
//! [`Custom`] composes an injected [`Operator`] and [`PipelineExec`] behind
//! one object. It never dispatches anything itself: single commands go to
//! [`Operator::process`], pipeline scopes come from [`Operator::pipeline`],
//! and prepared batches go to the executor. Errors come back verbatim.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ringline_custom::{Cmdable, Context, Custom, Operator, PipelineExec, Pipeliner};
//!
//! async fn example<O: Operator, E: PipelineExec>(
//!     op: Arc<O>,
//!     exec: Arc<E>,
//! ) -> Result<(), ringline_custom::Error> {
//!     let cx = Context::background();
//!     let custom = Custom::new(cx.clone(), op, exec);
//!
//!     custom.set(&cx, "hello", "world").await?;
//!     let reply = custom.do_cmd(&cx, ["GET", "hello"]).await;
//!     assert_eq!(reply.bytes()?.as_deref(), Some(&b"world"[..]));
//!
//!     let (cmds, result) = custom
//!         .pipelined(&cx, |pipe| {
//!             pipe.incr("counter").incr("counter");
//!             Ok(())
//!         })
//!         .await;
//!     result?;
//!     assert_eq!(cmds.len(), 2);
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

#[cfg(feature = "metrics")]
use crate::instrumented::ClientMetrics;
use crate::instrumented::{CommandResult, ResultCallback};
use crate::{Cmd, Cmdable, Context, Error, PipelineExec, Pipeliner, StatefulCmdable};

// ── Operator ────────────────────────────────────────────────────────────

/// The collaborator that actually dispatches commands and opens pipelines.
pub trait Operator: Send + Sync {
    /// The scope returned by [`pipeline`](Operator::pipeline).
    type Pipeline: Pipeliner;

    /// Dispatch one command, storing its reply on `cmd`.
    fn process(
        &self,
        cx: &Context,
        cmd: &mut Cmd,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Open a new, empty pipeline scope.
    fn pipeline(&self) -> Self::Pipeline;

    /// Open a scope, let `f` queue commands, then exec the batch.
    ///
    /// Returns the executed commands together with the batch outcome. An
    /// error from `f` is returned with no commands, before anything is sent.
    fn pipelined<F>(
        &self,
        cx: &Context,
        f: F,
    ) -> impl Future<Output = (Vec<Cmd>, Result<(), Error>)> + Send
    where
        F: FnOnce(&mut Self::Pipeline) -> Result<(), Error> + Send,
    {
        async move {
            let mut pipe = self.pipeline();
            if let Err(e) = f(&mut pipe) {
                pipe.discard();
                return (Vec::new(), Err(e));
            }
            pipe.exec(cx).await
        }
    }
}

// ── CustomBuilder ───────────────────────────────────────────────────────

/// Builder for a [`Custom`] with a default context, callbacks and metrics.
pub struct CustomBuilder<O, E> {
    op: Arc<O>,
    exec: Arc<E>,
    cx: Context,
    on_result: Option<ResultCallback>,
    #[cfg(feature = "metrics")]
    with_metrics: bool,
}

impl<O: Operator, E: PipelineExec> CustomBuilder<O, E> {
    pub(crate) fn new(op: Arc<O>, exec: Arc<E>) -> Self {
        Self {
            op,
            exec,
            cx: Context::background(),
            on_result: None,
            #[cfg(feature = "metrics")]
            with_metrics: false,
        }
    }

    /// The context reported by [`Custom::context()`]. Defaults to
    /// [`Context::background()`].
    pub fn context(mut self, cx: Context) -> Self {
        self.cx = cx;
        self
    }

    /// Register a callback invoked after each single-command dispatch.
    pub fn on_result<F>(mut self, f: F) -> Self
    where
        F: Fn(&CommandResult) + Send + Sync + 'static,
    {
        self.on_result = Some(Arc::new(f));
        self
    }

    /// Enable built-in histogram tracking (requires `metrics` feature).
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self) -> Self {
        self.with_metrics = true;
        self
    }

    pub fn build(self) -> Custom<O, E> {
        Custom {
            cx: self.cx,
            op: self.op,
            exec: self.exec,
            on_result: self.on_result,
            #[cfg(feature = "metrics")]
            metrics: self.with_metrics.then(|| Arc::new(ClientMetrics::new())),
        }
    }
}

// ── Custom ──────────────────────────────────────────────────────────────

/// Pipelining façade over an injected operator and batch executor.
///
/// Holds only shared references to its collaborators, so it is cheap to clone
/// and safe to use from many tasks at once. Ordering between concurrently
/// issued commands is whatever the operator provides.
pub struct Custom<O, E> {
    cx: Context,
    op: Arc<O>,
    exec: Arc<E>,
    on_result: Option<ResultCallback>,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<ClientMetrics>>,
}

impl<O: Operator, E: PipelineExec> Custom<O, E> {
    /// Create a façade with no callbacks or metrics.
    pub fn new(cx: Context, op: Arc<O>, exec: Arc<E>) -> Self {
        CustomBuilder::new(op, exec).context(cx).build()
    }

    /// Create a builder for a façade with callbacks or metrics.
    pub fn builder(op: Arc<O>, exec: Arc<E>) -> CustomBuilder<O, E> {
        CustomBuilder::new(op, exec)
    }

    /// The context this façade was built with.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    /// A copy of this façade carrying a different default context.
    pub fn with_context(&self, cx: Context) -> Self {
        Self {
            cx,
            ..self.clone()
        }
    }

    pub fn operator(&self) -> &Arc<O> {
        &self.op
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.exec
    }

    /// Returns a reference to the built-in metrics, if enabled.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<&ClientMetrics> {
        self.metrics.as_deref()
    }

    /// Run a prepared batch through the executor.
    pub async fn exec(&self, cx: &Context, cmds: &mut [Cmd]) -> Result<(), Error> {
        debug!(count = cmds.len(), "exec");
        self.exec.exec(cx, cmds).await
    }

    /// Open a scope on the operator, let `f` queue commands, and exec them.
    ///
    /// The commands come back alongside the outcome, so each one's reply or
    /// error stays readable when the batch fails.
    pub async fn pipelined<F>(&self, cx: &Context, f: F) -> (Vec<Cmd>, Result<(), Error>)
    where
        F: FnOnce(&mut O::Pipeline) -> Result<(), Error> + Send,
    {
        let (cmds, result) = self.op.pipelined(cx, f).await;
        match &result {
            Ok(()) => debug!(count = cmds.len(), "pipelined"),
            Err(e) => debug!(count = cmds.len(), error = %e, "pipelined failed"),
        }
        (cmds, result)
    }

    /// Open a new pipeline scope on the operator without executing it.
    pub fn pipeline(&self) -> O::Pipeline {
        self.op.pipeline()
    }

    /// Same as [`pipelined`](Custom::pipelined). No MULTI/EXEC wrapping is
    /// added; atomicity is whatever the operator's scope provides.
    pub async fn tx_pipelined<F>(&self, cx: &Context, f: F) -> (Vec<Cmd>, Result<(), Error>)
    where
        F: FnOnce(&mut O::Pipeline) -> Result<(), Error> + Send,
    {
        self.pipelined(cx, f).await
    }

    /// Same as [`pipeline`](Custom::pipeline).
    pub fn tx_pipeline(&self) -> O::Pipeline {
        self.op.pipeline()
    }

    #[inline]
    fn is_instrumented(&self) -> bool {
        if self.on_result.is_some() {
            return true;
        }
        #[cfg(feature = "metrics")]
        if self.metrics.is_some() {
            return true;
        }
        false
    }

    /// Record a command result: invoke callback and update metrics.
    #[inline]
    fn record(&self, result: &CommandResult) {
        if let Some(ref cb) = self.on_result {
            cb(result);
        }
        #[cfg(feature = "metrics")]
        if let Some(ref m) = self.metrics {
            m.record(result);
        }
    }
}

impl<O, E> Clone for Custom<O, E> {
    fn clone(&self) -> Self {
        Self {
            cx: self.cx.clone(),
            op: Arc::clone(&self.op),
            exec: Arc::clone(&self.exec),
            on_result: self.on_result.clone(),
            #[cfg(feature = "metrics")]
            metrics: self.metrics.clone(),
        }
    }
}

impl<O: Operator, E: PipelineExec> Cmdable for Custom<O, E> {
    fn process(
        &self,
        cx: &Context,
        cmd: &mut Cmd,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            trace!(command = %cmd.name(), "process");
            if !self.is_instrumented() {
                return self.op.process(cx, cmd).await;
            }
            let start = Instant::now();
            let result = self.op.process(cx, cmd).await;
            let latency_ns = start.elapsed().as_nanos() as u64;
            self.record(&CommandResult::new(cmd, result.is_ok(), latency_ns));
            result
        }
    }
}

impl<O: Operator, E: PipelineExec> StatefulCmdable for Custom<O, E> {}
