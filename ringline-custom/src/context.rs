//! Cancellation and deadline carrier threaded through every dispatch call.
//!
//! A [`Context`] is cheap to clone and compared by identity. Child contexts
//! observe their parent's cancellation, and a child's deadline is never later
//! than its parent's. The façade never inspects a context itself; operators
//! and executors use [`Context::check()`] or [`Context::err()`] before doing
//! work on the caller's behalf.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::Error;

struct Inner {
    parent: Option<Context>,
    deadline: Option<Instant>,
    cancelled: AtomicBool,
}

/// Cancellation/deadline carrier passed to every operation.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A root context with no deadline.
    pub fn background() -> Self {
        Self::child_of(None, None)
    }

    fn child_of(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent,
                deadline,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// A child that can be cancelled independently of this context.
    pub fn with_cancel(&self) -> Self {
        Self::child_of(Some(self.clone()), self.deadline())
    }

    /// A child that expires at `deadline`, or at this context's deadline if
    /// that comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline() {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self::child_of(Some(self.clone()), Some(deadline))
    }

    /// A child that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if this context or any ancestor was cancelled.
    pub fn is_cancelled(&self) -> bool {
        let mut cx = Some(self);
        while let Some(c) = cx {
            if c.inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            cx = c.inner.parent.as_ref();
        }
        false
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline. `Some(ZERO)` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Why this context is done, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<Error> {
        if self.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline() {
            Some(d) if Instant::now() >= d => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err` with the reason if this context is done.
    pub fn check(&self) -> Result<(), Error> {
        match self.err() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
