//! Pipeline scopes and the batch executor seam.
//!
//! A [`Pipeliner`] queues commands without sending them; [`exec`] hands the
//! whole queue to a [`PipelineExec`] in one call and returns the commands, in
//! queue order, together with the batch outcome. The commands come back even
//! when the batch fails, each carrying its own reply or error.
//!
//! A pipeline is not a transaction. Other clients' commands may interleave
//! with a batch, and an executor that retransmits on timeout can run some
//! commands more than once.
//!
//! [`exec`]: Pipeliner::exec

use std::future::{self, Future};
use std::sync::Arc;

use tracing::debug;

use crate::cmd::set_cmds_err;
use crate::{Cmd, Context, Error, IntoArg};

// ── PipelineExec ────────────────────────────────────────────────────────

/// Runs a batch of commands, storing each reply on its command.
///
/// Any `Fn(&Context, &mut [Cmd]) -> Result<(), Error>` closure that is
/// `Send + Sync` is an executor.
pub trait PipelineExec: Send + Sync {
    fn exec(
        &self,
        cx: &Context,
        cmds: &mut [Cmd],
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

impl<F> PipelineExec for F
where
    F: Fn(&Context, &mut [Cmd]) -> Result<(), Error> + Send + Sync,
{
    fn exec(
        &self,
        cx: &Context,
        cmds: &mut [Cmd],
    ) -> impl Future<Output = Result<(), Error>> + Send {
        future::ready(self(cx, cmds))
    }
}

// ── Pipeliner ───────────────────────────────────────────────────────────

/// A scope that queues commands for a single batched round trip.
///
/// The queueing helpers return `&mut Self` so they can be chained:
///
/// ```no_run
/// # use ringline_custom::{Context, Pipeliner};
/// # async fn example<P: Pipeliner>(pipe: &mut P) -> Result<(), ringline_custom::Error> {
/// pipe.set("k1", "v1").set("k2", "v2").get("k1");
/// let (cmds, result) = pipe.exec(&Context::background()).await;
/// result?;
/// assert_eq!(cmds.len(), 3);
/// # Ok(())
/// # }
/// ```
pub trait Pipeliner: Send {
    /// Queue a command for the next [`exec`](Pipeliner::exec).
    fn process(&mut self, cmd: Cmd);

    /// Number of queued commands.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued command without sending it.
    fn discard(&mut self);

    /// Send every queued command and return them, replies attached, with the
    /// batch outcome. The scope is empty afterwards.
    fn exec(
        &mut self,
        cx: &Context,
    ) -> impl Future<Output = (Vec<Cmd>, Result<(), Error>)> + Send;

    /// Queue a command built from `args`.
    fn do_cmd<I>(&mut self, args: I) -> &mut Self
    where
        Self: Sized,
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.process(Cmd::new(args));
        self
    }

    fn get(&mut self, key: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("GET").arg(key.as_ref()));
        self
    }

    fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("SET").arg(key.as_ref()).arg(value.as_ref()));
        self
    }

    fn set_ex(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        ttl_secs: u64,
    ) -> &mut Self
    where
        Self: Sized,
    {
        self.process(
            Cmd::cmd("SET")
                .arg(key.as_ref())
                .arg(value.as_ref())
                .arg("EX")
                .arg(ttl_secs),
        );
        self
    }

    fn del(&mut self, key: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("DEL").arg(key.as_ref()));
        self
    }

    fn incr(&mut self, key: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("INCR").arg(key.as_ref()));
        self
    }

    fn incr_by(&mut self, key: impl AsRef<[u8]>, delta: i64) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("INCRBY").arg(key.as_ref()).arg(delta));
        self
    }

    fn expire(&mut self, key: impl AsRef<[u8]>, seconds: u64) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("EXPIRE").arg(key.as_ref()).arg(seconds));
        self
    }

    fn hset(
        &mut self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> &mut Self
    where
        Self: Sized,
    {
        self.process(
            Cmd::cmd("HSET")
                .arg(key.as_ref())
                .arg(field.as_ref())
                .arg(value.as_ref()),
        );
        self
    }

    fn hget(&mut self, key: impl AsRef<[u8]>, field: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("HGET").arg(key.as_ref()).arg(field.as_ref()));
        self
    }

    fn lpush(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("LPUSH").arg(key.as_ref()).arg(value.as_ref()));
        self
    }

    fn rpush(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("RPUSH").arg(key.as_ref()).arg(value.as_ref()));
        self
    }

    fn select(&mut self, db: u32) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("SELECT").arg(db));
        self
    }

    fn client_set_name(&mut self, name: impl AsRef<[u8]>) -> &mut Self
    where
        Self: Sized,
    {
        self.process(Cmd::cmd("CLIENT").arg("SETNAME").arg(name.as_ref()));
        self
    }
}

// ── Pipeline ────────────────────────────────────────────────────────────

/// The standard [`Pipeliner`]: a queue flushed through a shared executor.
pub struct Pipeline<E> {
    exec: Arc<E>,
    cmds: Vec<Cmd>,
}

impl<E: PipelineExec> Pipeline<E> {
    pub fn new(exec: Arc<E>) -> Self {
        Self {
            exec,
            cmds: Vec::new(),
        }
    }

    /// The queued commands, in order.
    pub fn cmds(&self) -> &[Cmd] {
        &self.cmds
    }
}

impl<E: PipelineExec> Pipeliner for Pipeline<E> {
    fn process(&mut self, cmd: Cmd) {
        self.cmds.push(cmd);
    }

    fn len(&self) -> usize {
        self.cmds.len()
    }

    fn discard(&mut self) {
        self.cmds.clear();
    }

    fn exec(
        &mut self,
        cx: &Context,
    ) -> impl Future<Output = (Vec<Cmd>, Result<(), Error>)> + Send {
        let mut cmds = std::mem::take(&mut self.cmds);
        let exec = &*self.exec;
        async move {
            if cmds.is_empty() {
                return (cmds, Ok(()));
            }
            if let Err(e) = cx.check() {
                debug!(count = cmds.len(), error = %e, "pipeline context done before exec");
                set_cmds_err(&mut cmds, &e);
                return (cmds, Err(e));
            }
            debug!(count = cmds.len(), "pipeline exec");
            let result = exec.exec(cx, &mut cmds).await;
            if let Err(e) = &result {
                debug!(count = cmds.len(), error = %e, "pipeline exec failed");
                // commands the executor never answered inherit the batch error
                for cmd in cmds.iter_mut().filter(|c| !c.is_done()) {
                    cmd.set_err(e.clone());
                }
            }
            (cmds, result)
        }
    }
}
