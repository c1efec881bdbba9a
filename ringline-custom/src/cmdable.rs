//! Typed command helpers layered on a single `process` capability.
//!
//! Implementors of [`Cmdable`] only provide [`process`](Cmdable::process);
//! every other method builds a [`Cmd`], dispatches it through `process`, and
//! converts the reply. Keys and values accept `impl AsRef<[u8]>`, so `&str`,
//! `String`, `&[u8]`, `Vec<u8>` and `Bytes` all work.

use std::future::Future;

use bytes::Bytes;

use crate::{Cmd, Context, Error, IntoArg, Value};

/// Dispatch `cmd` through `sink` and return its reply.
async fn run<C: Cmdable + ?Sized>(sink: &C, cx: &Context, mut cmd: Cmd) -> Result<Value, Error> {
    sink.process(cx, &mut cmd).await?;
    cmd.into_result()
}

fn cmd_with_keys(name: &'static str, key: &[u8], rest: &[&[u8]]) -> Cmd {
    let mut cmd = Cmd::cmd(name).arg(key);
    for r in rest {
        cmd = cmd.arg(*r);
    }
    cmd
}

/// Single-command dispatch plus the common keyspace, string, hash, list and
/// set commands.
pub trait Cmdable: Sync {
    /// Dispatch one command, storing its reply on `cmd`.
    fn process(
        &self,
        cx: &Context,
        cmd: &mut Cmd,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Build a command from `args`, dispatch it, and return it with its
    /// reply or error attached. The dispatch error is not returned separately.
    fn do_cmd<I>(&self, cx: &Context, args: I) -> impl Future<Output = Cmd> + Send
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        let mut cmd = Cmd::new(args);
        async move {
            let _ = self.process(cx, &mut cmd).await;
            cmd
        }
    }

    // ── Connection ──────────────────────────────────────────────────────

    /// Ping the server.
    fn ping(&self, cx: &Context) -> impl Future<Output = Result<(), Error>> + Send {
        async move { run(self, cx, Cmd::cmd("PING")).await?.into_ok() }
    }

    /// Echo `message` back from the server.
    fn echo(
        &self,
        cx: &Context,
        message: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Bytes, Error>> + Send {
        let cmd = Cmd::cmd("ECHO").arg(message.as_ref());
        async move {
            run(self, cx, cmd)
                .await?
                .into_opt_bytes()?
                .ok_or(Error::UnexpectedResponse)
        }
    }

    // ── Keys ────────────────────────────────────────────────────────────

    /// Delete keys. Returns the number of keys removed.
    fn del(&self, cx: &Context, keys: &[&[u8]]) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::new(std::iter::once(&b"DEL"[..]).chain(keys.iter().copied()));
        async move { run(self, cx, cmd).await?.into_int() }
    }

    /// Delete keys asynchronously on the server.
    fn unlink(
        &self,
        cx: &Context,
        keys: &[&[u8]],
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::new(std::iter::once(&b"UNLINK"[..]).chain(keys.iter().copied()));
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn exists(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let cmd = Cmd::cmd("EXISTS").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_bool() }
    }

    /// Set a TTL in seconds. Returns false if the key does not exist.
    fn expire(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        seconds: u64,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let cmd = Cmd::cmd("EXPIRE").arg(key.as_ref()).arg(seconds);
        async move { run(self, cx, cmd).await?.into_bool() }
    }

    /// Remaining TTL in seconds (-2 missing key, -1 no expiry).
    fn ttl(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("TTL").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    /// Remaining TTL in milliseconds.
    fn pttl(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("PTTL").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn persist(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let cmd = Cmd::cmd("PERSIST").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_bool() }
    }

    /// The type name of the value stored at `key` ("none" if missing).
    fn key_type(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<String, Error>> + Send {
        let cmd = Cmd::cmd("TYPE").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_text() }
    }

    fn rename(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        new_key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("RENAME").arg(key.as_ref()).arg(new_key.as_ref());
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    fn dbsize(&self, cx: &Context) -> impl Future<Output = Result<i64, Error>> + Send {
        async move { run(self, cx, Cmd::cmd("DBSIZE")).await?.into_int() }
    }

    fn flushdb(&self, cx: &Context) -> impl Future<Output = Result<(), Error>> + Send {
        async move { run(self, cx, Cmd::cmd("FLUSHDB")).await?.into_ok() }
    }

    // ── Strings ─────────────────────────────────────────────────────────

    /// Get the value of a key. `None` if the key does not exist.
    fn get(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send {
        let cmd = Cmd::cmd("GET").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_opt_bytes() }
    }

    fn set(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("SET").arg(key.as_ref()).arg(value.as_ref());
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    /// SET with a TTL in seconds.
    fn set_ex(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("SET")
            .arg(key.as_ref())
            .arg(value.as_ref())
            .arg("EX")
            .arg(ttl_secs);
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    /// SET with a TTL in milliseconds.
    fn set_px(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        ttl_ms: u64,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("SET")
            .arg(key.as_ref())
            .arg(value.as_ref())
            .arg("PX")
            .arg(ttl_ms);
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    /// SET only if the key does not exist. Returns true if the key was set.
    fn set_nx(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let cmd = Cmd::cmd("SET")
            .arg(key.as_ref())
            .arg(value.as_ref())
            .arg("NX");
        async move {
            match run(self, cx, cmd).await? {
                Value::SimpleString(_) => Ok(true),
                Value::Nil => Ok(false),
                _ => Err(Error::UnexpectedResponse),
            }
        }
    }

    /// Get several keys at once. Missing keys are `None`.
    fn mget(
        &self,
        cx: &Context,
        keys: &[&[u8]],
    ) -> impl Future<Output = Result<Vec<Option<Bytes>>, Error>> + Send {
        let cmd = Cmd::new(std::iter::once(&b"MGET"[..]).chain(keys.iter().copied()));
        async move { run(self, cx, cmd).await?.into_opt_bytes_array() }
    }

    fn incr(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("INCR").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn decr(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("DECR").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn incr_by(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        delta: i64,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("INCRBY").arg(key.as_ref()).arg(delta);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn decr_by(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        delta: i64,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("DECRBY").arg(key.as_ref()).arg(delta);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    /// Append to a string. Returns the new length.
    fn append(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("APPEND").arg(key.as_ref()).arg(value.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    // ── Hashes ──────────────────────────────────────────────────────────

    /// Set a hash field. Returns the number of fields added.
    fn hset(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("HSET")
            .arg(key.as_ref())
            .arg(field.as_ref())
            .arg(value.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn hget(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send {
        let cmd = Cmd::cmd("HGET").arg(key.as_ref()).arg(field.as_ref());
        async move { run(self, cx, cmd).await?.into_opt_bytes() }
    }

    /// All field/value pairs of a hash.
    fn hgetall(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Vec<(Bytes, Bytes)>, Error>> + Send {
        let cmd = Cmd::cmd("HGETALL").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_pairs() }
    }

    fn hdel(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        fields: &[&[u8]],
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = cmd_with_keys("HDEL", key.as_ref(), fields);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn hexists(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let cmd = Cmd::cmd("HEXISTS").arg(key.as_ref()).arg(field.as_ref());
        async move { run(self, cx, cmd).await?.into_bool() }
    }

    fn hlen(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("HLEN").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn hincr_by(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        delta: i64,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("HINCRBY")
            .arg(key.as_ref())
            .arg(field.as_ref())
            .arg(delta);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    // ── Lists ───────────────────────────────────────────────────────────

    /// Push values to the head of a list. Returns the new length.
    fn lpush(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        values: &[&[u8]],
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = cmd_with_keys("LPUSH", key.as_ref(), values);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    /// Push values to the tail of a list. Returns the new length.
    fn rpush(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        values: &[&[u8]],
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = cmd_with_keys("RPUSH", key.as_ref(), values);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn lpop(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send {
        let cmd = Cmd::cmd("LPOP").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_opt_bytes() }
    }

    fn rpop(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send {
        let cmd = Cmd::cmd("RPOP").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_opt_bytes() }
    }

    fn llen(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("LLEN").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    /// Elements between `start` and `stop` inclusive; negative indices count
    /// from the tail.
    fn lrange(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        start: i64,
        stop: i64,
    ) -> impl Future<Output = Result<Vec<Bytes>, Error>> + Send {
        let cmd = Cmd::cmd("LRANGE").arg(key.as_ref()).arg(start).arg(stop);
        async move { run(self, cx, cmd).await?.into_bytes_array() }
    }

    // ── Sets ────────────────────────────────────────────────────────────

    fn sadd(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        members: &[&[u8]],
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = cmd_with_keys("SADD", key.as_ref(), members);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn srem(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        members: &[&[u8]],
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = cmd_with_keys("SREM", key.as_ref(), members);
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn smembers(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<Vec<Bytes>, Error>> + Send {
        let cmd = Cmd::cmd("SMEMBERS").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_bytes_array() }
    }

    fn scard(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<i64, Error>> + Send {
        let cmd = Cmd::cmd("SCARD").arg(key.as_ref());
        async move { run(self, cx, cmd).await?.into_int() }
    }

    fn sismember(
        &self,
        cx: &Context,
        key: impl AsRef<[u8]>,
        member: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let cmd = Cmd::cmd("SISMEMBER").arg(key.as_ref()).arg(member.as_ref());
        async move { run(self, cx, cmd).await?.into_bool() }
    }
}

/// Commands that change per-connection state.
pub trait StatefulCmdable: Cmdable {
    fn auth(
        &self,
        cx: &Context,
        password: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("AUTH").arg(password.as_ref());
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    /// ACL-style AUTH (Redis 6.0+).
    fn auth_acl(
        &self,
        cx: &Context,
        username: impl AsRef<[u8]>,
        password: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("AUTH")
            .arg(username.as_ref())
            .arg(password.as_ref());
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    fn select(&self, cx: &Context, db: u32) -> impl Future<Output = Result<(), Error>> + Send {
        async move { run(self, cx, Cmd::cmd("SELECT").arg(db)).await?.into_ok() }
    }

    fn swap_db(
        &self,
        cx: &Context,
        index1: u32,
        index2: u32,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("SWAPDB").arg(index1).arg(index2);
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    fn client_set_name(
        &self,
        cx: &Context,
        name: impl AsRef<[u8]>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let cmd = Cmd::cmd("CLIENT").arg("SETNAME").arg(name.as_ref());
        async move { run(self, cx, cmd).await?.into_ok() }
    }

    /// HELLO handshake. `auth` is `(username, password)`. Returns the raw
    /// server-properties reply.
    fn hello(
        &self,
        cx: &Context,
        protover: u32,
        auth: Option<(&[u8], &[u8])>,
        client_name: Option<&[u8]>,
    ) -> impl Future<Output = Result<Value, Error>> + Send {
        let mut cmd = Cmd::cmd("HELLO").arg(protover);
        if let Some((username, password)) = auth {
            cmd = cmd.arg("AUTH").arg(username).arg(password);
        }
        if let Some(name) = client_name {
            cmd = cmd.arg("SETNAME").arg(name);
        }
        async move { run(self, cx, cmd).await }
    }
}
