//! Command objects and decoded reply values.
//!
//! A [`Cmd`] is an argument list plus a reply slot. Whoever dispatches the
//! command (an operator, or a pipeline executor) fills the slot with
//! [`Cmd::set_val`] or [`Cmd::set_err`]; callers read it back with the typed
//! accessors.

use bytes::Bytes;

use crate::Error;

// ── Arguments ───────────────────────────────────────────────────────────

/// Conversion into a single command argument.
pub trait IntoArg {
    fn into_arg(self) -> Bytes;
}

impl IntoArg for Bytes {
    #[inline]
    fn into_arg(self) -> Bytes {
        self
    }
}

impl IntoArg for &Bytes {
    #[inline]
    fn into_arg(self) -> Bytes {
        self.clone()
    }
}

impl IntoArg for Vec<u8> {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoArg for &[u8] {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> IntoArg for &[u8; N] {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoArg for String {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoArg for &String {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoArg for &str {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

macro_rules! int_arg {
    ($($t:ty),*) => {
        $(
            impl IntoArg for $t {
                #[inline]
                fn into_arg(self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

int_arg!(i32, i64, isize, u32, u64, usize);

impl IntoArg for f64 {
    #[inline]
    fn into_arg(self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

// ── Value ───────────────────────────────────────────────────────────────

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    SimpleString(Bytes),
    BulkString(Bytes),
    Integer(i64),
    Double(f64),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Shorthand for the `+OK` status reply.
    pub fn ok() -> Self {
        Value::SimpleString(Bytes::from_static(b"OK"))
    }

    pub fn bulk(data: impl IntoArg) -> Self {
        Value::BulkString(data.into_arg())
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Expect a status reply.
    pub fn into_ok(self) -> Result<(), Error> {
        match self {
            Value::SimpleString(_) => Ok(()),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    pub fn into_int(self) -> Result<i64, Error> {
        match self {
            Value::Integer(n) => Ok(n),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Integer replies of 0/1, as returned by EXISTS, EXPIRE, SISMEMBER etc.
    pub fn into_bool(self) -> Result<bool, Error> {
        match self {
            Value::Integer(n) => Ok(n != 0),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Status or bulk reply as UTF-8 text (lossy).
    pub fn into_text(self) -> Result<String, Error> {
        match self {
            Value::SimpleString(data) | Value::BulkString(data) => {
                Ok(String::from_utf8_lossy(&data).into_owned())
            }
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Bulk reply, `None` on nil.
    pub fn into_opt_bytes(self) -> Result<Option<Bytes>, Error> {
        match self {
            Value::BulkString(data) => Ok(Some(data)),
            Value::Nil => Ok(None),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Array of bulk strings.
    pub fn into_bytes_array(self) -> Result<Vec<Bytes>, Error> {
        match self {
            Value::Array(arr) => arr
                .into_iter()
                .map(|v| match v {
                    Value::BulkString(data) => Ok(data),
                    _ => Err(Error::UnexpectedResponse),
                })
                .collect(),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Array of bulk strings where individual elements may be nil (MGET).
    pub fn into_opt_bytes_array(self) -> Result<Vec<Option<Bytes>>, Error> {
        match self {
            Value::Array(arr) => arr.into_iter().map(Value::into_opt_bytes).collect(),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Field/value pairs from either a RESP3 map or a flat RESP2 array.
    pub fn into_pairs(self) -> Result<Vec<(Bytes, Bytes)>, Error> {
        match self {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| match (k, v) {
                    (Value::BulkString(k), Value::BulkString(v)) => Ok((k, v)),
                    _ => Err(Error::UnexpectedResponse),
                })
                .collect(),
            Value::Array(_) => {
                let flat = self.into_bytes_array()?;
                if flat.len() % 2 != 0 {
                    return Err(Error::UnexpectedResponse);
                }
                let mut pairs = Vec::with_capacity(flat.len() / 2);
                let mut iter = flat.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    pairs.push((k, v));
                }
                Ok(pairs)
            }
            _ => Err(Error::UnexpectedResponse),
        }
    }
}

// ── Cmd ─────────────────────────────────────────────────────────────────

/// A command and, once dispatched, its reply.
#[derive(Debug, Clone)]
pub struct Cmd {
    args: Vec<Bytes>,
    reply: Option<Result<Value, Error>>,
}

impl Cmd {
    /// Build a command from a list of arguments. The first is the name.
    pub fn new<I>(args: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        Self {
            args: args.into_iter().map(IntoArg::into_arg).collect(),
            reply: None,
        }
    }

    /// Start a command with just its name; add arguments with [`arg`](Cmd::arg).
    pub fn cmd(name: impl IntoArg) -> Self {
        Self {
            args: vec![name.into_arg()],
            reply: None,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl IntoArg) -> Self {
        self.args.push(arg.into_arg());
        self
    }

    /// Lower-cased command name, empty for an empty command.
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|a| String::from_utf8_lossy(a).to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Store a successful reply. A server error value should go through
    /// [`set_err`](Cmd::set_err) as [`Error::Redis`] instead.
    pub fn set_val(&mut self, value: Value) {
        self.reply = Some(Ok(value));
    }

    pub fn set_err(&mut self, err: Error) {
        self.reply = Some(Err(err));
    }

    /// Returns true once a reply or error has been stored.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.reply.is_some()
    }

    pub fn val(&self) -> Option<&Value> {
        match &self.reply {
            Some(Ok(v)) => Some(v),
            _ => None,
        }
    }

    pub fn err(&self) -> Option<&Error> {
        match &self.reply {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    pub fn result(&self) -> Result<&Value, Error> {
        match &self.reply {
            Some(Ok(v)) => Ok(v),
            Some(Err(e)) => Err(e.clone()),
            None => Err(Error::NotExecuted),
        }
    }

    pub fn into_result(self) -> Result<Value, Error> {
        self.reply.unwrap_or(Err(Error::NotExecuted))
    }

    pub fn ok(&self) -> Result<(), Error> {
        self.result()?.clone().into_ok()
    }

    pub fn int(&self) -> Result<i64, Error> {
        self.result()?.clone().into_int()
    }

    pub fn bool(&self) -> Result<bool, Error> {
        self.result()?.clone().into_bool()
    }

    pub fn text(&self) -> Result<String, Error> {
        self.result()?.clone().into_text()
    }

    pub fn bytes(&self) -> Result<Option<Bytes>, Error> {
        self.result()?.clone().into_opt_bytes()
    }
}

impl PartialEq for Cmd {
    /// Commands compare by arguments only.
    fn eq(&self, other: &Self) -> bool {
        self.args == other.args
    }
}

/// Stamp `err` onto every command in a batch.
pub fn set_cmds_err(cmds: &mut [Cmd], err: &Error) {
    for cmd in cmds {
        cmd.set_err(err.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_builder_agree() {
        let a = Cmd::new(["SET", "key", "value"]);
        let b = Cmd::cmd("SET").arg("key").arg(b"value");
        assert_eq!(a, b);
        assert_eq!(a.args().len(), 3);
        assert_eq!(a.args()[1].as_ref(), b"key");
    }

    #[test]
    fn test_name_is_lowercase() {
        assert_eq!(Cmd::new(["GeT", "k"]).name(), "get");
        assert_eq!(Cmd::new(Vec::<&str>::new()).name(), "");
    }

    #[test]
    fn test_numeric_args() {
        let cmd = Cmd::cmd("EXPIRE").arg("k").arg(30u64).arg(-1i64).arg(1.5f64);
        let args: Vec<&[u8]> = cmd.args().iter().map(|a| a.as_ref()).collect();
        assert_eq!(args, vec![&b"EXPIRE"[..], b"k", b"30", b"-1", b"1.5"]);
    }

    #[test]
    fn test_owned_args() {
        let cmd = Cmd::new([
            Bytes::from_static(b"ECHO"),
            Bytes::from(String::from("hi")),
            Bytes::from(vec![0u8, 1]),
        ]);
        assert_eq!(cmd.args()[2].as_ref(), &[0u8, 1]);
    }

    #[test]
    fn test_not_executed() {
        let cmd = Cmd::new(["PING"]);
        assert!(!cmd.is_done());
        assert!(cmd.val().is_none());
        assert!(cmd.err().is_none());
        assert!(matches!(cmd.result(), Err(Error::NotExecuted)));
        assert!(matches!(cmd.into_result(), Err(Error::NotExecuted)));
    }

    #[test]
    fn test_reply_accessors() {
        let mut cmd = Cmd::new(["INCR", "n"]);
        cmd.set_val(Value::Integer(7));
        assert!(cmd.is_done());
        assert_eq!(cmd.int().unwrap(), 7);
        assert!(cmd.bool().unwrap());
        assert!(matches!(cmd.text(), Err(Error::UnexpectedResponse)));

        cmd.set_err(Error::Redis("WRONGTYPE".into()));
        assert!(cmd.val().is_none());
        assert!(matches!(cmd.err(), Some(Error::Redis(m)) if m == "WRONGTYPE"));
        assert!(matches!(cmd.int(), Err(Error::Redis(_))));
    }

    #[test]
    fn test_bytes_accessor() {
        let mut cmd = Cmd::new(["GET", "k"]);
        cmd.set_val(Value::Nil);
        assert_eq!(cmd.bytes().unwrap(), None);
        cmd.set_val(Value::bulk("v"));
        assert_eq!(cmd.bytes().unwrap().as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn test_set_cmds_err() {
        let mut cmds = vec![Cmd::new(["GET", "a"]), Cmd::new(["GET", "b"])];
        set_cmds_err(&mut cmds, &Error::ConnectionClosed);
        assert!(
            cmds.iter()
                .all(|c| matches!(c.err(), Some(Error::ConnectionClosed)))
        );
    }

    #[test]
    fn test_value_pairs_from_array_and_map() {
        let flat = Value::Array(vec![
            Value::bulk("f1"),
            Value::bulk("v1"),
            Value::bulk("f2"),
            Value::bulk("v2"),
        ]);
        let pairs = flat.into_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0.as_ref(), b"f2");

        let map = Value::Map(vec![(Value::bulk("f"), Value::bulk("v"))]);
        assert_eq!(map.into_pairs().unwrap()[0].1.as_ref(), b"v");

        let odd = Value::Array(vec![Value::bulk("f")]);
        assert!(matches!(odd.into_pairs(), Err(Error::UnexpectedResponse)));
    }

    #[test]
    fn test_value_opt_bytes_array() {
        let v = Value::Array(vec![Value::bulk("a"), Value::Nil]);
        let got = v.into_opt_bytes_array().unwrap();
        assert_eq!(got[0].as_deref(), Some(&b"a"[..]));
        assert!(got[1].is_none());

        let bad = Value::Array(vec![Value::Integer(1)]);
        assert!(bad.into_bytes_array().is_err());
    }

    #[test]
    fn test_value_status() {
        assert!(Value::ok().into_ok().is_ok());
        assert_eq!(Value::ok().into_text().unwrap(), "OK");
        assert!(Value::Integer(1).into_ok().is_err());
    }
}
