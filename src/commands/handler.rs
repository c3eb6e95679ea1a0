//! Command Dispatch
//!
//! Translates wire frames into [`ValueStore`] calls and store results back
//! into reply frames. This is the boundary where TTL strings are parsed,
//! argument counts are checked, and `StoreError`s become tagged error
//! replies (`NOTFOUND ...`, `EXPIRED ...`).
//!
//! ## Verbs
//!
//! | verb | arguments | reply |
//! |---|---|---|
//! | `SET` | key value \[ttl\] | `+ok` |
//! | `GET` | key | `[value, expires_at]` |
//! | `GETPREFIX` | prefix | array of `[key, value, expires_at]` |
//! | `GETALL` | - | array of `[key, value, expires_at]` |
//! | `LPUSH` / `RPUSH` | key value \[ttl\] | `+ok` |
//! | `GETLIST` | key | `[expires_at, [items...]]` |
//! | `HMSET` | key field value \[ttl\] | `+ok` |
//! | `GETMAP` | key | `[expires_at, [field, value, ...]]` |
//! | `DEL` | key | `+ok` |
//! | `DELALL` | - | `+ok` |
//! | `PING` | \[message\] | `+pong` or the message |
//! | `DBSIZE` | - | entry count |
//!
//! A TTL argument is a duration-from-now such as `20s`, `2m10s`, or
//! `300ms`. A non-positive or unparsable duration silently means "never
//! expires". When the argument is omitted entirely, the store's
//! configured default TTL applies instead.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::protocol::Frame;
use crate::storage::{StoreError, ValueStore};

/// Executes parsed commands against the store.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<ValueStore>,
}

impl CommandHandler {
    pub fn new(store: Arc<ValueStore>) -> Self {
        Self { store }
    }

    /// Executes one command frame and returns the reply frame.
    pub fn execute(&self, frame: Frame) -> Frame {
        let args = match frame {
            Frame::Array(args) => args,
            _ => return Frame::error("ERR commands must be arrays"),
        };
        let Some(verb) = args.first().and_then(Frame::as_text) else {
            return Frame::error("ERR missing command verb");
        };
        let verb = verb.to_uppercase();
        debug!(verb = %verb, args = args.len() - 1, "dispatching command");
        self.dispatch(&verb, &args[1..])
    }

    fn dispatch(&self, verb: &str, args: &[Frame]) -> Frame {
        match verb {
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "GETPREFIX" => self.cmd_get_prefix(args),
            "GETALL" => self.cmd_get_all(args),
            "LPUSH" => self.cmd_push(args, true),
            "RPUSH" => self.cmd_push(args, false),
            "GETLIST" => self.cmd_get_list(args),
            "HMSET" => self.cmd_hmset(args),
            "GETMAP" => self.cmd_get_map(args),
            "DEL" => self.cmd_del(args),
            "DELALL" => self.cmd_del_all(args),
            "PING" => self.cmd_ping(args),
            "DBSIZE" => self.cmd_dbsize(args),
            _ => Frame::error(format!("ERR unknown command '{verb}'")),
        }
    }

    // ------------------------------------------------------------------
    // Scalar verbs
    // ------------------------------------------------------------------

    /// `SET key value [ttl]`
    fn cmd_set(&self, args: &[Frame]) -> Frame {
        if args.len() < 2 || args.len() > 3 {
            return wrong_args("SET");
        }
        let (Some(key), Some(value)) = (key_text(&args[0]), args[1].as_text()) else {
            return Frame::error("ERR key and value must be non-empty strings");
        };
        let ttl = self.ttl_argument(args.get(2));
        self.store.set_scalar(key, value.to_string(), ttl);
        Frame::ok()
    }

    /// `GET key`
    fn cmd_get(&self, args: &[Frame]) -> Frame {
        let [key] = args else {
            return wrong_args("GET");
        };
        let Some(key) = key_text(key) else {
            return Frame::error("ERR key must be a non-empty string");
        };
        match self.store.get_scalar(key) {
            Ok((data, expires_at)) => {
                Frame::Array(vec![Frame::bulk(data), Frame::Integer(expires_at)])
            }
            Err(err) => failure(err),
        }
    }

    /// `GETPREFIX prefix`
    fn cmd_get_prefix(&self, args: &[Frame]) -> Frame {
        let [prefix] = args else {
            return wrong_args("GETPREFIX");
        };
        let Some(prefix) = prefix.as_text() else {
            return Frame::error("ERR prefix must be a string");
        };
        match self.store.get_by_prefix(prefix) {
            Ok(entries) => entry_rows(entries),
            Err(err) => failure(err),
        }
    }

    /// `GETALL`
    fn cmd_get_all(&self, args: &[Frame]) -> Frame {
        if !args.is_empty() {
            return wrong_args("GETALL");
        }
        match self.store.get_all() {
            Ok(entries) => entry_rows(entries),
            Err(err) => failure(err),
        }
    }

    // ------------------------------------------------------------------
    // List verbs
    // ------------------------------------------------------------------

    /// `LPUSH key value [ttl]` / `RPUSH key value [ttl]`
    fn cmd_push(&self, args: &[Frame], front: bool) -> Frame {
        let verb = if front { "LPUSH" } else { "RPUSH" };
        if args.len() < 2 || args.len() > 3 {
            return wrong_args(verb);
        }
        let (Some(key), Some(value)) = (key_text(&args[0]), args[1].as_text()) else {
            return Frame::error("ERR key and value must be non-empty strings");
        };
        let ttl = self.ttl_argument(args.get(2));
        let result = if front {
            self.store.lpush(key, value.to_string(), ttl)
        } else {
            self.store.rpush(key, value.to_string(), ttl)
        };
        match result {
            Ok(()) => Frame::ok(),
            Err(err) => failure(err),
        }
    }

    /// `GETLIST key`
    fn cmd_get_list(&self, args: &[Frame]) -> Frame {
        let [key] = args else {
            return wrong_args("GETLIST");
        };
        let Some(key) = key_text(key) else {
            return Frame::error("ERR key must be a non-empty string");
        };
        match self.store.get_list(key) {
            Ok((items, expires_at)) => Frame::Array(vec![
                Frame::Integer(expires_at),
                Frame::Array(items.into_iter().map(Frame::bulk).collect()),
            ]),
            Err(err) => failure(err),
        }
    }

    // ------------------------------------------------------------------
    // Map verbs
    // ------------------------------------------------------------------

    /// `HMSET key field value [ttl]`
    fn cmd_hmset(&self, args: &[Frame]) -> Frame {
        if args.len() < 3 || args.len() > 4 {
            return wrong_args("HMSET");
        }
        let (Some(key), Some(field), Some(value)) =
            (key_text(&args[0]), args[1].as_text(), args[2].as_text())
        else {
            return Frame::error("ERR key, field and value must be non-empty strings");
        };
        let ttl = self.ttl_argument(args.get(3));
        match self
            .store
            .hmset(key, field.to_string(), value.to_string(), ttl)
        {
            Ok(()) => Frame::ok(),
            Err(err) => failure(err),
        }
    }

    /// `GETMAP key`
    fn cmd_get_map(&self, args: &[Frame]) -> Frame {
        let [key] = args else {
            return wrong_args("GETMAP");
        };
        let Some(key) = key_text(key) else {
            return Frame::error("ERR key must be a non-empty string");
        };
        match self.store.get_map(key) {
            Ok((fields, expires_at)) => {
                let mut flat = Vec::with_capacity(fields.len() * 2);
                for (field, value) in fields {
                    flat.push(Frame::bulk(field));
                    flat.push(Frame::bulk(value));
                }
                Frame::Array(vec![Frame::Integer(expires_at), Frame::Array(flat)])
            }
            Err(err) => failure(err),
        }
    }

    // ------------------------------------------------------------------
    // Deletion and server verbs
    // ------------------------------------------------------------------

    /// `DEL key` - always replies ok, present or not.
    fn cmd_del(&self, args: &[Frame]) -> Frame {
        let [key] = args else {
            return wrong_args("DEL");
        };
        let Some(key) = key_text(key) else {
            return Frame::error("ERR key must be a non-empty string");
        };
        self.store.delete_key(key);
        Frame::ok()
    }

    /// `DELALL`
    fn cmd_del_all(&self, args: &[Frame]) -> Frame {
        if !args.is_empty() {
            return wrong_args("DELALL");
        }
        self.store.delete_all();
        Frame::ok()
    }

    /// `PING [message]`
    fn cmd_ping(&self, args: &[Frame]) -> Frame {
        match args {
            [] => Frame::Simple("pong".to_string()),
            [msg] => msg.clone(),
            _ => wrong_args("PING"),
        }
    }

    /// `DBSIZE` - physically present entries, swept or not.
    fn cmd_dbsize(&self, args: &[Frame]) -> Frame {
        if !args.is_empty() {
            return wrong_args("DBSIZE");
        }
        Frame::Integer(self.store.len() as i64)
    }

    /// Resolves the optional TTL argument: present means parse it (with
    /// unparsable/non-positive meaning "never"), absent means the store's
    /// configured default.
    fn ttl_argument(&self, arg: Option<&Frame>) -> Option<Duration> {
        match arg {
            Some(frame) => frame.as_text().and_then(parse_ttl),
            None => self.store.default_ttl(),
        }
    }
}

/// Rows of `(key, value, expires_at)` for the scan verbs.
fn entry_rows(entries: Vec<(String, String, i64)>) -> Frame {
    Frame::Array(
        entries
            .into_iter()
            .map(|(key, value, expires_at)| {
                Frame::Array(vec![
                    Frame::bulk(key),
                    Frame::bulk(value),
                    Frame::Integer(expires_at),
                ])
            })
            .collect(),
    )
}

fn failure(err: StoreError) -> Frame {
    match err {
        StoreError::NotFound => Frame::error(format!("NOTFOUND {err}")),
        StoreError::Expired => Frame::error(format!("EXPIRED {err}")),
    }
}

fn wrong_args(verb: &str) -> Frame {
    Frame::error(format!("ERR wrong number of arguments for '{verb}'"))
}

/// Keys are non-empty strings; everything else is rejected at this
/// boundary so the index never sees a degenerate key.
fn key_text(frame: &Frame) -> Option<&str> {
    frame.as_text().filter(|key| !key.is_empty())
}

/// Parses a duration-from-now TTL such as `20s`, `2m10s`, or `300ms`.
///
/// Accepted units are `ns`, `us`, `ms`, `s`, `m`, `h`, in any
/// combination of `<count><unit>` segments. Anything else - including a
/// bare number, an unknown unit, or a leading sign - yields `None`,
/// which callers treat as "never expires" rather than an error.
pub fn parse_ttl(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return None;
    }

    let bytes = s.as_bytes();
    let mut i = 0;
    let mut total_nanos: u64 = 0;
    while i < bytes.len() {
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let count: u64 = s[digits_start..i].parse().ok()?;

        let unit_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_digit() {
            i += 1;
        }
        let unit_nanos: u64 = match &s[unit_start..i] {
            "ns" => 1,
            "us" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };
        total_nanos = total_nanos.checked_add(count.checked_mul(unit_nanos)?)?;
    }

    if total_nanos == 0 {
        None
    } else {
        Some(Duration::from_nanos(total_nanos))
    }
}
