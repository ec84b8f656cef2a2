//! Command Handler
//!
//! Executes shell commands against a [`Namespace`]. Every key a command names
//! is a business key; the namespace adds the `root:domain:` prefix.
//!
//! ## Supported Commands
//!
//! ### Value Commands
//! - `SET key value [ttl_ms]` - Store a value
//! - `SETNX key value [ttl_ms]` - Store only if absent
//! - `GET key` - Fetch a value
//! - `DEL key [key ...]` - Delete keys
//! - `EXISTS key` - Check for a live key
//! - `MSET key value [key value ...]` - Store several values atomically
//! - `MGET key [key ...]` - Fetch several values
//!
//! ### Expiration Commands
//! - `TTL key` - Remaining lifetime in ms (-1 persistent, -2 missing)
//! - `EXPIRE key ttl_ms` - Reset the expiration
//! - `PERSIST key` - Remove the expiration
//!
//! ### Namespace Commands
//! - `KEYS [pattern]` - List business keys matching a glob
//! - `CLEAR` - Remove every key in the namespace
//!
//! ### Atomic Commands
//! - `INCR key [delta]` / `DECR key [delta]` - Adjust a counter
//! - `GETSET key value` - Store and return the previous value
//! - `CAS key expected new [ttl_ms]` - Compare and swap
//!
//! ### Shell Commands
//! - `PING [message]`, `DBSIZE`, `INFO`, `HELP`

use crate::commands::Reply;
use crate::namespace::{Namespace, NamespaceBuilder};
use crate::storage::{StorageEngine, StoreError, StoreResult, Ttl};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

const HELP: &[&str] = &[
    "SET key value [ttl_ms]",
    "SETNX key value [ttl_ms]",
    "GET key",
    "DEL key [key ...]",
    "EXISTS key",
    "MSET key value [key value ...]",
    "MGET key [key ...]",
    "TTL key",
    "EXPIRE key ttl_ms",
    "PERSIST key",
    "KEYS [pattern]",
    "CLEAR",
    "INCR key [delta]",
    "DECR key [delta]",
    "GETSET key value",
    "CAS key expected new [ttl_ms]",
    "PING [message]",
    "DBSIZE",
    "INFO",
    "HELP",
    "QUIT",
];

/// Dispatches commands to a namespace over a shared storage engine.
#[derive(Clone)]
pub struct CommandHandler {
    /// Engine the namespace writes to, kept for INFO
    storage: Arc<StorageEngine>,
    namespace: Namespace,
    /// Start time for INFO
    start_time: Instant,
}

impl CommandHandler {
    /// Creates a handler whose namespace is built on `storage`.
    ///
    /// Any backend already set on `namespace` is replaced.
    pub fn new(storage: Arc<StorageEngine>, namespace: NamespaceBuilder) -> Self {
        let namespace = namespace.backend(storage.clone()).build();
        Self {
            storage,
            namespace,
            start_time: Instant::now(),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Splits `line` into arguments and executes it.
    pub fn execute_line(&self, line: &str) -> Reply {
        match split_args(line) {
            Some(args) => self.execute(&args),
            None => Reply::error("ERR unbalanced quotes"),
        }
    }

    /// Executes a command given as its name followed by its arguments.
    pub fn execute(&self, args: &[String]) -> Reply {
        let Some((name, rest)) = args.split_first() else {
            return Reply::error("ERR empty command");
        };

        self.dispatch(&name.to_uppercase(), rest)
    }

    fn dispatch(&self, cmd: &str, args: &[String]) -> Reply {
        match cmd {
            "SET" => self.cmd_set(args),
            "SETNX" => self.cmd_setnx(args),
            "GET" => self.cmd_get(args),
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "MSET" => self.cmd_mset(args),
            "MGET" => self.cmd_mget(args),

            "TTL" => self.cmd_ttl(args),
            "EXPIRE" => self.cmd_expire(args),
            "PERSIST" => self.cmd_persist(args),

            "KEYS" => self.cmd_keys(args),
            "CLEAR" => self.cmd_clear(args),

            "INCR" => self.cmd_incr(args, false),
            "DECR" => self.cmd_incr(args, true),
            "GETSET" => self.cmd_getset(args),
            "CAS" => self.cmd_cas(args),

            "PING" => self.cmd_ping(args),
            "DBSIZE" => self.cmd_dbsize(args),
            "INFO" => self.cmd_info(args),
            "HELP" => self.cmd_help(args),

            _ => Reply::error(format!("ERR unknown command '{}'", cmd)),
        }
    }

    // ========================================================================
    // Value Commands
    // ========================================================================

    /// SET key value [ttl_ms]
    fn cmd_set(&self, args: &[String]) -> Reply {
        if !(2..=3).contains(&args.len()) {
            return wrong_arity("SET");
        }

        let ttl = match optional_ttl(args.get(2)) {
            Ok(ttl) => ttl,
            Err(reply) => return reply,
        };

        reply_with(self.namespace.set(&args[0], args[1].as_bytes(), ttl), |()| {
            Reply::ok()
        })
    }

    /// SETNX key value [ttl_ms]
    fn cmd_setnx(&self, args: &[String]) -> Reply {
        if !(2..=3).contains(&args.len()) {
            return wrong_arity("SETNX");
        }

        let ttl = match optional_ttl(args.get(2)) {
            Ok(ttl) => ttl,
            Err(reply) => return reply,
        };

        reply_with(
            self.namespace.set_nx(&args[0], args[1].as_bytes(), ttl),
            Reply::flag,
        )
    }

    /// GET key
    fn cmd_get(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("GET");
        }

        value_or_nil(self.namespace.get(&args[0]))
    }

    /// DEL key [key ...]
    fn cmd_del(&self, args: &[String]) -> Reply {
        let result = match args {
            [] => return wrong_arity("DEL"),
            [key] => self.namespace.delete(key),
            keys => {
                let keys: Vec<&String> = keys.iter().collect();
                self.namespace.mdel(&keys)
            }
        };

        reply_with(result, |()| Reply::ok())
    }

    /// EXISTS key
    fn cmd_exists(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("EXISTS");
        }

        reply_with(self.namespace.exists(&args[0]), Reply::flag)
    }

    /// MSET key value [key value ...]
    fn cmd_mset(&self, args: &[String]) -> Reply {
        if args.is_empty() || args.len() % 2 != 0 {
            return wrong_arity("MSET");
        }

        let pairs: Vec<(&String, &str)> = args
            .chunks_exact(2)
            .map(|pair| (&pair[0], pair[1].as_str()))
            .collect();

        reply_with(self.namespace.mset(&pairs, Duration::ZERO), |()| {
            Reply::ok()
        })
    }

    /// MGET key [key ...]
    fn cmd_mget(&self, args: &[String]) -> Reply {
        if args.is_empty() {
            return wrong_arity("MGET");
        }

        let keys: Vec<&String> = args.iter().collect();
        reply_with(self.namespace.mget(&keys), |found| {
            Reply::Array(
                args.iter()
                    .map(|key| found.get(key).cloned().map_or(Reply::Nil, Reply::Bulk))
                    .collect(),
            )
        })
    }

    // ========================================================================
    // Expiration Commands
    // ========================================================================

    /// TTL key
    fn cmd_ttl(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("TTL");
        }

        match self.namespace.ttl(&args[0]) {
            Ok(Ttl::Persistent) => Reply::integer(-1),
            Ok(Ttl::Remaining(d)) => {
                Reply::integer(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            }
            Err(StoreError::NotFound) => Reply::integer(-2),
            Err(e) => error_reply(e),
        }
    }

    /// EXPIRE key ttl_ms
    fn cmd_expire(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("EXPIRE");
        }

        let ttl = match parse_ttl(&args[1]) {
            Ok(ttl) => ttl,
            Err(reply) => return reply,
        };

        applied(self.namespace.expire(&args[0], ttl))
    }

    /// PERSIST key
    fn cmd_persist(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("PERSIST");
        }

        applied(self.namespace.persist(&args[0]))
    }

    // ========================================================================
    // Namespace Commands
    // ========================================================================

    /// KEYS [pattern]
    fn cmd_keys(&self, args: &[String]) -> Reply {
        if args.len() > 1 {
            return wrong_arity("KEYS");
        }

        let pattern = args.first().map_or("*", String::as_str);
        reply_with(self.namespace.keys(pattern), |mut keys| {
            keys.sort();
            Reply::Array(keys.into_iter().map(Reply::bulk).collect())
        })
    }

    /// CLEAR
    fn cmd_clear(&self, args: &[String]) -> Reply {
        if !args.is_empty() {
            return wrong_arity("CLEAR");
        }

        reply_with(self.namespace.clear(), |()| Reply::ok())
    }

    // ========================================================================
    // Atomic Commands
    // ========================================================================

    /// INCR key [delta] / DECR key [delta]
    fn cmd_incr(&self, args: &[String], negate: bool) -> Reply {
        let name = if negate { "DECR" } else { "INCR" };
        if !(1..=2).contains(&args.len()) {
            return wrong_arity(name);
        }

        let delta = match args.get(1) {
            Some(arg) => match arg.parse::<i64>() {
                Ok(d) => d,
                Err(_) => return Reply::error("ERR delta is not an integer"),
            },
            None => 1,
        };

        let result = if negate {
            self.namespace.decr(&args[0], delta)
        } else {
            self.namespace.incr(&args[0], delta)
        };
        reply_with(result, Reply::integer)
    }

    /// GETSET key value
    fn cmd_getset(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("GETSET");
        }

        value_or_nil(self.namespace.get_set(&args[0], args[1].as_bytes()))
    }

    /// CAS key expected new [ttl_ms]
    fn cmd_cas(&self, args: &[String]) -> Reply {
        if !(3..=4).contains(&args.len()) {
            return wrong_arity("CAS");
        }

        let ttl = match optional_ttl(args.get(3)) {
            Ok(ttl) => ttl,
            Err(reply) => return reply,
        };

        reply_with(
            self.namespace.compare_and_swap(
                &args[0],
                args[1].as_bytes(),
                args[2].as_bytes(),
                ttl,
            ),
            Reply::flag,
        )
    }

    // ========================================================================
    // Shell Commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[String]) -> Reply {
        match args.first() {
            Some(msg) => Reply::bulk(msg.clone()),
            None => Reply::status("PONG"),
        }
    }

    /// DBSIZE: live keys in this namespace.
    fn cmd_dbsize(&self, _args: &[String]) -> Reply {
        reply_with(self.namespace.keys("*"), |keys| {
            Reply::integer(keys.len() as i64)
        })
    }

    /// INFO
    fn cmd_info(&self, _args: &[String]) -> Reply {
        let stats = self.storage.stats();
        let uptime = self.start_time.elapsed().as_secs();

        let info = format!(
            "# Server\n\
             nskv_version:{}\n\
             os:{}\n\
             uptime_in_seconds:{}\n\
             \n\
             # Namespace\n\
             prefix:{}\n\
             \n\
             # Storage\n\
             entries:{}\n\
             get_ops:{}\n\
             set_ops:{}\n\
             del_ops:{}\n\
             expired_keys:{}",
            crate::VERSION,
            std::env::consts::OS,
            uptime,
            self.namespace.prefix(),
            stats.entries,
            stats.get_ops,
            stats.set_ops,
            stats.del_ops,
            stats.expired,
        );

        Reply::bulk(Bytes::from(info))
    }

    /// HELP
    fn cmd_help(&self, _args: &[String]) -> Reply {
        Reply::Array(HELP.iter().map(|line| Reply::status(*line)).collect())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn wrong_arity(cmd: &str) -> Reply {
    Reply::error(format!("ERR wrong number of arguments for '{}' command", cmd))
}

fn error_reply(err: StoreError) -> Reply {
    match err {
        StoreError::NotFound => Reply::error("ERR no such key"),
        StoreError::TypeMismatch => Reply::error("ERR value is not a counter"),
        e @ StoreError::InvalidPattern(_) => Reply::error(format!("ERR {}", e)),
    }
}

fn reply_with<T>(result: StoreResult<T>, f: impl FnOnce(T) -> Reply) -> Reply {
    match result {
        Ok(v) => f(v),
        Err(e) => error_reply(e),
    }
}

/// Bulk for a value, nil for a missing key.
fn value_or_nil(result: StoreResult<Bytes>) -> Reply {
    match result {
        Ok(v) => Reply::Bulk(v),
        Err(StoreError::NotFound) => Reply::Nil,
        Err(e) => error_reply(e),
    }
}

/// 1 if the key existed and was updated, 0 if it was missing.
fn applied(result: StoreResult<()>) -> Reply {
    match result {
        Ok(()) => Reply::flag(true),
        Err(StoreError::NotFound) => Reply::flag(false),
        Err(e) => error_reply(e),
    }
}

fn parse_ttl(arg: &str) -> Result<Duration, Reply> {
    arg.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| Reply::error("ERR ttl is not a non-negative integer"))
}

fn optional_ttl(arg: Option<&String>) -> Result<Duration, Reply> {
    arg.map_or(Ok(Duration::ZERO), |a| parse_ttl(a))
}

/// Splits a command line on whitespace. Double quotes group words and
/// `\"` or `\\` escape inside them. Returns `None` for an unterminated quote.
pub fn split_args(line: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            return Some(args);
        };

        let mut arg = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next()? {
                    '"' => break,
                    '\\' => match chars.next()? {
                        c @ ('"' | '\\') => arg.push(c),
                        'n' => arg.push('\n'),
                        c => {
                            arg.push('\\');
                            arg.push(c);
                        }
                    },
                    c => arg.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                arg.push(c);
            }
        }
        args.push(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        CommandHandler::new(storage, Namespace::builder("test", "shell"))
    }

    fn bulk(s: &str) -> Reply {
        Reply::bulk(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args("  SET  key   value "),
            Some(vec!["SET".to_string(), "key".into(), "value".into()])
        );
        assert_eq!(
            split_args(r#"SET greeting "hello world" 100"#),
            Some(vec![
                "SET".to_string(),
                "greeting".into(),
                "hello world".into(),
                "100".into()
            ])
        );
        assert_eq!(
            split_args(r#"SET q "say \"hi\"""#),
            Some(vec!["SET".to_string(), "q".into(), "say \"hi\"".into()])
        );
        assert_eq!(split_args(r#"SET "open"#), None);
        assert_eq!(split_args(""), Some(vec![]));
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("PING"), Reply::status("PONG"));
        assert_eq!(handler.execute_line("ping hello"), bulk("hello"));
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("SET key value"), Reply::ok());
        assert_eq!(handler.execute_line("GET key"), bulk("value"));
        assert_eq!(handler.execute_line("GET nonexistent"), Reply::Nil);
    }

    #[test]
    fn test_set_writes_under_namespace() {
        let handler = create_handler();

        handler.execute_line("SET user:1 alice");
        assert!(handler.storage.contains_raw("test:shell:user:1"));
        assert_eq!(handler.namespace().prefix(), "test:shell");
    }

    #[test]
    fn test_set_with_ttl() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("SET temp value 30"), Reply::ok());
        assert!(matches!(
            handler.execute_line("TTL temp"),
            Reply::Integer(ms) if ms > 0 && ms <= 30
        ));

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(handler.execute_line("GET temp"), Reply::Nil);
        assert_eq!(handler.execute_line("TTL temp"), Reply::integer(-2));
    }

    #[test]
    fn test_setnx() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("SETNX lock a"), Reply::integer(1));
        assert_eq!(handler.execute_line("SETNX lock b"), Reply::integer(0));
        assert_eq!(handler.execute_line("GET lock"), bulk("a"));
    }

    #[test]
    fn test_del() {
        let handler = create_handler();

        handler.execute_line("SET key1 value1");
        handler.execute_line("SET key2 value2");
        handler.execute_line("SET key3 value3");

        assert_eq!(handler.execute_line("DEL key1"), Reply::ok());
        assert_eq!(handler.execute_line("DEL key2 key3 missing"), Reply::ok());
        assert_eq!(handler.execute_line("DBSIZE"), Reply::integer(0));
    }

    #[test]
    fn test_exists() {
        let handler = create_handler();

        handler.execute_line("SET key1 value1");

        assert_eq!(handler.execute_line("EXISTS key1"), Reply::integer(1));
        assert_eq!(handler.execute_line("EXISTS nonexistent"), Reply::integer(0));
    }

    #[test]
    fn test_mset_mget() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("MSET k1 v1 k2 v2"), Reply::ok());
        assert_eq!(
            handler.execute_line("MGET k1 k3 k2"),
            Reply::Array(vec![bulk("v1"), Reply::Nil, bulk("v2")])
        );
        assert!(handler.execute_line("MSET k1").is_error());
    }

    #[test]
    fn test_expire_persist() {
        let handler = create_handler();

        handler.execute_line("SET key value");
        assert_eq!(handler.execute_line("TTL key"), Reply::integer(-1));

        assert_eq!(handler.execute_line("EXPIRE key 60000"), Reply::integer(1));
        assert!(matches!(
            handler.execute_line("TTL key"),
            Reply::Integer(ms) if ms > 59_000
        ));

        assert_eq!(handler.execute_line("PERSIST key"), Reply::integer(1));
        assert_eq!(handler.execute_line("TTL key"), Reply::integer(-1));

        assert_eq!(handler.execute_line("EXPIRE missing 100"), Reply::integer(0));
        assert_eq!(handler.execute_line("PERSIST missing"), Reply::integer(0));
        assert!(handler.execute_line("EXPIRE key soon").is_error());
    }

    #[test]
    fn test_keys_sorted_business_keys() {
        let handler = create_handler();

        handler.execute_line("MSET user:2 b user:1 a order:1 c");

        assert_eq!(
            handler.execute_line("KEYS user:*"),
            Reply::Array(vec![bulk("user:1"), bulk("user:2")])
        );
        assert_eq!(
            handler.execute_line("KEYS"),
            Reply::Array(vec![bulk("order:1"), bulk("user:1"), bulk("user:2")])
        );
        assert_eq!(handler.execute_line("KEYS nothing*"), Reply::Array(vec![]));
    }

    #[test]
    fn test_keys_invalid_pattern() {
        let handler = create_handler();

        match handler.execute_line("KEYS [abc") {
            Reply::Error(msg) => assert!(msg.starts_with("ERR invalid pattern")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_clear() {
        let handler = create_handler();

        handler.execute_line("MSET a 1 b 2");
        assert_eq!(handler.execute_line("DBSIZE"), Reply::integer(2));

        assert_eq!(handler.execute_line("CLEAR"), Reply::ok());
        assert_eq!(handler.execute_line("DBSIZE"), Reply::integer(0));
    }

    #[test]
    fn test_incr_decr() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("INCR counter"), Reply::integer(1));
        assert_eq!(handler.execute_line("INCR counter"), Reply::integer(2));
        assert_eq!(handler.execute_line("DECR counter"), Reply::integer(1));
        assert_eq!(handler.execute_line("INCR counter 10"), Reply::integer(11));
        assert_eq!(handler.execute_line("DECR counter 20"), Reply::integer(-9));

        assert_eq!(
            handler.execute_line("GET counter").to_string(),
            "(binary data, 8 bytes)"
        );
        assert!(handler.execute_line("INCR counter x").is_error());
    }

    #[test]
    fn test_incr_type_mismatch() {
        let handler = create_handler();

        handler.execute_line("SET name text");
        assert_eq!(
            handler.execute_line("INCR name"),
            Reply::error("ERR value is not a counter")
        );
    }

    #[test]
    fn test_getset() {
        let handler = create_handler();

        assert_eq!(handler.execute_line("GETSET key v1"), Reply::Nil);
        assert_eq!(handler.execute_line("GET key"), bulk("v1"));
        assert_eq!(handler.execute_line("GETSET key v2"), bulk("v1"));
        assert_eq!(handler.execute_line("GET key"), bulk("v2"));
    }

    #[test]
    fn test_cas() {
        let handler = create_handler();

        handler.execute_line("SET key old");

        assert_eq!(handler.execute_line("CAS key wrong new"), Reply::integer(0));
        assert_eq!(handler.execute_line("CAS key old new"), Reply::integer(1));
        assert_eq!(handler.execute_line("GET key"), bulk("new"));
        assert_eq!(handler.execute_line("CAS missing a b"), Reply::integer(0));
    }

    #[test]
    fn test_info_and_help() {
        let handler = create_handler();

        handler.execute_line("SET key value");

        match handler.execute_line("INFO") {
            Reply::Bulk(data) => {
                let text = String::from_utf8(data.to_vec()).unwrap();
                assert!(text.contains("prefix:test:shell"));
                assert!(text.contains("entries:1"));
            }
            other => panic!("expected bulk, got {:?}", other),
        }

        assert!(matches!(handler.execute_line("HELP"), Reply::Array(lines) if !lines.is_empty()));
    }

    #[test]
    fn test_arity_errors() {
        let handler = create_handler();

        for line in ["SET key", "GET", "DEL", "EXISTS", "TTL", "CAS a b", "CLEAR now"] {
            assert!(handler.execute_line(line).is_error(), "{}", line);
        }
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        assert!(handler.execute_line("UNKNOWN").is_error());
        assert!(handler.execute(&[]).is_error());
        assert!(handler.execute_line("SET \"broken").is_error());
    }
}
