//! Command Replies
//!
//! A [`Reply`] is what one command produces. Its `Display` form is the
//! human-readable rendering the shell prints:
//!
//! ```text
//! OK                     status
//! (error) ERR ...        error
//! (integer) 42           integer
//! "hello"                bulk (UTF-8)
//! (binary data, 8 bytes) bulk (anything else)
//! (nil)                  missing value
//! 1) "a"                 array, one element per line
//! ```

use bytes::Bytes;
use std::fmt;

/// The result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status line such as `OK` or `PONG`.
    Status(String),

    /// Error message, conventionally starting with `ERR`.
    Error(String),

    Integer(i64),

    /// A stored value. May hold arbitrary bytes.
    Bulk(Bytes),

    /// Absent value.
    Nil,

    Array(Vec<Reply>),
}

impl Reply {
    /// Common response for successful operations
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn status(s: impl Into<String>) -> Self {
        Reply::Status(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    /// Integer reply of 1 or 0.
    pub fn flag(b: bool) -> Self {
        Reply::Integer(i64::from(b))
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Reply::Nil => write!(f, "(nil)"),
            Reply::Array(values) => {
                if values.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_display() {
        assert_eq!(Reply::ok().to_string(), "OK");
        assert_eq!(
            Reply::error("ERR no such key").to_string(),
            "(error) ERR no such key"
        );
        assert_eq!(Reply::integer(-2).to_string(), "(integer) -2");
        assert_eq!(Reply::flag(true).to_string(), "(integer) 1");
        assert_eq!(Reply::Nil.to_string(), "(nil)");
    }

    #[test]
    fn test_bulk_display() {
        assert_eq!(Reply::bulk(Bytes::from("hello")).to_string(), "\"hello\"");

        let counter = Bytes::from(vec![0xff, 0xfe, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            Reply::bulk(counter).to_string(),
            "(binary data, 8 bytes)"
        );
    }

    #[test]
    fn test_array_display() {
        let reply = Reply::Array(vec![Reply::bulk(Bytes::from("a")), Reply::Nil]);
        assert_eq!(reply.to_string(), "1) \"a\"\n2) (nil)");

        assert_eq!(Reply::Array(vec![]).to_string(), "(empty array)");
    }
}
