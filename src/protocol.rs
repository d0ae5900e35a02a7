// src/protocol.rs

//! Typed replies and their RESP wire encoding.
//!
//! The engine hands one `Reply` back per command; the network layer
//! serializes it unchanged. Errors are already formatted strings here
//! (see `CommandError::reply_message`), so encoding is purely mechanical.

/// Everything a command can evaluate to.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Status line, e.g. OK / PONG / QUEUED
    Simple(String),
    /// Error line, sent verbatim
    Error(String),
    Integer(i64),
    /// Binary-safe value; GET of a bit-twiddled key may be non-UTF8
    Bulk(Vec<u8>),
    Array(Vec<Reply>),
    /// Absent value / empty EXEC
    Nil,
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Simple("OK".into())
    }

    pub fn bulk(s: impl Into<Vec<u8>>) -> Reply {
        Reply::Bulk(s.into())
    }

    /// RESP encoding: +simple, -error, :integer, $bulk, *array, $-1 nil.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                out.push(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Error(msg) => {
                out.push(b'-');
                out.extend_from_slice(msg.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Integer(n) => {
                out.push(b':');
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Bulk(data) => {
                out.push(b'$');
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
            Reply::Array(items) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.encode(out);
                }
            }
            Reply::Nil => {
                out.extend_from_slice(b"$-1\r\n");
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}
