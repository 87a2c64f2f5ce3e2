//! Transport abstraction: one remote procedure call, body or fault.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

/// A positional argument of a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Int(v) => write!(f, "{}", v),
            CallArg::Str(s) => write!(f, "{:?}", s),
            CallArg::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for CallArg {
    fn from(v: i64) -> Self {
        CallArg::Int(v)
    }
}

impl From<i32> for CallArg {
    fn from(v: i32) -> Self {
        CallArg::Int(i64::from(v))
    }
}

impl From<u32> for CallArg {
    fn from(v: u32) -> Self {
        CallArg::Int(i64::from(v))
    }
}

impl From<bool> for CallArg {
    fn from(v: bool) -> Self {
        CallArg::Bool(v)
    }
}

impl From<&str> for CallArg {
    fn from(v: &str) -> Self {
        CallArg::Str(v.to_string())
    }
}

impl From<String> for CallArg {
    fn from(v: String) -> Self {
        CallArg::Str(v)
    }
}

/// Build a `Vec<CallArg>` from heterogeneous values.
#[macro_export]
macro_rules! args {
    () => { Vec::<$crate::transport::CallArg>::new() };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::transport::CallArg::from($arg)),+]
    };
}

/// Remote procedure transport.
///
/// Implementations send `method` with `args` and return the response body
/// on success. A control plane fault, a failed call or an I/O error is
/// returned as [`ClientError::Transport`](crate::ClientError::Transport)
/// with its message untouched. No retries happen at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one call.
    async fn call(&self, method: &str, args: Vec<CallArg>) -> Result<String>;
}
