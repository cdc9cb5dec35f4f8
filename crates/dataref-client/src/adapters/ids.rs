//! Request id sources.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{CodecError, RequestId};
use crate::ports::RequestIdSource;

/// Random 128-bit ids. The default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestIds;

impl RequestIdSource for UuidRequestIds {
    fn next_id(&self) -> RequestId {
        RequestId::generate()
    }
}

/// Deterministic ids `req1`, `req2`, ... for tests and readable traces.
#[derive(Debug)]
pub struct SequentialRequestIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialRequestIds {
    pub fn new() -> Self {
        Self {
            prefix: "req".to_string(),
            next: AtomicU64::new(1),
        }
    }

    /// Ids of the form `{prefix}{n}`, starting at 1.
    pub fn with_prefix(prefix: &str) -> Result<Self, CodecError> {
        RequestId::parse(&format!("{prefix}1"))?;
        Ok(Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        })
    }
}

impl Default for SequentialRequestIds {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdSource for SequentialRequestIds {
    fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        // Prefix validated in `with_prefix`.
        RequestId::parse(&format!("{}{n}", self.prefix)).unwrap_or_else(|_| RequestId::generate())
    }
}
