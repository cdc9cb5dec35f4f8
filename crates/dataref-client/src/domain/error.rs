//! Error taxonomy for the dataref client.
//!
//! - `TransportError`: socket-level failures, always surfaced to the caller.
//! - `CodecError`: wire text that cannot be encoded or decoded.
//! - `ClientError`: what a read returns; wraps the two above plus
//!   correlator-level failures.
//!
//! A response that matches no pending request is not an error at all. The
//! correlator reports it as a `false` return and the datagram is dropped.

use std::time::Duration;
use thiserror::Error;

use crate::domain::config::ConfigError;
use crate::domain::types::DataRefType;

/// Failures of the UDP endpoint.
///
/// Every variant carries owned text so the error can be cloned and fanned
/// out to several waiting callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid remote address {address}: {reason}")]
    AddressInvalid { address: String, reason: String },

    #[error("failed to bind local UDP socket: {0}")]
    BindFailed(String),

    #[error("failed to send datagram: {0}")]
    SendFailed(String),

    #[error("payload of {size} bytes exceeds the {max}-byte datagram limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The datagram was refused whole. `head` keeps its leading bytes so the
    /// receiver can still tell which request it answered.
    #[error("datagram exceeds the {max}-byte limit")]
    DatagramTooLarge { max: usize, head: Vec<u8> },

    #[error("failed to receive datagram: {0}")]
    ReceiveFailed(String),
}

/// Leading bytes of an oversize datagram kept for routing.
pub const OVERSIZE_HEAD_LEN: usize = 256;

impl TransportError {
    /// Oversize-datagram error keeping the leading bytes of `bytes`.
    pub fn datagram_too_large(bytes: &[u8], max: usize) -> Self {
        TransportError::DatagramTooLarge {
            max,
            head: bytes[..bytes.len().min(OVERSIZE_HEAD_LEN)].to_vec(),
        }
    }

    /// True when only this datagram was bad and the socket itself is fine.
    pub fn is_per_datagram(&self) -> bool {
        matches!(self, TransportError::DatagramTooLarge { .. })
    }
}

/// Failures translating between wire text and domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unknown dataref type tag: {0:?}")]
    UnknownType(String),

    #[error("cannot parse {value:?} as {data_type}: {reason}")]
    ValueParse {
        data_type: DataRefType,
        value: String,
        reason: String,
    },

    #[error("invalid dataref name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
}

/// Error returned by a dataref read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("too many requests in flight (limit {max})")]
    Saturated { max: usize },

    #[error("expected a {expected} value, got {actual}")]
    TypeMismatch {
        expected: DataRefType,
        actual: &'static str,
    },

    #[error("request id source kept returning ids already in flight (last: {0})")]
    IdCollision(String),

    #[error("client is shutting down")]
    ShuttingDown,
}

impl ClientError {
    /// True when the read failed only because no matching response arrived in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(TransportError::Timeout(_)))
    }
}
