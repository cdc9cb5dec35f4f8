//! Outbound Ports (Driven Ports)
//!
//! Dependencies the client needs from the outside world: a way to move
//! datagrams to and from the responder, and a source of request ids.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{RequestId, TransportError};

/// One datagram endpoint pinned to a single remote responder.
///
/// Implementations never retry. A send is one datagram; a receive returns
/// exactly one datagram's bytes.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram to the remote endpoint.
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `timeout`, measured from this call, for one datagram.
    async fn receive_within(&self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Deadline applied by [`DatagramTransport::receive`].
    fn read_timeout(&self) -> Duration;

    /// Wait up to the configured read timeout for one datagram.
    async fn receive(&self) -> Result<Vec<u8>, TransportError> {
        self.receive_within(self.read_timeout()).await
    }
}

/// Source of request ids.
///
/// Ids only need to be unique among requests in flight at the same time;
/// the correlator rejects and redraws any id that is already pending.
pub trait RequestIdSource: Send + Sync {
    fn next_id(&self) -> RequestId;
}
