//! In-memory datagram transport.
//!
//! A bounded mpsc pair standing in for the UDP socket, so the correlator and
//! both client models can be exercised without touching the network. The
//! `ChannelPeer` end plays the responder.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use crate::domain::{TransportError, MAX_REQUEST_SIZE, MAX_RESPONSE_SIZE};
use crate::ports::DatagramTransport;

/// Client side of an in-memory datagram pair.
pub struct ChannelTransport {
    outbound: mpsc::Sender<Vec<u8>>,
    inbound: Mutex<mpsc::Receiver<Vec<u8>>>,
    read_timeout: Duration,
}

/// Responder side of an in-memory datagram pair.
pub struct ChannelPeer {
    requests: mpsc::Receiver<Vec<u8>>,
    responses: mpsc::Sender<Vec<u8>>,
}

/// Create a connected transport/peer pair.
pub fn channel_pair(buffer: usize, read_timeout: Duration) -> (ChannelTransport, ChannelPeer) {
    let (req_tx, req_rx) = mpsc::channel(buffer);
    let (resp_tx, resp_rx) = mpsc::channel(buffer);

    let transport = ChannelTransport {
        outbound: req_tx,
        inbound: Mutex::new(resp_rx),
        read_timeout,
    };
    let peer = ChannelPeer {
        requests: req_rx,
        responses: resp_tx,
    };
    (transport, peer)
}

#[async_trait]
impl DatagramTransport for ChannelTransport {
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_REQUEST_SIZE {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_REQUEST_SIZE,
            });
        }
        self.outbound
            .send(payload.to_vec())
            .await
            .map_err(|_| TransportError::SendFailed("peer closed".into()))
    }

    async fn receive_within(&self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        match tokio::time::timeout(timeout, inbound.recv()).await {
            Ok(Some(bytes)) if bytes.len() > MAX_RESPONSE_SIZE => Err(
                TransportError::datagram_too_large(&bytes, MAX_RESPONSE_SIZE),
            ),
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(TransportError::ReceiveFailed("peer closed".into())),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl ChannelPeer {
    /// Next datagram the client sent, `None` once the client is gone.
    pub async fn recv_request(&mut self) -> Option<Vec<u8>> {
        self.requests.recv().await
    }

    /// Deliver a datagram to the client. Returns false if the client is gone.
    pub async fn send_response(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.responses.send(bytes.into()).await.is_ok()
    }
}
