//! UDP transport adapter.
//!
//! Binds an ephemeral local port in the remote's address family and talks
//! to exactly one remote responder. The socket stays unconnected: datagrams
//! from any other source are dropped here, and an ICMP port-unreachable from
//! a missing responder never turns into a receive error. A silent host reads
//! as a timeout.

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::domain::{TransportError, MAX_REQUEST_SIZE, MAX_RESPONSE_SIZE};
use crate::ports::DatagramTransport;

/// UDP endpoint pinned to one responder.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
    read_timeout: Duration,
}

impl UdpTransport {
    /// Resolve `host:port` and bind a local ephemeral port.
    ///
    /// # Errors
    ///
    /// - `AddressInvalid` if the host does not resolve
    /// - `BindFailed` if no local socket can be bound
    pub async fn open(
        host: &str,
        port: u16,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let address = format!("{host}:{port}");
        let remote = lookup_host(address.as_str())
            .await
            .map_err(|e| TransportError::AddressInvalid {
                address: address.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| TransportError::AddressInvalid {
                address: address.clone(),
                reason: "host resolved to no addresses".into(),
            })?;

        Self::bind_for(remote, read_timeout).await
    }

    /// Bind a local ephemeral port for an already-resolved remote.
    pub async fn bind_for(
        remote: SocketAddr,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        debug!(
            local = ?socket.local_addr().ok(),
            remote = %remote,
            "Opened UDP transport"
        );

        Ok(Self {
            socket,
            remote,
            read_timeout,
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket
            .local_addr()
            .map_err(|e| TransportError::BindFailed(e.to_string()))
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_REQUEST_SIZE {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_REQUEST_SIZE,
            });
        }

        let sent = self
            .socket
            .send_to(payload, self.remote)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        if sent != payload.len() {
            return Err(TransportError::SendFailed(format!(
                "short send: {sent} of {} bytes",
                payload.len()
            )));
        }

        trace!(remote = %self.remote, bytes = sent, "Sent datagram");
        Ok(())
    }

    async fn receive_within(&self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + timeout;
        // One spare byte so an oversized datagram is detected, not truncated.
        let mut buf = vec![0u8; MAX_RESPONSE_SIZE + 1];

        loop {
            let (len, source) =
                match tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                    Ok(Ok(received)) => received,
                    Ok(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                    Err(_) => return Err(TransportError::Timeout(timeout)),
                };

            if source != self.remote {
                debug!(source = %source, remote = %self.remote, "Dropping datagram from unexpected source");
                continue;
            }

            if len > MAX_RESPONSE_SIZE {
                debug!(remote = %self.remote, "Refusing oversize datagram");
                return Err(TransportError::datagram_too_large(
                    &buf[..len],
                    MAX_RESPONSE_SIZE,
                ));
            }

            trace!(remote = %self.remote, bytes = len, "Received datagram");
            buf.truncate(len);
            return Ok(buf);
        }
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}
