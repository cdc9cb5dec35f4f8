//! Per-call dataref reader.
//!
//! No background task: each read sends its request, then receives on the
//! caller's task until its own response arrives or the deadline passes.
//! Reads are serialized, so at most one request is ever in flight and
//! anything else that arrives meanwhile is discarded.
//!
//! A read's deadline starts when it is called, not when it gets the socket,
//! so concurrent callers against a silent host all time out after about one
//! `read_timeout`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapters::{UdpTransport, UuidRequestIds};
use crate::domain::codec;
use crate::domain::{
    ClientConfig, ClientError, DataRefName, DataRefResponse, DataRefStore, DataRefType,
    DataRefValue, RequestId, TransportError,
};
use crate::ports::{DataRefReader, DatagramTransport, RequestIdSource};
use crate::service::correlator::{Correlator, CorrelatorStats, Submission};

/// Dataref reader that receives inline, one exchange at a time.
pub struct DirectReader {
    transport: Arc<dyn DatagramTransport>,
    correlator: Correlator,
    read_timeout: Duration,
    accept_legacy: bool,
    exchange: Mutex<()>,
}

impl DirectReader {
    pub fn new(transport: Arc<dyn DatagramTransport>) -> Self {
        let read_timeout = transport.read_timeout();
        Self {
            correlator: Correlator::new(Arc::new(UuidRequestIds), read_timeout),
            transport,
            read_timeout,
            accept_legacy: false,
            exchange: Mutex::new(()),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn RequestIdSource>) -> Self {
        let mut correlator = Correlator::new(ids, self.read_timeout)
            .with_max_in_flight(self.correlator.max_in_flight());
        if let Some(store) = self.correlator.store() {
            correlator = correlator.with_store(Arc::clone(store));
        }
        self.correlator = correlator;
        self
    }

    pub fn with_store(mut self, store: Arc<DataRefStore>) -> Self {
        self.correlator = self.correlator.with_store(store);
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.correlator = self.correlator.with_max_in_flight(max_in_flight);
        self
    }

    /// Match id-less responses to the current read by arrival order.
    pub fn accept_legacy_responses(mut self, accept: bool) -> Self {
        self.accept_legacy = accept;
        self
    }

    /// Open a UDP transport to the configured host.
    pub async fn connect(
        config: &ClientConfig,
        store: Option<Arc<DataRefStore>>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let transport =
            UdpTransport::open(&config.host, config.port, config.read_timeout).await?;

        info!(remote = %transport.remote_addr(), "Direct dataref reader connected");

        let mut reader = Self::new(Arc::new(transport))
            .with_max_in_flight(config.max_in_flight)
            .accept_legacy_responses(config.accept_legacy_responses);
        if let Some(store) = store {
            reader = reader.with_store(store);
        }
        Ok(reader)
    }

    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn stats(&self) -> &CorrelatorStats {
        self.correlator.stats()
    }

    pub fn store(&self) -> Option<&Arc<DataRefStore>> {
        self.correlator.store()
    }

    fn handle_datagram(&self, current: &RequestId, bytes: &[u8]) {
        match codec::decode_response(bytes) {
            Ok(DataRefResponse {
                request_id: Some(id),
                data_type,
                value,
            }) => {
                self.correlator.complete(&id, data_type, value);
            }
            Ok(DataRefResponse {
                request_id: None,
                data_type,
                value,
            }) if self.accept_legacy => {
                debug!(request_id = %current, "Matching legacy response by arrival order");
                self.correlator.complete(current, data_type, value);
            }
            Ok(DataRefResponse { request_id: None, .. }) => {
                debug!("Dropping legacy response without request id");
            }
            Err(e) => match codec::peek_request_id(bytes) {
                Some(id) => {
                    self.correlator.fail(&id, e.into());
                }
                None => warn!(error = %e, bytes = bytes.len(), "Dropping undecodable datagram"),
            },
        }
    }

    fn handle_oversize(&self, error: TransportError) {
        let TransportError::DatagramTooLarge { head, .. } = &error else {
            return;
        };
        match codec::peek_request_id(head) {
            Some(id) => {
                self.correlator.fail(&id, ClientError::Transport(error.clone()));
            }
            None => warn!(error = %error, "Dropping oversize datagram without request id"),
        }
    }
}

/// Cancels a submitted request when the read future is dropped early.
struct AbandonGuard<'a> {
    correlator: &'a Correlator,
    id: RequestId,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.correlator.cancel(&self.id) {
            debug!(request_id = %self.id, "Released abandoned read");
        }
    }
}

#[async_trait]
impl DataRefReader for DirectReader {
    async fn read(
        &self,
        name: &DataRefName,
        data_type: DataRefType,
    ) -> Result<DataRefValue, ClientError> {
        let deadline = Instant::now() + self.read_timeout;
        let Ok(_exchange) = tokio::time::timeout_at(deadline, self.exchange.lock()).await else {
            debug!(dataref = %name, "Deadline passed while queued behind another read");
            return Err(TransportError::Timeout(self.read_timeout).into());
        };

        let Submission { id, receiver } =
            self.correlator.submit(name, data_type, Some(self.read_timeout))?;
        let _guard = AbandonGuard {
            correlator: &self.correlator,
            id: id.clone(),
        };

        let request = codec::encode_request(&id, name, data_type);
        if let Err(e) = self.transport.send(&request).await {
            let error = ClientError::from(e);
            self.correlator.fail(&id, error.clone());
            return Err(error);
        }

        debug!(request_id = %id, dataref = %name, "Sent read request");

        while self.correlator.is_pending(&id) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.correlator.expire(&id);
                break;
            }

            match self.transport.receive_within(remaining).await {
                Ok(bytes) => self.handle_datagram(&id, &bytes),
                Err(TransportError::Timeout(_)) => {
                    self.correlator.expire(&id);
                }
                Err(e) if e.is_per_datagram() => self.handle_oversize(e),
                Err(e) => {
                    self.correlator.fail(&id, e.into());
                }
            }
        }

        receiver.await.unwrap_or(Err(ClientError::ShuttingDown))
    }
}
