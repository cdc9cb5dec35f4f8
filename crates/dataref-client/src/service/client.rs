//! Background-receive dataref client.
//!
//! One `ResponseListener` task owns the receive side of the transport and
//! hands each decoded response to the correlator. Any number of reads may be
//! in flight at once; each caller only ever sees its own response.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::{UdpTransport, UuidRequestIds};
use crate::domain::codec;
use crate::domain::{
    ClientConfig, ClientError, DataRefName, DataRefResponse, DataRefStore, DataRefType,
    DataRefValue, TransportError,
};
use crate::ports::{DataRefReader, DatagramTransport, RequestIdSource};
use crate::service::correlator::{sweep_task, Correlator, CorrelatorStats, Submission};

/// Pause after a hard receive error before trying again.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Builder for [`DataRefClient`].
pub struct DataRefClientBuilder {
    transport: Arc<dyn DatagramTransport>,
    ids: Arc<dyn RequestIdSource>,
    read_timeout: Duration,
    max_in_flight: usize,
    sweep_interval: Duration,
    store: Option<Arc<DataRefStore>>,
}

impl DataRefClientBuilder {
    pub fn ids(mut self, ids: Arc<dyn RequestIdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn store(mut self, store: Arc<DataRefStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Spawn the listener and sweeper tasks. Must run inside a Tokio runtime.
    pub fn start(self) -> DataRefClient {
        let mut correlator = Correlator::new(self.ids, self.read_timeout)
            .with_max_in_flight(self.max_in_flight);
        if let Some(store) = self.store {
            correlator = correlator.with_store(store);
        }
        let correlator = Arc::new(correlator);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = ResponseListener {
            correlator: Arc::clone(&correlator),
            transport: Arc::clone(&self.transport),
            shutdown: shutdown_rx.clone(),
        };
        let tasks = vec![
            tokio::spawn(listener.run()),
            tokio::spawn(sweep_task(
                Arc::clone(&correlator),
                self.sweep_interval,
                shutdown_rx,
            )),
        ];

        DataRefClient {
            transport: self.transport,
            correlator,
            read_timeout: self.read_timeout,
            shutdown: shutdown_tx,
            tasks: Mutex::new(tasks),
        }
    }
}

/// Dataref client with a background receive loop.
pub struct DataRefClient {
    transport: Arc<dyn DatagramTransport>,
    correlator: Arc<Correlator>,
    read_timeout: Duration,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DataRefClient {
    pub fn builder(transport: Arc<dyn DatagramTransport>) -> DataRefClientBuilder {
        let read_timeout = transport.read_timeout();
        DataRefClientBuilder {
            transport,
            ids: Arc::new(UuidRequestIds),
            read_timeout,
            max_in_flight: 1024,
            sweep_interval: Duration::from_secs(1),
            store: None,
        }
    }

    /// Open a UDP transport to the configured host and start the client.
    pub async fn connect(
        config: &ClientConfig,
        store: Option<Arc<DataRefStore>>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let transport =
            UdpTransport::open(&config.host, config.port, config.read_timeout).await?;

        info!(remote = %transport.remote_addr(), "Dataref client connected");

        let mut builder = Self::builder(Arc::new(transport))
            .max_in_flight(config.max_in_flight)
            .sweep_interval(config.sweep_interval);
        if let Some(store) = store {
            builder = builder.store(store);
        }
        Ok(builder.start())
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

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop the background tasks and fail every read still in flight.
    pub async fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }

        let failed = self.correlator.fail_all(ClientError::ShuttingDown);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Client task ended abnormally");
            }
        }

        info!(failed_reads = failed, "Dataref client shut down");
    }
}

impl Drop for DataRefClient {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

#[async_trait]
impl DataRefReader for DataRefClient {
    async fn read(
        &self,
        name: &DataRefName,
        data_type: DataRefType,
    ) -> Result<DataRefValue, ClientError> {
        if self.is_shut_down() {
            return Err(ClientError::ShuttingDown);
        }

        let Submission { id, mut receiver } =
            self.correlator.submit(name, data_type, Some(self.read_timeout))?;

        let request = codec::encode_request(&id, name, data_type);
        if let Err(e) = self.transport.send(&request).await {
            let error = ClientError::from(e);
            self.correlator.fail(&id, error.clone());
            return Err(error);
        }

        debug!(request_id = %id, dataref = %name, "Sent read request");

        match tokio::time::timeout(self.read_timeout, &mut receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ShuttingDown),
            Err(_) => {
                // Either this expires the request, or a response won the race
                // and is already in the channel.
                self.correlator.expire(&id);
                receiver.await.unwrap_or(Err(ClientError::ShuttingDown))
            }
        }
    }
}

/// Receive loop resolving pending requests from incoming datagrams.
pub(crate) struct ResponseListener {
    correlator: Arc<Correlator>,
    transport: Arc<dyn DatagramTransport>,
    shutdown: watch::Receiver<bool>,
}

impl ResponseListener {
    /// Run the listener loop
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!("Response listener stopping");
                        break;
                    }
                }
                received = self.transport.receive() => match received {
                    Ok(bytes) => self.handle_datagram(&bytes),
                    // Idle, nothing arrived this period.
                    Err(TransportError::Timeout(_)) => {}
                    Err(e) if e.is_per_datagram() => self.handle_oversize(e),
                    Err(e) => {
                        let failed = self.correlator.fail_all(ClientError::Transport(e.clone()));
                        error!(error = %e, failed_reads = failed, "Error receiving datagram");
                        tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                    }
                },
            }
        }
    }

    fn handle_datagram(&self, bytes: &[u8]) {
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
                ..
            }) => {
                debug!(data_type = %data_type, "Dropping legacy response without request id");
            }
            Err(e) => match codec::peek_request_id(bytes) {
                Some(id) => {
                    if !self.correlator.fail(&id, e.clone().into()) {
                        debug!(request_id = %id, error = %e, "Dropping malformed response for unknown request id");
                    }
                }
                None => warn!(error = %e, bytes = bytes.len(), "Dropping undecodable datagram"),
            },
        }
    }

    /// Fail only the request an oversize datagram answered, if it names one.
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
