//! Service Layer
//!
//! - `correlator`: pending-request bookkeeping shared by both client models
//! - `client`: background-receive client, reads may overlap
//! - `direct`: per-call reader, one exchange at a time

pub mod client;
pub mod correlator;
pub mod direct;

pub use client::{DataRefClient, DataRefClientBuilder};
pub use correlator::{sweep_task, Correlator, CorrelatorStats, ReadResult, Submission};
pub use direct::DirectReader;

use std::sync::Arc;

use crate::domain::{ClientConfig, ClientError, DataRefStore, ReceiveMode};
use crate::ports::DataRefReader;

/// Build the reader named by `config.mode` over a UDP transport.
pub async fn connect(config: &ClientConfig) -> Result<Arc<dyn DataRefReader>, ClientError> {
    connect_with_store(config, None).await
}

/// Like [`connect`], recording every resolved read in `store`.
pub async fn connect_with_store(
    config: &ClientConfig,
    store: Option<Arc<DataRefStore>>,
) -> Result<Arc<dyn DataRefReader>, ClientError> {
    let reader: Arc<dyn DataRefReader> = match config.mode {
        ReceiveMode::Background => Arc::new(DataRefClient::connect(config, store).await?),
        ReceiveMode::PerCall => Arc::new(DirectReader::connect(config, store).await?),
    };
    Ok(reader)
}
