//! Domain Layer - wire codec, value types, configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod codec;
pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use codec::{MAX_REQUEST_SIZE, MAX_RESPONSE_SIZE};
pub use config::{ClientConfig, ConfigError, ReceiveMode};
pub use error::{ClientError, CodecError, TransportError};
pub use store::{DataRefStore, StoredValue};
pub use types::{
    DataRefName, DataRefRequest, DataRefResponse, DataRefType, DataRefValue, RequestId,
};
