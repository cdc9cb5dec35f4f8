//! # DataRef Client
//!
//! Client engine for the X-Plane dataref bridge: typed reads of simulator
//! variables over a small `|`-delimited UDP request/response protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Application / Poller                       │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ DataRefReader::read(name, type)
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │  DataRefClient (background)    │  DirectReader (per call)    │
//! │  ResponseListener + sweeper    │  send, receive until match  │
//! ├──────────────────────────────────────────────────────────────┤
//! │           Correlator (request id -> waiting caller)          │
//! │                 └── DataRefStore (latest values)             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Codec (pure)                  │  DatagramTransport          │
//! │  encode_request/decode_response│  UdpTransport / Channel     │
//! └──────────────────────────────────────────────────────────────┘
//!                                │ UDP
//!                       Simulator-side responder
//! ```
//!
//! - **Domain Layer:** wire codec, value types, config, value store
//! - **Ports Layer:** `DataRefReader` (inbound), `DatagramTransport` and
//!   `RequestIdSource` (outbound)
//! - **Adapters Layer:** UDP socket, in-memory channel, id sources
//! - **Service Layer:** correlator and the two client models
//!
//! ## Guarantees
//!
//! - Every read resolves exactly once: a value of the declared type, or an
//!   error (timeout, transport, decode).
//! - A caller never receives a value that answered a different request.
//! - Stray, duplicate and late datagrams are dropped, never errors.
//! - Nothing is retried. Polling is the caller's loop.
//!
//! ## Example
//!
//! ```ignore
//! use dataref_client::{connect, ClientConfig, DataRefName, DataRefReader};
//!
//! let reader = connect(&ClientConfig::default()).await?;
//! let brake = DataRefName::new("sim/cockpit2/controls/parking_brake_ratio")?;
//! let ratio = reader.read_float(&brake).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{
    channel_pair, ChannelPeer, ChannelTransport, SequentialRequestIds, UdpTransport,
    UuidRequestIds,
};
pub use domain::codec;
pub use domain::{
    ClientConfig, ClientError, CodecError, ConfigError, DataRefName, DataRefRequest,
    DataRefResponse, DataRefStore, DataRefType, DataRefValue, ReceiveMode, RequestId,
    StoredValue, TransportError, MAX_REQUEST_SIZE, MAX_RESPONSE_SIZE,
};
pub use ports::{DataRefReader, DatagramTransport, RequestIdSource};
pub use service::{
    connect, connect_with_store, Correlator, CorrelatorStats, DataRefClient,
    DataRefClientBuilder, DirectReader, Submission,
};
