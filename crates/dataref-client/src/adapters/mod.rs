//! Adapters Layer
//!
//! - `udp`: production transport over a tokio `UdpSocket`
//! - `channel`: in-memory transport pair for tests
//! - `ids`: request id sources

pub mod channel;
pub mod ids;
pub mod udp;

pub use channel::{channel_pair, ChannelPeer, ChannelTransport};
pub use ids::{SequentialRequestIds, UuidRequestIds};
pub use udp::UdpTransport;
