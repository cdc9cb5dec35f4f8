//! Ports Layer
//!
//! - Driving port (inbound): `DataRefReader`, the API applications call
//! - Driven ports (outbound): the datagram transport and request id source

pub mod inbound;
pub mod outbound;

pub use inbound::DataRefReader;
pub use outbound::{DatagramTransport, RequestIdSource};
