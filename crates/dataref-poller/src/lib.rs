//! DataRef Poller - periodic dataref reads for dashboards and debugging.
//!
//! - `config`: TOML poll list and client settings
//! - `poller`: one polling round, or rounds on an interval

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod poller;

pub use config::{PollEntry, PollSettings, PollerConfig, PollerConfigError};
pub use poller::{snapshot_json, PollOutcome, Poller, RoundReport};
