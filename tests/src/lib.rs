//! # DataRef Bridge Test Suite
//!
//! End-to-end scenarios: a real `UdpTransport` talking to the loopback
//! `MockResponder` over 127.0.0.1.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── reads.rs          # happy paths, both receive models
//!     ├── misbehaviour.rs   # silence, strays, duplicates, garbage
//!     └── concurrency.rs    # overlapping reads, out-of-order answers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dataref-tests
//! cargo test -p dataref-tests integration::misbehaviour::
//! ```

pub mod integration;
