//! Loopback end-to-end tests and their fixtures.

pub mod concurrency;
pub mod misbehaviour;
pub mod reads;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use dataref_client::test_utils::MockResponder;
    use dataref_client::{
        DataRefClient, DataRefName, DataRefStore, DirectReader, SequentialRequestIds,
        UdpTransport,
    };

    /// Guard so a hung exchange fails the test instead of stalling the suite.
    pub const TEST_GUARD: Duration = Duration::from_secs(10);

    pub fn name(s: &str) -> DataRefName {
        DataRefName::new(s).unwrap()
    }

    pub async fn transport(responder: &MockResponder, timeout: Duration) -> Arc<UdpTransport> {
        let addr = responder.addr();
        Arc::new(
            UdpTransport::open(&addr.ip().to_string(), addr.port(), timeout)
                .await
                .unwrap(),
        )
    }

    /// Background client with `req1, req2, ...` ids and a value store.
    pub async fn background_client(responder: &MockResponder, timeout: Duration) -> DataRefClient {
        DataRefClient::builder(transport(responder, timeout).await)
            .ids(Arc::new(SequentialRequestIds::new()))
            .sweep_interval(Duration::from_millis(50))
            .store(Arc::new(DataRefStore::new()))
            .start()
    }

    pub async fn direct_reader(responder: &MockResponder, timeout: Duration) -> DirectReader {
        DirectReader::new(transport(responder, timeout).await)
            .with_ids(Arc::new(SequentialRequestIds::new()))
            .with_store(Arc::new(DataRefStore::new()))
    }
}
