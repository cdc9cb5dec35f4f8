//! # Overlapping Reads
//!
//! Many reads in flight on one socket, answered in whatever order the
//! responder's delays produce. Each caller must get its own value.

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use dataref_client::test_utils::{MockBehavior, MockResponder};
    use dataref_client::{DataRefReader, DataRefValue, DirectReader, UuidRequestIds};

    use crate::integration::fixtures::{
        background_client, direct_reader, name, transport, TEST_GUARD,
    };

    const READS: i64 = 64;

    fn seed(responder: &MockResponder) {
        for i in 0..READS {
            responder.set_value(&name(&format!("sim/test/value_{i}")), DataRefValue::Int(i * 10));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_each_get_their_own_value() {
        let responder = MockResponder::start().await.unwrap();
        seed(&responder);
        responder.set_behavior(MockBehavior::Delay(Duration::from_millis(20)));
        let client = Arc::new(background_client(&responder, Duration::from_secs(3)).await);

        let reads = (0..READS).map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let value = client
                    .read_int(&name(&format!("sim/test/value_{i}")))
                    .await;
                (i, value)
            })
        });

        let results = timeout(TEST_GUARD, join_all(reads)).await.unwrap();
        for result in results {
            let (i, value) = result.unwrap();
            assert_eq!(value, Ok(i * 10));
        }

        assert_eq!(client.pending_count(), 0);
        assert_eq!(
            client.stats().total_completed.load(Ordering::Relaxed),
            READS as u64
        );
        assert_eq!(client.store().unwrap().len(), READS as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_call_reads_are_serialized() {
        let responder = MockResponder::start().await.unwrap();
        seed(&responder);
        let reader = Arc::new(direct_reader(&responder, Duration::from_secs(3)).await);

        let reads = (0..8).map(|i| {
            let reader = Arc::clone(&reader);
            async move {
                reader
                    .read_int(&name(&format!("sim/test/value_{i}")))
                    .await
            }
        });

        let results = timeout(TEST_GUARD, join_all(reads)).await.unwrap();
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result, Ok(i as i64 * 10));
        }
        assert_eq!(reader.stats().total_completed.load(Ordering::Relaxed), 8);
    }

    #[tokio::test]
    async fn test_mixed_outcomes_in_one_burst() {
        let responder = MockResponder::start().await.unwrap();
        seed(&responder);
        let client = background_client(&responder, Duration::from_millis(300)).await;

        // Half the names exist, half get no answer at all.
        let names: Vec<_> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    name(&format!("sim/test/value_{i}"))
                } else {
                    name(&format!("sim/test/missing_{i}"))
                }
            })
            .collect();

        let results = timeout(
            TEST_GUARD,
            join_all(names.iter().map(|n| client.read_int(n))),
        )
        .await
        .unwrap();

        for (i, result) in results.into_iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(result, Ok(i as i64 * 10));
            } else {
                assert!(result.unwrap_err().is_timeout());
            }
        }
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_random_ids_against_real_socket() {
        let responder = MockResponder::start().await.unwrap();
        let reader = DirectReader::new(transport(&responder, Duration::from_secs(2)).await)
            .with_ids(Arc::new(UuidRequestIds));

        for _ in 0..5 {
            let ratio = timeout(
                TEST_GUARD,
                reader.read_float(&name("sim/cockpit2/controls/parking_brake_ratio")),
            )
            .await
            .unwrap();
            assert_eq!(ratio, Ok(0.5));
        }
    }
}
