//! # Misbehaving Responder
//!
//! UDP gives no delivery, ordering or uniqueness guarantees. Whatever the
//! responder does, each read must resolve exactly once, with its own value
//! or a clear failure.

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};
    use tokio::time::timeout;

    use dataref_client::test_utils::{MockBehavior, MockResponder};
    use dataref_client::{
        ClientError, CodecError, DataRefReader, DataRefType, DataRefValue, TransportError,
    };

    use crate::integration::fixtures::{background_client, direct_reader, name, TEST_GUARD};

    const BRAKE: &str = "sim/cockpit2/controls/parking_brake_ratio";

    #[tokio::test]
    async fn test_silent_responder_times_out() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_behavior(MockBehavior::Silent);
        let client = background_client(&responder, Duration::from_millis(200)).await;

        let started = Instant::now();
        let err = timeout(TEST_GUARD, client.read(&name(BRAKE), DataRefType::Float))
            .await
            .unwrap()
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Transport(TransportError::Timeout(Duration::from_millis(200)))
        );
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(client.pending_count(), 0);
        assert_eq!(
            client.store().unwrap().get(&name(BRAKE)).unwrap().value,
            DataRefValue::Invalid
        );
    }

    #[tokio::test]
    async fn test_oversize_answer_fails_only_its_own_read() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_value(&name("sim/big"), DataRefValue::IntArray(vec![1; 1500]));
        responder.set_value(&name("sim/small"), DataRefValue::Int(2));
        let client = background_client(&responder, Duration::from_secs(1)).await;

        let (big_name, small_name) = (name("sim/big"), name("sim/small"));
        let (big, small) = timeout(TEST_GUARD, async {
            tokio::join!(
                client.read(&big_name, DataRefType::IntArray),
                client.read(&small_name, DataRefType::Int),
            )
        })
        .await
        .unwrap();

        assert!(matches!(
            big,
            Err(ClientError::Transport(TransportError::DatagramTooLarge { .. }))
        ));
        assert_eq!(small, Ok(DataRefValue::Int(2)));
        assert_eq!(
            client.store().unwrap().get(&name("sim/big")).unwrap().value,
            DataRefValue::Invalid
        );
    }

    #[tokio::test]
    async fn test_late_response_discarded_by_same_client() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_value(&name("sim/b"), DataRefValue::Float(9.5));
        responder.set_behavior(MockBehavior::Delay(Duration::from_millis(150)));
        let client = background_client(&responder, Duration::from_millis(100)).await;

        let first = timeout(TEST_GUARD, client.read(&name("sim/b"), DataRefType::Float))
            .await
            .unwrap();
        assert!(first.unwrap_err().is_timeout());

        // req1's answer lands during req2's wait; only req2's answer counts.
        responder.set_value(&name("sim/b"), DataRefValue::Float(1.5));
        responder.set_behavior(MockBehavior::Respond);
        let second = timeout(TEST_GUARD, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.read_float(&name("sim/b")).await
        })
        .await
        .unwrap();
        assert_eq!(second, Ok(1.5));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(client.stats().total_discarded.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn test_stray_datagram_before_answer() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_behavior(MockBehavior::StrayFirst);

        let client = background_client(&responder, Duration::from_secs(2)).await;
        let direct = direct_reader(&responder, Duration::from_secs(2)).await;
        let readers: [&dyn DataRefReader; 2] = [&client, &direct];

        for reader in readers {
            let ratio = timeout(TEST_GUARD, reader.read_float(&name(BRAKE)))
                .await
                .unwrap();
            assert_eq!(ratio, Ok(0.5));
        }
        assert_eq!(client.stats().total_discarded.load(Ordering::Relaxed), 1);
        assert_eq!(direct.stats().total_discarded.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_duplicate_answer_resolves_once() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_behavior(MockBehavior::Duplicate);
        responder.set_value(&name("sim/b"), DataRefValue::Int(7));
        let client = background_client(&responder, Duration::from_secs(2)).await;

        assert_eq!(
            timeout(TEST_GUARD, client.read_float(&name(BRAKE))).await.unwrap(),
            Ok(0.5)
        );
        // The duplicate for req1 must not satisfy req2.
        assert_eq!(
            timeout(TEST_GUARD, client.read_int(&name("sim/b"))).await.unwrap(),
            Ok(7)
        );
        assert_eq!(client.stats().total_completed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_wrong_type_tag_leaves_read_pending_until_timeout() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_value(&name("sim/b"), DataRefValue::Int(1));
        responder.set_behavior(MockBehavior::WrongType(DataRefType::Float));
        let client = background_client(&responder, Duration::from_millis(200)).await;

        let err = timeout(TEST_GUARD, client.read(&name("sim/b"), DataRefType::Int))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(client.stats().total_discarded.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_unparsable_value_fails_its_read() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_behavior(MockBehavior::Raw(
            "req1|dataref|response|float|not-a-number".into(),
        ));
        let client = background_client(&responder, Duration::from_secs(2)).await;

        let err = timeout(TEST_GUARD, client.read(&name(BRAKE), DataRefType::Float))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Codec(CodecError::ValueParse {
                data_type: DataRefType::Float,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_garbage_without_id_ends_in_timeout() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_behavior(MockBehavior::Raw("200|OK|0.5".into()));
        let client = background_client(&responder, Duration::from_millis(200)).await;

        let err = timeout(TEST_GUARD, client.read(&name(BRAKE), DataRefType::Float))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_legacy_answers_only_accepted_when_enabled() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_behavior(MockBehavior::Legacy);

        let client = background_client(&responder, Duration::from_millis(200)).await;
        let err = timeout(TEST_GUARD, client.read_float(&name(BRAKE)))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_timeout());

        let direct = direct_reader(&responder, Duration::from_millis(200))
            .await
            .accept_legacy_responses(true);
        let ratio = timeout(TEST_GUARD, direct.read_float(&name(BRAKE)))
            .await
            .unwrap();
        assert_eq!(ratio, Ok(0.5));
    }

    #[tokio::test]
    async fn test_unknown_dataref_times_out() {
        let responder = MockResponder::start().await.unwrap();
        let direct = direct_reader(&responder, Duration::from_millis(150)).await;

        let err = timeout(TEST_GUARD, direct.read_int(&name("sim/does/not/exist")))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(responder.requests_received(), 1);
    }
}
