//! # Read Flows
//!
//! Correct answers reach the caller through both receive models, for every
//! declared type.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::timeout;

    use dataref_client::test_utils::MockResponder;
    use dataref_client::{
        connect, ClientConfig, ClientError, ConfigError, DataRefReader, DataRefType,
        DataRefValue, ReceiveMode,
    };

    use crate::integration::fixtures::{background_client, direct_reader, name, TEST_GUARD};

    const BRAKE: &str = "sim/cockpit2/controls/parking_brake_ratio";

    #[tokio::test]
    async fn test_parking_brake_ratio_read() {
        let responder = MockResponder::start().await.unwrap();
        let client = background_client(&responder, Duration::from_secs(3)).await;

        let ratio = timeout(TEST_GUARD, client.read_float(&name(BRAKE)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ratio, 0.5);
        assert_eq!(responder.requests_received(), 1);
        assert_eq!(client.pending_count(), 0);
        assert_eq!(
            client.store().unwrap().value(&name(BRAKE)),
            Some(DataRefValue::Float(0.5))
        );
    }

    #[tokio::test]
    async fn test_every_type_through_both_models() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_value(&name("sim/a/int"), DataRefValue::Int(-42));
        responder.set_value(&name("sim/a/float"), DataRefValue::Float(121.25));
        responder.set_value(&name("sim/a/ints"), DataRefValue::IntArray(vec![1, 0, 1]));
        responder.set_value(
            &name("sim/a/floats"),
            DataRefValue::FloatArray(vec![0.25, 0.5, 1.0]),
        );

        let background = background_client(&responder, Duration::from_secs(3)).await;
        let direct = direct_reader(&responder, Duration::from_secs(3)).await;
        let readers: [&dyn DataRefReader; 2] = [&background, &direct];

        for reader in readers {
            let read = async {
                assert_eq!(reader.read_int(&name("sim/a/int")).await.unwrap(), -42);
                assert_eq!(reader.read_float(&name("sim/a/float")).await.unwrap(), 121.25);
                assert_eq!(
                    reader.read_int_array(&name("sim/a/ints")).await.unwrap(),
                    vec![1, 0, 1]
                );
                assert_eq!(
                    reader.read_float_array(&name("sim/a/floats")).await.unwrap(),
                    vec![0.25, 0.5, 1.0]
                );
            };
            timeout(TEST_GUARD, read).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_empty_array_value() {
        let responder = MockResponder::start().await.unwrap();
        responder.set_value(&name("sim/a/none"), DataRefValue::IntArray(Vec::new()));
        let client = background_client(&responder, Duration::from_secs(3)).await;

        let value = timeout(TEST_GUARD, client.read(&name("sim/a/none"), DataRefType::IntArray))
            .await
            .unwrap();
        assert_eq!(value, Ok(DataRefValue::IntArray(Vec::new())));
    }

    #[tokio::test]
    async fn test_connect_builds_configured_model() {
        let responder = MockResponder::start().await.unwrap();

        for mode in [ReceiveMode::Background, ReceiveMode::PerCall] {
            let config = ClientConfig {
                mode,
                ..responder.client_config()
            };
            let reader = connect(&config).await.unwrap();
            let ratio = timeout(TEST_GUARD, reader.read_float(&name(BRAKE)))
                .await
                .unwrap();
            assert_eq!(ratio, Ok(0.5), "mode {mode:?}");
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = ClientConfig {
            read_timeout: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(matches!(
            connect(&config).await,
            Err(ClientError::Config(ConfigError::InvalidTimeout(_)))
        ));
    }
}
