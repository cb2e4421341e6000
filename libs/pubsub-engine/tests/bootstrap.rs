mod common;

use std::sync::Arc;

use common::*;
use pretty_assertions::assert_eq;
use pubsub_api::{CancellationToken, Payload, PublishOptions, ReceiveOptions, SchemaClient};
use pubsub_emulator::Emulator;
use pubsub_engine::{PubSub, PubSubConfig, PubSubError};
use pubsub_reactor::{AckReactor, AckSupervisor};

fn config() -> PubSubConfig {
    PubSubConfig::parse(&format!(
        r#"
        [project]
        id = "{PROJECT}"

        [healthcheck]
        topics = ["{TOPIC}"]
        subscriptions = ["{SUBSCRIPTION}"]

        [[schemas]]
        id = "simple"
        type = "avro"
        definition = '''{SIMPLE_AVRO_SCHEMA}'''

        [[topics]]
        id = "{TOPIC}"
        schema = "simple"
        encoding = "binary"

        [[subscriptions]]
        id = "{SUBSCRIPTION}"
        topic = "{TOPIC}"
        "#
    ))
    .unwrap()
}

async fn bootstrap(emulator: &Emulator, config: PubSubConfig) -> Result<PubSub, PubSubError> {
    let schema_client: Arc<dyn SchemaClient> = Arc::new(emulator.clone());
    PubSub::bootstrap(config, emulator, schema_client).await
}

#[tokio::test]
async fn health_fails_until_resources_are_prepared() {
    let emulator = Emulator::new(PROJECT);
    let pubsub = bootstrap(&emulator, config()).await.unwrap();

    let before = pubsub.check_health().await;
    assert_eq!(before.len(), 2);
    assert!(before.iter().all(|(_, result)| !result.success));
    assert_eq!(before[0].0, "gcppubsub-topics");
    assert_eq!(before[0].1.message, "topic test-topic does not exist");

    pubsub.prepare().await.unwrap();

    let after = pubsub.check_health().await;
    assert_eq!(
        after
            .iter()
            .map(|(name, result)| (name.as_str(), result.success, result.message.as_str()))
            .collect::<Vec<_>>(),
        vec![
            ("gcppubsub-topics", true, "topic test-topic exists"),
            (
                "gcppubsub-subscriptions",
                true,
                "subscription test-subscription exists"
            ),
        ]
    );
}

#[tokio::test]
async fn prepare_twice_reports_the_existing_resource() {
    let emulator = Emulator::new(PROJECT);
    let pubsub = bootstrap(&emulator, config()).await.unwrap();
    pubsub.prepare().await.unwrap();

    let err = pubsub.prepare().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to prepare schema \"simple\": schema projects/test-project/schemas/simple already exists"
    );
}

#[tokio::test]
async fn bootstrapped_layer_publishes_through_the_configured_schema() {
    let emulator = Emulator::new(PROJECT);
    let acks = Arc::new(AckSupervisor::new(PROJECT));
    emulator.add_reactor(Arc::new(AckReactor::new(Arc::clone(&acks))));

    let pubsub = bootstrap(&emulator, config()).await.unwrap();
    pubsub.prepare().await.unwrap();

    let record = SimpleRecord {
        string_field: "test avro".to_string(),
        float_field: 12.34,
        boolean_field: true,
    };
    let waiter = acks.start_ack_waiter(SUBSCRIPTION);

    pubsub
        .publisher()
        .publish(TOPIC, &Payload::record(&record).unwrap(), &PublishOptions::new())
        .await
        .unwrap()
        .get()
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let options = ReceiveOptions::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscribe = pubsub.subscriber().subscribe(
        cancel.clone(),
        SUBSCRIPTION,
        &options,
        move |message| {
            let tx = tx.clone();
            async move {
                let decoded = message.decode_record::<SimpleRecord>();
                message.ack();
                let _ = tx.send(decoded);
            }
        },
    );

    let check = async {
        let decoded = rx.recv().await.unwrap().unwrap();
        let acked = waiter
            .wait_max_duration(&CancellationToken::new(), WAIT)
            .await
            .unwrap()
            .data;
        cancel.cancel();
        (decoded, acked)
    };

    let (subscribed, (decoded, acked)) = tokio::join!(subscribe, check);
    subscribed.unwrap();
    assert_eq!(decoded, record);
    assert_eq!(acked.len(), 1);

    pubsub.shutdown().await;
}

#[tokio::test]
async fn bootstrap_gives_up_on_unknown_project() {
    let emulator = Emulator::new(PROJECT);
    let config = PubSubConfig::parse(
        r#"
        [project]
        id = "someone-else"

        [factory]
        attempts = 1
        interval_secs = 0
        "#,
    )
    .unwrap();

    let err = bootstrap(&emulator, config).await.unwrap_err();
    assert_eq!(err.to_string(), "pubsub client creation error after 1 attempts");
}
