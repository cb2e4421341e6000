//! In-process broker emulator for tests and local sandboxes.
//!
//! Implements the broker and schema collaborator traits over in-memory
//! state, and lets [`Reactor`]s observe (or fail) every RPC it serves.

mod client;
mod reactor;
mod server;

pub use client::{EmulatedMessage, EmulatorClient, EmulatorSubscription, EmulatorTopic};
pub use reactor::{Reaction, Reactor, Request};
pub use server::Emulator;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pubsub_api::{
        BoxFuture, BrokerClient, BrokerError, CancellationToken, ClientFactory, ErrorKind,
        MessageHandler, OutgoingMessage, ReceiveSettings, ReceivedMessage, SchemaClient,
        SchemaConfig, SchemaType, SubscriptionConfig, TopicConfig,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Records every request it sees; optionally fails one method.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Request>>,
        fail: Option<&'static str>,
    }

    impl Reactor for Recorder {
        fn func_names(&self) -> Vec<&'static str> {
            vec!["CreateTopic", "Publish", "Acknowledge", "ModifyAckDeadline"]
        }

        fn react(&self, request: &Request) -> Reaction {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail == Some(request.method()) {
                Reaction::fail(BrokerError::unavailable("injected"))
            } else {
                Reaction::ignore()
            }
        }
    }

    fn message(data: &str) -> OutgoingMessage {
        OutgoingMessage {
            data: data.as_bytes().to_vec(),
            ..OutgoingMessage::default()
        }
    }

    async fn setup(emulator: &Emulator) -> Arc<dyn BrokerClient> {
        let client = emulator.create("p").await.unwrap();
        client.create_topic("t", TopicConfig::default()).await.unwrap();
        client
            .create_subscription("s", SubscriptionConfig::new("t"))
            .await
            .unwrap();
        client
    }

    /// Forward every delivery into a channel.
    fn forward(tx: mpsc::UnboundedSender<Box<dyn ReceivedMessage>>) -> MessageHandler {
        Arc::new(move |m: Box<dyn ReceivedMessage>| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(m);
            }) as BoxFuture<'static, ()>
        })
    }

    fn noop() -> MessageHandler {
        Arc::new(|_: Box<dyn ReceivedMessage>| Box::pin(async {}) as BoxFuture<'static, ()>)
    }

    #[tokio::test]
    async fn create_and_read_back_resources() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;

        let topic = client.topic("t");
        assert_eq!(topic.name(), "projects/p/topics/t");
        assert!(topic.exists().await.unwrap());
        assert_eq!(topic.config().await.unwrap().name, "projects/p/topics/t");

        let subscription = client.subscription("s").config().await.unwrap();
        assert_eq!(subscription.name, "projects/p/subscriptions/s");
        assert_eq!(subscription.topic, "t");

        assert!(!client.topic("missing").exists().await.unwrap());
        let err = client.topic("missing").config().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn duplicate_or_dangling_resources_are_rejected() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;

        let err = client.create_topic("t", TopicConfig::default()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = client
            .create_subscription("s2", SubscriptionConfig::new("missing"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn other_project_is_refused() {
        let emulator = Emulator::new("p");
        let err = emulator.create("other").await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn schemas_are_stored_under_qualified_names() {
        let emulator = Emulator::new("p");
        let created = emulator
            .create_schema("s", SchemaConfig::new(SchemaType::Avro, "\"string\""))
            .await
            .unwrap();
        assert_eq!(created.name, "projects/p/schemas/s");

        let fetched = emulator.schema("projects/p/schemas/s").await.unwrap();
        assert_eq!(fetched, created);
        assert!(emulator.schema("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn publish_fans_out_and_ack_settles() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;
        client
            .create_subscription("s2", SubscriptionConfig::new("t"))
            .await
            .unwrap();

        let id = client.topic("t").publish(message("hello")).get().await.unwrap();
        assert_eq!(emulator.pending("s"), 1);
        assert_eq!(emulator.pending("s2"), 1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let subscription = client.subscription("s");
        let receive = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                subscription
                    .receive(cancel, ReceiveSettings::default(), forward(tx))
                    .await
            })
        };

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.id(), id);
        assert_eq!(delivered.data(), b"hello");
        assert_eq!(delivered.delivery_attempt(), Some(1));
        assert_eq!(emulator.outstanding("s"), 1);

        delivered.ack();
        delivered.nack();
        assert_eq!(emulator.outstanding("s"), 0);
        assert_eq!(emulator.pending("s"), 0);

        cancel.cancel();
        receive.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn nack_redelivers_with_next_attempt() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;
        client.topic("t").publish(message("again")).get().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let subscription = client.subscription("s");
        let receive = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                subscription
                    .receive(cancel, ReceiveSettings::default(), forward(tx))
                    .await
            })
        };

        let first = rx.recv().await.unwrap();
        first.nack();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.id(), first.id());
        assert_ne!(second.ack_id(), first.ack_id());
        assert_eq!(second.delivery_attempt(), Some(2));
        second.ack();

        cancel.cancel();
        receive.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn reactors_observe_and_fail_requests() {
        let emulator = Emulator::new("p");
        let recorder = Arc::new(Recorder {
            fail: Some("Publish"),
            ..Recorder::default()
        });
        emulator.add_reactor(recorder.clone());
        let client = setup(&emulator).await;

        let err = client.topic("t").publish(message("x")).get().await.unwrap_err();
        assert_eq!(err.message(), "injected");
        assert_eq!(emulator.pending("s"), 0);

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                Request::CreateTopic { topic: "projects/p/topics/t".to_string() },
                Request::Publish {
                    topic: "projects/p/topics/t".to_string(),
                    message_ids: vec!["1".to_string()],
                },
            ]
        );
    }

    #[tokio::test]
    async fn stopped_topic_refuses_publish() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;
        let topic = client.topic("t");
        topic.stop().await;

        let err = topic.publish(message("late")).get().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn ordering_key_requires_ordering() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;
        let topic = client.topic("t");
        let keyed = OutgoingMessage {
            ordering_key: "k".to_string(),
            ..message("x")
        };

        let err = topic.publish(keyed.clone()).get().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        topic.configure(Default::default(), true);
        topic.publish(keyed).get().await.unwrap();
    }

    #[tokio::test]
    async fn receive_on_missing_subscription_fails() {
        let emulator = Emulator::new("p");
        let client = emulator.create("p").await.unwrap();
        let handler: MessageHandler = noop();

        let err = client
            .subscription("missing")
            .receive(CancellationToken::new(), ReceiveSettings::default(), handler)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn receive_returns_after_cancel() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;
        let cancel = CancellationToken::new();
        let handler: MessageHandler = noop();

        let subscription = client.subscription("s");
        let receive = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                subscription
                    .receive(cancel, ReceiveSettings::default(), handler)
                    .await
            })
        };
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), receive)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn unbounded_receive_limits_still_deliver() {
        let emulator = Emulator::new("p");
        let client = setup(&emulator).await;
        client.topic("t").publish(message("unbounded")).get().await.unwrap();

        let settings = ReceiveSettings {
            num_workers: usize::MAX,
            max_outstanding_messages: usize::MAX,
            ..ReceiveSettings::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let subscription = client.subscription("s");
        let receive = {
            let cancel = cancel.clone();
            tokio::spawn(async move { subscription.receive(cancel, settings, forward(tx)).await })
        };

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.data(), b"unbounded");
        delivered.ack();

        cancel.cancel();
        receive.await.unwrap().unwrap();
    }
}
