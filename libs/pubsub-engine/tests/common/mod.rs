#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pubsub_api::prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use pubsub_api::{BrokerClient, CancellationToken, ClientFactory, ReceiveOptions};
use pubsub_emulator::Emulator;
use pubsub_engine::{
    Message, PubSubError, Publisher, SchemaConfigRegistry, Subscriber, SubscriptionFactory,
    SubscriptionRegistry, TopicFactory, TopicRegistry,
};
use pubsub_reactor::{AckReactor, AckSupervisor, LogReactor};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const PROJECT: &str = "test-project";
pub const TOPIC: &str = "test-topic";
pub const SUBSCRIPTION: &str = "test-subscription";
pub const WAIT: Duration = Duration::from_secs(5);

pub const SIMPLE_AVRO_SCHEMA: &str = r#"{
    "type": "record",
    "name": "SimpleRecord",
    "namespace": "test",
    "fields": [
        {"name": "StringField", "type": "string"},
        {"name": "FloatField", "type": "float"},
        {"name": "BooleanField", "type": "boolean"}
    ]
}"#;

pub const SIMPLE_PROTO_SCHEMA: &str = r#"syntax = "proto3";
package test;

message SimpleRecord {
  string StringField = 1;
  float FloatField = 2;
  bool BooleanField = 3;
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleRecord {
    pub string_field: String,
    pub float_field: f32,
    pub boolean_field: bool,
}

/// Emulator with ack and log reactors, plus a publisher and subscriber
/// wired to it.
pub struct Harness {
    pub emulator: Emulator,
    pub client: Arc<dyn BrokerClient>,
    pub acks: Arc<AckSupervisor>,
    pub publisher: Publisher,
    pub subscriber: Arc<Subscriber>,
}

pub async fn harness() -> Harness {
    let emulator = Emulator::new(PROJECT);
    let acks = Arc::new(AckSupervisor::new(PROJECT));
    emulator.add_reactor(Arc::new(LogReactor));
    emulator.add_reactor(Arc::new(AckReactor::new(Arc::clone(&acks))));

    let client = emulator.create(PROJECT).await.unwrap();
    let schemas = Arc::new(SchemaConfigRegistry::new(Arc::new(emulator.clone())));

    let publisher = Publisher::new(
        Arc::new(TopicFactory::new(Arc::clone(&client), Arc::clone(&schemas))),
        Arc::new(TopicRegistry::new()),
    );
    let subscriber = Arc::new(Subscriber::new(
        Arc::new(SubscriptionFactory::new(Arc::clone(&client), Arc::clone(&schemas))),
        Arc::new(SubscriptionRegistry::new()),
    ));

    Harness {
        emulator,
        client,
        acks,
        publisher,
        subscriber,
    }
}

/// A subscribe call running in the background, forwarding messages.
pub struct Receiving {
    messages: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), PubSubError>>,
}

impl Receiving {
    pub fn start(subscriber: &Arc<Subscriber>, subscription_id: &str) -> Self {
        let (tx, messages) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = {
            let subscriber = Arc::clone(subscriber);
            let cancel = cancel.clone();
            let subscription_id = subscription_id.to_string();
            tokio::spawn(async move {
                subscriber
                    .subscribe(cancel, &subscription_id, &ReceiveOptions::new(), move |message| {
                        let tx = tx.clone();
                        async move {
                            let _ = tx.send(message);
                        }
                    })
                    .await
            })
        };

        Self {
            messages,
            cancel,
            task,
        }
    }

    pub async fn next(&mut self) -> Message {
        tokio::time::timeout(WAIT, self.messages.recv())
            .await
            .expect("no message delivered in time")
            .expect("receive loop ended")
    }

    pub async fn stop(self) -> Result<(), PubSubError> {
        self.cancel.cancel();
        self.task.await.unwrap()
    }
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// Descriptor matching `SIMPLE_PROTO_SCHEMA`.
pub fn simple_proto_descriptor() -> MessageDescriptor {
    let file = FileDescriptorProto {
        name: Some("simple.proto".to_string()),
        package: Some("test".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("SimpleRecord".to_string()),
            field: vec![
                field("StringField", 1, Type::String),
                field("FloatField", 2, Type::Float),
                field("BooleanField", 3, Type::Bool),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
        .unwrap()
        .get_message_by_name("test.SimpleRecord")
        .unwrap()
}
