use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use pubsub_api::prost_reflect::{DynamicMessage, MessageDescriptor};
use pubsub_api::{Codec, CodecError, Payload, ReceivedMessage};
use serde::de::DeserializeOwned;

use crate::codec::SchemaCodec;

/// One inbound delivery together with the codec needed to decode it.
pub struct Message {
    base: Box<dyn ReceivedMessage>,
    codec: Arc<SchemaCodec>,
}

impl Message {
    pub fn new(base: Box<dyn ReceivedMessage>, codec: Arc<SchemaCodec>) -> Self {
        Self { base, codec }
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn ack_id(&self) -> &str {
        self.base.ack_id()
    }

    /// Raw, still encoded, message data.
    pub fn data(&self) -> &[u8] {
        self.base.data()
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        self.base.attributes()
    }

    pub fn publish_time(&self) -> SystemTime {
        self.base.publish_time()
    }

    pub fn ordering_key(&self) -> &str {
        self.base.ordering_key()
    }

    pub fn delivery_attempt(&self) -> Option<u32> {
        self.base.delivery_attempt()
    }

    pub fn codec(&self) -> &SchemaCodec {
        &self.codec
    }

    pub fn base_message(&self) -> &dyn ReceivedMessage {
        self.base.as_ref()
    }

    /// Decode the data into `out` with the subscription codec.
    pub fn decode(&self, out: &mut Payload) -> Result<(), CodecError> {
        self.codec.decode(self.data(), out)
    }

    /// Decode a structured message into a typed value.
    pub fn decode_record<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        let mut out = Payload::record_target();
        self.decode(&mut out)?;
        out.into_record()
    }

    /// Decode a protobuf message of the given type.
    pub fn decode_proto(&self, descriptor: MessageDescriptor) -> Result<DynamicMessage, CodecError> {
        let mut out = Payload::proto_target(descriptor);
        self.decode(&mut out)?;
        match out {
            Payload::Proto(message) => Ok(message),
            _ => Err(CodecError::InvalidProtoMessage),
        }
    }

    pub fn ack(&self) {
        tracing::debug!(message = %self.id(), "ack");
        self.base.ack();
    }

    pub fn nack(&self) {
        tracing::debug!(message = %self.id(), "nack");
        self.base.nack();
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id())
            .field("ack_id", &self.ack_id())
            .field("codec", &self.codec.name())
            .field("bytes", &self.data().len())
            .finish()
    }
}
