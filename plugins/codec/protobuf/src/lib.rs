//! Protocol-buffer codecs.
//!
//! Both codecs only accept `Payload::Proto`: the message carries its own
//! descriptor on encode, and the decode target supplies the descriptor
//! of the expected type. Anything else is an `invalid proto message`.

use prost::Message;
use prost_reflect::{DynamicMessage, ReflectMessage};
use pubsub_api::{Codec, CodecError, Payload};

fn target(out: &mut Payload) -> Result<&mut DynamicMessage, CodecError> {
    match out {
        Payload::Proto(message) => Ok(message),
        _ => Err(CodecError::InvalidProtoMessage),
    }
}

// ---- Binary ----

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoBinaryCodec;

impl Codec for ProtoBinaryCodec {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError> {
        let message = data.as_proto().ok_or(CodecError::InvalidProtoMessage)?;
        Ok(message.encode_to_vec())
    }

    fn decode(&self, data: &[u8], out: &mut Payload) -> Result<(), CodecError> {
        let target = target(out)?;
        *target = DynamicMessage::decode(target.descriptor(), data)
            .map_err(|e| CodecError::wrap("cannot decode proto binary", e))?;
        Ok(())
    }
}

// ---- JSON ----

/// Canonical protobuf JSON mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoJsonCodec;

impl Codec for ProtoJsonCodec {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError> {
        let message = data.as_proto().ok_or(CodecError::InvalidProtoMessage)?;
        serde_json::to_vec(message).map_err(|e| CodecError::wrap("cannot encode proto json", e))
    }

    fn decode(&self, data: &[u8], out: &mut Payload) -> Result<(), CodecError> {
        let target = target(out)?;
        let mut deserializer = serde_json::Deserializer::from_slice(data);
        let message = DynamicMessage::deserialize(target.descriptor(), &mut deserializer)
            .and_then(|message| deserializer.end().map(|()| message))
            .map_err(|e| CodecError::wrap("cannot decode proto json", e))?;
        *target = message;
        Ok(())
    }
}
