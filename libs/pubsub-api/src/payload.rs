use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

// ════════════════════════════════════════════════════════════════
//  Payload
// ════════════════════════════════════════════════════════════════

/// Native value handed to a codec for encoding, or filled by a codec
/// on decode.
///
/// - `Bytes` / `Text`: raw data, only meaningful to the raw codec.
/// - `Record`: generic structured value; what the avro codecs consume
///   and produce. Typed structs enter and leave through serde.
/// - `Proto`: a protocol-buffer message; the only shape the proto
///   codecs accept.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    Record(serde_json::Value),
    Proto(DynamicMessage),
}

impl Payload {
    /// Serialize any serde value into a `Record` payload.
    pub fn record<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        serde_json::to_value(value)
            .map(Payload::Record)
            .map_err(|e| CodecError::wrap("cannot convert record into map", e))
    }

    /// Transcode a generated protobuf message into a `Proto` payload.
    pub fn proto<M: ReflectMessage>(message: &M) -> Self {
        Payload::Proto(message.transcode_to_dynamic())
    }

    /// An empty `Proto` payload of the given type, used as a decode target.
    pub fn proto_target(descriptor: MessageDescriptor) -> Self {
        Payload::Proto(DynamicMessage::new(descriptor))
    }

    /// An empty `Record` payload, used as a decode target.
    pub fn record_target() -> Self {
        Payload::Record(serde_json::Value::Null)
    }

    /// Deserialize a `Record` payload into a typed value.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T, CodecError> {
        match self {
            Payload::Record(value) => serde_json::from_value(value)
                .map_err(|e| CodecError::wrap("cannot convert map into record", e)),
            Payload::Proto(message) => serde_json::to_value(&message)
                .and_then(serde_json::from_value)
                .map_err(|e| CodecError::wrap("cannot convert map into record", e)),
            _ => Err(CodecError::wrap(
                "cannot convert map into record",
                "payload is not structured",
            )),
        }
    }

    /// Borrow the inner protobuf message, if any.
    pub fn as_proto(&self) -> Option<&DynamicMessage> {
        match self {
            Payload::Proto(message) => Some(message),
            _ => None,
        }
    }

    /// Transcode a `Proto` payload into a generated protobuf message.
    pub fn into_proto<M: ReflectMessage + Default>(self) -> Result<M, CodecError> {
        match self {
            Payload::Proto(message) => message
                .transcode_to::<M>()
                .map_err(|e| CodecError::wrap("cannot decode proto binary", e)),
            _ => Err(CodecError::InvalidProtoMessage),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(v)
    }
}

impl From<&[u8]> for Payload {
    fn from(v: &[u8]) -> Self {
        Payload::Bytes(v.to_vec())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Record(v)
    }
}

impl From<DynamicMessage> for Payload {
    fn from(v: DynamicMessage) -> Self {
        Payload::Proto(v)
    }
}
