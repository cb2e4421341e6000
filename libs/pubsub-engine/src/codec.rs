use codec_avro::{AvroBinaryCodec, AvroJsonCodec};
use codec_protobuf::{ProtoBinaryCodec, ProtoJsonCodec};
use pubsub_api::{Codec, CodecError, Payload, SchemaEncoding, SchemaType};

// ════════════════════════════════════════════════════════════════
//  RawCodec
// ════════════════════════════════════════════════════════════════

/// Codec for topics without a schema: passes bytes through and
/// stringifies everything else, records and proto messages as their
/// JSON text. Raw data cannot be decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError> {
        Ok(match data {
            Payload::Bytes(bytes) => bytes.clone(),
            Payload::Text(text) => text.as_bytes().to_vec(),
            Payload::Record(serde_json::Value::String(text)) => text.as_bytes().to_vec(),
            Payload::Record(value) => value.to_string().into_bytes(),
            Payload::Proto(message) => serde_json::to_vec(message)
                .map_err(|e| CodecError::wrap("cannot stringify proto message", e))?,
        })
    }

    fn decode(&self, _data: &[u8], _out: &mut Payload) -> Result<(), CodecError> {
        Err(CodecError::NoSchema)
    }
}

// ════════════════════════════════════════════════════════════════
//  SchemaCodec
// ════════════════════════════════════════════════════════════════

/// The five supported (schema type, encoding) combinations.
#[derive(Debug, Clone)]
pub enum SchemaCodec {
    Raw(RawCodec),
    AvroBinary(AvroBinaryCodec),
    AvroJson(AvroJsonCodec),
    ProtoBinary(ProtoBinaryCodec),
    ProtoJson(ProtoJsonCodec),
}

impl SchemaCodec {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaCodec::Raw(_) => "raw",
            SchemaCodec::AvroBinary(_) => "avro-binary",
            SchemaCodec::AvroJson(_) => "avro-json",
            SchemaCodec::ProtoBinary(_) => "proto-binary",
            SchemaCodec::ProtoJson(_) => "proto-json",
        }
    }

    fn inner(&self) -> &dyn Codec {
        match self {
            SchemaCodec::Raw(c) => c,
            SchemaCodec::AvroBinary(c) => c,
            SchemaCodec::AvroJson(c) => c,
            SchemaCodec::ProtoBinary(c) => c,
            SchemaCodec::ProtoJson(c) => c,
        }
    }
}

impl Codec for SchemaCodec {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError> {
        self.inner().encode(data)
    }

    fn decode(&self, data: &[u8], out: &mut Payload) -> Result<(), CodecError> {
        self.inner().decode(data, out)
    }
}

impl Default for SchemaCodec {
    fn default() -> Self {
        SchemaCodec::Raw(RawCodec)
    }
}

// ════════════════════════════════════════════════════════════════
//  CodecFactory
// ════════════════════════════════════════════════════════════════

/// Builds the codec for a (schema type, encoding, definition) triple.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecFactory;

impl CodecFactory {
    pub fn create(
        &self,
        schema_type: SchemaType,
        encoding: SchemaEncoding,
        definition: &str,
    ) -> Result<SchemaCodec, CodecError> {
        match (schema_type, encoding) {
            (SchemaType::Unspecified, _) => Ok(SchemaCodec::Raw(RawCodec)),
            (SchemaType::Avro, SchemaEncoding::Binary) => {
                AvroBinaryCodec::new(definition).map(SchemaCodec::AvroBinary)
            }
            (SchemaType::Avro, SchemaEncoding::Json) => {
                AvroJsonCodec::new(definition).map(SchemaCodec::AvroJson)
            }
            (SchemaType::Avro, _) => Err(CodecError::InvalidAvroEncoding),
            (SchemaType::ProtocolBuffer, SchemaEncoding::Binary) => {
                Ok(SchemaCodec::ProtoBinary(ProtoBinaryCodec))
            }
            (SchemaType::ProtocolBuffer, SchemaEncoding::Json) => {
                Ok(SchemaCodec::ProtoJson(ProtoJsonCodec))
            }
            (SchemaType::ProtocolBuffer, _) => Err(CodecError::InvalidProtoEncoding),
            (SchemaType::Unrecognized(_), _) => Err(CodecError::InvalidSchemaType),
        }
    }
}
