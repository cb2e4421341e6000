use std::borrow::Cow;

use apache_avro::Schema;
use pubsub_api::{Codec, CodecError, Payload};

use crate::convert::{
    Dialect, Names, avro_to_json_encoding, avro_to_value, collect_names, value_to_avro,
};

fn parse_schema(definition: &str) -> Result<(Schema, Names), CodecError> {
    let schema = Schema::parse_str(definition)
        .map_err(|e| CodecError::wrap("cannot parse avro schema", e))?;
    let names = collect_names(&schema).map_err(|e| CodecError::wrap("cannot parse avro schema", e))?;
    Ok((schema, names))
}

// ═══════════════════════════════════════════════════════════════
//  AvroBinaryCodec
// ═══════════════════════════════════════════════════════════════

/// Avro binary datum encoding (no container header, no fingerprint).
#[derive(Debug, Clone)]
pub struct AvroBinaryCodec {
    schema: Schema,
    names: Names,
}

impl AvroBinaryCodec {
    pub fn new(definition: &str) -> Result<Self, CodecError> {
        let (schema, names) = parse_schema(definition)?;
        Ok(Self { schema, names })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Codec for AvroBinaryCodec {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError> {
        let Payload::Record(record) = data else {
            return Err(CodecError::wrap("cannot encode avro binary", "payload is not a record"));
        };
        let avro_value = value_to_avro(record, &self.schema, &self.names, Dialect::Generic)
            .map_err(|e| CodecError::wrap("cannot encode avro binary", e))?;
        apache_avro::to_avro_datum(&self.schema, avro_value)
            .map_err(|e| CodecError::wrap("cannot encode avro binary", e))
    }

    fn decode(&self, data: &[u8], out: &mut Payload) -> Result<(), CodecError> {
        let mut reader = data;
        let avro_value = apache_avro::from_avro_datum(&self.schema, &mut reader, None)
            .map_err(|e| CodecError::wrap("cannot decode avro binary", e))?;
        *out = Payload::Record(avro_to_value(&avro_value));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  AvroJsonCodec
// ═══════════════════════════════════════════════════════════════

/// Avro JSON encoding. Input is first turned into a generic record map,
/// so protobuf payloads are accepted through their JSON mapping.
#[derive(Debug, Clone)]
pub struct AvroJsonCodec {
    schema: Schema,
    names: Names,
}

impl AvroJsonCodec {
    pub fn new(definition: &str) -> Result<Self, CodecError> {
        let (schema, names) = parse_schema(definition)?;
        Ok(Self { schema, names })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

fn record_map(data: &Payload) -> Result<Cow<'_, serde_json::Value>, CodecError> {
    match data {
        Payload::Record(value) => Ok(Cow::Borrowed(value)),
        Payload::Proto(message) => serde_json::to_value(message)
            .map(Cow::Owned)
            .map_err(|e| CodecError::wrap("cannot convert record into map", e)),
        Payload::Bytes(_) | Payload::Text(_) => Err(CodecError::wrap(
            "cannot convert record into map",
            "payload is not structured",
        )),
    }
}

impl Codec for AvroJsonCodec {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError> {
        let record = record_map(data)?;
        let avro_value = value_to_avro(&record, &self.schema, &self.names, Dialect::Generic)
            .map_err(|e| CodecError::wrap("cannot encode avro json", e))?;
        serde_json::to_vec(&avro_to_json_encoding(&avro_value, &self.schema, &self.names))
            .map_err(|e| CodecError::wrap("cannot encode avro json", e))
    }

    fn decode(&self, data: &[u8], out: &mut Payload) -> Result<(), CodecError> {
        let json: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| CodecError::wrap("cannot decode avro json", e))?;
        let avro_value = value_to_avro(&json, &self.schema, &self.names, Dialect::AvroJson)
            .map_err(|e| CodecError::wrap("cannot decode avro json", e))?;
        *out = Payload::Record(avro_to_value(&avro_value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    const SIMPLE_SCHEMA: &str = r#"{
        "type": "record",
        "name": "SimpleRecord",
        "namespace": "test",
        "fields": [
            {"name": "StringField", "type": "string"},
            {"name": "FloatField", "type": "float"},
            {"name": "BooleanField", "type": "boolean"}
        ]
    }"#;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SimpleRecord {
        string_field: String,
        float_field: f32,
        boolean_field: bool,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct InvalidSimpleRecord {
        string_field: bool,
        float_field: String,
        boolean_field: f32,
    }

    fn simple() -> SimpleRecord {
        SimpleRecord {
            string_field: "test avro".to_string(),
            float_field: 12.34,
            boolean_field: true,
        }
    }

    fn invalid() -> Payload {
        Payload::record(&InvalidSimpleRecord {
            string_field: true,
            float_field: "test".to_string(),
            boolean_field: 12.34,
        })
        .unwrap()
    }

    #[test]
    fn binary_decodes_what_it_encodes() {
        let codec = AvroBinaryCodec::new(SIMPLE_SCHEMA).unwrap();
        let bytes = codec.encode(&Payload::record(&simple()).unwrap()).unwrap();

        let mut out = Payload::record_target();
        codec.decode(&bytes, &mut out).unwrap();
        assert_eq!(out.into_record::<SimpleRecord>().unwrap(), simple());
    }

    #[test]
    fn binary_encode_rejects_mismatched_record() {
        let codec = AvroBinaryCodec::new(SIMPLE_SCHEMA).unwrap();
        let err = codec.encode(&invalid()).unwrap_err();
        assert_eq!(err.context(), Some("cannot encode avro binary"));
    }

    #[test]
    fn binary_decode_rejects_truncated_data() {
        let codec = AvroBinaryCodec::new(SIMPLE_SCHEMA).unwrap();
        let err = codec.decode(&[], &mut Payload::record_target()).unwrap_err();
        assert_eq!(err.context(), Some("cannot decode avro binary"));
    }

    #[test]
    fn json_is_the_avro_text_encoding() {
        let codec = AvroJsonCodec::new(SIMPLE_SCHEMA).unwrap();
        let bytes = codec.encode(&Payload::record(&simple()).unwrap()).unwrap();

        let text: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(text["StringField"], "test avro");
        assert_eq!(text["BooleanField"], true);

        let mut out = Payload::record_target();
        codec.decode(&bytes, &mut out).unwrap();
        assert_eq!(out.into_record::<SimpleRecord>().unwrap(), simple());
    }

    #[test]
    fn json_encode_rejects_raw_payload() {
        let codec = AvroJsonCodec::new(SIMPLE_SCHEMA).unwrap();
        let err = codec.encode(&Payload::from("test")).unwrap_err();
        assert_eq!(err.context(), Some("cannot convert record into map"));

        let err = codec.encode(&invalid()).unwrap_err();
        assert_eq!(err.context(), Some("cannot encode avro json"));
    }

    #[test]
    fn json_decode_rejects_invalid_data() {
        let codec = AvroJsonCodec::new(SIMPLE_SCHEMA).unwrap();
        let err = codec.decode(b"invalid", &mut Payload::record_target()).unwrap_err();
        assert_eq!(err.context(), Some("cannot decode avro json"));
    }

    const EVENT_SCHEMA: &str = r#"{
        "type": "record",
        "name": "Event",
        "fields": [
            {"name": "id", "type": {"type": "string", "logicalType": "uuid"}},
            {"name": "at", "type": {"type": "int", "logicalType": "time-millis"}},
            {"name": "origin", "type": {"type": "record", "name": "Place", "fields": [{"name": "x", "type": "int"}]}},
            {"name": "target", "type": "Place"}
        ]
    }"#;

    #[test]
    fn logical_and_reused_named_types_round_trip() {
        let event = serde_json::json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "at": 45_000,
            "origin": {"x": 1},
            "target": {"x": 2}
        });
        let binary: Box<dyn Codec> = Box::new(AvroBinaryCodec::new(EVENT_SCHEMA).unwrap());
        let json: Box<dyn Codec> = Box::new(AvroJsonCodec::new(EVENT_SCHEMA).unwrap());

        for codec in [binary, json] {
            let bytes = codec.encode(&Payload::Record(event.clone())).unwrap();
            let mut out = Payload::record_target();
            codec.decode(&bytes, &mut out).unwrap();
            assert_eq!(out, Payload::Record(event.clone()));
        }
    }

    #[test]
    fn invalid_definition_is_rejected() {
        let err = AvroBinaryCodec::new("invalid").unwrap_err();
        assert_eq!(err.context(), Some("cannot parse avro schema"));
        assert!(AvroJsonCodec::new("invalid").is_err());
    }
}
