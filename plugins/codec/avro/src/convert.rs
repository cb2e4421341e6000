use std::collections::HashMap;

use apache_avro::schema::{Name, ResolvedSchema, SchemaKind};
use apache_avro::types::Value;
use apache_avro::{BigDecimal, Decimal, Duration, Schema, Uuid};

/// A generic value that does not fit the schema it is converted against.
#[derive(Debug, thiserror::Error)]
#[error("value {value} does not match schema {expected:?}")]
pub(crate) struct SchemaMismatch {
    value: String,
    expected: SchemaKind,
}

fn mismatch(value: &serde_json::Value, schema: &Schema) -> SchemaMismatch {
    SchemaMismatch {
        value: value.to_string(),
        expected: SchemaKind::from(schema),
    }
}

/// Named types declared by a schema, keyed by full name. Resolves the
/// `Schema::Ref` a reused record, enum or fixed type parses into.
pub(crate) type Names = HashMap<Name, Schema>;

pub(crate) fn collect_names(schema: &Schema) -> Result<Names, apache_avro::Error> {
    let resolved = ResolvedSchema::try_from(schema)?;
    Ok(resolved
        .get_names()
        .iter()
        .map(|(name, schema)| (name.clone(), (*schema).clone()))
        .collect())
}

fn latin1(bytes: &[u8]) -> serde_json::Value {
    serde_json::Value::String(bytes.iter().map(|&byte| byte as char).collect())
}

/// How bytes and unions are spelled in the JSON side of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// Generic record map: bytes as arrays of numbers, unions unwrapped.
    Generic,
    /// Avro JSON encoding: bytes as ISO-8859-1 strings, non-null union
    /// branches wrapped as `{"<branch type>": value}`.
    AvroJson,
}

// ═══════════════════════════════════════════════════════════════
//  Avro → JSON conversion
// ═══════════════════════════════════════════════════════════════

/// Avro value to a generic record map.
pub(crate) fn avro_to_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::json!(i),
        Value::Long(l) => serde_json::json!(l),
        Value::Float(f) => serde_json::json!(f),
        Value::Double(d) => serde_json::json!(d),
        Value::Bytes(b) | Value::Fixed(_, b) => serde_json::json!(b),
        Value::String(s) | Value::Enum(_, s) => serde_json::Value::String(s.clone()),
        Value::Union(_, inner) => avro_to_value(inner),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(avro_to_value).collect())
        }
        Value::Map(entries) => {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_value(v)))
                .collect();
            serde_json::Value::Object(map)
        }
        Value::Record(fields) => {
            let map: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_value(v)))
                .collect();
            serde_json::Value::Object(map)
        }
        Value::Date(d) => serde_json::json!(d),
        Value::TimeMillis(t) => serde_json::json!(t),
        Value::TimeMicros(t) => serde_json::json!(t),
        Value::TimestampMillis(t) => serde_json::json!(t),
        Value::TimestampMicros(t) => serde_json::json!(t),
        Value::TimestampNanos(t) => serde_json::json!(t),
        Value::Decimal(d) => serde_json::json!(decimal_bytes(d)),
        Value::BigDecimal(d) => serde_json::Value::String(d.to_string()),
        Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        Value::Duration(d) => serde_json::json!(<[u8; 12]>::from(*d)),
        Value::LocalTimestampMillis(t) => serde_json::json!(t),
        Value::LocalTimestampMicros(t) => serde_json::json!(t),
        Value::LocalTimestampNanos(t) => serde_json::json!(t),
    }
}

fn decimal_bytes(decimal: &Decimal) -> Vec<u8> {
    decimal.try_into().unwrap_or_default()
}

/// Avro value to its Avro JSON encoding. Needs the schema to name
/// union branches.
pub(crate) fn avro_to_json_encoding(
    value: &Value,
    schema: &Schema,
    names: &Names,
) -> serde_json::Value {
    if let Schema::Ref { name } = schema {
        if let Some(resolved) = names.get(name) {
            return avro_to_json_encoding(value, resolved, names);
        }
    }
    match (value, schema) {
        (Value::Union(idx, inner), Schema::Union(union_schema)) => {
            match union_schema.variants().get(*idx as usize) {
                Some(Schema::Null) | None => serde_json::Value::Null,
                Some(branch) => {
                    let mut wrapped = serde_json::Map::new();
                    wrapped.insert(branch_name(branch), avro_to_json_encoding(inner, branch, names));
                    serde_json::Value::Object(wrapped)
                }
            }
        }
        (Value::Record(fields), Schema::Record(record_schema)) => {
            let map: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .zip(&record_schema.fields)
                .map(|((k, v), field)| (k.clone(), avro_to_json_encoding(v, &field.schema, names)))
                .collect();
            serde_json::Value::Object(map)
        }
        (Value::Array(items), Schema::Array(inner)) => serde_json::Value::Array(
            items.iter().map(|item| avro_to_json_encoding(item, &inner.items, names)).collect(),
        ),
        (Value::Map(entries), Schema::Map(inner)) => {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_json_encoding(v, &inner.types, names)))
                .collect();
            serde_json::Value::Object(map)
        }
        (Value::Bytes(b) | Value::Fixed(_, b), _) => latin1(b),
        (Value::Decimal(d), _) => latin1(&decimal_bytes(d)),
        (Value::Duration(d), _) => latin1(&<[u8; 12]>::from(*d)),
        (other, _) => avro_to_value(other),
    }
}

/// Type name used as the key of a wrapped union branch.
fn branch_name(schema: &Schema) -> String {
    match schema {
        Schema::Null => "null".to_string(),
        Schema::Boolean => "boolean".to_string(),
        Schema::Int => "int".to_string(),
        Schema::Long => "long".to_string(),
        Schema::Float => "float".to_string(),
        Schema::Double => "double".to_string(),
        Schema::Bytes => "bytes".to_string(),
        Schema::String => "string".to_string(),
        Schema::Array(_) => "array".to_string(),
        Schema::Map(_) => "map".to_string(),
        Schema::Uuid => "string".to_string(),
        Schema::Date | Schema::TimeMillis => "int".to_string(),
        Schema::TimeMicros
        | Schema::TimestampMillis
        | Schema::TimestampMicros
        | Schema::TimestampNanos
        | Schema::LocalTimestampMillis
        | Schema::LocalTimestampMicros
        | Schema::LocalTimestampNanos => "long".to_string(),
        Schema::BigDecimal => "bytes".to_string(),
        Schema::Decimal(decimal) => branch_name(&decimal.inner),
        other => match other.name() {
            Some(name) => name.fullname(None),
            None => format!("{:?}", SchemaKind::from(other)).to_lowercase(),
        },
    }
}

// ═══════════════════════════════════════════════════════════════
//  JSON → Avro conversion
// ═══════════════════════════════════════════════════════════════

/// Schema-guided conversion of a JSON value into an avro value.
///
/// Strict: any value that does not fit the schema is an error, numbers
/// are range-checked and missing record fields fall back to the field
/// default (or null) before being checked. Logical types take the
/// shape `avro_to_value` gives them back.
pub(crate) fn value_to_avro(
    val: &serde_json::Value,
    schema: &Schema,
    names: &Names,
    dialect: Dialect,
) -> Result<Value, SchemaMismatch> {
    use serde_json::Value as J;

    match (schema, val) {
        (Schema::Ref { name }, _) => match names.get(name) {
            Some(resolved) => value_to_avro(val, resolved, names, dialect),
            None => Err(mismatch(val, schema)),
        },
        (Schema::Null, J::Null) => Ok(Value::Null),
        (Schema::Boolean, J::Bool(b)) => Ok(Value::Boolean(*b)),
        (Schema::Int, J::Number(n)) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int)
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::Long, J::Number(n)) => {
            n.as_i64().map(Value::Long).ok_or_else(|| mismatch(val, schema))
        }
        (Schema::Float, J::Number(n)) => n
            .as_f64()
            .map(|f| Value::Float(f as f32))
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::Double, J::Number(n)) => {
            n.as_f64().map(Value::Double).ok_or_else(|| mismatch(val, schema))
        }
        (Schema::String, J::String(s)) => Ok(Value::String(s.clone())),
        (Schema::Bytes, _) => bytes_of(val, dialect)
            .map(Value::Bytes)
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::Fixed(fixed), _) => match bytes_of(val, dialect) {
            Some(bytes) if bytes.len() == fixed.size => Ok(Value::Fixed(fixed.size, bytes)),
            _ => Err(mismatch(val, schema)),
        },
        (Schema::Enum(enum_schema), J::String(s)) => enum_schema
            .symbols
            .iter()
            .position(|symbol| symbol == s)
            .map(|idx| Value::Enum(idx as u32, s.clone()))
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::Date, J::Number(n)) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Date)
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::TimeMillis, J::Number(n)) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::TimeMillis)
            .ok_or_else(|| mismatch(val, schema)),
        (
            Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::TimestampNanos
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros
            | Schema::LocalTimestampNanos,
            J::Number(n),
        ) => {
            let n = n.as_i64().ok_or_else(|| mismatch(val, schema))?;
            Ok(match schema {
                Schema::TimeMicros => Value::TimeMicros(n),
                Schema::TimestampMillis => Value::TimestampMillis(n),
                Schema::TimestampMicros => Value::TimestampMicros(n),
                Schema::TimestampNanos => Value::TimestampNanos(n),
                Schema::LocalTimestampMillis => Value::LocalTimestampMillis(n),
                Schema::LocalTimestampMicros => Value::LocalTimestampMicros(n),
                _ => Value::LocalTimestampNanos(n),
            })
        }
        (Schema::Uuid, J::String(s)) => Uuid::parse_str(s)
            .map(Value::Uuid)
            .map_err(|_| mismatch(val, schema)),
        (Schema::BigDecimal, J::String(s)) => s
            .parse::<BigDecimal>()
            .map(Value::BigDecimal)
            .map_err(|_| mismatch(val, schema)),
        (Schema::Decimal(_), _) => bytes_of(val, dialect)
            .map(|bytes| Value::Decimal(Decimal::from(bytes)))
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::Duration, _) => bytes_of(val, dialect)
            .and_then(|bytes| <[u8; 12]>::try_from(bytes).ok())
            .map(|bytes| Value::Duration(Duration::from(bytes)))
            .ok_or_else(|| mismatch(val, schema)),
        (Schema::Array(inner), J::Array(items)) => items
            .iter()
            .map(|item| value_to_avro(item, &inner.items, names, dialect))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Schema::Map(inner), J::Object(entries)) => entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), value_to_avro(v, &inner.types, names, dialect)?)))
            .collect::<Result<HashMap<_, _>, _>>()
            .map(Value::Map),
        (Schema::Record(record_schema), J::Object(map)) => {
            let mut fields = Vec::with_capacity(record_schema.fields.len());
            for field in &record_schema.fields {
                let field_val = map
                    .get(&field.name)
                    .or(field.default.as_ref())
                    .unwrap_or(&J::Null);
                fields.push((field.name.clone(), value_to_avro(field_val, &field.schema, names, dialect)?));
            }
            Ok(Value::Record(fields))
        }
        (Schema::Union(union_schema), _) => {
            let variants = union_schema.variants();
            if dialect == Dialect::AvroJson {
                if let J::Object(wrapped) = val {
                    if let Some((key, inner)) = wrapped.iter().next().filter(|_| wrapped.len() == 1) {
                        if let Some(idx) = variants.iter().position(|v| branch_name(v) == *key) {
                            let v = value_to_avro(inner, &variants[idx], names, dialect)?;
                            return Ok(Value::Union(idx as u32, Box::new(v)));
                        }
                    }
                }
            }
            for (idx, variant) in variants.iter().enumerate() {
                if dialect == Dialect::AvroJson && !matches!(variant, Schema::Null) {
                    continue;
                }
                if let Ok(v) = value_to_avro(val, variant, names, dialect) {
                    return Ok(Value::Union(idx as u32, Box::new(v)));
                }
            }
            Err(mismatch(val, schema))
        }
        _ => Err(mismatch(val, schema)),
    }
}

fn bytes_of(val: &serde_json::Value, dialect: Dialect) -> Option<Vec<u8>> {
    match (val, dialect) {
        (serde_json::Value::String(s), Dialect::AvroJson) => {
            s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
        }
        (serde_json::Value::String(s), Dialect::Generic) => Some(s.as_bytes().to_vec()),
        (serde_json::Value::Array(items), Dialect::Generic) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}
