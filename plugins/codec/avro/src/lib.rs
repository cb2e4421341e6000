//! Avro codecs: binary datum encoding and the Avro JSON encoding.

mod codec;
mod convert;

pub use codec::{AvroBinaryCodec, AvroJsonCodec};
