use crate::error::CodecError;
use crate::payload::Payload;

/// Encodes native payloads to wire bytes and back under one schema
/// contract. Implementations are immutable once constructed.
pub trait Codec: Send + Sync {
    fn encode(&self, data: &Payload) -> Result<Vec<u8>, CodecError>;

    /// Decode `data` into `out`. The variant of `out` tells the codec what
    /// shape the caller expects (e.g. a `Proto` target carries its
    /// message descriptor).
    fn decode(&self, data: &[u8], out: &mut Payload) -> Result<(), CodecError>;
}
