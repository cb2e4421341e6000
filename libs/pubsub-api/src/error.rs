/// Boxed error used as the cause of wrapped codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ════════════════════════════════════════════════════════════════
//  Broker Error
// ════════════════════════════════════════════════════════════════

/// Category of a broker error. Lets callers tell a missing resource
/// from a transient failure without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource does not exist.
    NotFound,
    /// The resource already exists (create calls).
    AlreadyExists,
    /// The request was malformed or violates a resource contract.
    InvalidArgument,
    /// The broker is unreachable or shut down. Transient, may retry.
    Unavailable,
    /// Anything else.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => f.write_str("not found"),
            ErrorKind::AlreadyExists => f.write_str("already exists"),
            ErrorKind::InvalidArgument => f.write_str("invalid argument"),
            ErrorKind::Unavailable => f.write_str("unavailable"),
            ErrorKind::Internal => f.write_str("internal"),
        }
    }
}

/// Unified error type for all broker collaborator methods.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerError {
    kind: ErrorKind,
    message: String,
}

impl BrokerError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Prefix the message with context, keeping the kind.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Debug for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BrokerError {}

impl From<String> for BrokerError {
    fn from(s: String) -> Self { Self::internal(s) }
}

impl From<&str> for BrokerError {
    fn from(s: &str) -> Self { Self::internal(s) }
}

// ════════════════════════════════════════════════════════════════
//  Codec Error
// ════════════════════════════════════════════════════════════════

/// Errors returned by `Codec::encode` / `Codec::decode` and by the
/// codec factory.
///
/// Contract errors are fixed messages; encoding failures wrap the
/// underlying marshal error behind a distinguishing prefix.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("data without schema cannot be decoded")]
    NoSchema,

    #[error("invalid avro encoding")]
    InvalidAvroEncoding,

    #[error("invalid proto encoding")]
    InvalidProtoEncoding,

    #[error("invalid schema type")]
    InvalidSchemaType,

    #[error("invalid proto message")]
    InvalidProtoMessage,

    #[error("{context}: {source}")]
    Wrapped {
        context: &'static str,
        #[source]
        source: BoxError,
    },
}

impl CodecError {
    /// Wrap an underlying failure behind a fixed prefix,
    /// e.g. `CodecError::wrap("cannot encode avro binary", e)`.
    pub fn wrap(context: &'static str, source: impl Into<BoxError>) -> Self {
        CodecError::Wrapped { context, source: source.into() }
    }

    /// Prefix of a wrapped error, if any.
    pub fn context(&self) -> Option<&'static str> {
        match self {
            CodecError::Wrapped { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn broker_error_context_keeps_kind() {
        let err = BrokerError::not_found("topic missing").with_context("get topic");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "get topic: topic missing");
        assert!(err.is_not_found());
    }

    #[test]
    fn wrapped_codec_error_renders_prefix_and_cause() {
        let err = CodecError::wrap("cannot decode avro binary", "unexpected eof");
        assert_eq!(err.to_string(), "cannot decode avro binary: unexpected eof");
        assert_eq!(err.context(), Some("cannot decode avro binary"));
        assert_eq!(CodecError::NoSchema.context(), None);
    }
}
