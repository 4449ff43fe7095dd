/// Faults raised by the foreign runtime.
///
/// Once one of these is raised the runtime has a pending exception and the
/// current conversion is over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForeignError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("pending exception: {0}")]
    PendingException(String),

    #[error("local reference capacity exceeded: {live} live, {requested} requested, capacity {capacity}")]
    LocalRefCapacityExceeded {
        live: usize,
        requested: usize,
        capacity: usize,
    },

    #[error("invalid or stale local reference")]
    InvalidReference,

    #[error("array index {index} out of bounds for length {len}")]
    ArrayIndexOutOfBounds { index: usize, len: usize },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("number format error: {0:?}")]
    NumberFormat(String),

    #[error("unknown callback")]
    UnknownCallback,

    #[error("callback threw: {0}")]
    CallbackThrew(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("foreign runtime error: {0}")]
    Foreign(#[from] ForeignError),

    /// A foreign fault with the location in the report where it happened.
    #[error("{context}: {source}")]
    Aborted {
        context: String,
        #[source]
        source: ForeignError,
    },

    #[error("invalid report: {0}")]
    InvalidReport(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Add context to the error.
    ///
    /// Foreign faults keep their cause; outer context is prepended.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            BridgeError::Foreign(source) => BridgeError::Aborted {
                context: ctx.to_string(),
                source,
            },
            BridgeError::Aborted { context, source } => BridgeError::Aborted {
                context: format!("{ctx}: {context}"),
                source,
            },
            BridgeError::Config(msg) => BridgeError::Config(format!("{ctx}: {msg}")),
            BridgeError::InvalidReport(msg) => BridgeError::InvalidReport(format!("{ctx}: {msg}")),
            BridgeError::Delivery(msg) => BridgeError::Delivery(format!("{ctx}: {msg}")),
            BridgeError::Io(e) => BridgeError::Io(std::io::Error::new(e.kind(), format!("{ctx}: {e}"))),
        }
    }

    /// The underlying foreign fault, if this error came from the runtime.
    pub fn foreign(&self) -> Option<&ForeignError> {
        match self {
            BridgeError::Foreign(e) | BridgeError::Aborted { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_nests_outermost_first() {
        let err = BridgeError::from(ForeignError::OutOfMemory)
            .with_context("member 'bytesSent'")
            .with_context("record 'ssrc_1'");
        assert_eq!(
            err.to_string(),
            "record 'ssrc_1': member 'bytesSent': out of memory"
        );
        assert_eq!(err.foreign(), Some(&ForeignError::OutOfMemory));
    }

    #[test]
    fn config_errors_have_no_foreign_cause() {
        let err = BridgeError::Config("bad".into()).with_context("bridge.toml");
        assert_eq!(err.to_string(), "config error: bridge.toml: bad");
        assert!(err.foreign().is_none());
    }

    #[test]
    fn io_errors_keep_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = BridgeError::from(io).with_context("report.json");
        assert_eq!(err.to_string(), "io error: report.json: missing");
        assert!(matches!(&err, BridgeError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
