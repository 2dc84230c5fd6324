use thiserror::Error;

#[derive(Debug, Error)]
pub enum DurationError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("audio decode failed: {message}")]
    Decode { message: String },
    #[error("degenerate input: {message}")]
    DegenerateInput { message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl DurationError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }

    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Failures the integration layer absorbs with the uniform split.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::DegenerateInput { .. })
    }
}
