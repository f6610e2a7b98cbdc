//! Failure taxonomy for a single poll cycle.

use thiserror::Error;

/// Everything that can stop a poll cycle from producing a document.
///
/// Each variant maps to one of four failure kinds reported by [`PollError::kind`]:
/// `fetch_error`, `decode_error`, `unsupported_content` and `serialization_error`.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("invalid feed url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("feed fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("feed decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("feed decode failed: missing required field `{0}`")]
    MissingField(&'static str),

    #[error(
        "unsupported feed content: none of {entities} entities carries a trip update or vehicle position"
    )]
    UnsupportedContent { entities: usize },

    #[error("failed to serialize output document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PollError {
    /// Short, stable tag used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::InvalidUrl { .. } | PollError::Fetch(_) => "fetch_error",
            PollError::Decode(_) | PollError::MissingField(_) => "decode_error",
            PollError::UnsupportedContent { .. } => "unsupported_content",
            PollError::Serialization(_) => "serialization_error",
        }
    }

    pub fn is_fetch(&self) -> bool {
        self.kind() == "fetch_error"
    }

    pub fn is_decode(&self) -> bool {
        self.kind() == "decode_error"
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, PollError::UnsupportedContent { .. })
    }
}
