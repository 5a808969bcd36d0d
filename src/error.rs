// src/error.rs
//! Failure taxonomy shared by the cycle driver, the summary engine and delivery.
//!
//! Cycle-level kinds (`StateCorrupt`, `SourceUnreachable`) abort a fetch cycle.
//! Item-level kinds are turned into `SummaryFailed` events and never cross the
//! per-item handler boundary.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StateCorrupt,
    SourceUnreachable,
    UnexpectedUrl,
    OffTopic,
    SummaryFailed,
    DeliveryFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StateCorrupt => "state_corrupt",
            ErrorKind::SourceUnreachable => "source_unreachable",
            ErrorKind::UnexpectedUrl => "unexpected_url",
            ErrorKind::OffTopic => "off_topic",
            ErrorKind::SummaryFailed => "summary_failed",
            ErrorKind::DeliveryFailed => "delivery_failed",
        }
    }

    /// True for failures that abort a whole cycle rather than one item.
    pub fn is_cycle_level(&self) -> bool {
        matches!(self, ErrorKind::StateCorrupt | ErrorKind::SourceUnreachable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
    /// Originating article URL for item-level failures.
    pub url: Option<String>,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
        }
    }

    pub fn for_url(kind: ErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: Some(url.into()),
        }
    }

    pub fn state_corrupt(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StateCorrupt, message)
    }

    pub fn source_unreachable(err: &anyhow::Error) -> Self {
        Self::new(ErrorKind::SourceUnreachable, format!("{err:#}"))
    }

    pub fn delivery_failed(err: &anyhow::Error) -> Self {
        Self::new(ErrorKind::DeliveryFailed, format!("{err:#}"))
    }

    /// Text shown to the operator in the chat destination.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::StateCorrupt => {
                format!("The cursor state file could not be read ({}).", self.message)
            }
            ErrorKind::SourceUnreachable => {
                format!("The source repository could not be reached ({}).", self.message)
            }
            ErrorKind::UnexpectedUrl => {
                "The article could not be opened or read. Check that the URL is reachable.".to_string()
            }
            ErrorKind::OffTopic => {
                "The article is outside the topics this digest covers.".to_string()
            }
            ErrorKind::SummaryFailed => {
                format!("The article could not be summarized ({}).", self.message)
            }
            ErrorKind::DeliveryFailed => {
                format!("The notification could not be delivered ({}).", self.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_level_kinds() {
        assert!(ErrorKind::StateCorrupt.is_cycle_level());
        assert!(ErrorKind::SourceUnreachable.is_cycle_level());
        assert!(!ErrorKind::OffTopic.is_cycle_level());
        assert!(!ErrorKind::DeliveryFailed.is_cycle_level());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let e = PipelineError::for_url(ErrorKind::SummaryFailed, "https://a.dev", "missing title");
        assert_eq!(e.to_string(), "summary_failed: missing title");
        assert_eq!(e.url.as_deref(), Some("https://a.dev"));
        assert!(e.user_message().contains("missing title"));
    }
}
