//! Error types for webfixture

use std::time::Duration;

use thiserror::Error;

/// Result type for webfixture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Driver messages that mean the element went away between lookup and use
const STALE_MARKERS: &[&str] = &[
    "stale element reference",
    "Element does not exist in cache",
    "is not attached to the page document",
];

/// Driver messages that mean another element is currently on top of the target
const INTERCEPT_MARKERS: &[&str] = &[
    "Other element would receive the click",
    "element click intercepted",
];

/// Error type for webfixture
#[derive(Debug, Error)]
pub enum Error {
    /// A single table step failed; the run continues with the next step
    #[error("{message}")]
    StepFailed {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Continuing the run is meaningless; remaining steps are skipped
    #[error("{message}")]
    RunAborted {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// A poll deadline elapsed
    #[error("Timed-out waiting (after {}s)", .after.as_secs())]
    Timeout { after: Duration },

    /// Element was detached from the DOM between lookup and use
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// Another element would receive the click
    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    /// Unclassified automation driver failure
    #[error("Driver error: {0}")]
    Driver(String),

    /// JavaScript raised or returned something unusable
    #[error("Script error: {0}")]
    Script(String),

    /// Navigation error
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Out-of-band HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Address could not be parsed or joined
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a recoverable step failure
    pub fn step_failed(message: impl Into<String>) -> Self {
        Self::StepFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a recoverable step failure wrapping its cause
    pub fn step_failed_by(message: impl Into<String>, source: Error) -> Self {
        Self::StepFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a run-aborting failure wrapping its cause
    pub fn run_aborted(message: impl Into<String>, source: Option<Error>) -> Self {
        Self::RunAborted {
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    /// Classify a raw driver message into stale/intercepted/other
    ///
    /// Driver implementations should route their failures through this so the
    /// poller can tell transient races from real errors regardless of which
    /// automation backend produced them.
    pub fn from_driver_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if STALE_MARKERS.iter().any(|m| message.contains(m)) {
            Self::StaleElement(message)
        } else if INTERCEPT_MARKERS.iter().any(|m| message.contains(m)) {
            Self::ClickIntercepted(message)
        } else {
            Self::Driver(message)
        }
    }

    /// Errors the poller swallows and retries
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StaleElement(_) | Error::ClickIntercepted(_))
    }

    /// Check if this is a stale element error
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::StaleElement(_))
    }

    /// Check if a deadline elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Already one of the two kinds the test runner renders
    pub fn is_classified(&self) -> bool {
        matches!(self, Error::StepFailed { .. } | Error::RunAborted { .. })
    }

    /// Check if the run must stop
    pub fn stops_run(&self) -> bool {
        matches!(self, Error::RunAborted { .. })
    }

    /// Message plus every cause, one per line
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            out.push_str("\ncaused by: ");
            out.push_str(&cause.to_string());
            current = cause.source();
        }
        out
    }
}
