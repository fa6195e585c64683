use thiserror::Error;

/// Failures of the capture+analysis round trip. The runtime forwards these to
/// subscribers untouched and never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("API key is missing. Set OPENAI_API_KEY and restart.")]
    MissingApiKey,
    #[error("analysis provider returned an unexpected response")]
    InvalidResponse,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("{0}")]
    Transport(String),
    #[error("screen capture failed: {0}")]
    Capture(String),
}
