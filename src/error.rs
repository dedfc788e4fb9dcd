use thiserror::Error;

/// Errors a caller is expected to surface instead of degrading to an empty
/// result. Both are configuration problems, not data problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown city: {0}")]
    UnknownCity(String),

    #[error("invalid WFS service URL '{url}': {reason}")]
    InvalidServiceUrl { url: String, reason: String },
}
