//! Error types for the WMS fetch pipeline.

use thiserror::Error;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for every stage of the pipeline.
///
/// No variant is fatal: each one is handed back to the caller, which decides
/// how to surface it.
#[derive(Debug, Error)]
pub enum WmsError {
    // === Input Errors ===
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Failed to parse capabilities XML: {0}")]
    Parse(String),

    // === Network / Image Errors ===
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    // === Segmentation Errors ===
    #[error("No segmentation model loaded")]
    ModelNotLoaded,

    #[error("Inference failed: {0}")]
    Inference(String),

    // === Setup Errors ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WmsError {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        WmsError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable short code for this error, suitable for logs and UI mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            WmsError::Validation { .. } => "ValidationError",
            WmsError::Parse(_) => "ParseError",
            WmsError::Transport(_) => "TransportError",
            WmsError::HttpStatus { .. } => "HttpStatusError",
            WmsError::Decode(_) => "DecodeError",
            WmsError::ModelNotLoaded => "ModelNotLoadedError",
            WmsError::Inference(_) => "InferenceError",
            WmsError::Config(_) => "ConfigError",
        }
    }

    /// The offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            WmsError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether repeating the same request could succeed.
    ///
    /// Only transport-level failures qualify; a server that answered with an
    /// error status or garbage is not retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, WmsError::Transport(_))
    }
}

impl From<image::ImageError> for WmsError {
    fn from(err: image::ImageError) -> Self {
        WmsError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_field() {
        let err = WmsError::validation("layers", "at least one layer is required");
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(err.field(), Some("layers"));
        assert!(err.to_string().contains("'layers'"));
    }

    #[test]
    fn test_only_transport_is_transient() {
        assert!(WmsError::Transport("connection refused".into()).is_transient());
        assert!(!WmsError::HttpStatus {
            status: 503,
            url: "http://x".into()
        }
        .is_transient());
        assert!(!WmsError::Decode("bad png".into()).is_transient());
    }

    #[test]
    fn test_http_status_message() {
        let err = WmsError::HttpStatus {
            status: 404,
            url: "http://example.com/wms".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from http://example.com/wms");
        assert_eq!(err.field(), None);
    }
}
