use thiserror::Error;

/// Sensor uploader error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploaderError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Non-finite {field} in record {index}")]
    NonFiniteValue { index: usize, field: &'static str },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Collector channel closed")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploaderError {
    /// True for failures raised while building the JSON document
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            UploaderError::Encoding(_) | UploaderError::NonFiniteValue { .. }
        )
    }
}

impl From<serde_json::Error> for UploaderError {
    fn from(err: serde_json::Error) -> Self {
        UploaderError::Encoding(err.to_string())
    }
}

/// Result type for uploader operations
pub type UResult<T> = Result<T, UploaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_classification() {
        assert!(UploaderError::Encoding("bad".to_string()).is_encoding());
        assert!(UploaderError::NonFiniteValue { index: 0, field: "vertAcc" }.is_encoding());
        assert!(!UploaderError::HttpStatus(500).is_encoding());
        assert!(!UploaderError::Transport("refused".to_string()).is_encoding());
    }

    #[test]
    fn test_error_display() {
        let err = UploaderError::NonFiniteValue { index: 3, field: "accx" };
        assert_eq!(err.to_string(), "Non-finite accx in record 3");
        assert_eq!(UploaderError::HttpStatus(404).to_string(), "Unexpected HTTP status: 404");
    }
}
