use jni::JNIEnv;
use sensor_uploader::{ConfigError, UploaderError};
use thiserror::Error;

/// Errors surfaced to Java as exceptions
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error(transparent)]
    Uploader(#[from] UploaderError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JNI error: {0}")]
    Jni(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ConfigError> for BridgeError {
    fn from(e: ConfigError) -> Self {
        BridgeError::Config(e.to_string())
    }
}

impl From<jni::errors::Error> for BridgeError {
    fn from(e: jni::errors::Error) -> Self {
        BridgeError::Jni(e.to_string())
    }
}

/// Result type for JNI operations
pub type BResult<T> = Result<T, BridgeError>;

/// Java exception class thrown for `error`
pub fn exception_class(error: &BridgeError) -> &'static str {
    match error {
        BridgeError::Uploader(UploaderError::InvalidEndpoint(_)) | BridgeError::Config(_) => {
            "java/lang/IllegalArgumentException"
        }
        BridgeError::Uploader(UploaderError::ChannelClosed) => "java/lang/IllegalStateException",
        BridgeError::Uploader(UploaderError::Transport(_))
        | BridgeError::Uploader(UploaderError::HttpStatus(_))
        | BridgeError::Uploader(UploaderError::SensorUnavailable(_)) => "java/io/IOException",
        BridgeError::Uploader(_) | BridgeError::Jni(_) | BridgeError::Internal(_) => {
            "java/lang/RuntimeException"
        }
    }
}

/// Throw Java exception from Rust error
pub fn throw_java_exception(env: &mut JNIEnv, error: &BridgeError) -> BResult<()> {
    env.throw_new(exception_class(error), error.to_string())
        .map_err(|_| BridgeError::Jni("Failed to throw exception".to_string()))?;

    Ok(())
}
