use crate::error::{UResult, UploaderError};
use std::fmt;

/// Why a send attempt failed, as reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Endpoint answered with something other than 200
    Status(u16),
    /// The upload document could not be built
    Encoding,
    /// Connection, DNS or I/O failure
    Transport,
}

/// User-visible messages emitted by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    CollectionStarted,
    CollectionStopped,
    SendSucceeded,
    SendFailed(SendFailure),
}

impl Notification {
    pub fn from_send_result(result: &UResult<()>) -> Self {
        match result {
            Ok(()) => Notification::SendSucceeded,
            Err(UploaderError::HttpStatus(code)) => Notification::SendFailed(SendFailure::Status(*code)),
            Err(e) if e.is_encoding() => Notification::SendFailed(SendFailure::Encoding),
            Err(_) => Notification::SendFailed(SendFailure::Transport),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notification::CollectionStarted => "Data collection started",
            Notification::CollectionStopped => "Data collection stopped and saved",
            Notification::SendSucceeded => "Data sent successfully",
            Notification::SendFailed(SendFailure::Status(_)) => "Failed to send data",
            Notification::SendFailed(SendFailure::Encoding) => "JSON Error",
            Notification::SendFailed(SendFailure::Transport) => "Error sending data",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notification::SendFailed(_))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
