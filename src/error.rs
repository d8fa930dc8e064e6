//! Connection and stream error types
//!
//! Errors are classified the way RFC 7540 Section 7 classifies them: a
//! condition that can be isolated to one stream is stream-scoped and surfaces
//! as RST_STREAM; anything that compromises shared connection state (HPACK
//! tables, windows, settings) is connection-fatal and maps to a GOAWAY code.

use std::fmt;

/// Errors raised by the connection core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure: the duplex errored, or ended before Terminated
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation (RFC 7540 Section 7 - Error code 0x1)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Implementation fault (RFC 7540 Section 7 - Error code 0x2)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Flow-control violation (RFC 7540 Section 7 - Error code 0x3)
    #[error("Flow control error: {0}")]
    FlowControl(String),

    /// Frame received for a closed stream (RFC 7540 Section 7 - Error code 0x5)
    #[error("Stream closed: {0}")]
    StreamClosed(u32),

    /// Frame size incorrect (RFC 7540 Section 7 - Error code 0x6)
    #[error("Frame size error: {0}")]
    FrameSize(String),

    /// Stream refused before processing (RFC 7540 Section 7 - Error code 0x7)
    #[error("Refused stream: {0}")]
    RefusedStream(u32),

    /// Stream cancelled (RFC 7540 Section 7 - Error code 0x8)
    #[error("Stream cancelled: {0}")]
    Cancel(u32),

    /// HPACK coding failure (RFC 7540 Section 7 - Error code 0x9)
    #[error("Compression error: {0}")]
    Compression(String),

    /// Invalid stream ID (parity, regression, or reserved bit misuse)
    #[error("Invalid stream ID: {0}")]
    InvalidStreamId(u32),

    /// Stream not found in the registry
    #[error("Stream not found: {0}")]
    StreamNotFound(u32),

    /// Peer's MAX_CONCURRENT_STREAMS would be exceeded
    #[error("Too many concurrent streams")]
    TooManyStreams,

    /// A locally proposed setting failed validation
    #[error("Invalid settings value: {0}")]
    InvalidSettings(String),

    /// The connection has terminated
    #[error("Connection closed")]
    ConnectionClosed,

    /// The settings handshake has not completed yet
    #[error("Connection not ready")]
    NotReady,

    /// The connection is finishing; no new streams may be opened
    #[error("Connection is shutting down")]
    ShuttingDown,

    /// Client preface missing or malformed
    #[error("Missing connection preface")]
    MissingPreface,

    /// Too many pings in flight
    #[error("Too many pending pings")]
    TooManyPings,
}

impl Error {
    /// Map a dispatch error to the code carried in GOAWAY.
    ///
    /// HPACK decode failures are not stream-recoverable and map to
    /// PROTOCOL_ERROR. Transport errors never reach GOAWAY (the wire is
    /// gone); they are recorded as CONNECT_ERROR.
    pub fn goaway_code(&self) -> ErrorCode {
        match self {
            Error::Protocol(_)
            | Error::Compression(_)
            | Error::MissingPreface
            | Error::InvalidStreamId(_) => ErrorCode::ProtocolError,
            Error::FlowControl(_) => ErrorCode::FlowControlError,
            Error::FrameSize(_) => ErrorCode::FrameSizeError,
            Error::StreamClosed(_) => ErrorCode::StreamClosed,
            Error::RefusedStream(_) => ErrorCode::RefusedStream,
            Error::Cancel(_) => ErrorCode::Cancel,
            Error::Io(_) => ErrorCode::ConnectError,
            _ => ErrorCode::InternalError,
        }
    }

    /// True for transport failures, where emitting GOAWAY is pointless.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// HTTP/2 error codes as defined in RFC 7540 Section 7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// Graceful shutdown
    NoError = 0x0,
    /// Protocol error detected
    ProtocolError = 0x1,
    /// Implementation fault
    InternalError = 0x2,
    /// Flow-control limits exceeded
    FlowControlError = 0x3,
    /// Settings not acknowledged
    SettingsTimeout = 0x4,
    /// Frame received for closed stream
    StreamClosed = 0x5,
    /// Frame size incorrect
    FrameSizeError = 0x6,
    /// Stream not processed
    RefusedStream = 0x7,
    /// Stream cancelled
    Cancel = 0x8,
    /// Compression state not updated
    CompressionError = 0x9,
    /// TCP connection error for CONNECT method
    ConnectError = 0xa,
    /// Processing capacity exceeded
    EnhanceYourCalm = 0xb,
    /// Negotiated TLS parameters not acceptable
    InadequateSecurity = 0xc,
    /// Use HTTP/1.1 for the request
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Create error code from u32
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0x0 => Some(ErrorCode::NoError),
            0x1 => Some(ErrorCode::ProtocolError),
            0x2 => Some(ErrorCode::InternalError),
            0x3 => Some(ErrorCode::FlowControlError),
            0x4 => Some(ErrorCode::SettingsTimeout),
            0x5 => Some(ErrorCode::StreamClosed),
            0x6 => Some(ErrorCode::FrameSizeError),
            0x7 => Some(ErrorCode::RefusedStream),
            0x8 => Some(ErrorCode::Cancel),
            0x9 => Some(ErrorCode::CompressionError),
            0xa => Some(ErrorCode::ConnectError),
            0xb => Some(ErrorCode::EnhanceYourCalm),
            0xc => Some(ErrorCode::InadequateSecurity),
            0xd => Some(ErrorCode::Http11Required),
            _ => None,
        }
    }

    /// Get error name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FlowControlError => "FLOW_CONTROL_ERROR",
            ErrorCode::SettingsTimeout => "SETTINGS_TIMEOUT",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
            ErrorCode::FrameSizeError => "FRAME_SIZE_ERROR",
            ErrorCode::RefusedStream => "REFUSED_STREAM",
            ErrorCode::Cancel => "CANCEL",
            ErrorCode::CompressionError => "COMPRESSION_ERROR",
            ErrorCode::ConnectError => "CONNECT_ERROR",
            ErrorCode::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            ErrorCode::InadequateSecurity => "INADEQUATE_SECURITY",
            ErrorCode::Http11Required => "HTTP_1_1_REQUIRED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u32())
    }
}

/// Result type for connection core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ErrorCode::NoError.as_u32(), 0x0);
        assert_eq!(ErrorCode::ProtocolError.as_u32(), 0x1);
        assert_eq!(ErrorCode::Http11Required.as_u32(), 0xd);

        assert_eq!(ErrorCode::from_u32(0x0), Some(ErrorCode::NoError));
        assert_eq!(ErrorCode::from_u32(0x3), Some(ErrorCode::FlowControlError));
        assert_eq!(ErrorCode::from_u32(0xff), None);
    }

    #[test]
    fn test_goaway_mapping() {
        assert_eq!(
            Error::Protocol("x".into()).goaway_code(),
            ErrorCode::ProtocolError
        );
        assert_eq!(
            Error::FlowControl("x".into()).goaway_code(),
            ErrorCode::FlowControlError
        );
        assert_eq!(
            Error::FrameSize("x".into()).goaway_code(),
            ErrorCode::FrameSizeError
        );
        // HPACK failures desynchronize the shared tables: connection-fatal,
        // reported as PROTOCOL_ERROR.
        assert_eq!(
            Error::Compression("x".into()).goaway_code(),
            ErrorCode::ProtocolError
        );
        assert_eq!(
            Error::TooManyPings.goaway_code(),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn test_transport_classification() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.is_transport());
        assert_eq!(io.goaway_code(), ErrorCode::ConnectError);
        assert!(!Error::Protocol("x".into()).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Protocol("test error".to_string());
        assert_eq!(err.to_string(), "Protocol error: test error");

        let err = Error::StreamClosed(42);
        assert_eq!(err.to_string(), "Stream closed: 42");
    }
}
