//! Error types for port detection

use thiserror::Error;

/// Errors that can occur while enumerating ports
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// Serial port error
    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialport_error_conversion() {
        let err: DetectError =
            serialport::Error::new(serialport::ErrorKind::NoDevice, "udev unavailable").into();

        assert!(matches!(err, DetectError::SerialPort(_)));
        assert_eq!(err.to_string(), "serial port error: udev unavailable");
    }
}
