// src/common/error.rs

/// Coarse classification of a failed decode attempt.
///
/// Every variant is recoverable: the caller simply polls again. The
/// persistent-degradation and stale-data conditions are tracked by
/// [`HealthState`](crate::monitor::HealthState), not here.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Not enough bytes buffered, or the SPI handshake was not observed in budget.
    TransportNotReady,
    /// Bad sync/end byte, checksum or CRC mismatch, or a device-reported fault.
    FrameIntegrity,
    /// The underlying HAL reported an error.
    Bus,
    /// The operation does not exist for this device family.
    Unsupported,
}

#[derive(Debug, thiserror::Error)]
pub enum OpcError<E = ()>
where
    E: core::fmt::Debug,
{
    /// Underlying I/O error from the HAL implementation.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// Fewer bytes are buffered than the frame needs.
    #[error("Not enough data: needed {needed}, available {available}")]
    NotReady { needed: usize, available: usize },

    /// The SPI ready handshake was not seen within the retry budget.
    #[error("Handshake not observed after {attempts} transfers")]
    HandshakeFailed { attempts: u32 },

    /// A non-blocking write kept returning `WouldBlock`.
    #[error("Operation timed out")]
    Timeout,

    /// The next byte in the stream is not the expected start byte.
    #[error("Unexpected start byte: {0:#04x}")]
    BadSync(u8),

    /// The frame did not end with the expected end byte.
    #[error("Unexpected end byte: {0:#04x}")]
    BadEnd(u8),

    /// Additive checksum does not match the transmitted one.
    #[error("Checksum mismatch: expected {expected:#06x}, calculated {calculated:#06x}")]
    ChecksumMismatch { expected: u16, calculated: u16 },

    /// CRC does not match the transmitted one.
    #[error("CRC mismatch: expected {expected:#06x}, calculated {calculated:#06x}")]
    CrcMismatch { expected: u16, calculated: u16 },

    /// Device reported a non-zero status byte.
    #[error("Device reported status {0:#04x}")]
    DeviceStatus(u8),

    /// Device answered with its explicit failure marker.
    #[error("Device rejected the request")]
    DeviceNack,

    /// A command was sent but never acknowledged.
    #[error("Command not acknowledged")]
    NotAcknowledged,

    /// Received frame is structurally wrong (length, command echo).
    #[error("Invalid frame format")]
    InvalidFormat,

    /// The device family has no such operation.
    #[error("Operation not supported by this device")]
    Unsupported,
}

impl<E: core::fmt::Debug> OpcError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpcError::Io(_) => ErrorKind::Bus,
            OpcError::NotReady { .. } | OpcError::HandshakeFailed { .. } | OpcError::Timeout => {
                ErrorKind::TransportNotReady
            }
            OpcError::BadSync(_)
            | OpcError::BadEnd(_)
            | OpcError::ChecksumMismatch { .. }
            | OpcError::CrcMismatch { .. }
            | OpcError::DeviceStatus(_)
            | OpcError::DeviceNack
            | OpcError::NotAcknowledged
            | OpcError::InvalidFormat => ErrorKind::FrameIntegrity,
            OpcError::Unsupported => ErrorKind::Unsupported,
        }
    }

    /// True for errors that only mean "try again next poll".
    pub fn is_not_ready(&self) -> bool {
        self.kind() == ErrorKind::TransportNotReady
    }
}
