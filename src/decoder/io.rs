// src/decoder/io.rs

//! Bounded serial I/O shared by the UART decoders.

use crate::common::{
    error::OpcError,
    hal_traits::{OpcTimer, SerialPort},
    timing,
};
use core::time::Duration;
use nb::Result as NbResult;

/// Retries a non-blocking operation while it returns `WouldBlock`, sleeping
/// briefly between tries, and gives up with `Timeout` after a fixed count.
fn retry_bounded<IF, T, FN>(iface: &mut IF, mut f: FN) -> Result<T, OpcError<IF::Error>>
where
    IF: SerialPort + OpcTimer,
    FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
{
    for _ in 0..=timing::WRITE_RETRY_LIMIT {
        match f(iface) {
            Ok(value) => return Ok(value),
            Err(nb::Error::WouldBlock) => iface.delay_us(timing::WRITE_RETRY_DELAY_US),
            Err(nb::Error::Other(e)) => return Err(OpcError::Io(e)),
        }
    }
    Err(OpcError::Timeout)
}

/// Writes every byte of `frame` and flushes.
pub(crate) fn write_all<IF>(iface: &mut IF, frame: &[u8]) -> Result<(), OpcError<IF::Error>>
where
    IF: SerialPort + OpcTimer,
{
    for &byte in frame {
        retry_bounded(iface, |i| i.write_byte(byte))?;
    }
    retry_bounded(iface, |i| i.flush())
}

/// Sends a command, waits `settle`, then throws away the device's fixed-size reply.
pub(crate) fn command_and_discard<IF>(
    iface: &mut IF,
    frame: &[u8],
    settle: Duration,
    reply_len: usize,
) -> Result<(), OpcError<IF::Error>>
where
    IF: SerialPort + OpcTimer,
{
    write_all(iface, frame)?;
    iface.delay(settle);
    iface.discard(reply_len).map_err(OpcError::Io)?;
    Ok(())
}

/// Consumes one byte that is expected to be buffered already.
pub(crate) fn read_one<IF>(iface: &mut IF) -> Result<u8, OpcError<IF::Error>>
where
    IF: SerialPort,
{
    match iface.read_byte() {
        Ok(byte) => Ok(byte),
        Err(nb::Error::WouldBlock) => Err(OpcError::NotReady { needed: 1, available: 0 }),
        Err(nb::Error::Other(e)) => Err(OpcError::Io(e)),
    }
}

/// Looks at the next byte without consuming it.
pub(crate) fn peek_one<IF>(iface: &mut IF) -> Result<u8, OpcError<IF::Error>>
where
    IF: SerialPort,
{
    match iface.peek() {
        Ok(byte) => Ok(byte),
        Err(nb::Error::WouldBlock) => Err(OpcError::NotReady { needed: 1, available: 0 }),
        Err(nb::Error::Other(e)) => Err(OpcError::Io(e)),
    }
}

/// Fills `buf` from what is buffered; fewer bytes than asked is `NotReady`.
pub(crate) fn read_exact<IF>(iface: &mut IF, buf: &mut [u8]) -> Result<(), OpcError<IF::Error>>
where
    IF: SerialPort,
{
    let got = iface.read_available(buf).map_err(OpcError::Io)?;
    if got < buf.len() {
        return Err(OpcError::NotReady { needed: buf.len(), available: got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockError, MockInterface};

    #[test]
    fn test_write_all_flushes() {
        let mut iface = MockInterface::new();
        write_all(&mut iface, &[0x68, 0x01, 0x04, 0x93]).unwrap();
        assert_eq!(iface.tx, vec![0x68, 0x01, 0x04, 0x93]);
        assert_eq!(iface.flush_count, 1);
    }

    #[test]
    fn test_write_all_reports_io_error() {
        let mut iface = MockInterface::new();
        iface.fail_io = true;
        assert!(matches!(write_all(&mut iface, &[0x00]), Err(OpcError::Io(MockError))));
    }

    #[test]
    fn test_command_and_discard_drops_reply() {
        let mut iface = MockInterface::new();
        iface.respond_on_flush(&[0x42, 0x4D, 0x00, 0x04, 0xE4, 0x00, 0x01, 0x77, 0xAA]);
        command_and_discard(&mut iface, &[0x01], Duration::from_millis(20), 8).unwrap();
        assert_eq!(iface.rx.len(), 1, "only bytes past the reply remain");
        assert_eq!(iface.now_us, 20_000);
    }

    #[test]
    fn test_read_exact_short_is_not_ready() {
        let mut iface = MockInterface::new();
        iface.stage_rx(&[1, 2]);
        let mut buf = [0u8; 4];
        assert!(matches!(
            read_exact(&mut iface, &mut buf),
            Err(OpcError::NotReady { needed: 4, available: 2 })
        ));
    }

    #[test]
    fn test_read_and_peek_one() {
        let mut iface = MockInterface::new();
        assert!(matches!(peek_one(&mut iface), Err(OpcError::NotReady { .. })));
        iface.stage_rx(&[0x7E]);
        assert_eq!(peek_one(&mut iface).unwrap(), 0x7E);
        assert_eq!(read_one(&mut iface).unwrap(), 0x7E);
        assert!(matches!(read_one(&mut iface), Err(OpcError::NotReady { .. })));
    }
}
