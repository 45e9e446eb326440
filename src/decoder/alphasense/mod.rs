// src/decoder/alphasense/mod.rs

//! Alphasense OPC-R1 and OPC-N3 over SPI (mode 1, MSB first).
//!
//! Every exchange opens with a handshake: the host clocks a command byte
//! until the device answers `0x31` and then `0xF3` on consecutive transfers.
//! Chip select stays asserted for whatever follows and is released at the end.

pub mod n3;
pub mod r1;

pub use n3::N3;
pub use r1::R1;

use crate::common::{
    config::RetryPolicy,
    error::OpcError,
    hal_traits::{OpcTimer, SpiPort},
    timing,
};
use log::debug;

pub const HANDSHAKE_BUSY: u8 = 0x31;
pub const HANDSHAKE_READY: u8 = 0xF3;

/// Command byte that starts a histogram read.
pub(crate) const CMD_READ_HISTOGRAM: u8 = 0x30;
/// Command byte that opens a power or peripheral-control exchange.
pub(crate) const CMD_CONTROL: u8 = 0x03;

const FULL_SCALE: f32 = 65535.0;

/// Relative humidity in %RH from the SHT-style raw code.
pub fn humidity_from_raw(raw: u16) -> f32 {
    f32::from(raw) / FULL_SCALE * 100.0
}

/// Temperature in °C from the SHT-style raw code.
pub fn temperature_from_raw(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / FULL_SCALE
}

/// Releases chip select, then hands back `result`. A deselect failure only
/// surfaces if `result` was a success.
pub(crate) fn release<IF, T>(iface: &mut IF, result: Result<T, OpcError<IF::Error>>) -> Result<T, OpcError<IF::Error>>
where
    IF: SpiPort,
{
    let deselected = iface.deselect().map_err(OpcError::Io);
    let value = result?;
    deselected?;
    Ok(value)
}

/// Runs the ready handshake under `policy`.
///
/// On success chip select is left asserted. On failure it has been released
/// and nothing beyond the handshake transfers went out on the bus.
pub(crate) fn handshake<IF>(iface: &mut IF, command: u8, policy: &RetryPolicy) -> Result<(), OpcError<IF::Error>>
where
    IF: SpiPort + OpcTimer,
{
    let mut attempts = 0u32;
    for round in 0..policy.rounds {
        let pause = policy.backoff_before(round);
        if !pause.is_zero() {
            debug!("handshake: backing off {} ms before round {}", pause.as_millis(), round);
            iface.delay(pause);
        }

        iface.select().map_err(OpcError::Io)?;
        let mut previous = 0x00;
        for _ in 0..policy.transfers_per_round {
            iface.delay(timing::ALPHASENSE_HANDSHAKE_GAP);
            let current = match iface.transfer(command) {
                Ok(byte) => byte,
                Err(e) => return release(iface, Err(OpcError::Io(e))),
            };
            attempts += 1;
            if previous == HANDSHAKE_BUSY && current == HANDSHAKE_READY {
                return Ok(());
            }
            previous = current;
        }
        iface.deselect().map_err(OpcError::Io)?;
    }
    Err(OpcError::HandshakeFailed { attempts })
}

/// Clocks `fill` out once per byte of `buf`, pausing `gap_us` before each.
/// Leaves chip select as it found it.
pub(crate) fn read_block<IF>(iface: &mut IF, fill: u8, gap_us: u32, buf: &mut [u8]) -> Result<(), OpcError<IF::Error>>
where
    IF: SpiPort + OpcTimer,
{
    for slot in buf.iter_mut() {
        iface.delay_us(gap_us);
        *slot = iface.transfer(fill).map_err(OpcError::Io)?;
    }
    Ok(())
}

/// Handshake with `CMD_CONTROL`, then one control byte.
pub(crate) fn send_control<IF>(iface: &mut IF, control: u8, policy: &RetryPolicy) -> Result<(), OpcError<IF::Error>>
where
    IF: SpiPort + OpcTimer,
{
    handshake(iface, CMD_CONTROL, policy)?;
    let sent = iface.transfer(control).map(|_| ()).map_err(OpcError::Io);
    release(iface, sent)
}
