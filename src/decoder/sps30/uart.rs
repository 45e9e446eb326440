// src/decoder/sps30/uart.rs

use super::shdlc::{self, ESCAPE, FRAME_DELIMITER};
use super::{parse_values, PAYLOAD_LEN};
use crate::common::{
    config::{DeviceConfig, SPS30_UART},
    error::OpcError,
    frame::FrameBuffer,
    hal_traits::{OpcTimer, SerialPort},
    reading::Reading,
    timing,
};
use crate::decoder::{io, OpcDecoder};

/// Unstuffed length of a read-measured-values reply.
const FRAME_LEN: usize = 47;
/// Start byte plus `ADR CMD STATE LEN`.
const HEADER_LEN: usize = 5;
/// Replies to start/stop/clean carry no data.
const COMMAND_REPLY_LEN: usize = 7;
/// Bytes thrown away after a framing fault so the next attempt starts clean.
const DRAIN_LEN: usize = 60;

/// SPS30 on its SHDLC UART interface (115200 8N1).
#[derive(Debug, Clone, Default)]
pub struct Sps30Uart {
    payload: FrameBuffer<PAYLOAD_LEN>,
}

impl Sps30Uart {
    pub fn new() -> Self {
        Self::default()
    }

    fn send<IF>(&mut self, iface: &mut IF, command: u8, data: &[u8]) -> Result<(), OpcError<IF::Error>>
    where
        IF: SerialPort + OpcTimer,
    {
        let frame = shdlc::request(command, data).ok_or(OpcError::InvalidFormat)?;
        io::command_and_discard(iface, &frame, timing::SPS30_COMMAND_SETTLE, COMMAND_REPLY_LEN)
    }

    fn drain<IF: SerialPort>(iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        iface.discard(DRAIN_LEN).map_err(OpcError::Io)?;
        Ok(())
    }
}

/// A frame that runs dry after its header was consumed cannot be resumed.
fn torn<E: core::fmt::Debug>(e: OpcError<E>) -> OpcError<E> {
    if e.is_not_ready() {
        OpcError::InvalidFormat
    } else {
        e
    }
}

fn read_unstuffed<IF: SerialPort>(iface: &mut IF) -> Result<u8, OpcError<IF::Error>> {
    let byte = io::read_one(iface)?;
    if byte == ESCAPE {
        Ok(shdlc::unstuff(io::read_one(iface)?))
    } else {
        Ok(byte)
    }
}

impl<IF> OpcDecoder<IF> for Sps30Uart
where
    IF: SerialPort + OpcTimer,
{
    type BusError = IF::Error;

    fn config(&self) -> &'static DeviceConfig {
        &SPS30_UART
    }

    /// Requests the current values and decodes whatever reply is buffered.
    ///
    /// The reply to this request usually lands after the call returns and is
    /// picked up by the next attempt.
    ///
    /// Byte stuffing can stretch a reply past 47 bytes. If the buffer runs
    /// dry part way through the payload, the consumed part is lost and the
    /// attempt fails with `InvalidFormat`. The tail that arrives later fails
    /// the next attempt's sync check, and the drain that follows may take a
    /// fresh frame queued behind it.
    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        let request =
            shdlc::request(shdlc::CMD_READ_MEASURED_VALUES, &[]).ok_or(OpcError::InvalidFormat)?;
        io::write_all(iface, &request)?;

        let available = iface.available();
        if available == 0 {
            return Err(OpcError::NotReady { needed: FRAME_LEN, available });
        }

        let start = io::peek_one(iface)?;
        if start != FRAME_DELIMITER {
            Self::drain(iface)?;
            return Err(OpcError::BadSync(start));
        }

        // Buffer left alone: the rest of the frame is still arriving.
        if available < FRAME_LEN {
            return Err(OpcError::NotReady { needed: FRAME_LEN, available });
        }

        let mut header = [0u8; HEADER_LEN];
        io::read_exact(iface, &mut header)?;
        let mut sum = header[1..].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));

        let state = header[3];
        if state != 0x00 {
            Self::drain(iface)?;
            return Err(OpcError::DeviceStatus(state));
        }
        if usize::from(header[4]) != PAYLOAD_LEN {
            Self::drain(iface)?;
            return Err(OpcError::InvalidFormat);
        }

        self.payload.clear();
        for _ in 0..PAYLOAD_LEN {
            let byte = read_unstuffed(iface).map_err(torn)?;
            sum = sum.wrapping_add(byte);
            self.payload.push(byte);
        }

        let checksum = read_unstuffed(iface).map_err(torn)?;
        let end = io::read_one(iface).map_err(torn)?;
        if end != FRAME_DELIMITER {
            Self::drain(iface)?;
            return Err(OpcError::BadEnd(end));
        }

        let calculated = !sum;
        if checksum != calculated {
            Self::drain(iface)?;
            return Err(OpcError::ChecksumMismatch {
                expected: u16::from(checksum),
                calculated: u16::from(calculated),
            });
        }

        Ok(Reading::Sps30(parse_values(self.payload.as_slice())))
    }

    /// Start measurement, float output format.
    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.send(iface, shdlc::CMD_START_MEASUREMENT, &shdlc::START_ARGS_FLOAT)
    }

    /// Stop measurement.
    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.send(iface, shdlc::CMD_STOP_MEASUREMENT, &[])
    }

    fn start(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.power_on(iface)?;
        iface.delay(timing::SPS30_START_SETTLE);
        self.clean(iface)
    }

    fn supports_cleaning(&self) -> bool {
        true
    }

    fn clean(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.send(iface, shdlc::CMD_START_FAN_CLEANING, &[])
    }
}
