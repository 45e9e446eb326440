// src/decoder/hpm.rs

//! Honeywell HPM series over UART.
//!
//! In push (auto-send) mode the sensor streams 32-byte `42 4D` frames with
//! the same sum16 trailer as the Plantower. In polled mode the host sends
//! `68 01 04 93` and the sensor answers `40 LEN 04 DATA.. CS`, or `96 96`
//! when it refuses.

use super::{io, plantower, OpcDecoder};
use crate::common::{
    bytes::{read_u16_array, ByteOrder},
    config::{DeviceConfig, HPM_POLLED, HPM_PUSH},
    error::OpcError,
    frame::FrameBuffer,
    hal_traits::{OpcTimer, SerialPort},
    reading::{HpmReading, Reading},
    timing,
};
use log::{debug, trace};

const COMMAND_HEAD: u8 = 0x68;
const COMMAND_LEN: u8 = 0x01;

pub const CMD_READ: u8 = 0x04;
pub const CMD_POWER_ON: u8 = 0x01;
pub const CMD_POWER_OFF: u8 = 0x02;
pub const CMD_AUTO_SEND_ON: u8 = 0x40;
pub const CMD_AUTO_SEND_OFF: u8 = 0x20;

const ACK: [u8; 2] = [0xA5, 0xA5];
const ACK_ATTEMPTS: u8 = 50;

const RESPONSE_HEAD: u8 = 0x40;
const RESPONSE_NACK: u8 = 0x96;
/// `HEAD LEN CMD` of a polled response.
const RESPONSE_HEADER_LEN: usize = 3;
/// Four big-endian PM values plus the checksum byte.
const MIN_PAYLOAD_LEN: usize = 9;
const MAX_PAYLOAD_LEN: usize = 32;

/// How readings reach the host.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HpmMode {
    /// Sensor streams frames on its own.
    Push,
    /// Host requests every reading.
    Polled,
}

/// `68 01 CMD CS` with `CS = (0x10000 - (0x68 + 0x01 + CMD)) mod 256`.
pub fn command_frame(cmd: u8) -> [u8; 4] {
    let sum = u16::from(COMMAND_HEAD) + u16::from(COMMAND_LEN) + u16::from(cmd);
    let checksum = (0x1_0000u32 - u32::from(sum)) % 256;
    [COMMAND_HEAD, COMMAND_LEN, cmd, checksum as u8]
}

/// `(65536 - (head + len + cmd) - sum(data)) mod 256` over a polled response,
/// where `data` excludes the trailing checksum byte.
pub fn response_checksum(header: &[u8; RESPONSE_HEADER_LEN], data: &[u8]) -> u8 {
    let total = header
        .iter()
        .chain(data)
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)));
    (0x1_0000u32.wrapping_sub(total) % 256) as u8
}

fn parse_pm(fields: &[u8]) -> HpmReading {
    let [pm1_0, pm2_5, pm4_0, pm10]: [u16; 4] = read_u16_array(fields, 0, ByteOrder::Big);
    HpmReading { pm1_0, pm2_5, pm4_0, pm10 }
}

#[derive(Debug, Clone)]
pub struct Hpm {
    mode: HpmMode,
    frame: FrameBuffer<{ plantower::FRAME_LEN }>,
    payload: FrameBuffer<MAX_PAYLOAD_LEN>,
}

impl Hpm {
    pub fn push() -> Self {
        Hpm { mode: HpmMode::Push, frame: FrameBuffer::new(), payload: FrameBuffer::new() }
    }

    pub fn polled() -> Self {
        Hpm { mode: HpmMode::Polled, frame: FrameBuffer::new(), payload: FrameBuffer::new() }
    }

    pub fn mode(&self) -> HpmMode {
        self.mode
    }

    /// Sends `cmd` until the sensor acknowledges with `A5 A5`, at most 50 times.
    pub fn command<IF>(&mut self, iface: &mut IF, cmd: u8) -> Result<(), OpcError<IF::Error>>
    where
        IF: SerialPort + OpcTimer,
    {
        let frame = command_frame(cmd);
        for attempt in 1..=ACK_ATTEMPTS {
            io::write_all(iface, &frame)?;
            iface.delay(timing::HPM_RESPONSE_DELAY);
            let mut reply = [0u8; 2];
            let got = iface.read_available(&mut reply).map_err(OpcError::Io)?;
            if got == reply.len() && reply == ACK {
                return Ok(());
            }
            trace!("hpm: command {:#04x} attempt {} not acknowledged", cmd, attempt);
        }
        debug!("hpm: command {:#04x} gave up after {} attempts", cmd, ACK_ATTEMPTS);
        Err(OpcError::NotAcknowledged)
    }

    /// Turns auto-send on or off; the decoding mode follows only on acknowledgement.
    pub fn set_auto_send<IF>(&mut self, iface: &mut IF, enabled: bool) -> Result<(), OpcError<IF::Error>>
    where
        IF: SerialPort + OpcTimer,
    {
        let (cmd, mode) = if enabled {
            (CMD_AUTO_SEND_ON, HpmMode::Push)
        } else {
            (CMD_AUTO_SEND_OFF, HpmMode::Polled)
        };
        self.command(iface, cmd)?;
        self.mode = mode;
        Ok(())
    }

    fn decode_push<IF: SerialPort>(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        plantower::read_sum16_frame(iface, &mut self.frame)?;
        Ok(Reading::Hpm(parse_pm(&self.frame.as_slice()[4..12])))
    }

    fn decode_polled<IF>(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>>
    where
        IF: SerialPort + OpcTimer,
    {
        // Stale bytes from a previous exchange would misalign the reply.
        iface.discard(MAX_PAYLOAD_LEN).map_err(OpcError::Io)?;
        io::write_all(iface, &command_frame(CMD_READ))?;
        iface.delay(timing::HPM_RESPONSE_DELAY);

        let available = iface.available();
        if available == 0 {
            return Err(OpcError::NotReady { needed: RESPONSE_HEADER_LEN, available });
        }
        if io::peek_one(iface)? == RESPONSE_NACK {
            iface.discard(2).map_err(OpcError::Io)?;
            return Err(OpcError::DeviceNack);
        }
        if available < RESPONSE_HEADER_LEN {
            return Err(OpcError::NotReady { needed: RESPONSE_HEADER_LEN, available });
        }

        let mut header = [0u8; RESPONSE_HEADER_LEN];
        io::read_exact(iface, &mut header)?;
        let [head, len, cmd] = header;
        if head != RESPONSE_HEAD {
            return Err(OpcError::BadSync(head));
        }
        if cmd != CMD_READ {
            return Err(OpcError::InvalidFormat);
        }
        let len = usize::from(len);
        if !(MIN_PAYLOAD_LEN..=MAX_PAYLOAD_LEN).contains(&len) {
            return Err(OpcError::InvalidFormat);
        }
        let available = iface.available();
        if available < len {
            return Err(OpcError::NotReady { needed: len, available });
        }

        self.payload.clear();
        let buf = &mut self.payload.fill_all()[..len];
        io::read_exact(iface, buf)?;

        let (data, trailer) = buf.split_at(len - 1);
        let calculated = response_checksum(&header, data);
        if calculated != trailer[0] {
            return Err(OpcError::ChecksumMismatch {
                expected: u16::from(trailer[0]),
                calculated: u16::from(calculated),
            });
        }
        Ok(Reading::Hpm(parse_pm(&data[..8])))
    }
}

impl<IF> OpcDecoder<IF> for Hpm
where
    IF: SerialPort + OpcTimer,
{
    type BusError = IF::Error;

    fn config(&self) -> &'static DeviceConfig {
        match self.mode {
            HpmMode::Push => &HPM_PUSH,
            HpmMode::Polled => &HPM_POLLED,
        }
    }

    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        match self.mode {
            HpmMode::Push => self.decode_push(iface),
            HpmMode::Polled => self.decode_polled(iface),
        }
    }

    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.command(iface, CMD_POWER_ON)
    }

    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.command(iface, CMD_POWER_OFF)
    }

    /// Power on, then put the sensor in the auto-send state matching the mode.
    fn start(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.power_on(iface)?;
        iface.delay(timing::HPM_START_SETTLE);
        let push = self.mode == HpmMode::Push;
        self.set_auto_send(iface, push)
    }
}
