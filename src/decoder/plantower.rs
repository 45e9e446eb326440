// src/decoder/plantower.rs

//! Plantower PMS5003: fixed 32-byte UART frame with a 16-bit additive checksum.
//!
//! Frame layout (all fields big-endian `u16`):
//!
//! | offset | field                                   |
//! |--------|-----------------------------------------|
//! | 0..2   | `42 4D` start                           |
//! | 2..4   | frame length (28)                       |
//! | 4..10  | PM1.0 / PM2.5 / PM10, standard particle |
//! | 10..16 | PM1.0 / PM2.5 / PM10, environmental     |
//! | 16..28 | counts ≥0.3, 0.5, 1.0, 2.5, 5.0, 10 µm  |
//! | 28..30 | reserved                                |
//! | 30..32 | sum of bytes 0..30                      |

use super::{io, OpcDecoder};
use crate::common::{
    bytes::{read_u16_array, ByteOrder},
    checksum::{sum16, verify_sum16},
    config::{DeviceConfig, PLANTOWER},
    error::OpcError,
    frame::FrameBuffer,
    hal_traits::{OpcTimer, SerialPort},
    reading::{PlantowerReading, Reading},
    timing,
};
use log::trace;

pub(crate) const FRAME_LEN: usize = 32;
pub(crate) const START_BYTE: u8 = 0x42;
const SECOND_BYTE: u8 = 0x4D;

const CMD_READ: u8 = 0xE2;
const CMD_MODE: u8 = 0xE1;
const CMD_POWER: u8 = 0xE4;
/// Every command is answered with an 8-byte acknowledgement frame.
const REPLY_LEN: usize = 8;

/// How the sensor delivers frames.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlantowerMode {
    /// Sensor streams a frame roughly every 2.3 s.
    Active,
    /// Sensor answers one frame per read request.
    Passive,
}

/// Builds `42 4D CMD 00 DATA SUMH SUML`.
pub fn command_frame(cmd: u8, data: u8) -> [u8; 7] {
    let body = [START_BYTE, SECOND_BYTE, cmd, 0x00, data];
    let sum = sum16(&body).to_be_bytes();
    [body[0], body[1], body[2], body[3], body[4], sum[0], sum[1]]
}

/// Reads one 32-byte, `0x42`-led, sum16-checked frame into `frame`.
///
/// If the next byte is not `0x42` exactly one byte is dropped, so a misaligned
/// stream realigns one byte per attempt. Nothing is consumed until 32 bytes are
/// buffered. A frame that fails its checksum is not put back.
pub(crate) fn read_sum16_frame<IF>(
    iface: &mut IF,
    frame: &mut FrameBuffer<FRAME_LEN>,
) -> Result<(), OpcError<IF::Error>>
where
    IF: SerialPort,
{
    let available = iface.available();
    if available == 0 {
        return Err(OpcError::NotReady { needed: FRAME_LEN, available });
    }

    let first = io::peek_one(iface)?;
    if first != START_BYTE {
        io::read_one(iface)?;
        trace!("dropping {:#04x} while looking for frame start", first);
        return Err(OpcError::BadSync(first));
    }

    if available < FRAME_LEN {
        return Err(OpcError::NotReady { needed: FRAME_LEN, available });
    }

    frame.clear();
    io::read_exact(iface, frame.fill_all())?;
    verify_sum16(frame.as_slice())
}

fn parse(frame: &[u8]) -> PlantowerReading {
    let fields: [u16; 13] = read_u16_array(frame, 2, ByteOrder::Big);
    PlantowerReading {
        frame_len: fields[0],
        pm_standard: [fields[1], fields[2], fields[3]],
        pm_environmental: [fields[4], fields[5], fields[6]],
        counts: [fields[7], fields[8], fields[9], fields[10], fields[11], fields[12]],
    }
}

#[derive(Debug, Clone)]
pub struct Plantower {
    mode: PlantowerMode,
    frame: FrameBuffer<FRAME_LEN>,
}

impl Plantower {
    pub fn active() -> Self {
        Plantower { mode: PlantowerMode::Active, frame: FrameBuffer::new() }
    }

    pub fn passive() -> Self {
        Plantower { mode: PlantowerMode::Passive, frame: FrameBuffer::new() }
    }

    pub fn mode(&self) -> PlantowerMode {
        self.mode
    }

    /// Switches the sensor between streaming and request/response delivery.
    pub fn set_mode<IF>(&mut self, iface: &mut IF, mode: PlantowerMode) -> Result<(), OpcError<IF::Error>>
    where
        IF: SerialPort + OpcTimer,
    {
        let data = match mode {
            PlantowerMode::Passive => 0x00,
            PlantowerMode::Active => 0x01,
        };
        self.command(iface, CMD_MODE, data)?;
        self.mode = mode;
        Ok(())
    }

    fn command<IF>(&mut self, iface: &mut IF, cmd: u8, data: u8) -> Result<(), OpcError<IF::Error>>
    where
        IF: SerialPort + OpcTimer,
    {
        io::command_and_discard(
            iface,
            &command_frame(cmd, data),
            timing::PLANTOWER_COMMAND_SETTLE,
            REPLY_LEN,
        )
    }
}

impl Default for Plantower {
    fn default() -> Self {
        Self::active()
    }
}

impl<IF> OpcDecoder<IF> for Plantower
where
    IF: SerialPort + OpcTimer,
{
    type BusError = IF::Error;

    fn config(&self) -> &'static DeviceConfig {
        &PLANTOWER
    }

    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        if self.mode == PlantowerMode::Passive && iface.available() == 0 {
            io::write_all(iface, &command_frame(CMD_READ, 0x00))?;
            iface.delay(timing::PLANTOWER_READ_SETTLE);
        }
        read_sum16_frame(iface, &mut self.frame)?;
        Ok(Reading::Plantower(parse(self.frame.as_slice())))
    }

    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.command(iface, CMD_POWER, 0x01)
    }

    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.command(iface, CMD_POWER, 0x00)
    }

    fn start(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.power_on(iface)?;
        iface.delay(timing::PLANTOWER_START_SETTLE);
        let mode = self.mode;
        self.set_mode(iface, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockError, MockInterface};

    fn encode(reading: &PlantowerReading) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = START_BYTE;
        frame[1] = SECOND_BYTE;
        let mut fields = [0u16; 14];
        fields[0] = reading.frame_len;
        fields[1..4].copy_from_slice(&reading.pm_standard);
        fields[4..7].copy_from_slice(&reading.pm_environmental);
        fields[7..13].copy_from_slice(&reading.counts);
        for (i, field) in fields.iter().enumerate() {
            frame[2 + i * 2..4 + i * 2].copy_from_slice(&field.to_be_bytes());
        }
        let sum = sum16(&frame[..30]).to_be_bytes();
        frame[30] = sum[0];
        frame[31] = sum[1];
        frame
    }

    fn sample() -> PlantowerReading {
        PlantowerReading {
            frame_len: 28,
            pm_standard: [5, 9, 12],
            pm_environmental: [4, 8, 11],
            counts: [1203, 361, 70, 6, 2, 0x0101],
        }
    }

    fn decode(iface: &mut MockInterface, pms: &mut Plantower) -> Result<Reading, OpcError<MockError>> {
        <Plantower as OpcDecoder<MockInterface>>::attempt_decode(pms, iface)
    }

    #[test]
    fn test_round_trip() {
        let mut iface = MockInterface::new();
        iface.stage_rx(&encode(&sample()));
        let mut pms = Plantower::active();
        let reading = decode(&mut iface, &mut pms).unwrap();
        assert_eq!(reading, Reading::Plantower(sample()));
        assert_eq!(iface.available(), 0);
        assert!(iface.tx.is_empty(), "active mode never writes");
    }

    #[test]
    fn test_any_single_byte_flip_fails() {
        let good = encode(&sample());
        for index in 0..FRAME_LEN {
            let mut bad = good;
            bad[index] ^= 0x01;
            let mut iface = MockInterface::new();
            iface.stage_rx(&bad);
            let result = decode(&mut iface, &mut Plantower::active());
            assert!(result.is_err(), "flip at byte {} decoded", index);
        }
    }

    #[test]
    fn test_checksum_mismatch_consumes_frame() {
        let mut frame = encode(&sample());
        frame[10] ^= 0x80;
        let mut iface = MockInterface::new();
        iface.stage_rx(&frame);
        iface.stage_rx(&[0x42]);
        let result = decode(&mut iface, &mut Plantower::active());
        assert!(matches!(result, Err(OpcError::ChecksumMismatch { .. })));
        assert_eq!(iface.available(), 1, "the bad frame must not be pushed back");
    }

    #[test]
    fn test_bad_sync_drops_one_byte() {
        let mut iface = MockInterface::new();
        iface.stage_rx(&[0x13, 0x37]);
        iface.stage_rx(&encode(&sample()));
        let mut pms = Plantower::active();

        assert!(matches!(decode(&mut iface, &mut pms), Err(OpcError::BadSync(0x13))));
        assert_eq!(iface.available(), 33);
        assert!(matches!(decode(&mut iface, &mut pms), Err(OpcError::BadSync(0x37))));
        assert!(decode(&mut iface, &mut pms).is_ok(), "realigned on the third attempt");
    }

    #[test]
    fn test_partial_frame_is_left_buffered() {
        let frame = encode(&sample());
        let mut iface = MockInterface::new();
        iface.stage_rx(&frame[..20]);
        let mut pms = Plantower::active();
        assert!(matches!(
            decode(&mut iface, &mut pms),
            Err(OpcError::NotReady { needed: 32, available: 20 })
        ));
        assert_eq!(iface.available(), 20);

        iface.stage_rx(&frame[20..]);
        assert!(decode(&mut iface, &mut pms).is_ok());
    }

    #[test]
    fn test_empty_stream_is_not_ready() {
        let mut iface = MockInterface::new();
        let err = decode(&mut iface, &mut Plantower::active()).unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_command_frames() {
        assert_eq!(command_frame(CMD_POWER, 0x01), [0x42, 0x4D, 0xE4, 0x00, 0x01, 0x01, 0x74]);
        assert_eq!(command_frame(CMD_POWER, 0x00), [0x42, 0x4D, 0xE4, 0x00, 0x00, 0x01, 0x73]);
        assert_eq!(command_frame(CMD_READ, 0x00), [0x42, 0x4D, 0xE2, 0x00, 0x00, 0x01, 0x71]);
    }

    #[test]
    fn test_passive_mode_requests_a_frame() {
        let mut iface = MockInterface::new();
        iface.respond_on_flush(&encode(&sample()));
        let mut pms = Plantower::passive();
        let reading = decode(&mut iface, &mut pms).unwrap();
        assert_eq!(reading, Reading::Plantower(sample()));
        assert_eq!(iface.tx, command_frame(CMD_READ, 0x00).to_vec());
        assert_eq!(iface.now_us, 50_000, "request waits for the frame to arrive");
    }

    #[test]
    fn test_passive_mode_skips_request_when_buffered() {
        let mut iface = MockInterface::new();
        iface.stage_rx(&encode(&sample()));
        let mut pms = Plantower::passive();
        assert!(decode(&mut iface, &mut pms).is_ok());
        assert!(iface.tx.is_empty(), "buffered frame is read without a new request");
        assert_eq!(iface.now_us, 0);
    }

    #[test]
    fn test_start_sequence() {
        let mut iface = MockInterface::new();
        let mut pms = Plantower::passive();
        <Plantower as OpcDecoder<MockInterface>>::start(&mut pms, &mut iface).unwrap();
        let mut expected = command_frame(CMD_POWER, 0x01).to_vec();
        expected.extend_from_slice(&command_frame(CMD_MODE, 0x00));
        assert_eq!(iface.tx, expected);
        assert_eq!(pms.mode(), PlantowerMode::Passive);
        assert_eq!(iface.now_us, 140_000, "20 ms + 100 ms + 20 ms");
    }
}
