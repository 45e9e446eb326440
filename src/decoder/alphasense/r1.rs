// src/decoder/alphasense/r1.rs

//! OPC-R1 histogram read.
//!
//! | offset | field                                  |
//! |--------|----------------------------------------|
//! | 0..32  | 16 bin counts (`u16`)                  |
//! | 32..36 | MToF for bins 1, 3, 5, 7 (`u8`)        |
//! | 36..40 | sample flow rate (`f32`)               |
//! | 40..42 | temperature raw (`u16`)                |
//! | 42..44 | humidity raw (`u16`)                   |
//! | 44..48 | sample period (`f32`)                  |
//! | 48, 49 | reject counts, glitch and long TOF     |
//! | 50..62 | PM1.0, PM2.5, PM10 (`f32`)             |
//! | 62..64 | CRC-16 over bytes 0..62                |
//!
//! Floats are little-endian. Bin counts and the raw temperature/humidity
//! follow the configured integer order; the CRC has its own order, LSB first
//! by default.

use super::{
    handshake, humidity_from_raw, read_block, release, send_control, temperature_from_raw,
    CMD_READ_HISTOGRAM,
};
use crate::common::{
    bytes::{read_f32, read_u16, read_u16_array, ByteOrder},
    checksum::crc16,
    config::{DeviceConfig, RetryPolicy, R1 as R1_CONFIG},
    error::OpcError,
    frame::FrameBuffer,
    hal_traits::{OpcTimer, SpiPort},
    reading::{R1Reading, Reading},
    timing,
};
use crate::decoder::OpcDecoder;

const FRAME_LEN: usize = 64;
const CRC_OFFSET: usize = 62;

const CONTROL_POWER_ON: u8 = 0x03;
const CONTROL_POWER_OFF: u8 = 0x00;

#[derive(Debug, Clone)]
pub struct R1 {
    frame: FrameBuffer<FRAME_LEN>,
    integer_order: ByteOrder,
    crc_order: ByteOrder,
    read_policy: RetryPolicy,
    command_policy: RetryPolicy,
}

impl R1 {
    pub fn new() -> Self {
        R1 {
            frame: FrameBuffer::new(),
            integer_order: ByteOrder::Big,
            crc_order: ByteOrder::Little,
            read_policy: RetryPolicy::READ,
            command_policy: RetryPolicy::COMMAND,
        }
    }

    /// Byte order of the bin counts and raw temperature/humidity.
    pub fn with_integer_order(mut self, order: ByteOrder) -> Self {
        self.integer_order = order;
        self
    }

    /// Byte order of the trailing CRC.
    pub fn with_crc_order(mut self, order: ByteOrder) -> Self {
        self.crc_order = order;
        self
    }

    pub fn with_read_policy(mut self, policy: RetryPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_command_policy(mut self, policy: RetryPolicy) -> Self {
        self.command_policy = policy;
        self
    }

    fn parse(&self) -> R1Reading {
        let frame = self.frame.as_slice();
        let order = self.integer_order;
        R1Reading {
            bins: read_u16_array(frame, 0, order),
            bin_mtof: [frame[32], frame[33], frame[34], frame[35]],
            sample_flow_rate: read_f32(frame, 36, ByteOrder::Little),
            temperature: temperature_from_raw(read_u16(frame, 40, order)),
            humidity: humidity_from_raw(read_u16(frame, 42, order)),
            sample_period: read_f32(frame, 44, ByteOrder::Little),
            reject_glitch: frame[48],
            reject_long_tof: frame[49],
            pm1_0: read_f32(frame, 50, ByteOrder::Little),
            pm2_5: read_f32(frame, 54, ByteOrder::Little),
            pm10: read_f32(frame, 58, ByteOrder::Little),
        }
    }
}

impl Default for R1 {
    fn default() -> Self {
        Self::new()
    }
}

impl<IF> OpcDecoder<IF> for R1
where
    IF: SpiPort + OpcTimer,
{
    type BusError = IF::Error;

    fn config(&self) -> &'static DeviceConfig {
        &R1_CONFIG
    }

    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        handshake(iface, CMD_READ_HISTOGRAM, &self.read_policy)?;
        self.frame.clear();
        let block = read_block(iface, CMD_READ_HISTOGRAM, timing::R1_BYTE_GAP_US, self.frame.fill_all());
        release(iface, block)?;

        let frame = self.frame.as_slice();
        let expected = read_u16(frame, CRC_OFFSET, self.crc_order);
        let calculated = crc16(&frame[..CRC_OFFSET]);
        if expected != calculated {
            return Err(OpcError::CrcMismatch { expected, calculated });
        }
        Ok(Reading::R1(self.parse()))
    }

    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        send_control(iface, CONTROL_POWER_ON, &self.command_policy)
    }

    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        send_control(iface, CONTROL_POWER_OFF, &self.command_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockError, MockInterface};
    use std::vec::Vec;

    fn sample_frame(order: ByteOrder) -> [u8; FRAME_LEN] {
        sample_frame_with_crc(order, ByteOrder::Little)
    }

    fn sample_frame_with_crc(order: ByteOrder, crc_order: ByteOrder) -> [u8; FRAME_LEN] {
        let put16 = |frame: &mut [u8; FRAME_LEN], offset: usize, value: u16, order: ByteOrder| {
            let bytes = match order {
                ByteOrder::Big => value.to_be_bytes(),
                ByteOrder::Little => value.to_le_bytes(),
            };
            frame[offset..offset + 2].copy_from_slice(&bytes);
        };
        let mut frame = [0u8; FRAME_LEN];
        for bin in 0..16u16 {
            put16(&mut frame, usize::from(bin) * 2, 100 + bin, order);
        }
        frame[32..36].copy_from_slice(&[10, 20, 30, 40]);
        frame[36..40].copy_from_slice(&5.5f32.to_le_bytes());
        put16(&mut frame, 40, 0x6666, order);
        put16(&mut frame, 42, 0x8000, order);
        frame[44..48].copy_from_slice(&1.25f32.to_le_bytes());
        frame[48] = 3;
        frame[49] = 4;
        frame[50..54].copy_from_slice(&1.5f32.to_le_bytes());
        frame[54..58].copy_from_slice(&2.5f32.to_le_bytes());
        frame[58..62].copy_from_slice(&10.0f32.to_le_bytes());
        let crc = crc16(&frame[..CRC_OFFSET]);
        put16(&mut frame, CRC_OFFSET, crc, crc_order);
        frame
    }

    fn staged(frame: &[u8]) -> MockInterface {
        let mut iface = MockInterface::new();
        iface.stage_miso(&[0x00, 0x31, 0xF3]);
        iface.stage_miso(frame);
        iface
    }

    fn decode(iface: &mut MockInterface, r1: &mut R1) -> Result<Reading, OpcError<MockError>> {
        <R1 as OpcDecoder<MockInterface>>::attempt_decode(r1, iface)
    }

    #[test]
    fn test_decode_big_endian_integers() {
        let mut iface = staged(&sample_frame(ByteOrder::Big));
        let reading = match decode(&mut iface, &mut R1::new()).unwrap() {
            Reading::R1(r) => r,
            other => panic!("unexpected reading {:?}", other),
        };
        assert_eq!(reading.bins[0], 100);
        assert_eq!(reading.bins[15], 115);
        assert_eq!(reading.bin_mtof, [10, 20, 30, 40]);
        assert_eq!(reading.sample_flow_rate, 5.5);
        assert!((reading.temperature - 25.0).abs() < 0.01);
        assert!((reading.humidity - 50.0).abs() < 0.01);
        assert_eq!(reading.sample_period, 1.25);
        assert_eq!((reading.reject_glitch, reading.reject_long_tof), (3, 4));
        assert_eq!((reading.pm1_0, reading.pm2_5, reading.pm10), (1.5, 2.5, 10.0));

        assert_eq!(iface.mosi.len(), 3 + FRAME_LEN);
        assert!(iface.mosi.iter().all(|&b| b == 0x30), "read clocks 0x30 throughout");
        assert!(!iface.selected);
    }

    #[test]
    fn test_decode_little_endian_integers() {
        let mut iface = staged(&sample_frame(ByteOrder::Little));
        let mut r1 = R1::new().with_integer_order(ByteOrder::Little);
        match decode(&mut iface, &mut r1).unwrap() {
            Reading::R1(r) => assert_eq!(r.bins[3], 103),
            other => panic!("unexpected reading {:?}", other),
        }
    }

    #[test]
    fn test_big_endian_bins_with_lsb_first_crc() {
        let frame = sample_frame_with_crc(ByteOrder::Big, ByteOrder::Little);
        assert_eq!(&frame[0..2], &[0x00, 100], "bins are MSB first");
        let crc = crc16(&frame[..CRC_OFFSET]);
        assert_eq!(&frame[CRC_OFFSET..], &crc.to_le_bytes(), "CRC is LSB first");

        let mut iface = staged(&frame);
        match decode(&mut iface, &mut R1::new()).unwrap() {
            Reading::R1(r) => {
                assert_eq!(r.bins[0], 100, "bins decoded big-endian");
                assert_eq!(r.bins[15], 115);
            }
            other => panic!("unexpected reading {:?}", other),
        }
    }

    #[test]
    fn test_crc_order_is_configurable() {
        let frame = sample_frame_with_crc(ByteOrder::Big, ByteOrder::Big);
        let mut iface = staged(&frame);
        let result = decode(&mut iface, &mut R1::new());
        assert!(matches!(result, Err(OpcError::CrcMismatch { .. })), "default expects LSB-first CRC");

        let mut iface = staged(&frame);
        let mut r1 = R1::new().with_crc_order(ByteOrder::Big);
        match decode(&mut iface, &mut r1).unwrap() {
            Reading::R1(r) => assert_eq!(r.bins[1], 101),
            other => panic!("unexpected reading {:?}", other),
        }
    }

    #[test]
    fn test_crc_mismatch() {
        let mut frame = sample_frame(ByteOrder::Big);
        frame[7] ^= 0x40;
        let mut iface = staged(&frame);
        let result = decode(&mut iface, &mut R1::new());
        assert!(matches!(result, Err(OpcError::CrcMismatch { .. })));
        assert!(!iface.selected);
    }

    #[test]
    fn test_no_handshake_means_no_block_read() {
        let mut iface = MockInterface::new();
        let result = decode(&mut iface, &mut R1::new());
        assert!(matches!(result, Err(OpcError::HandshakeFailed { attempts: 25 })));
        assert_eq!(iface.mosi.len(), 25);
    }

    #[test]
    fn test_custom_read_policy() {
        let policy = RetryPolicy { transfers_per_round: 5, ..RetryPolicy::READ };
        let mut iface = MockInterface::new();
        let result = decode(&mut iface, &mut R1::new().with_read_policy(policy));
        assert!(matches!(result, Err(OpcError::HandshakeFailed { attempts: 5 })));
    }

    #[test]
    fn test_power_commands() {
        let mut iface = MockInterface::new();
        iface.stage_miso(&[0x31, 0xF3, 0x00, 0x31, 0xF3, 0x00]);
        let mut r1 = R1::new();
        <R1 as OpcDecoder<MockInterface>>::power_on(&mut r1, &mut iface).unwrap();
        <R1 as OpcDecoder<MockInterface>>::power_off(&mut r1, &mut iface).unwrap();
        let expected: Vec<u8> = vec![0x03, 0x03, 0x03, 0x03, 0x03, 0x00];
        assert_eq!(iface.mosi, expected);
    }
}
