// src/decoder/alphasense/n3.rs

//! OPC-N3 histogram read and peripheral control.
//!
//! | offset | field                                      |
//! |--------|--------------------------------------------|
//! | 0..48  | 24 bin counts                              |
//! | 48..52 | MToF for bins 1, 3, 5, 7 (`u8`)            |
//! | 52..54 | sample period code                         |
//! | 54..56 | sample flow rate code                      |
//! | 56..58 | temperature raw                            |
//! | 58..60 | humidity raw                               |
//! | 60..72 | PM1.0, PM2.5, PM10 (`f32`)                 |
//! | 72..84 | reject glitch, long TOF, ratio, out of range, fan rev count, laser status |
//! | 84..86 | CRC-16 over bytes 0..84                    |
//!
//! Everything is little-endian.

use super::{
    handshake, humidity_from_raw, read_block, release, send_control, temperature_from_raw,
    CMD_READ_HISTOGRAM,
};
use crate::common::{
    bytes::{read_f32, read_u16, read_u16_array, ByteOrder},
    checksum::crc16,
    config::{DeviceConfig, RetryPolicy, N3 as N3_CONFIG},
    error::OpcError,
    frame::FrameBuffer,
    hal_traits::{OpcTimer, SpiPort},
    reading::{N3Reading, Reading},
    timing,
};
use crate::decoder::OpcDecoder;
use log::debug;

const FRAME_LEN: usize = 86;
const CRC_OFFSET: usize = 84;
/// The N3 clocks the histogram out against `0x00` fill bytes.
const READ_FILL: u8 = 0x00;

const CONTROL_FAN_OFF: u8 = 0x02;
const CONTROL_FAN_ON: u8 = 0x03;
const CONTROL_LASER_OFF: u8 = 0x06;
const CONTROL_LASER_ON: u8 = 0x07;

const ORDER: ByteOrder = ByteOrder::Little;

#[derive(Debug, Clone)]
pub struct N3 {
    frame: FrameBuffer<FRAME_LEN>,
    external_pump: bool,
    read_policy: RetryPolicy,
    command_policy: RetryPolicy,
}

impl N3 {
    pub fn new() -> Self {
        N3 {
            frame: FrameBuffer::new(),
            external_pump: false,
            read_policy: RetryPolicy::READ,
            command_policy: RetryPolicy::COMMAND,
        }
    }

    /// With an external pump the internal fan stays off and only the laser runs.
    pub fn with_external_pump(mut self, external_pump: bool) -> Self {
        self.external_pump = external_pump;
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

    pub fn fan_on<IF: SpiPort + OpcTimer>(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.control(iface, CONTROL_FAN_ON)
    }

    pub fn fan_off<IF: SpiPort + OpcTimer>(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.control(iface, CONTROL_FAN_OFF)
    }

    pub fn laser_on<IF: SpiPort + OpcTimer>(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.control(iface, CONTROL_LASER_ON)
    }

    pub fn laser_off<IF: SpiPort + OpcTimer>(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.control(iface, CONTROL_LASER_OFF)
    }

    fn control<IF: SpiPort + OpcTimer>(&mut self, iface: &mut IF, control: u8) -> Result<(), OpcError<IF::Error>> {
        let result = send_control(iface, control, &self.command_policy);
        if let Err(e) = &result {
            debug!("n3: control {:#04x} failed: {:?}", control, e);
        }
        result
    }

    fn parse(&self) -> N3Reading {
        let frame = self.frame.as_slice();
        let rejects: [u16; 6] = read_u16_array(frame, 72, ORDER);
        N3Reading {
            bins: read_u16_array(frame, 0, ORDER),
            bin_mtof: [frame[48], frame[49], frame[50], frame[51]],
            sample_period: read_u16(frame, 52, ORDER),
            sample_flow_rate: read_u16(frame, 54, ORDER),
            temperature: temperature_from_raw(read_u16(frame, 56, ORDER)),
            humidity: humidity_from_raw(read_u16(frame, 58, ORDER)),
            pm1_0: read_f32(frame, 60, ORDER),
            pm2_5: read_f32(frame, 64, ORDER),
            pm10: read_f32(frame, 68, ORDER),
            reject_glitch: rejects[0],
            reject_long_tof: rejects[1],
            reject_ratio: rejects[2],
            reject_out_of_range: rejects[3],
            fan_rev_count: rejects[4],
            laser_status: rejects[5],
        }
    }
}

impl Default for N3 {
    fn default() -> Self {
        Self::new()
    }
}

impl<IF> OpcDecoder<IF> for N3
where
    IF: SpiPort + OpcTimer,
{
    type BusError = IF::Error;

    fn config(&self) -> &'static DeviceConfig {
        &N3_CONFIG
    }

    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        handshake(iface, CMD_READ_HISTOGRAM, &self.read_policy)?;
        self.frame.clear();
        let block = read_block(iface, READ_FILL, timing::N3_BYTE_GAP_US, self.frame.fill_all());
        release(iface, block)?;

        let frame = self.frame.as_slice();
        let expected = read_u16(frame, CRC_OFFSET, ORDER);
        let calculated = crc16(&frame[..CRC_OFFSET]);
        if expected != calculated {
            return Err(OpcError::CrcMismatch { expected, calculated });
        }
        Ok(Reading::N3(self.parse()))
    }

    /// Fan (or pump-mode fan off), then laser. Both steps are attempted even
    /// if the first fails; the first error is returned.
    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        iface.delay(timing::N3_PRE_FAN);
        let (fan, gap) = if self.external_pump {
            (self.fan_off(iface), timing::N3_POWER_OFF_GAP)
        } else {
            (self.fan_on(iface), timing::N3_FAN_TO_LASER)
        };
        iface.delay(gap);
        let laser = self.laser_on(iface);
        iface.delay(timing::N3_POST_LASER);
        fan.and(laser)
    }

    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        let fan = self.fan_off(iface);
        iface.delay(timing::N3_POWER_OFF_GAP);
        let laser = self.laser_off(iface);
        iface.delay(timing::N3_POWER_OFF_GAP);
        fan.and(laser)
    }
}
