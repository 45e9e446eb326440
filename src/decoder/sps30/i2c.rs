// src/decoder/sps30/i2c.rs

use super::{parse_values, PAYLOAD_LEN};
use crate::common::{
    checksum::{crc8, verify_crc8_word},
    config::{BusParams, DeviceConfig, SPS30_I2C},
    error::OpcError,
    frame::FrameBuffer,
    hal_traits::{I2cPort, OpcTimer},
    reading::Reading,
    timing,
};
use crate::decoder::OpcDecoder;
use log::trace;

const DEFAULT_ADDRESS: u8 = match SPS30_I2C.bus {
    BusParams::I2c { address, .. } => address,
    _ => 0x69,
};

const CMD_START_MEASUREMENT: u16 = 0x0010;
const CMD_STOP_MEASUREMENT: u16 = 0x0104;
const CMD_READ_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASURED_VALUES: u16 = 0x0300;
const CMD_START_FAN_CLEANING: u16 = 0x5607;

/// Output format argument of start-measurement: big-endian floats.
const FLOAT_FORMAT: [u8; 2] = [0x03, 0x00];

/// 20 words of `{msb, lsb, crc}`.
const RAW_LEN: usize = PAYLOAD_LEN / 2 * 3;

/// SPS30 on I2C. Every 2-byte word on the wire is followed by its CRC-8.
#[derive(Debug, Clone)]
pub struct Sps30I2c {
    address: u8,
    raw: FrameBuffer<RAW_LEN>,
    payload: FrameBuffer<PAYLOAD_LEN>,
}

impl Sps30I2c {
    pub fn new() -> Self {
        Sps30I2c { address: DEFAULT_ADDRESS, raw: FrameBuffer::new(), payload: FrameBuffer::new() }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn command<IF>(&self, iface: &mut IF, command: u16) -> Result<(), OpcError<IF::Error>>
    where
        IF: I2cPort,
    {
        iface.write(self.address, &command.to_be_bytes()).map_err(OpcError::Io)
    }

    /// Polls the data-ready flag. Anything but `{00, 01}` means no new values.
    fn data_ready<IF>(&self, iface: &mut IF) -> Result<bool, OpcError<IF::Error>>
    where
        IF: I2cPort + OpcTimer,
    {
        self.command(iface, CMD_READ_DATA_READY)?;
        iface.delay(timing::SPS30_I2C_READ_DELAY);
        let mut reply = [0u8; 3];
        iface.read(self.address, &mut reply).map_err(OpcError::Io)?;
        let flag = verify_crc8_word(&reply)?;
        Ok(flag == [0x00, 0x01])
    }
}

impl Default for Sps30I2c {
    fn default() -> Self {
        Self::new()
    }
}

impl<IF> OpcDecoder<IF> for Sps30I2c
where
    IF: I2cPort + OpcTimer,
{
    type BusError = IF::Error;

    fn config(&self) -> &'static DeviceConfig {
        &SPS30_I2C
    }

    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<IF::Error>> {
        if !self.data_ready(iface)? {
            trace!("sps30: no new measurement");
            return Err(OpcError::NotReady { needed: RAW_LEN, available: 0 });
        }

        self.command(iface, CMD_READ_MEASURED_VALUES)?;
        iface.delay(timing::SPS30_I2C_READ_DELAY);
        self.raw.clear();
        iface.read(self.address, self.raw.fill_all()).map_err(OpcError::Io)?;

        self.payload.clear();
        for group in self.raw.as_slice().chunks_exact(3) {
            let word = verify_crc8_word(group)?;
            self.payload.push(word[0]);
            self.payload.push(word[1]);
        }

        Ok(Reading::Sps30(parse_values(self.payload.as_slice())))
    }

    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        let [hi, lo] = CMD_START_MEASUREMENT.to_be_bytes();
        let frame = [hi, lo, FLOAT_FORMAT[0], FLOAT_FORMAT[1], crc8(&FLOAT_FORMAT)];
        iface.write(self.address, &frame).map_err(OpcError::Io)?;
        Ok(())
    }

    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<IF::Error>> {
        self.command(iface, CMD_STOP_MEASUREMENT)
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
        self.command(iface, CMD_START_FAN_CLEANING)
    }
}
