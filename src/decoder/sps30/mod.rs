// src/decoder/sps30/mod.rs

//! Sensirion SPS30, over UART (SHDLC) or I2C.
//!
//! Both transports carry the same 40-byte payload once framing is removed:
//! ten big-endian IEEE-754 floats in the order mass PM1.0/2.5/4.0/10,
//! number PM0.5/1.0/2.5/4.0/10, typical particle size.

mod i2c;
pub mod shdlc;
mod uart;

pub use i2c::Sps30I2c;
pub use uart::Sps30Uart;

use crate::common::{
    bytes::{read_f32, ByteOrder},
    reading::Sps30Reading,
};

pub(crate) const PAYLOAD_LEN: usize = 40;

pub(crate) fn parse_values(payload: &[u8]) -> Sps30Reading {
    let f = |index: usize| read_f32(payload, index * 4, ByteOrder::Big);
    Sps30Reading {
        mass_pm1_0: f(0),
        mass_pm2_5: f(1),
        mass_pm4_0: f(2),
        mass_pm10: f(3),
        number_pm0_5: f(4),
        number_pm1_0: f(5),
        number_pm2_5: f(6),
        number_pm4_0: f(7),
        number_pm10: f(8),
        typical_size: f(9),
    }
}
