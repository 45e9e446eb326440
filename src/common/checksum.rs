// src/common/checksum.rs

//! Stateless checksum and CRC routines shared by the frame decoders.

use super::error::OpcError;
use crc::{Crc, CRC_16_MODBUS, CRC_8_NRSC_5};

/// CRC-16 used by the Alphasense OPCs.
/// Polynomial: 0xA001 (reflected form of 0x8005)
/// Initial Value: 0xFFFF
/// Input/Output Reflected: true
/// Final XOR: 0x0000
/// Check Value: 0x4B37 (for "123456789") - catalogued as CRC-16/MODBUS
const CRC16_COMPUTER: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC-8 used for every 2-byte word on the Sensirion I2C bus.
/// Polynomial: 0x31, Initial Value: 0xFF, no reflection, no final XOR.
const CRC8_COMPUTER: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// 16-bit wrapping sum of every byte (Plantower and HPM push frames).
#[inline]
pub fn sum16(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, &byte| acc.wrapping_add(u16::from(byte)))
}

/// 8-bit wrapping sum, bit-inverted (SPS30 SHDLC frames).
#[inline]
pub fn sum8_complement(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

/// Calculates the CRC-16 (poly 0xA001, init 0xFFFF) over `data`.
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC16_COMPUTER.checksum(data)
}

/// Calculates the Sensirion CRC-8 (poly 0x31, init 0xFF) over `data`.
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    CRC8_COMPUTER.checksum(data)
}

/// Verifies a Plantower-style frame: the big-endian trailing `u16` must equal
/// the additive sum of every byte before it.
pub fn verify_sum16<E>(frame: &[u8]) -> Result<(), OpcError<E>>
where
    E: core::fmt::Debug,
{
    if frame.len() < 2 {
        return Err(OpcError::InvalidFormat);
    }
    let split = frame.len() - 2;
    let expected = u16::from_be_bytes([frame[split], frame[split + 1]]);
    let calculated = sum16(&frame[..split]);
    if expected == calculated {
        Ok(())
    } else {
        Err(OpcError::ChecksumMismatch { expected, calculated })
    }
}

/// Verifies one Sensirion `{msb, lsb, crc}` group.
pub fn verify_crc8_word<E>(group: &[u8]) -> Result<[u8; 2], OpcError<E>>
where
    E: core::fmt::Debug,
{
    if group.len() != 3 {
        return Err(OpcError::InvalidFormat);
    }
    let calculated = crc8(&group[..2]);
    if calculated == group[2] {
        Ok([group[0], group[1]])
    } else {
        Err(OpcError::CrcMismatch {
            expected: u16::from(group[2]),
            calculated: u16::from(calculated),
        })
    }
}
