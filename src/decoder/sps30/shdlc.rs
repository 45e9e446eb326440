// src/decoder/sps30/shdlc.rs

//! SHDLC framing for the SPS30 UART interface.
//!
//! A frame is `7E ADR CMD [STATE] LEN DATA.. CHK 7E`. Between the two `7E`
//! delimiters the bytes `7E 7D 11 13` are sent as `7D` followed by the byte
//! XOR `0x20`. The checksum is the inverted low byte of the sum of every
//! unstuffed byte between the delimiters, excluding the checksum itself.

use crate::common::checksum::sum8_complement;
use arrayvec::ArrayVec;

pub const FRAME_DELIMITER: u8 = 0x7E;
pub const ESCAPE: u8 = 0x7D;
const ESCAPE_XOR: u8 = 0x20;

pub const DEVICE_ADDRESS: u8 = 0x00;

pub const CMD_START_MEASUREMENT: u8 = 0x00;
pub const CMD_STOP_MEASUREMENT: u8 = 0x01;
pub const CMD_READ_MEASURED_VALUES: u8 = 0x03;
pub const CMD_START_FAN_CLEANING: u8 = 0x56;

/// Sub-command and output format of start-measurement: big-endian IEEE-754 floats.
pub const START_ARGS_FLOAT: [u8; 2] = [0x01, 0x03];

/// Largest request data field we ever build.
pub const MAX_REQUEST_DATA: usize = 8;
/// Worst case: both delimiters plus every inner byte stuffed.
pub const MAX_REQUEST_LEN: usize = 2 + 2 * (4 + MAX_REQUEST_DATA);

pub type Request = ArrayVec<u8, MAX_REQUEST_LEN>;

#[inline]
pub fn needs_stuffing(byte: u8) -> bool {
    matches!(byte, 0x7E | 0x7D | 0x11 | 0x13)
}

/// Maps the byte following an `ESCAPE` back to its original value.
///
/// Unknown escape codes are passed through unchanged; the frame checksum
/// catches them.
#[inline]
pub fn unstuff(escaped: u8) -> u8 {
    match escaped {
        0x5E => 0x7E,
        0x5D => 0x7D,
        0x31 => 0x11,
        0x33 => 0x13,
        other => other,
    }
}

fn push_stuffed(out: &mut Request, byte: u8) -> Option<()> {
    if needs_stuffing(byte) {
        out.try_push(ESCAPE).ok()?;
        out.try_push(byte ^ ESCAPE_XOR).ok()
    } else {
        out.try_push(byte).ok()
    }
}

/// Builds a complete MOSI frame. `None` if `data` exceeds [`MAX_REQUEST_DATA`].
pub fn request(command: u8, data: &[u8]) -> Option<Request> {
    if data.len() > MAX_REQUEST_DATA {
        return None;
    }
    let mut body: ArrayVec<u8, { 3 + MAX_REQUEST_DATA }> = ArrayVec::new();
    body.try_push(DEVICE_ADDRESS).ok()?;
    body.try_push(command).ok()?;
    body.try_push(data.len() as u8).ok()?;
    body.try_extend_from_slice(data).ok()?;
    let checksum = sum8_complement(&body);

    let mut frame = Request::new();
    frame.try_push(FRAME_DELIMITER).ok()?;
    for &byte in body.iter().chain(core::iter::once(&checksum)) {
        push_stuffed(&mut frame, byte)?;
    }
    frame.try_push(FRAME_DELIMITER).ok()?;
    Some(frame)
}
