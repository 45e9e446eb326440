// src/mock.rs

//! Scriptable test double implementing every port trait plus the timer.

use crate::common::hal_traits::{I2cPort, OpcTimer, SerialPort, SpiPort};
use core::time::Duration;
use std::collections::VecDeque;
use std::vec::Vec;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(pub u64);

impl core::ops::Add<Duration> for MockInstant {
    type Output = Self;
    fn add(self, rhs: Duration) -> Self {
        MockInstant(self.0.saturating_add(rhs.as_micros() as u64))
    }
}

impl core::ops::Sub<MockInstant> for MockInstant {
    type Output = Duration;
    fn sub(self, rhs: MockInstant) -> Duration {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug, Default)]
pub struct MockInterface {
    /// Microseconds since the mock was created; only delays advance it.
    pub now_us: u64,
    pub fail_io: bool,

    // UART
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    /// Each flush moves the next queued response into `rx`.
    pub on_flush: VecDeque<Vec<u8>>,
    pub flush_count: usize,

    // SPI
    pub miso: VecDeque<u8>,
    pub mosi: Vec<u8>,
    pub selected: bool,
    pub select_count: usize,

    // I2C
    pub i2c_writes: Vec<(u8, Vec<u8>)>,
    pub i2c_reads: VecDeque<Vec<u8>>,
}

impl MockInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_rx(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    pub fn respond_on_flush(&mut self, data: &[u8]) {
        self.on_flush.push_back(data.to_vec());
    }

    pub fn stage_miso(&mut self, data: &[u8]) {
        self.miso.extend(data.iter().copied());
    }

    pub fn stage_i2c_read(&mut self, data: &[u8]) {
        self.i2c_reads.push_back(data.to_vec());
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.now_us = self.now_us.saturating_add(ms * 1_000);
    }
}

impl OpcTimer for MockInterface {
    type Instant = MockInstant;

    fn now(&self) -> MockInstant {
        MockInstant(self.now_us)
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us = self.now_us.saturating_add(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance_ms(u64::from(ms));
    }
}

impl SerialPort for MockInterface {
    type Error = MockError;

    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn peek(&mut self) -> nb::Result<u8, MockError> {
        if self.fail_io {
            return Err(nb::Error::Other(MockError));
        }
        self.rx.front().copied().ok_or(nb::Error::WouldBlock)
    }

    fn read_byte(&mut self) -> nb::Result<u8, MockError> {
        if self.fail_io {
            return Err(nb::Error::Other(MockError));
        }
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), MockError> {
        if self.fail_io {
            return Err(nb::Error::Other(MockError));
        }
        self.tx.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), MockError> {
        self.flush_count += 1;
        if let Some(response) = self.on_flush.pop_front() {
            self.rx.extend(response);
        }
        Ok(())
    }
}

impl SpiPort for MockInterface {
    type Error = MockError;

    fn select(&mut self) -> Result<(), MockError> {
        self.selected = true;
        self.select_count += 1;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), MockError> {
        self.selected = false;
        Ok(())
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, MockError> {
        if self.fail_io {
            return Err(MockError);
        }
        self.mosi.push(byte);
        Ok(self.miso.pop_front().unwrap_or(0x00))
    }
}

impl I2cPort for MockInterface {
    type Error = MockError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), MockError> {
        if self.fail_io {
            return Err(MockError);
        }
        self.i2c_writes.push((address, bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<(), MockError> {
        match self.i2c_reads.pop_front() {
            Some(data) if data.len() == buf.len() && !self.fail_io => {
                buf.copy_from_slice(&data);
                Ok(())
            }
            _ => Err(MockError),
        }
    }
}
