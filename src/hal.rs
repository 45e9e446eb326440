// src/hal.rs

//! Adapters from `embedded-hal` 1.0 to the crate's port traits.
//!
//! embedded-hal 1.0 has no serial traits, so UART devices implement
//! [`SerialPort`](crate::common::hal_traits::SerialPort) directly.

use crate::common::hal_traits::{I2cPort, OpcInstant, OpcTimer, SpiPort};
use core::fmt::Debug;
use embedded_hal::{delay::DelayNs, digital::OutputPin, i2c::I2c, spi::SpiBus};

/// Error from an SPI bus with a separately driven chip-select pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalSpiError<S, P> {
    Spi(S),
    Pin(P),
}

/// An `SpiBus` plus an active-low chip-select pin.
///
/// Chip select is driven by hand because the Alphasense handshake keeps it
/// asserted across an unknown number of single-byte transfers.
#[derive(Debug)]
pub struct HalSpi<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> HalSpi<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    pub fn new(spi: SPI, cs: CS) -> Self {
        HalSpi { spi, cs }
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> SpiPort for HalSpi<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    SPI::Error: Debug,
    CS::Error: Debug,
{
    type Error = HalSpiError<SPI::Error, CS::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(HalSpiError::Pin)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        // Clock out anything still queued before raising chip select.
        self.spi.flush().map_err(HalSpiError::Spi)?;
        self.cs.set_high().map_err(HalSpiError::Pin)
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        let mut word = [byte];
        self.spi.transfer_in_place(&mut word).map_err(HalSpiError::Spi)?;
        Ok(word[0])
    }
}

/// An embedded-hal `I2c` master.
#[derive(Debug)]
pub struct HalI2c<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> HalI2c<I2C> {
    pub fn new(i2c: I2C) -> Self {
        HalI2c { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> I2cPort for HalI2c<I2C> {
    type Error = I2C::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buf)
    }
}

/// A `DelayNs` implementation plus a monotonic clock.
///
/// `clock` is any function returning the current instant, e.g. a wrapper
/// around a hardware timer's tick counter.
pub struct HalTimer<D, C> {
    delay: D,
    clock: C,
}

// Manual impl: the clock is usually a closure, which has no `Debug`.
impl<D: Debug, C> Debug for HalTimer<D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HalTimer").field("delay", &self.delay).finish_non_exhaustive()
    }
}

impl<D, C, I> HalTimer<D, C>
where
    D: DelayNs,
    C: Fn() -> I,
    I: OpcInstant,
{
    pub fn new(delay: D, clock: C) -> Self {
        HalTimer { delay, clock }
    }

    pub fn release(self) -> (D, C) {
        (self.delay, self.clock)
    }
}

impl<D, C, I> OpcTimer for HalTimer<D, C>
where
    D: DelayNs,
    C: Fn() -> I,
    I: OpcInstant,
{
    type Instant = I;

    fn now(&self) -> I {
        (self.clock)()
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms)
    }
}
