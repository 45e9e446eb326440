// src/common/hal_traits.rs

//! The bus contracts every decoder consumes.
//!
//! All methods are non-blocking or bounded: a decode attempt is one poll of
//! whatever the transport already holds, never a wait for more.

use core::fmt::Debug;
use core::ops::{Add, Sub};
use core::time::Duration;

/// Monotonic timestamp produced by an [`OpcTimer`].
pub trait OpcInstant:
    Copy + Ord + Debug + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

impl<T> OpcInstant for T where
    T: Copy + Ord + Debug + Sub<Output = Duration> + Add<Duration, Output = T>
{
}

/// Abstraction for the clock and blocking delays.
///
/// Delays are deliberate busy waits on the calling thread: the SPI devices
/// need fixed inter-transfer gaps and the recovery sequences need multi-second
/// power-off windows.
pub trait OpcTimer {
    type Instant: OpcInstant;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Delay for a `Duration`, saturating at `u32::MAX` milliseconds.
    fn delay(&mut self, duration: Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        self.delay_ms(ms);
    }
}

/// Byte stream transport (UART).
pub trait SerialPort {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Number of received bytes waiting to be read.
    fn available(&mut self) -> usize;

    /// Returns the next byte without consuming it, or `WouldBlock` if none is buffered.
    fn peek(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to read a single byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` if no byte is available yet.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte, `WouldBlock` if the transmit buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;

    /// Reads whatever is buffered into `buf`, stopping early if the stream runs dry.
    ///
    /// Returns the number of bytes written into `buf`.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.read_byte() {
                Ok(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(count)
    }

    /// Throws away up to `max` buffered bytes. Returns how many were dropped.
    fn discard(&mut self, max: usize) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < max {
            match self.read_byte() {
                Ok(_) => count += 1,
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(count)
    }
}

/// Full-duplex, byte-at-a-time SPI with a manually driven chip select.
pub trait SpiPort {
    type Error: Debug;

    /// Asserts chip select (active low on all supported devices).
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Releases chip select.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clocks `byte` out and returns the byte clocked in.
    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error>;
}

/// 7-bit addressed I2C master.
pub trait I2cPort {
    type Error: Debug;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fills all of `buf` or fails.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Pairs a bus port with a timer so the combination satisfies a decoder's
/// `Port + OpcTimer` bound.
#[derive(Debug)]
pub struct Bound<P, T> {
    pub port: P,
    pub timer: T,
}

impl<P, T> Bound<P, T> {
    pub fn new(port: P, timer: T) -> Self {
        Bound { port, timer }
    }

    pub fn release(self) -> (P, T) {
        (self.port, self.timer)
    }
}

impl<P, T: OpcTimer> OpcTimer for Bound<P, T> {
    type Instant = T::Instant;

    fn now(&self) -> Self::Instant {
        self.timer.now()
    }

    fn delay_us(&mut self, us: u32) {
        self.timer.delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timer.delay_ms(ms)
    }
}

impl<P: SerialPort, T> SerialPort for Bound<P, T> {
    type Error = P::Error;

    fn available(&mut self) -> usize {
        self.port.available()
    }

    fn peek(&mut self) -> nb::Result<u8, Self::Error> {
        self.port.peek()
    }

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        self.port.read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.port.write_byte(byte)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.port.flush()
    }
}

impl<P: SpiPort, T> SpiPort for Bound<P, T> {
    type Error = P::Error;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.port.select()
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.port.deselect()
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        self.port.transfer(byte)
    }
}

impl<P: I2cPort, T> I2cPort for Bound<P, T> {
    type Error = P::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.port.write(address, bytes)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.port.read(address, buf)
    }
}
