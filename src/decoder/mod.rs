// src/decoder/mod.rs

//! Per-family frame decoders.
//!
//! Each decoder owns its scratch buffer and turns one bounded poll of its bus
//! into either a [`Reading`] or an [`OpcError`]. The set of families is closed;
//! [`Reading`] is the tagged union of their outputs.

pub mod alphasense;
pub mod hpm;
pub(crate) mod io;
pub mod plantower;
pub mod sps30;

pub use alphasense::{N3, R1};
pub use hpm::{Hpm, HpmMode};
pub use plantower::{Plantower, PlantowerMode};
pub use sps30::{Sps30I2c, Sps30Uart};

use crate::common::{
    config::DeviceConfig, error::OpcError, hal_traits::OpcTimer, reading::Reading,
};
use core::fmt::Debug;

/// The capability every device family provides.
///
/// `IF` is the interface the decoder talks through: a bus port plus a timer.
pub trait OpcDecoder<IF: OpcTimer> {
    /// Error type of the underlying bus.
    type BusError: Debug;

    /// Immutable constants for this wire variant.
    fn config(&self) -> &'static DeviceConfig;

    /// One bounded decode attempt. Never waits for bytes that are not there yet.
    fn attempt_decode(&mut self, iface: &mut IF) -> Result<Reading, OpcError<Self::BusError>>;

    fn power_on(&mut self, iface: &mut IF) -> Result<(), OpcError<Self::BusError>>;

    fn power_off(&mut self, iface: &mut IF) -> Result<(), OpcError<Self::BusError>>;

    /// Device start-up sequence. Defaults to a plain power-on.
    fn start(&mut self, iface: &mut IF) -> Result<(), OpcError<Self::BusError>> {
        self.power_on(iface)
    }

    /// Whether [`clean`](OpcDecoder::clean) does anything on this device.
    fn supports_cleaning(&self) -> bool {
        false
    }

    /// Runs the fan-clean cycle.
    fn clean(&mut self, _iface: &mut IF) -> Result<(), OpcError<Self::BusError>> {
        Err(OpcError::Unsupported)
    }
}
