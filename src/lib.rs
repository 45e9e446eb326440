// src/lib.rs

#![cfg_attr(not(test), no_std)]

//! Frame decoders and health tracking for optical particle counters.
//!
//! Each sensor family has a decoder in [`decoder`] that turns one poll of its
//! bus into a [`Reading`]. [`Opc`] wraps a decoder with the health
//! bookkeeping and power-cycle recovery shared by all of them.

pub mod common;
pub mod decoder;
#[cfg(feature = "impl-hal")]
pub mod hal;
pub mod monitor;

#[cfg(test)]
mod mock;

pub use common::{
    ByteOrder, DeviceConfig, ErrorKind, Family, I2cPort, OpcError, OpcInstant, OpcTimer, Reading, RecoveryStep,
    RetryPolicy, SerialPort, SpiPort,
};
pub use decoder::{Hpm, HpmMode, OpcDecoder, Plantower, PlantowerMode, Sps30I2c, Sps30Uart, N3, R1};
pub use monitor::{HealthState, HealthStatus, Opc};
