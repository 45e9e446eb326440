// src/common/mod.rs

pub mod bytes;
pub mod checksum;
pub mod config;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod reading;
pub mod timing;

pub use bytes::ByteOrder;
pub use checksum::{crc16, crc8, sum16, sum8_complement};
pub use config::{BusParams, ChecksumKind, DeviceConfig, Family, RecoveryStep, RetryPolicy};
pub use error::{ErrorKind, OpcError};
pub use frame::FrameBuffer;
pub use hal_traits::{Bound, I2cPort, OpcInstant, OpcTimer, SerialPort, SpiPort};
pub use reading::{HpmReading, N3Reading, PlantowerReading, R1Reading, Reading, Sps30Reading, MAX_VALUES};
