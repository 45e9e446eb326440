// src/common/timing.rs

use core::time::Duration;

// Nominal values taken from the device datasheets and from what has proven
// reliable on the bench. All are blocking delays on the calling thread.

// === Health ===

/// Default age of the last good reading that forces a power-cycle recovery.
pub const DEFAULT_RESET_THRESHOLD: Duration = Duration::from_millis(1_200_000);

// === Plantower (PMS5003) ===

/// Wait after a command before discarding its reply.
pub const PLANTOWER_COMMAND_SETTLE: Duration = Duration::from_millis(20);
/// Gap between power-on and the mode command during start-up.
pub const PLANTOWER_START_SETTLE: Duration = Duration::from_millis(100);
/// Wait after a passive-mode read request; a 32-byte frame takes ~33 ms at 9600 baud.
pub const PLANTOWER_READ_SETTLE: Duration = Duration::from_millis(50);

// === SPS30 ===

/// Wait after an SHDLC command before discarding its reply.
pub const SPS30_COMMAND_SETTLE: Duration = Duration::from_millis(100);
/// Gap between start-measurement and the start-up fan clean.
pub const SPS30_START_SETTLE: Duration = Duration::from_millis(100);
/// Minimum gap between an I2C command write and the following read.
pub const SPS30_I2C_READ_DELAY: Duration = Duration::from_millis(1);

// === Alphasense (R1, N3) ===

/// Gap between handshake transfers.
pub const ALPHASENSE_HANDSHAKE_GAP: Duration = Duration::from_millis(10);
/// Gap between bulk-read transfers on the R1.
pub const R1_BYTE_GAP_US: u32 = 20;
/// Gap between bulk-read transfers on the N3.
pub const N3_BYTE_GAP_US: u32 = 10;
/// N3 start-up gaps: before the fan, between fan and laser, after the laser.
pub const N3_PRE_FAN: Duration = Duration::from_millis(1000);
pub const N3_FAN_TO_LASER: Duration = Duration::from_millis(500);
pub const N3_POST_LASER: Duration = Duration::from_millis(1000);
/// Gap between the sub-commands of an N3 power-off.
pub const N3_POWER_OFF_GAP: Duration = Duration::from_millis(50);

// === HPM ===

/// Wait after a request before reading the reply.
pub const HPM_RESPONSE_DELAY: Duration = Duration::from_millis(50);
/// Gap between power-on and the auto-send command during start-up.
pub const HPM_START_SETTLE: Duration = Duration::from_millis(100);

// === Bus plumbing ===

/// Back-off while a UART transmit buffer reports `WouldBlock`.
pub const WRITE_RETRY_DELAY_US: u32 = 100;
/// Number of `WouldBlock` retries per byte before giving up with `Timeout`.
pub const WRITE_RETRY_LIMIT: u32 = 200;
