// src/common/config.rs

//! Immutable per-family device constants and the tunable retry policy.

use core::time::Duration;

/// The supported sensor families.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Family {
    /// Plantower PMS5003 and pin-compatible relatives.
    Plantower,
    /// Sensirion SPS30.
    Sps30,
    /// Alphasense OPC-R1.
    R1,
    /// Alphasense OPC-N3.
    N3,
    /// Honeywell HPM series.
    Hpm,
}

/// Integrity check applied to a received frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChecksumKind {
    /// 16-bit additive sum compared against a big-endian trailer.
    Sum16,
    /// 8-bit additive sum, one's complement (SHDLC).
    Sum8Complement,
    /// `(0x10000 - header - payload) mod 256` (HPM polled responses).
    Sum8Negated,
    /// CRC-8, poly 0x31, init 0xFF, per 2-byte word.
    Crc8,
    /// CRC-16, poly 0xA001, init 0xFFFF.
    Crc16,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusParams {
    Uart { baud: u32 },
    /// SPI mode per the usual CPOL/CPHA numbering.
    Spi { clock_hz: u32, mode: u8 },
    I2c { address: u8, clock_hz: u32 },
}

/// One step of a power-cycle recovery.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RecoveryStep {
    PowerOff,
    PowerOn,
    /// Fan-clean cycle, only issued for devices that support it.
    Clean,
    Delay(Duration),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceConfig {
    pub family: Family,
    /// Length of the data frame the decoder reads, before any de-stuffing.
    pub frame_len: usize,
    /// Leading synchronisation byte(s), or handshake bytes on SPI.
    pub sync: &'static [u8],
    pub checksum: ChecksumKind,
    pub bus: BusParams,
    /// Sequence run when the last good reading is older than the reset threshold.
    pub recovery: &'static [RecoveryStep],
}

const fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

const fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

pub const PLANTOWER: DeviceConfig = DeviceConfig {
    family: Family::Plantower,
    frame_len: 32,
    sync: &[0x42, 0x4D],
    checksum: ChecksumKind::Sum16,
    bus: BusParams::Uart { baud: 9600 },
    recovery: &[
        RecoveryStep::PowerOff,
        RecoveryStep::Delay(secs(20)),
        RecoveryStep::PowerOn,
        RecoveryStep::Delay(millis(100)),
    ],
};

/// SPS30 over UART. Frame length is the unstuffed minimum: start byte,
/// 4 info bytes, 40 payload bytes, checksum, end byte.
pub const SPS30_UART: DeviceConfig = DeviceConfig {
    family: Family::Sps30,
    frame_len: 47,
    sync: &[0x7E],
    checksum: ChecksumKind::Sum8Complement,
    bus: BusParams::Uart { baud: 115_200 },
    recovery: &SPS30_RECOVERY,
};

/// SPS30 over I2C: 20 groups of `{msb, lsb, crc}`.
pub const SPS30_I2C: DeviceConfig = DeviceConfig {
    family: Family::Sps30,
    frame_len: 60,
    sync: &[],
    checksum: ChecksumKind::Crc8,
    bus: BusParams::I2c { address: 0x69, clock_hz: 100_000 },
    recovery: &SPS30_RECOVERY,
};

const SPS30_RECOVERY: [RecoveryStep; 6] = [
    RecoveryStep::PowerOff,
    RecoveryStep::Delay(secs(2)),
    RecoveryStep::PowerOn,
    RecoveryStep::Delay(millis(100)),
    RecoveryStep::Clean,
    RecoveryStep::Delay(secs(2)),
];

const ALPHASENSE_RECOVERY: [RecoveryStep; 4] = [
    RecoveryStep::PowerOff,
    RecoveryStep::Delay(secs(2)),
    RecoveryStep::PowerOn,
    RecoveryStep::Delay(millis(100)),
];

pub const R1: DeviceConfig = DeviceConfig {
    family: Family::R1,
    frame_len: 64,
    sync: &[0x31, 0xF3],
    checksum: ChecksumKind::Crc16,
    bus: BusParams::Spi { clock_hz: 500_000, mode: 1 },
    recovery: &ALPHASENSE_RECOVERY,
};

pub const N3: DeviceConfig = DeviceConfig {
    family: Family::N3,
    frame_len: 86,
    sync: &[0x31, 0xF3],
    checksum: ChecksumKind::Crc16,
    bus: BusParams::Spi { clock_hz: 500_000, mode: 1 },
    recovery: &ALPHASENSE_RECOVERY,
};

const HPM_RECOVERY: [RecoveryStep; 4] = [
    RecoveryStep::PowerOff,
    RecoveryStep::Delay(secs(20)),
    RecoveryStep::PowerOn,
    RecoveryStep::Delay(millis(100)),
];

pub const HPM_PUSH: DeviceConfig = DeviceConfig {
    family: Family::Hpm,
    frame_len: 32,
    sync: &[0x42, 0x4D],
    checksum: ChecksumKind::Sum16,
    bus: BusParams::Uart { baud: 9600 },
    recovery: &HPM_RECOVERY,
};

/// HPM polled reply: header, length, command echo, then `length` bytes of
/// which the last is the checksum. Sized for the largest reply we accept.
pub const HPM_POLLED: DeviceConfig = DeviceConfig {
    family: Family::Hpm,
    frame_len: 32,
    sync: &[0x40],
    checksum: ChecksumKind::Sum8Negated,
    bus: BusParams::Uart { baud: 9600 },
    recovery: &HPM_RECOVERY,
};

/// Bounded retry schedule for the SPI ready handshake.
///
/// A round is `transfers_per_round` handshake transfers with chip select held.
/// Between rounds chip select is released and the caller sleeps
/// `backoff * 2^(round - 1)`, capped at `max_backoff`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RetryPolicy {
    pub transfers_per_round: u16,
    pub rounds: u8,
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Data reads: a single round, no sleeping.
    pub const READ: RetryPolicy = RetryPolicy {
        transfers_per_round: 25,
        rounds: 1,
        backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    };

    /// Power and sub-commands: best-effort twice.
    pub const COMMAND: RetryPolicy = RetryPolicy {
        transfers_per_round: 20,
        rounds: 2,
        backoff: secs(2),
        max_backoff: secs(8),
    };

    /// Sleep before round `round` (0-based). Round 0 never sleeps.
    pub fn backoff_before(&self, round: u8) -> Duration {
        if round == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(u32::from(round - 1)).unwrap_or(u32::MAX);
        self.backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    /// Upper bound on handshake transfers.
    pub fn max_transfers(&self) -> u32 {
        u32::from(self.transfers_per_round) * u32::from(self.rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            transfers_per_round: 10,
            rounds: 6,
            backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.backoff_before(0), Duration::ZERO);
        assert_eq!(policy.backoff_before(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_before(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_before(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_before(4), Duration::from_secs(5));
        assert_eq!(policy.backoff_before(200), Duration::from_secs(5));
        assert_eq!(policy.max_transfers(), 60);
    }

    #[test]
    fn test_read_policy_never_sleeps() {
        assert_eq!(RetryPolicy::READ.rounds, 1);
        assert_eq!(RetryPolicy::READ.max_transfers(), 25);
        assert_eq!(RetryPolicy::COMMAND.backoff_before(1), Duration::from_secs(2));
    }

    #[test]
    fn test_only_sps30_recovery_cleans() {
        for config in [PLANTOWER, R1, N3, HPM_PUSH, HPM_POLLED] {
            assert!(
                !config.recovery.contains(&RecoveryStep::Clean),
                "{:?} must not clean",
                config.family
            );
        }
        assert!(SPS30_UART.recovery.contains(&RecoveryStep::Clean));
        assert!(SPS30_I2C.recovery.contains(&RecoveryStep::Clean));
    }

    #[test]
    fn test_recovery_power_off_delay_within_bounds() {
        for config in [PLANTOWER, SPS30_UART, SPS30_I2C, R1, N3, HPM_PUSH, HPM_POLLED] {
            assert_eq!(config.recovery[0], RecoveryStep::PowerOff);
            match config.recovery[1] {
                RecoveryStep::Delay(d) => {
                    assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(20))
                }
                other => panic!("expected delay after power-off, got {:?}", other),
            }
        }
    }
}
