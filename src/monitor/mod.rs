// src/monitor/mod.rs

//! A sensor instance: one decoder, the interface it talks through, and the
//! health tracker that watches its results.

mod health;
mod recovery;

pub use health::{HealthState, HealthStatus, BAD_STREAK_LIMIT};

use crate::common::{
    config::DeviceConfig, error::OpcError, hal_traits::OpcTimer, reading::Reading, timing,
};
use crate::decoder::OpcDecoder;
use core::time::Duration;
use log::{debug, info, warn};

/// Polls one sensor and keeps its health bookkeeping.
///
/// Every call to [`poll`](Opc::poll) is a single bounded decode attempt. The
/// result feeds the health tracker, and if no good reading has been seen for
/// the reset threshold the device's recovery plan runs before `poll` returns.
#[derive(Debug)]
pub struct Opc<D, IF>
where
    D: OpcDecoder<IF>,
    IF: OpcTimer,
{
    decoder: D,
    interface: IF,
    health: HealthState<IF::Instant>,
    last_reading: Option<Reading>,
    cleaned_at_altitude: bool,
}

impl<D, IF> Opc<D, IF>
where
    D: OpcDecoder<IF>,
    IF: OpcTimer,
{
    pub fn new(decoder: D, interface: IF) -> Self {
        let health = HealthState::new(interface.now(), timing::DEFAULT_RESET_THRESHOLD);
        Opc { decoder, interface, health, last_reading: None, cleaned_at_altitude: false }
    }

    /// Overrides how long the sensor may go without a good reading before a
    /// forced power cycle.
    pub fn with_reset_threshold(mut self, threshold: Duration) -> Self {
        self.health.set_reset_threshold(threshold);
        self
    }

    pub fn set_reset_threshold(&mut self, threshold: Duration) {
        self.health.set_reset_threshold(threshold);
    }

    pub fn config(&self) -> &'static DeviceConfig {
        self.decoder.config()
    }

    /// Runs the device start-up sequence and re-initializes the health state.
    ///
    /// Health is re-initialized even if start-up reports an error.
    pub fn start(&mut self) -> Result<(), OpcError<D::BusError>> {
        let result = self.decoder.start(&mut self.interface);
        if let Err(e) = &result {
            warn!("{:?}: start-up failed: {}", self.config().family, e);
        }
        let threshold = self.health.reset_threshold();
        self.health = HealthState::new(self.interface.now(), threshold);
        self.cleaned_at_altitude = false;
        result
    }

    /// One decode attempt, then health bookkeeping, then the age check.
    pub fn poll(&mut self) -> Result<Reading, OpcError<D::BusError>> {
        let family = self.config().family;
        let result = self.decoder.attempt_decode(&mut self.interface);
        let now = self.interface.now();

        match &result {
            Ok(reading) => {
                if self.health.record_success(now) {
                    info!("{:?}: readings good again", family);
                }
                self.last_reading = Some(*reading);
            }
            Err(e) => {
                debug!("{:?}: decode failed: {}", family, e);
                if self.health.record_failure() {
                    warn!("{:?}: {} consecutive bad readings", family, self.health.bad_streak());
                }
            }
        }

        if self.health.recovery_due(now) {
            self.recover();
        }
        result
    }

    fn recover(&mut self) {
        let family = self.config().family;
        warn!(
            "{:?}: no good reading for {} ms, power cycling",
            family,
            self.since_last_good().as_millis()
        );
        let plan = self.decoder.config().recovery;
        let failed = recovery::run_recovery(&mut self.decoder, &mut self.interface, plan);
        self.health.rearm(self.interface.now());
        info!("{:?}: recovery finished, {} step(s) failed", family, failed);
    }

    /// Fan-clean once, the first time `altitude` exceeds `threshold`.
    ///
    /// Returns whether a clean was issued. Devices without a cleaning cycle
    /// never clean.
    pub fn clean_above_altitude(&mut self, altitude: f32, threshold: f32) -> Result<bool, OpcError<D::BusError>> {
        if self.cleaned_at_altitude || !self.decoder.supports_cleaning() || !(altitude > threshold) {
            return Ok(false);
        }
        self.decoder.clean(&mut self.interface)?;
        self.cleaned_at_altitude = true;
        info!("{:?}: cleaned at altitude {}", self.config().family, altitude);
        Ok(true)
    }

    pub fn clean(&mut self) -> Result<(), OpcError<D::BusError>> {
        self.decoder.clean(&mut self.interface)
    }

    pub fn power_on(&mut self) -> Result<(), OpcError<D::BusError>> {
        self.decoder.power_on(&mut self.interface)
    }

    pub fn power_off(&mut self) -> Result<(), OpcError<D::BusError>> {
        self.decoder.power_off(&mut self.interface)
    }

    pub fn health(&self) -> &HealthState<IF::Instant> {
        &self.health
    }

    pub fn status(&self) -> HealthStatus {
        self.health.status()
    }

    pub fn good_count(&self) -> u32 {
        self.health.good_count()
    }

    pub fn bad_streak(&self) -> u32 {
        self.health.bad_streak()
    }

    pub fn log_quality(&self) -> bool {
        self.health.log_quality()
    }

    pub fn since_last_good(&self) -> Duration {
        self.health.since_last_good(self.interface.now())
    }

    /// Copy of the most recent good reading.
    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }

    pub fn interface_mut(&mut self) -> &mut IF {
        &mut self.interface
    }

    pub fn release(self) -> (D, IF) {
        (self.decoder, self.interface)
    }
}
