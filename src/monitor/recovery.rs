// src/monitor/recovery.rs

use crate::common::{config::RecoveryStep, hal_traits::OpcTimer};
use crate::decoder::OpcDecoder;
use log::warn;

/// Runs a power-cycle plan step by step.
///
/// A failing step is logged and skipped; the remaining steps still run.
/// Returns the number of steps that failed.
pub(crate) fn run_recovery<D, IF>(decoder: &mut D, iface: &mut IF, plan: &[RecoveryStep]) -> usize
where
    D: OpcDecoder<IF>,
    IF: OpcTimer,
{
    let mut failed = 0;
    for step in plan {
        let outcome = match *step {
            RecoveryStep::PowerOff => decoder.power_off(iface),
            RecoveryStep::PowerOn => decoder.power_on(iface),
            RecoveryStep::Clean if decoder.supports_cleaning() => decoder.clean(iface),
            RecoveryStep::Clean => Ok(()),
            RecoveryStep::Delay(duration) => {
                iface.delay(duration);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("recovery step {:?} failed: {}", step, e);
            failed += 1;
        }
    }
    failed
}
