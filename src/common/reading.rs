// src/common/reading.rs

//! Decoded measurement records, one per sensor family.
//!
//! Every record is `Copy`: a successful decode hands the caller a value, never
//! a view into the decoder's scratch buffer.

use super::config::Family;
use heapless::Vec;

/// Capacity of [`Reading::values`]; fits the largest record (N3).
pub const MAX_VALUES: usize = 48;

/// Plantower PMS5003 frame contents.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PlantowerReading {
    pub frame_len: u16,
    /// PM1.0 / PM2.5 / PM10 in µg/m³, factory "standard particle" calibration.
    pub pm_standard: [u16; 3],
    /// PM1.0 / PM2.5 / PM10 in µg/m³, atmospheric environment.
    pub pm_environmental: [u16; 3],
    /// Particles per 0.1 L at or above 0.3, 0.5, 1.0, 2.5, 5.0 and 10 µm.
    /// Each bin includes every bin after it.
    pub counts: [u16; 6],
}

impl PlantowerReading {
    /// Particle counts per size band (0.3–0.5, 0.5–1.0, … , ≥10 µm).
    ///
    /// A noisy frame can report a larger bin than its predecessor, so the
    /// subtraction saturates at zero.
    pub fn differential_counts(&self) -> [u16; 6] {
        let mut out = [0u16; 6];
        for i in 0..6 {
            let next = self.counts.get(i + 1).copied().unwrap_or(0);
            out[i] = self.counts[i].saturating_sub(next);
        }
        out
    }
}

/// Sensirion SPS30 measured values, float format.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Sps30Reading {
    /// Mass Concentration PM1.0 [μg/m³]
    pub mass_pm1_0: f32,
    /// Mass Concentration PM2.5 [μg/m³]
    pub mass_pm2_5: f32,
    /// Mass Concentration PM4.0 [μg/m³]
    pub mass_pm4_0: f32,
    /// Mass Concentration PM10 [μg/m³]
    pub mass_pm10: f32,
    /// Number Concentration PM0.5 [#/cm³]
    pub number_pm0_5: f32,
    /// Number Concentration PM1.0 [#/cm³]
    pub number_pm1_0: f32,
    /// Number Concentration PM2.5 [#/cm³]
    pub number_pm2_5: f32,
    /// Number Concentration PM4.0 [#/cm³]
    pub number_pm4_0: f32,
    /// Number Concentration PM10 [#/cm³]
    pub number_pm10: f32,
    /// Typical Particle Size [µm]
    pub typical_size: f32,
}

/// Alphasense OPC-R1 histogram.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct R1Reading {
    pub bins: [u16; 16],
    /// Mean time of flight for bins 1, 3, 5 and 7 [1/3 µs].
    pub bin_mtof: [u8; 4],
    /// Sample flow rate [mL/s]
    pub sample_flow_rate: f32,
    /// [°C]
    pub temperature: f32,
    /// [%RH]
    pub humidity: f32,
    /// Histogram integration period [s]
    pub sample_period: f32,
    pub reject_glitch: u8,
    pub reject_long_tof: u8,
    /// PM1.0 / PM2.5 / PM10 [μg/m³]
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm10: f32,
}

/// Alphasense OPC-N3 histogram.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct N3Reading {
    pub bins: [u16; 24],
    /// Mean time of flight for bins 1, 3, 5 and 7 [1/3 µs].
    pub bin_mtof: [u8; 4],
    /// Raw period code; divide by 100 for seconds.
    pub sample_period: u16,
    /// Raw flow code; divide by 100 for mL/s.
    pub sample_flow_rate: u16,
    /// [°C]
    pub temperature: f32,
    /// [%RH]
    pub humidity: f32,
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm10: f32,
    pub reject_glitch: u16,
    pub reject_long_tof: u16,
    pub reject_ratio: u16,
    pub reject_out_of_range: u16,
    pub fan_rev_count: u16,
    pub laser_status: u16,
}

/// Honeywell HPM mass concentrations [μg/m³].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HpmReading {
    pub pm1_0: u16,
    pub pm2_5: u16,
    pub pm4_0: u16,
    pub pm10: u16,
}

/// A successful decode from any supported family.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Reading {
    Plantower(PlantowerReading),
    Sps30(Sps30Reading),
    R1(R1Reading),
    N3(N3Reading),
    Hpm(HpmReading),
}

impl Reading {
    pub fn family(&self) -> Family {
        match self {
            Reading::Plantower(_) => Family::Plantower,
            Reading::Sps30(_) => Family::Sps30,
            Reading::R1(_) => Family::R1,
            Reading::N3(_) => Family::N3,
            Reading::Hpm(_) => Family::Hpm,
        }
    }

    /// Flattens the record into its fixed column order.
    ///
    /// Plantower: standard PM ×3, environmental PM ×3, cumulative counts ×6.
    /// SPS30: mass ×4, number ×5, typical size.
    /// R1: bins ×16, MToF ×4, flow, temperature, humidity, period, PM ×3.
    /// N3: bins ×24, MToF ×4, period, flow, temperature, humidity, PM ×3.
    /// HPM: PM1.0, PM2.5, PM4.0, PM10.
    pub fn values(&self) -> Vec<f32, MAX_VALUES> {
        let mut out: Vec<f32, MAX_VALUES> = Vec::new();
        let mut push = |v: f32| {
            let pushed = out.push(v);
            debug_assert!(pushed.is_ok(), "MAX_VALUES is smaller than a reading layout");
        };
        match self {
            Reading::Plantower(r) => {
                r.pm_standard.iter().for_each(|&v| push(f32::from(v)));
                r.pm_environmental.iter().for_each(|&v| push(f32::from(v)));
                r.counts.iter().for_each(|&v| push(f32::from(v)));
            }
            Reading::Sps30(r) => {
                for v in [
                    r.mass_pm1_0,
                    r.mass_pm2_5,
                    r.mass_pm4_0,
                    r.mass_pm10,
                    r.number_pm0_5,
                    r.number_pm1_0,
                    r.number_pm2_5,
                    r.number_pm4_0,
                    r.number_pm10,
                    r.typical_size,
                ] {
                    push(v);
                }
            }
            Reading::R1(r) => {
                r.bins.iter().for_each(|&v| push(f32::from(v)));
                r.bin_mtof.iter().for_each(|&v| push(f32::from(v)));
                for v in [
                    r.sample_flow_rate,
                    r.temperature,
                    r.humidity,
                    r.sample_period,
                    r.pm1_0,
                    r.pm2_5,
                    r.pm10,
                ] {
                    push(v);
                }
            }
            Reading::N3(r) => {
                r.bins.iter().for_each(|&v| push(f32::from(v)));
                r.bin_mtof.iter().for_each(|&v| push(f32::from(v)));
                push(f32::from(r.sample_period));
                push(f32::from(r.sample_flow_rate));
                for v in [r.temperature, r.humidity, r.pm1_0, r.pm2_5, r.pm10] {
                    push(v);
                }
            }
            Reading::Hpm(r) => {
                for v in [r.pm1_0, r.pm2_5, r.pm4_0, r.pm10] {
                    push(f32::from(v));
                }
            }
        }
        out
    }

    /// Copies as many values as fit into `dest`; returns the count copied.
    pub fn copy_to(&self, dest: &mut [f32]) -> usize {
        let values = self.values();
        let n = values.len().min(dest.len());
        dest[..n].copy_from_slice(&values[..n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_differential_counts() {
        let r = PlantowerReading {
            counts: [1000, 400, 100, 20, 5, 1],
            ..Default::default()
        };
        assert_eq!(r.differential_counts(), [600, 300, 80, 15, 4, 1]);
    }

    #[test]
    fn test_differential_counts_saturates() {
        let r = PlantowerReading {
            counts: [10, 12, 0, 0, 0, 0],
            ..Default::default()
        };
        assert_eq!(r.differential_counts()[0], 0);
    }

    #[test]
    fn test_values_lengths_per_family() {
        assert_eq!(Reading::Plantower(PlantowerReading::default()).values().len(), 12);
        assert_eq!(Reading::Sps30(Sps30Reading::default()).values().len(), 10);
        assert_eq!(Reading::R1(R1Reading::default()).values().len(), 27);
        assert_eq!(Reading::N3(N3Reading::default()).values().len(), 35);
        assert_eq!(Reading::Hpm(HpmReading::default()).values().len(), 4);
        assert!(Reading::N3(N3Reading::default()).values().len() <= MAX_VALUES, "largest layout fits");
    }

    #[test]
    fn test_copy_to_truncates_and_offsets() {
        let reading = Reading::Hpm(HpmReading { pm1_0: 1, pm2_5: 2, pm4_0: 3, pm10: 4 });
        let mut dest = [0.0f32; 6];
        assert_eq!(reading.copy_to(&mut dest[2..]), 4);
        assert_eq!(dest, [0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);

        let mut short = [0.0f32; 2];
        assert_eq!(reading.copy_to(&mut short), 2);
        assert_eq!(short, [1.0, 2.0]);
    }

    #[test]
    fn test_family_tags() {
        assert_eq!(Reading::Sps30(Sps30Reading::default()).family(), Family::Sps30);
        assert_eq!(Reading::N3(N3Reading::default()).family(), Family::N3);
    }
}
