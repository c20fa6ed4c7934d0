use chargewatch_platform::RawSample;
use chargewatch_protocol::{BatteryReading, RawState};
use color_eyre::eyre::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{trace, warn};

/// Maps a raw source sample onto a [`BatteryReading`].
///
/// A negative percent is the no-battery sentinel.
pub fn normalize(sample: &RawSample) -> BatteryReading {
    let raw_state = RawState::from_tag(&sample.state);
    if sample.percent < 0.0 || raw_state == RawState::NoBattery {
        return BatteryReading::no_battery();
    }

    let level = sample.percent.round().clamp(0.0, 100.0) as u8;
    BatteryReading::new(level, raw_state)
}

/// Synthetic reading used when the source fails.
pub fn fallback_reading<R: Rng + ?Sized>(rng: &mut R) -> BatteryReading {
    BatteryReading {
        level: rng.gen_range(0..100),
        is_charging: rng.gen_bool(0.5),
        no_battery: false,
        raw_state: RawState::Undetermined,
    }
}

/// Turns source results into readings, degrading to a synthetic reading on error.
pub struct Normalizer {
    rng: StdRng,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn reading(&mut self, sample: Result<RawSample>) -> BatteryReading {
        match sample {
            Ok(sample) => {
                trace!(percent = sample.percent, state = %sample.state, "Raw battery sample");
                normalize(&sample)
            }
            Err(e) => {
                let reading = fallback_reading(&mut self.rng);
                warn!(
                    error = %e,
                    level = reading.level,
                    charging = reading.is_charging,
                    "Battery source failed, using synthetic reading"
                );
                reading
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::eyre;

    #[test]
    fn test_charging_states() {
        for tag in ["charging", "charged", "finishing charge"] {
            let reading = normalize(&RawSample::new(64.0, tag));
            assert!(reading.is_charging, "{} should count as charging", tag);
            assert_eq!(reading.level, 64);
            assert!(!reading.no_battery);
        }

        let reading = normalize(&RawSample::new(64.0, "discharging"));
        assert!(!reading.is_charging);
        assert_eq!(reading.raw_state, RawState::Discharging);

        let reading = normalize(&RawSample::new(64.0, "AC attached"));
        assert!(!reading.is_charging);
        assert_eq!(reading.raw_state, RawState::Undetermined);
    }

    #[test]
    fn test_no_battery_sentinel() {
        let reading = normalize(&RawSample::new(-1.0, "charging"));
        assert_eq!(reading, BatteryReading::no_battery());

        let reading = normalize(&RawSample::new(55.0, "no battery"));
        assert_eq!(reading.level, 0);
        assert!(!reading.is_charging);
        assert!(reading.no_battery);
    }

    #[test]
    fn test_level_rounding_and_clamping() {
        assert_eq!(normalize(&RawSample::new(99.6, "charging")).level, 100);
        assert_eq!(normalize(&RawSample::new(99.4, "charging")).level, 99);
        assert_eq!(normalize(&RawSample::new(104.0, "charged")).level, 100);
        assert_eq!(normalize(&RawSample::new(0.2, "discharging")).level, 0);
    }

    #[test]
    fn test_source_failure_yields_synthetic_reading() {
        let mut normalizer = Normalizer::with_rng(StdRng::seed_from_u64(7));
        for _ in 0..50 {
            let reading = normalizer.reading(Err(eyre!("IOKit unavailable")));
            assert!(reading.level < 100);
            assert!(!reading.no_battery);
            assert_eq!(reading.raw_state, RawState::Undetermined);
        }
    }

    #[test]
    fn test_fallback_varies_charging_flag() {
        let mut rng = StdRng::seed_from_u64(42);
        let readings: Vec<_> = (0..64).map(|_| fallback_reading(&mut rng)).collect();
        assert!(readings.iter().any(|r| r.is_charging));
        assert!(readings.iter().any(|r| !r.is_charging));
    }

    #[test]
    fn test_successful_sample_passes_through() {
        let mut normalizer = Normalizer::with_rng(StdRng::seed_from_u64(1));
        let reading = normalizer.reading(Ok(RawSample::new(42.0, "discharging")));
        assert_eq!(reading, BatteryReading::new(42, RawState::Discharging));
    }
}
