use async_trait::async_trait;
use chargewatch_platform::{BatteryProvider, HardwareHealth, RawSample, StarshipBattery};
use color_eyre::eyre::Result;

/// Yields one raw battery sample per call. May suspend and may fail.
#[async_trait(?Send)]
pub trait BatterySource {
    async fn query(&mut self) -> Result<RawSample>;
}

/// Hardware-health fields for the analytics query.
pub trait HardwareInventory {
    fn inventory(&mut self) -> Result<HardwareHealth>;
}

/// The OS battery, opened lazily so a failed open is retried on the next tick.
#[derive(Default)]
pub struct PlatformSource {
    provider: Option<StarshipBattery>,
}

impl PlatformSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn refreshed(&mut self) -> Result<&StarshipBattery> {
        let provider = match self.provider.take() {
            Some(mut provider) => {
                provider.refresh()?;
                provider
            }
            None => StarshipBattery::new()?,
        };
        Ok(self.provider.insert(provider))
    }
}

#[async_trait(?Send)]
impl BatterySource for PlatformSource {
    async fn query(&mut self) -> Result<RawSample> {
        Ok(self.refreshed()?.info().raw_sample())
    }
}

impl HardwareInventory for PlatformSource {
    fn inventory(&mut self) -> Result<HardwareHealth> {
        Ok(self.refreshed()?.info().hardware_health())
    }
}
