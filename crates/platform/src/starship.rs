use color_eyre::eyre::Result;
use starship_battery::units::energy::watt_hour;
use starship_battery::units::ratio::percent;
use starship_battery::Manager;

use crate::battery::{BatteryInfo, BatteryProvider};
use crate::types::ChargeState;

/// Battery provider backed by `starship-battery`.
///
/// A machine without a battery is not an error: the provider reports
/// `present = false` and the monitor turns that into a no-battery reading.
pub struct StarshipBattery {
    info: BatteryInfo,
    manager: Manager,
}

impl BatteryProvider for StarshipBattery {
    fn new() -> Result<Self> {
        let manager = Manager::new()?;
        let mut provider = Self {
            info: BatteryInfo::default(),
            manager,
        };
        provider.refresh()?;
        Ok(provider)
    }

    fn refresh(&mut self) -> Result<()> {
        self.refresh_from_battery_crate()?;
        #[cfg(target_os = "linux")]
        self.refresh_linux_extras();
        Ok(())
    }

    fn info(&self) -> &BatteryInfo {
        &self.info
    }
}

impl StarshipBattery {
    fn refresh_from_battery_crate(&mut self) -> Result<()> {
        let Some(battery) = self.manager.batteries()?.next() else {
            if self.info.present {
                tracing::info!("Battery no longer reported by the system");
            }
            self.info = BatteryInfo::default();
            return Ok(());
        };
        let mut battery = battery?;

        self.manager.refresh(&mut battery)?;

        self.info.present = true;
        self.info.charge_percent = battery.state_of_charge().get::<percent>();
        self.info.max_capacity_wh = battery.energy_full().get::<watt_hour>();
        self.info.design_capacity_wh = battery.energy_full_design().get::<watt_hour>();
        self.info.health_percent = battery.state_of_health().get::<percent>();
        self.info.cycle_count = battery.cycle_count();
        self.info.state = ChargeState::from(battery.state());
        self.info.external_connected = self.info.state.is_plugged_in();

        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn refresh_linux_extras(&mut self) {
        if !self.info.present {
            return;
        }
        self.info.external_connected = sysfs::is_ac_connected();

        if self.info.external_connected
            && !matches!(self.info.state, ChargeState::Charging | ChargeState::Full)
        {
            self.info.state = ChargeState::NotCharging;
        }
    }
}

#[cfg(target_os = "linux")]
mod sysfs {
    use std::fs;
    use std::path::Path;

    const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

    pub fn is_ac_connected() -> bool {
        let power_supply = Path::new(POWER_SUPPLY_PATH);
        let Ok(entries) = fs::read_dir(power_supply) else {
            return false;
        };

        entries.flatten().any(|entry| {
            let path = entry.path();
            let is_mains = fs::read_to_string(path.join("type"))
                .map(|t| t.trim() == "Mains")
                .unwrap_or(false);
            is_mains
                && fs::read_to_string(path.join("online"))
                    .map(|online| online.trim() == "1")
                    .unwrap_or(false)
        })
    }
}
