use chargewatch_protocol::Thresholds;
use color_eyre::eyre::Result;

use crate::config::UserConfig;

/// Source of the user's notification thresholds.
pub trait SettingsStore {
    fn thresholds(&self) -> Thresholds;
    fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()>;
}

/// Thresholds persisted in the TOML config file.
pub struct ConfigSettings {
    thresholds: Thresholds,
}

impl ConfigSettings {
    pub fn new(config: &UserConfig) -> Self {
        Self {
            thresholds: config.thresholds,
        }
    }
}

impl SettingsStore for ConfigSettings {
    fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        // re-read so edits made since startup are not clobbered
        let mut config = UserConfig::load();
        config.thresholds = thresholds;
        config.save()?;
        self.thresholds = thresholds;
        Ok(())
    }
}

/// In-memory thresholds, not persisted.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySettings {
    thresholds: Thresholds,
}

#[cfg(test)]
impl SettingsStore for MemorySettings {
    fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        self.thresholds = thresholds;
        Ok(())
    }
}
