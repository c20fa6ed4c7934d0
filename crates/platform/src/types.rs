//! Shared types for battery sampling.

use std::fmt;

/// Percent value reported when the machine has no battery.
pub const NO_BATTERY_PERCENT: f32 = -1.0;

/// A raw battery observation as reported by the OS.
///
/// `state` is a free-form tag (`"charging"`, `"charged"`, `"finishing charge"`,
/// `"discharging"`, `"AC attached"`, `"no battery"`, ...). Interpreting it is
/// the monitor's job, not the platform's.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub percent: f32,
    pub state: String,
}

impl RawSample {
    pub fn new(percent: f32, state: impl Into<String>) -> Self {
        Self {
            percent,
            state: state.into(),
        }
    }

    pub fn no_battery() -> Self {
        Self::new(NO_BATTERY_PERCENT, ChargeState::NoBattery.tag())
    }
}

/// Battery charging state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeState {
    /// Battery is actively charging
    Charging,
    /// Battery is discharging (on battery power)
    Discharging,
    /// Battery is full and external power is connected
    Full,
    /// External power connected but not charging (e.g., charge limit reached)
    NotCharging,
    /// No battery installed
    NoBattery,
    /// State cannot be determined
    #[default]
    Unknown,
}

impl ChargeState {
    /// Returns a human-readable label for the charge state.
    pub fn label(&self) -> &'static str {
        match self {
            ChargeState::Charging => "Charging",
            ChargeState::Discharging => "On Battery",
            ChargeState::Full => "Full",
            ChargeState::NotCharging => "Not Charging",
            ChargeState::NoBattery => "No Battery",
            ChargeState::Unknown => "Unknown",
        }
    }

    /// Returns the raw state tag carried by a [`RawSample`].
    pub fn tag(&self) -> &'static str {
        match self {
            ChargeState::Charging => "charging",
            ChargeState::Discharging => "discharging",
            ChargeState::Full => "charged",
            ChargeState::NotCharging => "AC attached",
            ChargeState::NoBattery => "no battery",
            ChargeState::Unknown => "undetermined",
        }
    }

    /// Returns true if external power is connected.
    pub fn is_plugged_in(&self) -> bool {
        matches!(
            self,
            ChargeState::Charging | ChargeState::Full | ChargeState::NotCharging
        )
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<starship_battery::State> for ChargeState {
    fn from(state: starship_battery::State) -> Self {
        match state {
            starship_battery::State::Charging => ChargeState::Charging,
            starship_battery::State::Discharging => ChargeState::Discharging,
            starship_battery::State::Empty => ChargeState::Discharging,
            starship_battery::State::Full => ChargeState::Full,
            starship_battery::State::Unknown => ChargeState::Unknown,
            #[allow(unreachable_patterns)]
            _ => ChargeState::Unknown,
        }
    }
}
