//! Battery sampling for chargewatch.
//!
//! This crate wraps the OS battery query behind the [`BatteryProvider`] trait
//! and exposes two views of the result:
//!
//! - [`RawSample`]: the `{percent, state}` pair the monitor normalizes every tick
//! - [`HardwareHealth`]: the inventory fields (condition, cycles, capacity)
//!   reported by the on-demand analytics query
//!
//! # Example
//!
//! ```ignore
//! use chargewatch_platform::{BatteryProvider, StarshipBattery};
//!
//! let mut battery = StarshipBattery::new()?;
//! battery.refresh()?;
//! let sample = battery.info().raw_sample();
//! println!("{}% ({})", sample.percent, sample.state);
//! ```

mod battery;
mod starship;
mod types;

pub use battery::{BatteryInfo, BatteryProvider, HardwareHealth};
pub use starship::StarshipBattery;
pub use types::{ChargeState, RawSample, NO_BATTERY_PERCENT};
