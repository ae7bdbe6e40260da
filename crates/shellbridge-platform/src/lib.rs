//! Platform abstraction for the shellbridge daemon.
//!
//! The capability traits ([`AppRegistry`], [`BatterySource`]) keep the
//! host-facing contract testable without a real OS environment; the `linux`
//! module provides the one real implementation per capability.

pub mod notifier;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod linux;

pub use notifier::{BatteryNotifier, NotifierState};
pub use traits::{AppRegistry, BatterySource, ManualBatterySource, Platform};
