pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use types::{AppDescriptor, AppEntry, BatteryLevel, LaunchOutcome};
