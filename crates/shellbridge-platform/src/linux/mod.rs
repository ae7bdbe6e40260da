mod app_registry;
mod battery;

use std::sync::Arc;
use std::time::Duration;

use shellbridge_core::Config;

use crate::traits::Platform;

pub use app_registry::DesktopAppRegistry;
pub use battery::SysfsBatterySource;

pub fn create_platform(config: &Config) -> Platform {
    Platform {
        registry: Arc::new(DesktopAppRegistry::new(&config.extra_app_dirs())),
        battery: Arc::new(SysfsBatterySource::new(Duration::from_millis(
            config.battery.poll_interval_ms,
        ))),
    }
}
