use std::sync::Arc;

use tokio::sync::broadcast;

use shellbridge_core::{AppDescriptor, BatteryLevel, BridgeResult, Config, LaunchOutcome};

/// Enumerate and launch installed applications
pub trait AppRegistry: Send + Sync {
    /// List applications that expose a user-facing launch entry point.
    ///
    /// The snapshot is produced fresh per call; an empty list is a valid
    /// answer, a failed OS query is not silently one.
    fn list_apps(&self) -> BridgeResult<Vec<AppDescriptor>>;

    /// Ask the OS to bring the named application to the foreground.
    ///
    /// Absence of the target and failure of the launch attempt are both
    /// normal outcomes, reported through [`LaunchOutcome`]. The `Err`
    /// channel is reserved for faults in the registry itself.
    fn launch(&self, id: &str) -> BridgeResult<LaunchOutcome>;
}

/// A fan-out source of battery-level change events
pub trait BatterySource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<BatteryLevel>;
}

/// A [`BatterySource`] driven by explicit pushes.
///
/// Stands in for the OS battery device where none is wanted: unit tests and
/// embedders that feed readings from elsewhere.
pub struct ManualBatterySource {
    tx: broadcast::Sender<BatteryLevel>,
}

impl ManualBatterySource {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Emit one reading to all current subscribers
    pub fn push(&self, level: BatteryLevel) {
        // No subscribers is fine; the event is simply not delivered.
        let _ = self.tx.send(level);
    }
}

impl Default for ManualBatterySource {
    fn default() -> Self {
        Self::new()
    }
}

impl BatterySource for ManualBatterySource {
    fn subscribe(&self) -> broadcast::Receiver<BatteryLevel> {
        self.tx.subscribe()
    }
}

/// Aggregate struct holding the platform implementations used by the daemon
pub struct Platform {
    pub registry: Arc<dyn AppRegistry>,
    pub battery: Arc<dyn BatterySource>,
}

impl Platform {
    /// Create a Platform instance with OS-appropriate implementations.
    ///
    /// Must be called from within a tokio runtime; the battery poller is
    /// spawned on it.
    pub fn current(config: &Config) -> Self {
        #[cfg(target_os = "linux")]
        {
            crate::linux::create_platform(config)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = config;
            compile_error!("shellbridge only has a Linux platform backend")
        }
    }
}
