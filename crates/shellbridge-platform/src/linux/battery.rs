use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use shellbridge_core::BatteryLevel;

use crate::traits::BatterySource;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// [`BatterySource`] that samples the sysfs battery device.
///
/// A background task reads the device's `capacity` on a fixed interval and
/// broadcasts a reading whenever it changes; a failed read broadcasts
/// `Unknown` (once, on transition). The task stops when the source drops.
pub struct SysfsBatterySource {
    tx: broadcast::Sender<BatteryLevel>,
    poll: JoinHandle<()>,
}

impl SysfsBatterySource {
    /// Must be called from within a tokio runtime
    pub fn new(poll_interval: Duration) -> Self {
        let (tx, _) = broadcast::channel(16);
        let poll = tokio::spawn(poll_loop(tx.clone(), poll_interval));
        Self { tx, poll }
    }
}

impl Drop for SysfsBatterySource {
    fn drop(&mut self) {
        self.poll.abort();
    }
}

impl BatterySource for SysfsBatterySource {
    fn subscribe(&self) -> broadcast::Receiver<BatteryLevel> {
        self.tx.subscribe()
    }
}

async fn poll_loop(tx: broadcast::Sender<BatteryLevel>, poll_interval: Duration) {
    let mut device = find_battery_device(Path::new(POWER_SUPPLY_DIR));
    match &device {
        Some(path) => tracing::info!(device = %path.display(), "watching battery device"),
        None => tracing::warn!("no battery device found, reporting unknown"),
    }

    let mut interval = tokio::time::interval(poll_interval);
    let mut last: Option<BatteryLevel> = None;

    loop {
        interval.tick().await;

        // Batteries can appear after startup (e.g. hotplug); re-probe until
        // one shows up.
        if device.is_none() {
            device = find_battery_device(Path::new(POWER_SUPPLY_DIR));
        }

        let level = match &device {
            Some(path) => read_capacity(path),
            None => BatteryLevel::Unknown,
        };

        if last != Some(level) {
            tracing::debug!(?level, "battery level changed");
            // No subscribers is fine; the event is simply not delivered.
            let _ = tx.send(level);
            last = Some(level);
        }
    }
}

/// Find the first power-supply device of type Battery
fn find_battery_device(supply_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(supply_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if let Ok(kind) = fs::read_to_string(path.join("type")) {
            if kind.trim() == "Battery" {
                return Some(path);
            }
        }
    }
    None
}

fn read_capacity(device: &Path) -> BatteryLevel {
    let raw = match fs::read_to_string(device.join("capacity")) {
        Ok(raw) => raw,
        Err(_) => return BatteryLevel::Unknown,
    };
    match raw.trim().parse::<i32>() {
        Ok(value) => BatteryLevel::from_raw(value),
        Err(_) => BatteryLevel::Unknown,
    }
}
