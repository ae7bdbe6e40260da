use serde::{Deserialize, Serialize};

/// Snapshot of a launchable application as the host shell sees it.
///
/// Produced fresh on every enumeration; `id` is unique within one result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Unique identifier (desktop-entry file stem on Linux)
    #[serde(rename = "packageName")]
    pub id: String,
    /// Display name of the application
    #[serde(rename = "appName")]
    pub name: String,
}

/// Full application record kept by the registry.
///
/// The host only ever receives the [`AppDescriptor`] projection; the extra
/// fields are what the registry needs to actually launch the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEntry {
    pub id: String,
    pub name: String,
    /// Command to execute the application
    pub exec: String,
    pub icon: Option<String>,
    pub description: Option<String>,
}

impl AppEntry {
    pub fn descriptor(&self) -> AppDescriptor {
        AppDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// One battery reading. Wire form is a plain integer, `-1` for unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum BatteryLevel {
    /// Charge percentage in [0, 100]
    Percent(u8),
    /// The OS did not report a usable level
    Unknown,
}

impl BatteryLevel {
    /// Decode a raw OS reading. Anything outside [0, 100] maps to `Unknown`,
    /// so the stream never carries a negative value other than the sentinel.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0..=100 => BatteryLevel::Percent(raw as u8),
            _ => BatteryLevel::Unknown,
        }
    }
}

impl From<BatteryLevel> for i32 {
    fn from(level: BatteryLevel) -> i32 {
        match level {
            BatteryLevel::Percent(p) => i32::from(p),
            BatteryLevel::Unknown => -1,
        }
    }
}

impl From<i32> for BatteryLevel {
    fn from(raw: i32) -> Self {
        BatteryLevel::from_raw(raw)
    }
}

/// Outcome of a launch request.
///
/// `NotFound` is a normal result, not an error: the host must be able to
/// tell "no such app" apart from "the launch itself blew up" without string
/// matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LaunchOutcome {
    Launched,
    NotFound,
    Failed { reason: String },
}

impl LaunchOutcome {
    pub fn is_launched(&self) -> bool {
        matches!(self, LaunchOutcome::Launched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_level_decodes_valid_range() {
        assert_eq!(BatteryLevel::from_raw(0), BatteryLevel::Percent(0));
        assert_eq!(BatteryLevel::from_raw(42), BatteryLevel::Percent(42));
        assert_eq!(BatteryLevel::from_raw(100), BatteryLevel::Percent(100));
    }

    #[test]
    fn battery_level_out_of_range_is_unknown() {
        assert_eq!(BatteryLevel::from_raw(-1), BatteryLevel::Unknown);
        assert_eq!(BatteryLevel::from_raw(-42), BatteryLevel::Unknown);
        assert_eq!(BatteryLevel::from_raw(101), BatteryLevel::Unknown);
        assert_eq!(BatteryLevel::from_raw(i32::MAX), BatteryLevel::Unknown);
    }

    #[test]
    fn battery_level_wire_form_is_plain_integer() {
        assert_eq!(
            serde_json::to_string(&BatteryLevel::Percent(87)).unwrap(),
            "87"
        );
        assert_eq!(serde_json::to_string(&BatteryLevel::Unknown).unwrap(), "-1");

        let level: BatteryLevel = serde_json::from_str("42").unwrap();
        assert_eq!(level, BatteryLevel::Percent(42));
        let level: BatteryLevel = serde_json::from_str("-7").unwrap();
        assert_eq!(level, BatteryLevel::Unknown);
    }

    #[test]
    fn descriptor_uses_host_field_names() {
        let desc = AppDescriptor {
            id: "org.mozilla.firefox".to_string(),
            name: "Firefox".to_string(),
        };
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("\"packageName\":\"org.mozilla.firefox\""));
        assert!(json.contains("\"appName\":\"Firefox\""));
    }

    #[test]
    fn launch_outcome_is_status_tagged() {
        assert_eq!(
            serde_json::to_string(&LaunchOutcome::Launched).unwrap(),
            r#"{"status":"launched"}"#
        );
        assert_eq!(
            serde_json::to_string(&LaunchOutcome::NotFound).unwrap(),
            r#"{"status":"notFound"}"#
        );
        let failed = LaunchOutcome::Failed {
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"status":"failed","reason":"permission denied"}"#
        );
    }
}
