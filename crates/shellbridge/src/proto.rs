//! Wire protocol between the daemon and the host shell.
//!
//! Newline-delimited JSON on a Unix socket. Requests carry a `method` tag,
//! responses and stream events a `type` tag.

use serde::{Deserialize, Serialize};

use shellbridge_core::{AppDescriptor, BatteryLevel, BridgeError, LaunchOutcome};

/// Methods the host can invoke
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Request {
    GetInstalledApps,
    LaunchApp { package: Option<String> },
    SubscribeBattery,
    UnsubscribeBattery,
}

const METHODS: &[&str] = &[
    "getInstalledApps",
    "launchApp",
    "subscribeBattery",
    "unsubscribeBattery",
];

/// Responses and stream events sent back to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Apps {
        apps: Vec<AppDescriptor>,
    },
    Launch {
        #[serde(flatten)]
        outcome: LaunchOutcome,
    },
    Subscribed,
    Unsubscribed,
    BatteryLevel {
        level: BatteryLevel,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    OperationFailed,
    SubscriptionError,
    BadRequest,
    UnknownMethod,
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    pub fn from_error(err: &BridgeError) -> Self {
        let code = match err {
            BridgeError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            BridgeError::NotFound(_) => ErrorCode::NotFound,
            BridgeError::Subscription(_) => ErrorCode::SubscriptionError,
            BridgeError::OperationFailed(_)
            | BridgeError::Config(_)
            | BridgeError::Io(_) => ErrorCode::OperationFailed,
        };
        Response::error(code, err.to_string())
    }
}

/// Parse one request line, or produce the error response to send back.
///
/// An unrecognized `method` and a malformed line are distinguished so the
/// host can tell "you sent garbage" from "this daemon doesn't do that".
pub fn parse_request(line: &str) -> Result<Request, Response> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        Response::error(ErrorCode::BadRequest, format!("Malformed request: {}", e))
    })?;

    match serde_json::from_value::<Request>(value.clone()) {
        Ok(request) => Ok(request),
        Err(e) => match value.get("method").and_then(|m| m.as_str()) {
            Some(method) if !METHODS.contains(&method) => Err(Response::error(
                ErrorCode::UnknownMethod,
                format!("Unknown method '{}'", method),
            )),
            _ => Err(Response::error(
                ErrorCode::BadRequest,
                format!("Malformed request: {}", e),
            )),
        },
    }
}
