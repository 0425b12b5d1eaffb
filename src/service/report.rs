//! Reports handed to the web layer
//!
//! These are the bodies of `GET /status` and `POST /feed`. The web layer
//! serializes them as JSON and uses [`FeedReport::http_status`] as the
//! response code.

use serde::Serialize;

use crate::controller::{ConnectionState, DispenseOutcome};

/// Device availability as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: DeviceStatus,
}

impl StatusReport {
    pub fn from_state(state: ConnectionState) -> Self {
        let status = if state.is_connected() {
            DeviceStatus::Online
        } else {
            DeviceStatus::Offline
        };
        Self { status }
    }
}

/// Feed result category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Success,
    Simulated,
    Error,
}

/// Body of `POST /feed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedReport {
    pub status: FeedStatus,
    pub message: String,
}

impl FeedReport {
    /// No hardware attached; nothing was sent
    pub fn simulated() -> Self {
        Self {
            status: FeedStatus::Simulated,
            message: "Feeding simulated (Hardware Offline)".to_string(),
        }
    }

    /// Map a dispense outcome. Only a transport failure is an error.
    pub fn from_outcome(outcome: &DispenseOutcome) -> Self {
        let (status, message) = match outcome {
            DispenseOutcome::Completed { .. } => {
                (FeedStatus::Success, "Feeding complete".to_string())
            }
            DispenseOutcome::TimedOut { .. } => (
                FeedStatus::Success,
                "Feeding initiated (completion not confirmed)".to_string(),
            ),
            DispenseOutcome::NotAcknowledged { .. } => (
                FeedStatus::Success,
                "Feeding initiated (not acknowledged)".to_string(),
            ),
            DispenseOutcome::Offline { reason } => (FeedStatus::Error, reason.clone()),
        };
        Self { status, message }
    }

    /// HTTP status code the web layer should answer with
    pub fn http_status(&self) -> u16 {
        match self.status {
            FeedStatus::Success | FeedStatus::Simulated => 200,
            FeedStatus::Error => 500,
        }
    }
}
