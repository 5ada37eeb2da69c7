use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Alert;

use super::device::{MediaDevice, PlatformError};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    AccessDenied,
    NoDevice,
    UnsupportedPlatform,
    DeviceBusy,
}

impl DenialReason {
    /// Classify a platform error name. Anything unrecognised is treated as a
    /// plain refusal.
    pub fn from_platform_error(name: &str) -> Self {
        match name {
            "NotAllowedError" | "SecurityError" | "PermissionDeniedError" => {
                DenialReason::AccessDenied
            }
            "NotFoundError" | "OverconstrainedError" | "DevicesNotFoundError" => {
                DenialReason::NoDevice
            }
            "NotSupportedError" | "TypeError" => DenialReason::UnsupportedPlatform,
            "NotReadableError" | "AbortError" | "TrackStartError" => DenialReason::DeviceBusy,
            _ => DenialReason::AccessDenied,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::AccessDenied => "access-denied",
            DenialReason::NoDevice => "no-device",
            DenialReason::UnsupportedPlatform => "unsupported-platform",
            DenialReason::DeviceBusy => "device-busy",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            DenialReason::AccessDenied => {
                "Camera permission denied. Please allow camera access in your settings."
            }
            DenialReason::NoDevice => "No camera found on your device.",
            DenialReason::UnsupportedPlatform => "Camera not supported on this platform.",
            DenialReason::DeviceBusy => "Camera is already in use by another application.",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "reason")]
pub enum PermissionState {
    #[default]
    Unrequested,
    Pending,
    Granted,
    Denied(DenialReason),
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

pub struct PermissionGate {
    device: Arc<dyn MediaDevice>,
    state: PermissionState,
    attempts: u32,
}

impl PermissionGate {
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        Self {
            device,
            state: PermissionState::Unrequested,
            attempts: 0,
        }
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Ask the platform for camera access. A decision already taken is
    /// returned as-is; leaving the denied state requires [`retry`](Self::retry).
    pub async fn request_access(&mut self) -> PermissionState {
        match self.state {
            PermissionState::Granted | PermissionState::Denied(_) => self.state,
            PermissionState::Unrequested | PermissionState::Pending => self.run_request().await,
        }
    }

    pub async fn retry(&mut self) -> PermissionState {
        log_info!("Retrying camera permission request");
        self.state = PermissionState::Pending;
        self.run_request().await
    }

    /// Dialog to show while access is denied.
    pub fn prompt(&self) -> Option<Alert> {
        match self.state {
            PermissionState::Denied(reason) => Some(Alert::retry_or_back(
                "Camera Permission Required",
                reason.user_message(),
            )),
            _ => None,
        }
    }

    async fn run_request(&mut self) -> PermissionState {
        self.state = PermissionState::Pending;
        self.attempts += 1;

        self.state = match self.device.request_permission().await {
            Ok(()) => PermissionState::Granted,
            Err(PlatformError { name, message }) => {
                let reason = DenialReason::from_platform_error(&name);
                log_warn!(
                    "Camera permission denied by {} ({}: {}) -> {}",
                    self.device.name(),
                    name,
                    message,
                    reason
                );
                PermissionState::Denied(reason)
            }
        };

        self.state
    }
}
