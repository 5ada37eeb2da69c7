use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::capture::permission::DenialReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("camera permission denied: {0}")]
    Denied(DenialReason),
}

impl PermissionError {
    pub fn reason(&self) -> DenialReason {
        match self {
            PermissionError::Denied(reason) => *reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera found")]
    DeviceNotFound,

    #[error("camera already in use")]
    DeviceBusy,

    #[error("camera not supported on this platform")]
    Unsupported,

    #[error("stream {0} is not open")]
    StreamClosed(u64),

    #[error("stream did not become ready within {0}ms")]
    ReadyTimeout(u64),

    #[error("device I/O error: {0}")]
    Io(String),
}

impl DeviceError {
    /// Message shown in the blocking alert. Each open failure gets its own text.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => {
                "Camera permission denied. Please allow camera access in your settings.".into()
            }
            DeviceError::DeviceNotFound => "No camera found on your device.".into(),
            DeviceError::DeviceBusy => {
                "Camera is already in use by another application.".into()
            }
            DeviceError::Unsupported => "Camera not supported on this platform.".into(),
            DeviceError::StreamClosed(_) => "The camera stream was closed.".into(),
            DeviceError::ReadyTimeout(_) => {
                "The camera took too long to start. Please try again.".into()
            }
            DeviceError::Io(detail) => format!("Camera error: {detail}"),
        }
    }

    /// Classification used when an open failure sends the session back to the
    /// denied state. Generic I/O counts as a busy device, the same bucket the
    /// platform uses for unreadable hardware.
    pub fn denial_reason(&self) -> DenialReason {
        match self {
            DeviceError::PermissionDenied => DenialReason::AccessDenied,
            DeviceError::DeviceNotFound => DenialReason::NoDevice,
            DeviceError::Unsupported => DenialReason::UnsupportedPlatform,
            DeviceError::DeviceBusy
            | DeviceError::StreamClosed(_)
            | DeviceError::ReadyTimeout(_)
            | DeviceError::Io(_) => DenialReason::DeviceBusy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera not ready")]
    NotReady,

    #[error("frame capture failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed JSON response: {0}")]
    MalformedJson(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("cannot {action} while session is {phase}")]
    InvalidState { action: &'static str, phase: String },

    #[error("analysis was cancelled")]
    Cancelled,
}

impl WorkflowError {
    pub fn alert(&self) -> Alert {
        match self {
            WorkflowError::Permission(err) => Alert::retry_or_back(
                "Camera Permission Required",
                err.reason().user_message(),
            ),
            WorkflowError::Device(err) => Alert::retry_or_back("Camera Error", err.user_message()),
            WorkflowError::Capture(CaptureError::NotReady) => {
                Alert::retry_or_back("Error", "Camera not ready")
            }
            WorkflowError::Capture(CaptureError::Failed(_)) => {
                Alert::retry_or_back("Error", "Failed to capture image. Please try again.")
            }
            WorkflowError::Network(err) => Alert::retry_or_back("Error", err.to_string()),
            WorkflowError::InvalidState { .. } | WorkflowError::Cancelled => {
                Alert::back_only("Error", self.to_string())
            }
        }
    }
}

// Frontend bridges receive errors as plain strings.
impl Serialize for WorkflowError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertAction {
    Retry,
    Back,
    Retake,
    UseImage,
    Continue,
}

/// Blocking dialog payload handed to the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub actions: Vec<AlertAction>,
}

impl Alert {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        actions: Vec<AlertAction>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            actions,
        }
    }

    pub fn retry_or_back(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, vec![AlertAction::Retry, AlertAction::Back])
    }

    pub fn back_only(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, vec![AlertAction::Back])
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failures_have_distinct_messages() {
        let messages = [
            DeviceError::PermissionDenied.user_message(),
            DeviceError::DeviceNotFound.user_message(),
            DeviceError::DeviceBusy.user_message(),
            DeviceError::Unsupported.user_message(),
        ];

        for (i, lhs) in messages.iter().enumerate() {
            for rhs in messages.iter().skip(i + 1) {
                assert_ne!(lhs, rhs);
            }
        }
    }

    #[test]
    fn every_error_offers_a_way_back() {
        let errors = vec![
            WorkflowError::Permission(PermissionError::Denied(DenialReason::AccessDenied)),
            WorkflowError::Device(DeviceError::DeviceBusy),
            WorkflowError::Capture(CaptureError::NotReady),
            WorkflowError::Network(NetworkError::Status {
                status: 502,
                body: "bad gateway".into(),
            }),
            WorkflowError::Cancelled,
        ];

        for err in errors {
            assert!(err.alert().actions.contains(&AlertAction::Back), "{err}");
        }
    }

    #[test]
    fn network_failure_is_surfaced_verbatim() {
        let err = WorkflowError::Network(NetworkError::Request("connection refused".into()));
        let alert = err.alert();
        assert_eq!(alert.message, "request failed: connection refused");
        assert_eq!(alert.actions, vec![AlertAction::Retry, AlertAction::Back]);
    }

    #[test]
    fn workflow_error_serializes_as_string() {
        let err = WorkflowError::Capture(CaptureError::NotReady);
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"camera not ready\""
        );
    }
}
