use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::device::Facing;
use super::frame::ImageRef;
use super::permission::{DenialReason, PermissionState};
use super::simulator::AnalysisMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "phase", content = "reason")]
pub enum SessionPhase {
    Idle,
    RequestingPermission,
    PermissionDenied(DenialReason),
    StreamOpening,
    StreamReady,
    Capturing,
    Captured,
    Analyzing,
    Complete,
    /// Torn down; the stream and any timer have been released.
    Closed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::RequestingPermission => "requestingPermission",
            SessionPhase::PermissionDenied(_) => "permissionDenied",
            SessionPhase::StreamOpening => "streamOpening",
            SessionPhase::StreamReady => "streamReady",
            SessionPhase::Capturing => "capturing",
            SessionPhase::Captured => "captured",
            SessionPhase::Analyzing => "analyzing",
            SessionPhase::Complete => "complete",
            SessionPhase::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::PermissionDenied(reason) => write!(f, "permissionDenied({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// State of one capture workflow, owned by the screen that opened it.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub facing: Facing,
    pub flash_enabled: bool,
    pub retained_image: Option<ImageRef>,
    pub method: Option<AnalysisMethod>,
    pub opened_at: DateTime<Utc>,
}

impl CaptureSession {
    pub fn new(facing: Facing) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: SessionPhase::Idle,
            facing,
            flash_enabled: false,
            retained_image: None,
            method: None,
            opened_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: &'static str,
    pub reason: Option<DenialReason>,
    pub permission: PermissionState,
    pub facing: Facing,
    pub flash_enabled: bool,
    pub stream_ready: bool,
    pub retained_image: Option<Uuid>,
    pub method: Option<AnalysisMethod>,
}

impl SessionSnapshot {
    pub fn new(session: &CaptureSession, permission: PermissionState, stream_ready: bool) -> Self {
        let reason = match session.phase {
            SessionPhase::PermissionDenied(reason) => Some(reason),
            _ => None,
        };

        Self {
            session_id: session.id,
            phase: session.phase.as_str(),
            reason,
            permission,
            facing: session.facing,
            flash_enabled: session.flash_enabled,
            stream_ready,
            retained_image: session.retained_image.as_ref().map(ImageRef::id),
            method: session.method,
        }
    }
}
