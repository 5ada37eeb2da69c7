use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::watch;

use crate::error::DeviceError;

use super::device::{Facing, MediaDevice, PlatformError, RawStream, StreamId};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamStatus {
    Opening,
    Ready,
}

/// Caller-side view of an open stream. Cheap to clone; all clones refer to
/// the same device stream.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    id: StreamId,
    facing: Facing,
    ready: watch::Receiver<bool>,
}

impl StreamHandle {
    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn status(&self) -> StreamStatus {
        if self.is_ready() {
            StreamStatus::Ready
        } else {
            StreamStatus::Opening
        }
    }
}

impl From<RawStream> for StreamHandle {
    fn from(raw: RawStream) -> Self {
        Self {
            id: raw.id,
            facing: raw.facing,
            ready: raw.ready,
        }
    }
}

fn classify_open_error(err: &PlatformError) -> DeviceError {
    match err.name.as_str() {
        "NotAllowedError" | "SecurityError" => DeviceError::PermissionDenied,
        "NotFoundError" | "OverconstrainedError" => DeviceError::DeviceNotFound,
        "NotReadableError" | "AbortError" => DeviceError::DeviceBusy,
        "NotSupportedError" | "TypeError" => DeviceError::Unsupported,
        _ => DeviceError::Io(err.to_string()),
    }
}

/// Owns the single live stream of a capture session.
///
/// Opening while a stream is held releases the old one first, and dropping
/// the manager releases whatever is still open, so every stream the manager
/// opened is closed exactly once.
pub struct DeviceStreamManager {
    device: Arc<dyn MediaDevice>,
    active: Option<StreamHandle>,
    flash_enabled: bool,
    ready_timeout: Option<Duration>,
}

impl DeviceStreamManager {
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        Self {
            device,
            active: None,
            flash_enabled: false,
            ready_timeout: None,
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn open_handles(&self) -> usize {
        usize::from(self.active.is_some())
    }

    pub fn active(&self) -> Option<&StreamHandle> {
        self.active.as_ref()
    }

    pub fn flash_enabled(&self) -> bool {
        self.flash_enabled
    }

    pub async fn open(&mut self, facing: Facing) -> Result<StreamHandle, DeviceError> {
        if let Some(previous) = self.active.take() {
            log_debug!("Releasing stream {} before opening a new one", previous.id);
            self.device.close_stream(previous.id);
        }

        let raw = self.device.open_stream(facing).await.map_err(|err| {
            let mapped = classify_open_error(&err);
            log_warn!("Opening {} camera failed: {} -> {:?}", facing.as_str(), err, mapped);
            mapped
        })?;

        let handle = StreamHandle::from(raw);
        if self.flash_enabled {
            if let Err(err) = self.device.set_torch(handle.id, true) {
                log_warn!("Could not restore flash on stream {}: {}", handle.id, err);
            }
        }

        log_info!(
            "Opened {} camera stream {} on {}",
            facing.as_str(),
            handle.id,
            self.device.name()
        );
        self.active = Some(handle.clone());
        Ok(handle)
    }

    /// Release `handle`. Closing a stream that is no longer held is a no-op.
    pub fn close(&mut self, handle: &StreamHandle) {
        match &self.active {
            Some(active) if active.id == handle.id => {
                self.device.close_stream(handle.id);
                self.active = None;
                log_debug!("Closed stream {}", handle.id);
            }
            _ => log_debug!("Stream {} already closed", handle.id),
        }
    }

    pub fn close_active(&mut self) {
        if let Some(handle) = self.active.take() {
            self.device.close_stream(handle.id);
            log_debug!("Closed stream {}", handle.id);
        }
    }

    /// Close `handle` and reopen with the other camera. On failure no stream
    /// is held.
    pub async fn switch_facing(&mut self, handle: &StreamHandle) -> Result<StreamHandle, DeviceError> {
        let target = handle.facing.flipped();
        self.close(handle);
        self.close_active();
        self.open(target).await
    }

    pub fn toggle_flash(&mut self, handle: &StreamHandle) -> Result<bool, DeviceError> {
        match &self.active {
            Some(active) if active.id == handle.id => {}
            _ => return Err(DeviceError::StreamClosed(handle.id)),
        }

        let enabled = !self.flash_enabled;
        self.device
            .set_torch(handle.id, enabled)
            .map_err(|err| DeviceError::Io(err.to_string()))?;
        self.flash_enabled = enabled;
        Ok(enabled)
    }

    /// Wait for the device to confirm frame delivery on `handle`.
    pub async fn wait_ready(&self, handle: &StreamHandle) -> Result<(), DeviceError> {
        let mut ready = handle.ready.clone();
        let wait = async move {
            ready
                .wait_for(|ready| *ready)
                .await
                .map(|_| ())
                .map_err(|_| DeviceError::StreamClosed(handle.id))
        };

        match self.ready_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| DeviceError::ReadyTimeout(limit.as_millis() as u64))?,
            None => wait.await,
        }
    }
}

impl Drop for DeviceStreamManager {
    fn drop(&mut self) {
        self.close_active();
    }
}
