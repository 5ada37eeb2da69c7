use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CaptureError;

use super::device::{Facing, MediaDevice};
use super::stream::StreamHandle;

/// A frozen frame. Immutable once created; clones share the same bytes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    id: Uuid,
    #[serde(skip)]
    bytes: Arc<[u8]>,
    mime_type: &'static str,
    facing: Facing,
    flash: bool,
    captured_at: DateTime<Utc>,
}

impl ImageRef {
    fn new(bytes: Vec<u8>, facing: Facing, flash: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: Arc::from(bytes),
            mime_type: "image/jpeg",
            facing,
            flash,
            captured_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn flash(&self) -> bool {
        self.flash
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageRef {}

pub struct CaptureController {
    device: Arc<dyn MediaDevice>,
}

impl CaptureController {
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        Self { device }
    }

    /// Freeze the current frame of a ready stream. Leaves the stream open.
    pub async fn capture(&self, handle: &StreamHandle, flash: bool) -> Result<ImageRef, CaptureError> {
        if !handle.is_ready() {
            return Err(CaptureError::NotReady);
        }

        let bytes = self.device.capture_frame(handle.id()).await?;
        if bytes.is_empty() {
            return Err(CaptureError::Failed("device returned an empty frame".into()));
        }

        let image = ImageRef::new(bytes, handle.facing(), flash);
        log::info!(
            "Captured frame {} ({} bytes) from stream {}",
            image.id,
            image.len(),
            handle.id()
        );
        Ok(image)
    }
}
