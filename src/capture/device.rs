//! Media-capture capability providers.
//!
//! The rest of the capture workflow only talks to [`MediaDevice`]. Which
//! implementation backs it is decided once at startup by [`select_provider`],
//! so nothing downstream branches on platform capabilities.

use std::{
    collections::HashMap,
    io::Cursor,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};

use crate::error::CaptureError;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub type StreamId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facing {
    Front,
    #[default]
    Back,
}

impl Facing {
    pub fn flipped(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Back => "back",
        }
    }
}

/// Error reported by the platform, identified by its DOM-style name
/// (`NotAllowedError`, `NotFoundError`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub name: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Stream as handed out by the platform. `ready` flips to `true` once the
/// device has delivered its first frame.
#[derive(Debug)]
pub struct RawStream {
    pub id: StreamId,
    pub facing: Facing,
    pub ready: watch::Receiver<bool>,
}

#[async_trait]
pub trait MediaDevice: Send + Sync {
    fn name(&self) -> &'static str;

    async fn request_permission(&self) -> Result<(), PlatformError>;

    async fn open_stream(&self, facing: Facing) -> Result<RawStream, PlatformError>;

    /// Release a stream. Unknown ids are ignored.
    fn close_stream(&self, id: StreamId);

    fn set_torch(&self, id: StreamId, enabled: bool) -> Result<(), PlatformError>;

    /// Encode the current frame as JPEG.
    async fn capture_frame(&self, id: StreamId) -> Result<Vec<u8>, CaptureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraProvider {
    #[default]
    Synthetic,
    Unavailable,
}

impl std::str::FromStr for CameraProvider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(CameraProvider::Synthetic),
            "unavailable" | "none" => Ok(CameraProvider::Unavailable),
            other => Err(anyhow::anyhow!("unknown camera provider '{other}'")),
        }
    }
}

pub fn select_provider(kind: CameraProvider) -> Arc<dyn MediaDevice> {
    log_debug!("Selected camera provider: {:?}", kind);
    match kind {
        CameraProvider::Synthetic => Arc::new(SyntheticCamera::new()),
        CameraProvider::Unavailable => Arc::new(UnavailableCamera),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct SyntheticStream {
    facing: Facing,
    torch: bool,
    ready_tx: Arc<watch::Sender<bool>>,
    warmup: Option<JoinHandle<()>>,
}

/// Software camera producing soil-coloured frames. Permission and open
/// outcomes can be scripted, which is how tests drive the failure paths.
pub struct SyntheticCamera {
    permission_script: Mutex<Vec<Result<(), PlatformError>>>,
    open_script: Mutex<Vec<Result<(), PlatformError>>>,
    warmup: Duration,
    frame_size: (u32, u32),
    next_id: AtomicU64,
    streams: Mutex<HashMap<StreamId, SyntheticStream>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    stray_closes: AtomicUsize,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            permission_script: Mutex::new(Vec::new()),
            open_script: Mutex::new(Vec::new()),
            warmup: Duration::ZERO,
            frame_size: (320, 240),
            next_id: AtomicU64::new(1),
            streams: Mutex::new(HashMap::new()),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            stray_closes: AtomicUsize::new(0),
        }
    }

    /// Delay between opening a stream and its first frame.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width.max(1), height.max(1));
        self
    }

    /// Queue the outcome of the next permission request. Once the queue is
    /// empty every request is granted.
    pub fn script_permission(&self, outcome: Result<(), PlatformError>) {
        lock(&self.permission_script).push(outcome);
    }

    /// Queue the outcome of the next `open_stream` call.
    pub fn script_open(&self, outcome: Result<(), PlatformError>) {
        lock(&self.open_script).push(outcome);
    }

    pub fn active_streams(&self) -> usize {
        lock(&self.streams).len()
    }

    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close calls for ids that were already released.
    pub fn stray_close_count(&self) -> usize {
        self.stray_closes.load(Ordering::SeqCst)
    }

    pub fn torch_enabled(&self, id: StreamId) -> Option<bool> {
        lock(&self.streams).get(&id).map(|stream| stream.torch)
    }

    pub fn stream_facing(&self, id: StreamId) -> Option<Facing> {
        lock(&self.streams).get(&id).map(|stream| stream.facing)
    }

    fn next_scripted(script: &Mutex<Vec<Result<(), PlatformError>>>) -> Result<(), PlatformError> {
        let mut guard = lock(script);
        if guard.is_empty() {
            Ok(())
        } else {
            guard.remove(0)
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevice for SyntheticCamera {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn request_permission(&self) -> Result<(), PlatformError> {
        Self::next_scripted(&self.permission_script)
    }

    async fn open_stream(&self, facing: Facing) -> Result<RawStream, PlatformError> {
        Self::next_scripted(&self.open_script)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (ready_tx, ready_rx) = watch::channel(false);
        let ready_tx = Arc::new(ready_tx);

        let warmup = if self.warmup.is_zero() {
            ready_tx.send_replace(true);
            None
        } else {
            let tx = Arc::clone(&ready_tx);
            let delay = self.warmup;
            Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tx.send_replace(true);
            }))
        };

        lock(&self.streams).insert(
            id,
            SyntheticStream {
                facing,
                torch: false,
                ready_tx,
                warmup,
            },
        );
        self.opened.fetch_add(1, Ordering::SeqCst);
        log_debug!("Synthetic stream {} opened ({})", id, facing.as_str());

        Ok(RawStream {
            id,
            facing,
            ready: ready_rx,
        })
    }

    fn close_stream(&self, id: StreamId) {
        match lock(&self.streams).remove(&id) {
            Some(stream) => {
                if let Some(handle) = stream.warmup {
                    handle.abort();
                }
                self.closed.fetch_add(1, Ordering::SeqCst);
                log_debug!("Synthetic stream {} closed", id);
            }
            None => {
                self.stray_closes.fetch_add(1, Ordering::SeqCst);
                log_warn!("close requested for unknown stream {}", id);
            }
        }
    }

    fn set_torch(&self, id: StreamId, enabled: bool) -> Result<(), PlatformError> {
        let mut streams = lock(&self.streams);
        let stream = streams
            .get_mut(&id)
            .ok_or_else(|| PlatformError::new("InvalidStateError", "stream is not open"))?;
        stream.torch = enabled;
        Ok(())
    }

    async fn capture_frame(&self, id: StreamId) -> Result<Vec<u8>, CaptureError> {
        let (facing, torch) = {
            let streams = lock(&self.streams);
            let stream = streams
                .get(&id)
                .ok_or_else(|| CaptureError::Failed(format!("stream {id} is not open")))?;
            if !*stream.ready_tx.borrow() {
                return Err(CaptureError::NotReady);
            }
            (stream.facing, stream.torch)
        };

        let (width, height) = self.frame_size;
        tokio::task::spawn_blocking(move || render_soil_frame(width, height, facing, torch))
            .await
            .map_err(|err| CaptureError::Failed(format!("frame worker join failed: {err}")))?
    }
}

fn render_soil_frame(
    width: u32,
    height: u32,
    facing: Facing,
    torch: bool,
) -> Result<Vec<u8>, CaptureError> {
    let mut rng = rand::thread_rng();
    let base: [i16; 3] = match facing {
        Facing::Back => [121, 85, 58],
        Facing::Front => [92, 66, 48],
    };
    let boost: i16 = if torch { 40 } else { 0 };

    let frame = RgbImage::from_fn(width, height, |_, _| {
        let grain: i16 = rng.gen_range(-18..=18);
        let channel = |value: i16| (value + grain + boost).clamp(0, 255) as u8;
        Rgb([channel(base[0]), channel(base[1]), channel(base[2])])
    });

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(frame)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|err| CaptureError::Failed(format!("jpeg encoding failed: {err}")))?;
    Ok(buffer.into_inner())
}

/// Provider for platforms without a media-capture API.
pub struct UnavailableCamera;

#[async_trait]
impl MediaDevice for UnavailableCamera {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn request_permission(&self) -> Result<(), PlatformError> {
        Err(PlatformError::new(
            "NotSupportedError",
            "Camera API not supported on this platform",
        ))
    }

    async fn open_stream(&self, _facing: Facing) -> Result<RawStream, PlatformError> {
        Err(PlatformError::new(
            "NotSupportedError",
            "Camera API not supported on this platform",
        ))
    }

    fn close_stream(&self, _id: StreamId) {}

    fn set_torch(&self, _id: StreamId, _enabled: bool) -> Result<(), PlatformError> {
        Err(PlatformError::new("NotSupportedError", "no torch available"))
    }

    async fn capture_frame(&self, _id: StreamId) -> Result<Vec<u8>, CaptureError> {
        Err(CaptureError::Failed("no camera available".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_frames_are_jpeg() {
        let camera = SyntheticCamera::new().with_frame_size(16, 16);
        let stream = camera.open_stream(Facing::Back).await.unwrap();

        let bytes = camera.capture_frame(stream.id).await.unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        camera.close_stream(stream.id);
        assert_eq!(camera.active_streams(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_require_warmup() {
        let camera = SyntheticCamera::new().with_warmup(Duration::from_millis(300));
        let mut stream = camera.open_stream(Facing::Front).await.unwrap();

        assert!(!*stream.ready.borrow());
        assert_eq!(
            camera.capture_frame(stream.id).await,
            Err(CaptureError::NotReady)
        );

        stream.ready.wait_for(|ready| *ready).await.unwrap();
        assert!(camera.capture_frame(stream.id).await.is_ok());
        camera.close_stream(stream.id);
    }

    #[tokio::test]
    async fn scripted_open_failure_is_consumed_once() {
        let camera = SyntheticCamera::new();
        camera.script_open(Err(PlatformError::new("NotReadableError", "busy")));

        let first = camera.open_stream(Facing::Back).await;
        assert_eq!(first.unwrap_err().name, "NotReadableError");

        let second = camera.open_stream(Facing::Back).await.unwrap();
        camera.close_stream(second.id);
        assert_eq!(camera.opened_count(), 1);
        assert_eq!(camera.closed_count(), 1);
    }

    #[tokio::test]
    async fn double_close_is_counted_as_stray() {
        let camera = SyntheticCamera::new();
        let stream = camera.open_stream(Facing::Back).await.unwrap();
        camera.close_stream(stream.id);
        camera.close_stream(stream.id);
        assert_eq!(camera.closed_count(), 1);
        assert_eq!(camera.stray_close_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_provider_rejects_everything() {
        let camera = select_provider(CameraProvider::Unavailable);
        let err = camera.request_permission().await.unwrap_err();
        assert_eq!(err.name, "NotSupportedError");
        assert!(camera.open_stream(Facing::Back).await.is_err());
    }

    #[test]
    fn provider_names_parse() {
        assert_eq!(
            "Synthetic".parse::<CameraProvider>().unwrap(),
            CameraProvider::Synthetic
        );
        assert_eq!(
            "none".parse::<CameraProvider>().unwrap(),
            CameraProvider::Unavailable
        );
        assert!("webcam".parse::<CameraProvider>().is_err());
    }
}
