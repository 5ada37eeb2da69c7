//! Camera capture workflow: permission, preview stream, still capture and
//! the timed analysis hand-off.

pub mod device;
pub mod events;
pub mod frame;
pub mod orchestrator;
pub mod permission;
pub mod session;
pub mod simulator;
pub mod stream;

pub use device::{select_provider, CameraProvider, Facing, MediaDevice, SyntheticCamera};
pub use events::{ChannelSink, EventSink, LogSink, SessionEvent};
pub use frame::{CaptureController, ImageRef};
pub use orchestrator::{OrchestratorConfig, SessionOrchestrator};
pub use permission::{DenialReason, PermissionGate, PermissionState};
pub use session::{CaptureSession, SessionPhase, SessionSnapshot};
pub use simulator::{AnalysisMethod, AnalysisResult, AnalysisSimulator};
pub use stream::{DeviceStreamManager, StreamHandle};
