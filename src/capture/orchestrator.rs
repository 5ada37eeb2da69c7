use std::{sync::Arc, time::Duration};

use crate::{
    error::{
        Alert, AlertAction, CaptureError, DeviceError, PermissionError, Result, WorkflowError,
    },
    navigation::{leave_screen, Navigator, Route},
    sensor::SensorInput,
};

use super::{
    device::{Facing, MediaDevice},
    events::{EventSink, SessionEvent},
    frame::{CaptureController, ImageRef},
    permission::{PermissionGate, PermissionState},
    session::{CaptureSession, SessionPhase, SessionSnapshot},
    simulator::{
        AnalysisEvent, AnalysisInput, AnalysisResult, AnalysisSimulator, AnalysisTask,
        DEFAULT_ANALYSIS_DURATION,
    },
    stream::{DeviceStreamManager, StreamHandle},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub type CompletionCallback = Box<dyn FnOnce(AnalysisResult) + Send>;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub facing: Facing,
    pub analysis_duration: Duration,
    pub ready_timeout: Option<Duration>,
    pub completion_route: Route,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Back,
            analysis_duration: DEFAULT_ANALYSIS_DURATION,
            ready_timeout: None,
            completion_route: Route::CropRecommendation,
        }
    }
}

/// Drives one capture session from screen entry to the hand-off at
/// `Complete`.
///
/// All transitions go through `&mut self`; the only concurrent piece is the
/// analysis timer, which lives in its own task and is cancelled on teardown.
/// Dropping the orchestrator tears the session down.
pub struct SessionOrchestrator {
    session: CaptureSession,
    gate: PermissionGate,
    streams: DeviceStreamManager,
    capture: CaptureController,
    simulator: AnalysisSimulator,
    stream: Option<StreamHandle>,
    analysis: Option<AnalysisTask>,
    last_error: Option<DeviceError>,
    navigator: Arc<dyn Navigator>,
    events: Arc<dyn EventSink>,
    on_complete: Option<CompletionCallback>,
    completion_route: Route,
}

impl SessionOrchestrator {
    pub fn new(
        device: Arc<dyn MediaDevice>,
        navigator: Arc<dyn Navigator>,
        events: Arc<dyn EventSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            session: CaptureSession::new(config.facing),
            gate: PermissionGate::new(Arc::clone(&device)),
            streams: DeviceStreamManager::new(Arc::clone(&device))
                .with_ready_timeout(config.ready_timeout),
            capture: CaptureController::new(device),
            simulator: AnalysisSimulator::new(config.analysis_duration),
            stream: None,
            analysis: None,
            last_error: None,
            navigator,
            events,
            on_complete: None,
            completion_route: config.completion_route,
        }
    }

    /// Replace the default hand-off (pushing the completion route).
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(AnalysisResult) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn permission(&self) -> PermissionState {
        self.gate.state()
    }

    pub fn retained_image(&self) -> Option<&ImageRef> {
        self.session.retained_image.as_ref()
    }

    pub fn open_handles(&self) -> usize {
        self.streams.open_handles()
    }

    pub fn is_ready(&self) -> bool {
        self.stream.as_ref().is_some_and(StreamHandle::is_ready)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(&self.session, self.gate.state(), self.is_ready())
    }

    /// Dialog for the current phase: the denial prompt, or the
    /// retake/use-image confirmation after a capture.
    pub fn alert(&self) -> Option<Alert> {
        match self.session.phase {
            SessionPhase::PermissionDenied(reason) => Some(match &self.last_error {
                Some(err) => Alert::retry_or_back("Camera Error", err.user_message()),
                None => Alert::retry_or_back("Camera Permission Required", reason.user_message()),
            }),
            SessionPhase::Captured => Some(Alert::new(
                "Image Captured",
                "Image has been captured successfully!",
                vec![AlertAction::Retake, AlertAction::UseImage],
            )),
            _ => None,
        }
    }

    /// Screen entry: request permission and open the preview stream.
    pub async fn enter(&mut self) -> Result<SessionPhase> {
        self.ensure("enter", |phase| matches!(phase, SessionPhase::Idle))?;
        self.set_phase(SessionPhase::RequestingPermission);
        let state = self.gate.request_access().await;
        self.after_permission(state).await
    }

    /// Leave the denied state and run the permission request again.
    pub async fn retry(&mut self) -> Result<SessionPhase> {
        self.ensure("retry", |phase| {
            matches!(phase, SessionPhase::PermissionDenied(_))
        })?;
        self.last_error = None;
        self.set_phase(SessionPhase::RequestingPermission);
        let state = self.gate.retry().await;
        self.after_permission(state).await
    }

    async fn after_permission(&mut self, state: PermissionState) -> Result<SessionPhase> {
        match state {
            PermissionState::Granted => self.open_stream(self.session.facing).await,
            PermissionState::Denied(reason) => {
                self.set_phase(SessionPhase::PermissionDenied(reason));
                self.raise_alert();
                Ok(self.session.phase)
            }
            PermissionState::Unrequested | PermissionState::Pending => {
                log_warn!("Permission request returned without a decision: {:?}", state);
                Ok(self.session.phase)
            }
        }
    }

    async fn open_stream(&mut self, facing: Facing) -> Result<SessionPhase> {
        self.set_phase(SessionPhase::StreamOpening);
        match self.streams.open(facing).await {
            Ok(handle) => {
                self.session.facing = handle.facing();
                self.stream = Some(handle);
                self.refresh_ready();
                Ok(self.session.phase)
            }
            Err(err) => {
                self.session.facing = facing;
                self.fail_stream(err)
            }
        }
    }

    fn fail_stream(&mut self, err: DeviceError) -> Result<SessionPhase> {
        self.stream = None;
        self.streams.close_active();
        self.last_error = Some(err.clone());
        self.set_phase(SessionPhase::PermissionDenied(err.denial_reason()));
        self.raise_alert();
        Err(err.into())
    }

    /// Promote `StreamOpening` to `StreamReady` if the device has delivered a
    /// frame. Returns the current readiness.
    fn refresh_ready(&mut self) -> bool {
        let ready = self.is_ready();
        if ready && self.session.phase == SessionPhase::StreamOpening {
            self.set_phase(SessionPhase::StreamReady);
        }
        ready
    }

    pub async fn wait_until_ready(&mut self) -> Result<SessionPhase> {
        self.ensure("wait for the camera", |phase| {
            matches!(phase, SessionPhase::StreamOpening | SessionPhase::StreamReady)
        })?;
        if self.refresh_ready() {
            return Ok(self.session.phase);
        }

        let Some(handle) = self.stream.clone() else {
            return self.invalid("wait for the camera");
        };

        match self.streams.wait_ready(&handle).await {
            Ok(()) => {
                self.refresh_ready();
                Ok(self.session.phase)
            }
            Err(err) => self.fail_stream(err),
        }
    }

    /// Freeze a frame. While the stream is still warming up this does
    /// nothing and returns `Ok(None)`.
    pub async fn capture(&mut self) -> Result<Option<ImageRef>> {
        self.ensure("capture", |phase| {
            matches!(phase, SessionPhase::StreamOpening | SessionPhase::StreamReady)
        })?;
        if !self.refresh_ready() {
            log_debug!("Capture ignored: stream not ready");
            return Ok(None);
        }
        let Some(handle) = self.stream.clone() else {
            return self.invalid("capture");
        };

        self.set_phase(SessionPhase::Capturing);
        match self
            .capture
            .capture(&handle, self.streams.flash_enabled())
            .await
        {
            Ok(image) => {
                self.session.retained_image = Some(image.clone());
                self.set_phase(SessionPhase::Captured);
                Ok(Some(image))
            }
            Err(CaptureError::NotReady) => {
                self.set_phase(SessionPhase::StreamOpening);
                Ok(None)
            }
            Err(err) => {
                log_warn!("Capture failed: {}", err);
                self.set_phase(SessionPhase::StreamReady);
                let err = WorkflowError::from(err);
                self.events.emit(SessionEvent::AlertRaised {
                    session_id: self.session.id,
                    alert: err.alert(),
                });
                Err(err)
            }
        }
    }

    /// Discard the captured frame and go back to the live preview.
    pub fn retake(&mut self) -> Result<SessionPhase> {
        self.ensure("retake", |phase| matches!(phase, SessionPhase::Captured))?;
        if let Some(image) = self.session.retained_image.take() {
            log_debug!("Discarding capture {}", image.id());
        }
        self.set_phase(SessionPhase::StreamReady);
        self.refresh_ready();
        Ok(self.session.phase)
    }

    pub async fn switch_facing(&mut self) -> Result<SessionPhase> {
        self.ensure("switch camera", |phase| {
            matches!(phase, SessionPhase::StreamOpening | SessionPhase::StreamReady)
        })?;
        let Some(handle) = self.stream.take() else {
            return self.invalid("switch camera");
        };

        self.set_phase(SessionPhase::StreamOpening);
        match self.streams.switch_facing(&handle).await {
            Ok(next) => {
                log_info!("Switched to {} camera", next.facing().as_str());
                self.session.facing = next.facing();
                self.stream = Some(next);
                self.refresh_ready();
                Ok(self.session.phase)
            }
            Err(err) => {
                self.session.facing = handle.facing().flipped();
                self.fail_stream(err)
            }
        }
    }

    pub fn toggle_flash(&mut self) -> Result<bool> {
        let Some(handle) = self.stream.as_ref() else {
            return self.invalid("toggle flash");
        };
        let enabled = self.streams.toggle_flash(handle)?;
        self.session.flash_enabled = enabled;
        self.emit_phase();
        Ok(enabled)
    }

    /// Hand the captured frame to the simulator. The preview stream is no
    /// longer needed and is released here.
    pub fn analyze(&mut self) -> Result<SessionPhase> {
        self.ensure("analyze", |phase| matches!(phase, SessionPhase::Captured))?;
        let Some(image) = self.session.retained_image.clone() else {
            return self.invalid("analyze");
        };
        self.release_stream();
        self.start_analysis(AnalysisInput::Camera(image))
    }

    /// Sensor-entry variant: no camera involved, straight from `Idle`.
    pub fn analyze_readings(&mut self, input: SensorInput) -> Result<SessionPhase> {
        self.ensure("analyze readings", |phase| matches!(phase, SessionPhase::Idle))?;
        self.start_analysis(AnalysisInput::Sensor(input))
    }

    fn start_analysis(&mut self, input: AnalysisInput) -> Result<SessionPhase> {
        self.session.method = Some(input.method());
        self.analysis = Some(self.simulator.run(input));
        self.set_phase(SessionPhase::Analyzing);
        Ok(self.session.phase)
    }

    /// Play the progress sequence to the end, then hand off.
    pub async fn run_to_completion(&mut self) -> Result<AnalysisResult> {
        self.ensure("finish analysis", |phase| {
            matches!(phase, SessionPhase::Analyzing)
        })?;

        let session_id = self.session.id;
        let events = Arc::clone(&self.events);
        let Some(task) = self.analysis.as_mut() else {
            return self.invalid("finish analysis");
        };

        let result = loop {
            match task.next_event().await {
                Some(AnalysisEvent::Step(step)) => {
                    events.emit(SessionEvent::AnalysisProgress { session_id, step });
                }
                Some(AnalysisEvent::Complete(result)) => break result,
                None => return Err(WorkflowError::Cancelled),
            }
        };

        self.analysis = None;
        self.set_phase(SessionPhase::Complete);
        if let Some(method) = self.session.method {
            self.events.emit(SessionEvent::AnalysisCompleted { session_id, method });
        }

        match self.on_complete.take() {
            Some(callback) => callback(result),
            None => self.navigator.push(self.completion_route),
        }
        Ok(result)
    }

    /// Release everything the session holds: cancel the timer, close the
    /// stream, drop the captured frame.
    pub fn teardown(&mut self) {
        if let Some(mut task) = self.analysis.take() {
            task.cancel();
        }
        self.release_stream();
        self.session.retained_image = None;
        if self.session.phase != SessionPhase::Closed {
            self.set_phase(SessionPhase::Closed);
        }
    }

    /// User-initiated exit: tear down, then navigate back.
    pub fn exit(&mut self) {
        self.teardown();
        leave_screen(self.navigator.as_ref());
    }

    fn release_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            self.streams.close(&handle);
        }
        self.streams.close_active();
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        log_debug!(
            "Session {}: {} -> {}",
            self.session.id,
            self.session.phase,
            phase
        );
        self.session.phase = phase;
        self.emit_phase();
    }

    fn emit_phase(&self) {
        self.events.emit(SessionEvent::PhaseChanged {
            snapshot: self.snapshot(),
        });
    }

    fn raise_alert(&self) {
        if let Some(alert) = self.alert() {
            self.events.emit(SessionEvent::AlertRaised {
                session_id: self.session.id,
                alert,
            });
        }
    }

    fn ensure(&self, action: &'static str, allowed: impl Fn(&SessionPhase) -> bool) -> Result<()> {
        if allowed(&self.session.phase) {
            Ok(())
        } else {
            self.invalid(action)
        }
    }

    /// Rejection for an action the current phase does not allow. While
    /// denied, the denial itself is reported.
    fn invalid<T>(&self, action: &'static str) -> Result<T> {
        if let SessionPhase::PermissionDenied(reason) = self.session.phase {
            return Err(match &self.last_error {
                Some(err) => err.clone().into(),
                None => PermissionError::Denied(reason).into(),
            });
        }
        Err(WorkflowError::InvalidState {
            action,
            phase: self.session.phase.to_string(),
        })
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use super::*;
    use crate::capture::{
        device::{PlatformError, SyntheticCamera},
        events::{ChannelSink, LogSink},
        permission::DenialReason,
        simulator::ANALYSIS_STEPS,
    };
    use crate::navigation::RouteStack;
    use crate::sensor::SensorForm;

    struct Harness {
        device: Arc<SyntheticCamera>,
        navigator: Arc<RouteStack>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        orchestrator: SessionOrchestrator,
    }

    fn harness(device: SyntheticCamera) -> Harness {
        let device = Arc::new(device.with_frame_size(16, 12));
        let navigator = Arc::new(RouteStack::new(Route::MethodSelection));
        navigator.push(Route::Camera);
        let (sink, events) = ChannelSink::new();
        let orchestrator = SessionOrchestrator::new(
            device.clone(),
            navigator.clone(),
            Arc::new(sink),
            OrchestratorConfig::default(),
        );
        Harness {
            device,
            navigator,
            events,
            orchestrator,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn sensor_input() -> SensorInput {
        SensorForm {
            ph: "6.2".into(),
            moisture: "55".into(),
            temperature: "27".into(),
            nitrogen: "40".into(),
            phosphorus: "22".into(),
            potassium: "31".into(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn camera_workflow_reaches_recommendations() {
        let mut h = harness(SyntheticCamera::new().with_warmup(Duration::from_millis(200)));

        assert_eq!(h.orchestrator.enter().await.unwrap(), SessionPhase::StreamOpening);
        assert_eq!(h.orchestrator.wait_until_ready().await.unwrap(), SessionPhase::StreamReady);

        let image = h.orchestrator.capture().await.unwrap().unwrap();
        assert_eq!(h.orchestrator.phase(), SessionPhase::Captured);
        assert_eq!(h.orchestrator.retained_image(), Some(&image));
        assert_eq!(
            h.orchestrator.alert().unwrap().actions,
            vec![AlertAction::Retake, AlertAction::UseImage]
        );

        h.orchestrator.analyze().unwrap();
        assert_eq!(h.orchestrator.open_handles(), 0);
        assert_eq!(h.device.active_streams(), 0);

        h.orchestrator.run_to_completion().await.unwrap();
        assert_eq!(h.orchestrator.phase(), SessionPhase::Complete);
        assert_eq!(h.navigator.current(), Some(Route::CropRecommendation));

        let progress: Vec<String> = drain(&mut h.events)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::AnalysisProgress { step, .. } => Some(step.label),
                _ => None,
            })
            .collect();
        assert_eq!(progress, ANALYSIS_STEPS);
    }

    #[tokio::test(start_paused = true)]
    async fn capture_before_ready_is_a_silent_no_op() {
        let mut h = harness(SyntheticCamera::new().with_warmup(Duration::from_millis(500)));
        h.orchestrator.enter().await.unwrap();

        assert_eq!(h.orchestrator.capture().await.unwrap(), None);
        assert_eq!(h.orchestrator.phase(), SessionPhase::StreamOpening);
        assert!(h.orchestrator.retained_image().is_none());

        h.orchestrator.wait_until_ready().await.unwrap();
        assert!(h.orchestrator.capture().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn retake_discards_previous_capture() {
        let mut h = harness(SyntheticCamera::new());
        h.orchestrator.enter().await.unwrap();

        let first = h.orchestrator.capture().await.unwrap().unwrap();
        assert_eq!(h.orchestrator.retake().unwrap(), SessionPhase::StreamReady);
        assert!(h.orchestrator.retained_image().is_none());

        let second = h.orchestrator.capture().await.unwrap().unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(h.orchestrator.retained_image(), Some(&second));
        assert_eq!(h.device.active_streams(), 1);
    }

    #[tokio::test]
    async fn denied_permission_offers_retry_that_can_grant() {
        let device = SyntheticCamera::new();
        device.script_permission(Err(PlatformError::new("NotAllowedError", "Permission denied")));
        let mut h = harness(device);

        let phase = h.orchestrator.enter().await.unwrap();
        assert_eq!(phase, SessionPhase::PermissionDenied(DenialReason::AccessDenied));
        assert_eq!(h.orchestrator.open_handles(), 0);

        let alert = h.orchestrator.alert().unwrap();
        assert_eq!(alert.actions, vec![AlertAction::Retry, AlertAction::Back]);
        assert!(drain(&mut h.events)
            .iter()
            .any(|event| matches!(event, SessionEvent::AlertRaised { .. })));

        assert!(matches!(
            h.orchestrator.capture().await,
            Err(WorkflowError::Permission(PermissionError::Denied(DenialReason::AccessDenied)))
        ));

        assert_eq!(h.orchestrator.retry().await.unwrap(), SessionPhase::StreamReady);
        assert_eq!(h.orchestrator.permission(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn stream_failure_lands_in_retryable_denied_state() {
        let device = SyntheticCamera::new();
        device.script_open(Err(PlatformError::new("NotReadableError", "in use")));
        let mut h = harness(device);

        let err = h.orchestrator.enter().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Device(DeviceError::DeviceBusy)));
        assert_eq!(
            h.orchestrator.phase(),
            SessionPhase::PermissionDenied(DenialReason::DeviceBusy)
        );
        assert_eq!(
            h.orchestrator.alert().unwrap().message,
            DeviceError::DeviceBusy.user_message()
        );

        assert_eq!(h.orchestrator.retry().await.unwrap(), SessionPhase::StreamReady);
        assert_eq!(h.device.active_streams(), 1);
    }

    #[tokio::test]
    async fn switching_camera_never_holds_two_streams() {
        let mut h = harness(SyntheticCamera::new());
        h.orchestrator.enter().await.unwrap();
        assert_eq!(h.orchestrator.session().facing, Facing::Back);

        h.orchestrator.switch_facing().await.unwrap();
        assert_eq!(h.orchestrator.session().facing, Facing::Front);
        assert_eq!(h.device.active_streams(), 1);

        h.device
            .script_open(Err(PlatformError::new("NotFoundError", "no back camera")));
        let err = h.orchestrator.switch_facing().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Device(DeviceError::DeviceNotFound)));
        assert_eq!(h.device.active_streams(), 0);
        assert_eq!(h.orchestrator.open_handles(), 0);
        assert_eq!(h.device.opened_count(), h.device.closed_count());
    }

    #[tokio::test]
    async fn flash_toggles_while_streaming() {
        let mut h = harness(SyntheticCamera::new());
        assert!(h.orchestrator.toggle_flash().is_err());

        h.orchestrator.enter().await.unwrap();
        assert!(h.orchestrator.toggle_flash().unwrap());
        assert!(h.orchestrator.session().flash_enabled);

        let image = h.orchestrator.capture().await.unwrap().unwrap();
        assert!(image.flash());
    }

    #[tokio::test(start_paused = true)]
    async fn exit_mid_analysis_releases_everything() {
        let mut h = harness(SyntheticCamera::new());
        h.orchestrator.enter().await.unwrap();
        h.orchestrator.capture().await.unwrap();
        h.orchestrator.analyze().unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        h.orchestrator.exit();
        drain(&mut h.events);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut h.events).is_empty());
        assert_eq!(h.orchestrator.phase(), SessionPhase::Closed);
        assert_eq!(h.navigator.current(), Some(Route::MethodSelection));
        assert_eq!(h.device.active_streams(), 0);
        assert_eq!(h.device.stray_close_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_screen_releases_the_stream() {
        let h = harness(SyntheticCamera::new().with_warmup(Duration::from_millis(100)));
        let Harness {
            device,
            navigator,
            mut orchestrator,
            ..
        } = h;

        orchestrator.enter().await.unwrap();
        orchestrator.switch_facing().await.unwrap();
        drop(orchestrator);

        assert_eq!(device.active_streams(), 0);
        assert_eq!(device.opened_count(), 2);
        assert_eq!(device.closed_count(), 2);
        assert_eq!(device.stray_close_count(), 0);
        // Teardown alone does not navigate.
        assert_eq!(navigator.current(), Some(Route::Camera));
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_variant_runs_without_a_camera() {
        let device = Arc::new(SyntheticCamera::new());
        let navigator = Arc::new(RouteStack::new(Route::SensorEntry));
        let completed = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&completed);
        let mut orchestrator = SessionOrchestrator::new(
            device.clone(),
            navigator.clone(),
            Arc::new(LogSink),
            OrchestratorConfig::default(),
        )
        .on_complete(move |result| {
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(result);
            }
        });

        orchestrator.analyze_readings(sensor_input()).unwrap();
        assert_eq!(orchestrator.open_handles(), 0);
        orchestrator.run_to_completion().await.unwrap();

        assert_eq!(orchestrator.phase(), SessionPhase::Complete);
        assert_eq!(*completed.lock().unwrap(), Some(AnalysisResult));
        // The callback replaced the default navigation.
        assert_eq!(navigator.current(), Some(Route::SensorEntry));
        assert_eq!(device.opened_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_variant_defaults_to_recommendations() {
        let navigator = Arc::new(RouteStack::new(Route::SensorEntry));
        let mut orchestrator = SessionOrchestrator::new(
            Arc::new(SyntheticCamera::new()),
            navigator.clone(),
            Arc::new(LogSink),
            OrchestratorConfig::default(),
        );

        orchestrator.analyze_readings(sensor_input()).unwrap();
        orchestrator.run_to_completion().await.unwrap();
        assert_eq!(navigator.current(), Some(Route::CropRecommendation));
    }

    #[tokio::test]
    async fn out_of_order_actions_are_rejected() {
        let mut h = harness(SyntheticCamera::new());
        assert!(matches!(
            h.orchestrator.retake(),
            Err(WorkflowError::InvalidState { action: "retake", .. })
        ));
        assert!(h.orchestrator.analyze().is_err());
        assert!(h.orchestrator.run_to_completion().await.is_err());

        h.orchestrator.enter().await.unwrap();
        assert!(h.orchestrator.enter().await.is_err());
        assert!(h.orchestrator.analyze_readings(sensor_input()).is_err());
    }
}
