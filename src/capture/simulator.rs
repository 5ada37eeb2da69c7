//! Timed stand-in for soil analysis.
//!
//! No analysis happens here: the input is carried along untouched while a
//! fixed sequence of progress steps is played out at even intervals.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::sensor::SensorInput;

use super::frame::ImageRef;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub const DEFAULT_ANALYSIS_DURATION: Duration = Duration::from_millis(5000);

pub const ANALYSIS_STEPS: [&str; 5] = [
    "Initializing scanner...",
    "Detecting soil texture...",
    "Analyzing color composition...",
    "Identifying nutrient patterns...",
    "Generating recommendations...",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisMethod {
    Camera,
    Sensor,
}

impl AnalysisMethod {
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisMethod::Camera => "Image Analysis",
            AnalysisMethod::Sensor => "Sensor Data Analysis",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnalysisMethod::Camera => "Analyzing soil composition from image...",
            AnalysisMethod::Sensor => "Processing sensor readings...",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    Camera(ImageRef),
    Sensor(SensorInput),
}

impl AnalysisInput {
    pub fn method(&self) -> AnalysisMethod {
        match self {
            AnalysisInput::Camera(_) => AnalysisMethod::Camera,
            AnalysisInput::Sensor(_) => AnalysisMethod::Sensor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStep {
    pub index: usize,
    pub total: usize,
    pub label: String,
}

/// Success signal. Carries no analysis data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AnalysisEvent {
    Step(ProgressStep),
    Complete(AnalysisResult),
}

#[derive(Debug, Clone)]
pub struct AnalysisSimulator {
    duration: Duration,
    steps: Vec<String>,
}

impl Default for AnalysisSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYSIS_DURATION)
    }
}

impl AnalysisSimulator {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            steps: ANALYSIS_STEPS.iter().map(|step| step.to_string()).collect(),
        }
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Start the progress sequence. Dropping the returned task cancels it.
    pub fn run(&self, input: AnalysisInput) -> AnalysisTask {
        let id = Uuid::new_v4();
        let cancel_token = CancellationToken::new();
        let emitted = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(self.steps.len() + 1);

        log_info!(
            "Analysis {} started ({}, {}ms): {}",
            id,
            input.method().title(),
            self.duration.as_millis(),
            input.method().description()
        );

        let handle = tokio::spawn(progress_loop(
            id,
            self.steps.clone(),
            self.duration,
            tx,
            cancel_token.clone(),
            Arc::clone(&emitted),
        ));

        AnalysisTask {
            id,
            input,
            rx,
            cancel_token,
            handle: Some(handle),
            emitted,
        }
    }
}

async fn progress_loop(
    id: Uuid,
    steps: Vec<String>,
    duration: Duration,
    tx: mpsc::Sender<AnalysisEvent>,
    cancel_token: CancellationToken,
    emitted: Arc<AtomicUsize>,
) {
    let started = Instant::now();
    let total = steps.len();
    let spacing = if total == 0 {
        Duration::ZERO
    } else {
        duration / total as u32
    };

    for (index, label) in steps.into_iter().enumerate() {
        let deadline = started + spacing * index as u32;
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("Analysis {} cancelled before step {}", id, index);
                return;
            }
            _ = time::sleep_until(deadline) => {}
        }

        let event = AnalysisEvent::Step(ProgressStep { index, total, label });
        if tx.send(event).await.is_err() {
            return;
        }
        emitted.fetch_add(1, Ordering::SeqCst);
    }

    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            log_debug!("Analysis {} cancelled before completion", id);
            return;
        }
        _ = time::sleep_until(started + duration) => {}
    }

    if tx.send(AnalysisEvent::Complete(AnalysisResult)).await.is_ok() {
        emitted.fetch_add(1, Ordering::SeqCst);
        log_info!("Analysis {} complete", id);
    }
}

/// Handle to a running progress sequence.
pub struct AnalysisTask {
    id: Uuid,
    input: AnalysisInput,
    rx: mpsc::Receiver<AnalysisEvent>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    emitted: Arc<AtomicUsize>,
}

impl AnalysisTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input(&self) -> &AnalysisInput {
        &self.input
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Events the timer has sent so far.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    /// Next event, or `None` once the sequence is finished or cancelled.
    pub async fn next_event(&mut self) -> Option<AnalysisEvent> {
        if self.cancel_token.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Drain the remaining events and return the result, if the sequence ran
    /// to completion.
    pub async fn wait(mut self) -> Option<AnalysisResult> {
        while let Some(event) = self.next_event().await {
            if let AnalysisEvent::Complete(result) = event {
                return Some(result);
            }
        }
        None
    }

    /// Stop the timer and discard anything still queued.
    pub fn cancel(&mut self) {
        if self.cancel_token.is_cancelled() {
            return;
        }
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        log_debug!("Analysis {} cancelled", self.id);
    }
}

impl Drop for AnalysisTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
