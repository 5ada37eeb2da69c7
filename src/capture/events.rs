//! Session events pushed to the view layer.

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Alert;

use super::session::SessionSnapshot;
use super::simulator::{AnalysisMethod, ProgressStep};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    PhaseChanged { snapshot: SessionSnapshot },
    #[serde(rename_all = "camelCase")]
    AnalysisProgress { session_id: Uuid, step: ProgressStep },
    #[serde(rename_all = "camelCase")]
    AnalysisCompleted {
        session_id: Uuid,
        method: AnalysisMethod,
    },
    #[serde(rename_all = "camelCase")]
    AlertRaised { session_id: Uuid, alert: Alert },
}

impl SessionEvent {
    /// Channel name used by frontend bridges.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PhaseChanged { .. } => "capture-session-changed",
            SessionEvent::AnalysisProgress { .. } => "analysis-progress",
            SessionEvent::AnalysisCompleted { .. } => "analysis-completed",
            SessionEvent::AlertRaised { .. } => "capture-alert",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Writes events to the log. Used when no view layer is attached.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SessionEvent) {
        match &event {
            SessionEvent::PhaseChanged { snapshot } => {
                log::debug!("session {} -> {}", snapshot.session_id, snapshot.phase)
            }
            SessionEvent::AnalysisProgress { step, .. } => {
                log::info!("[{}/{}] {}", step.index + 1, step.total, step.label)
            }
            SessionEvent::AnalysisCompleted { session_id, method } => {
                log::info!("session {} finished {}", session_id, method.title())
            }
            SessionEvent::AlertRaised { alert, .. } => {
                log::warn!("{}: {}", alert.title, alert.message)
            }
        }
    }
}

/// Forwards events into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(feature = "tauri")]
impl<R: tauri::Runtime> EventSink for tauri::AppHandle<R> {
    fn emit(&self, event: SessionEvent) {
        let name = event.name();
        if let Err(err) = tauri::Emitter::emit(self, name, &event) {
            log::warn!("failed to emit {name}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SessionEvent::AlertRaised {
            session_id: Uuid::nil(),
            alert: Alert::retry_or_back("Camera Error", "No camera found on your device."),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "alertRaised");
        assert_eq!(value["alert"]["actions"][0], "retry");
        assert_eq!(event.name(), "capture-alert");
    }

    #[test]
    fn channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        for index in 0..3 {
            sink.emit(SessionEvent::AnalysisProgress {
                session_id: Uuid::nil(),
                step: ProgressStep {
                    index,
                    total: 3,
                    label: format!("step {index}"),
                },
            });
        }

        for expected in 0..3 {
            match rx.try_recv().unwrap() {
                SessionEvent::AnalysisProgress { step, .. } => assert_eq!(step.index, expected),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(rx.try_recv().is_err());
    }
}
