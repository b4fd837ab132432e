//! Pipeline stages and the observer event channel.
//!
//! Pipelines run on background tasks; a front-end keeps the receiving half
//! of the channel and renders events on its own thread. Events are
//! fire-and-forget: a dropped or slow receiver never stalls a run.

pub mod backup;
pub mod restore;

pub use backup::BackupPipeline;
pub use restore::RestorePipeline;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::utils::errors::{BackupError, Result};

/// Pipeline stage reported alongside progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pack,
    Encrypt,
    Upload,
    Retention,
    Ledger,
    Fetch,
    Decrypt,
    Extract,
}

/// Event delivered to the observer channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Progress { stage: Stage, percent: u8 },
    Log { message: String },
}

/// Sending half of the observer channel, cloned into pipeline tasks.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    /// Create a sink and its receiving half.
    pub fn channel() -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event, for headless runs.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn progress(&self, stage: Stage, percent: u8) {
        self.send(PipelineEvent::Progress { stage, percent });
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(PipelineEvent::Log {
            message: message.into(),
        });
    }

    fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            // Receiver may be gone (front-end closed); events are best-effort.
            let _ = tx.send(event);
        }
    }
}

/// Run a CPU or filesystem-bound stage off the async executor.
pub(crate) async fn spawn_blocking_stage<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackupError::Io(std::io::Error::other(format!("worker task failed: {e}"))))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_events_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.progress(Stage::Pack, 0);
        sink.log("hello");
        sink.progress(Stage::Ledger, 100);

        assert!(matches!(
            rx.recv().await,
            Some(PipelineEvent::Progress {
                stage: Stage::Pack,
                percent: 0
            })
        ));
        assert!(matches!(rx.recv().await, Some(PipelineEvent::Log { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(PipelineEvent::Progress {
                stage: Stage::Ledger,
                percent: 100
            })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_panic() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.progress(Stage::Pack, 0);
        sink.log("nobody listening");
    }

    #[tokio::test]
    async fn test_disabled_sink_is_silent() {
        let sink = EventSink::disabled();
        sink.progress(Stage::Upload, 75);
        sink.log("dropped");
    }
}
