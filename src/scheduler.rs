//! Wall-clock backup scheduling.
//!
//! One schedule series at a time: `start` replaces any previous series,
//! `stop` cancels pending triggers without interrupting an in-flight run.
//! Periodic specs are polled against the local clock once per second.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDateTime, Weekday};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pipeline::BackupPipeline;
use crate::remote::RemoteStore;

/// When backups fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSpec {
    /// Immediately, exactly once.
    Once,
    /// Every day at the given local time.
    Daily { hour: u32, minute: u32 },
    /// Every week on the given local weekday and time.
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

impl ScheduleSpec {
    /// Next fire time strictly after `from`, in local naive time.
    /// `None` for `Once` and for out-of-range hour/minute values.
    pub fn next_after(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            ScheduleSpec::Once => None,
            ScheduleSpec::Daily { hour, minute } => {
                let today = from.date().and_hms_opt(hour, minute, 0)?;
                if today > from {
                    Some(today)
                } else {
                    today.checked_add_signed(ChronoDuration::days(1))
                }
            }
            ScheduleSpec::Weekly {
                weekday,
                hour,
                minute,
            } => {
                for days_ahead in 0..=7 {
                    let date = from
                        .date()
                        .checked_add_signed(ChronoDuration::days(days_ahead))?;
                    if date.weekday() != weekday {
                        continue;
                    }
                    let candidate = date.and_hms_opt(hour, minute, 0)?;
                    if candidate > from {
                        return Some(candidate);
                    }
                }
                None
            }
        }
    }
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No schedule set.
    Idle,
    /// Schedule set, waiting for the next trigger.
    Armed,
    /// A pipeline invocation is in flight.
    Running,
}

struct ActiveSchedule {
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Drives the backup pipeline from wall-clock triggers.
pub struct Scheduler {
    active: Option<ActiveSchedule>,
    state: Arc<StdMutex<SchedulerState>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            active: None,
            state: Arc::new(StdMutex::new(SchedulerState::Idle)),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Arm a schedule, replacing any previous one.
    pub fn start<S>(
        &mut self,
        spec: ScheduleSpec,
        pipeline: Arc<BackupPipeline<S>>,
        folder: impl Into<PathBuf>,
    ) where
        S: RemoteStore + 'static,
    {
        self.stop();

        let folder = folder.into();
        let cancel = CancellationToken::new();
        let state = Arc::clone(&self.state);
        set_state(&state, SchedulerState::Armed);
        info!(?spec, folder = %folder.display(), "backup scheduler started");

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_schedule(spec, pipeline, folder, state, task_cancel).await;
        });
        self.active = Some(ActiveSchedule {
            cancel,
            _handle: handle,
        });
    }

    /// Cancel pending triggers. An in-flight run is not interrupted; only
    /// future triggers are suppressed.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            info!("backup scheduler stopped");
        }
        set_state(&self.state, SchedulerState::Idle);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

fn set_state(state: &Arc<StdMutex<SchedulerState>>, value: SchedulerState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

async fn run_schedule<S>(
    spec: ScheduleSpec,
    pipeline: Arc<BackupPipeline<S>>,
    folder: PathBuf,
    state: Arc<StdMutex<SchedulerState>>,
    cancel: CancellationToken,
) where
    S: RemoteStore + 'static,
{
    if spec == ScheduleSpec::Once {
        trigger(&pipeline, &folder, &state, &cancel).await;
        return;
    }

    let Some(mut next_fire) = spec.next_after(Local::now().naive_local()) else {
        error!(?spec, "schedule has no valid fire time");
        set_state(&state, SchedulerState::Idle);
        return;
    };
    info!(next = %next_fire, "next backup trigger armed");

    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }

        if Local::now().naive_local() < next_fire {
            continue;
        }

        trigger(&pipeline, &folder, &state, &cancel).await;

        match spec.next_after(Local::now().naive_local()) {
            Some(next) => {
                next_fire = next;
                info!(next = %next_fire, "next backup trigger armed");
            }
            None => return,
        }
    }
}

async fn trigger<S: RemoteStore>(
    pipeline: &BackupPipeline<S>,
    folder: &Path,
    state: &Arc<StdMutex<SchedulerState>>,
    cancel: &CancellationToken,
) {
    set_state(state, SchedulerState::Running);
    match pipeline.try_run(folder).await {
        Ok(Some(record)) => info!(filename = %record.filename, "scheduled backup completed"),
        Ok(None) => warn!("scheduled trigger skipped: previous run still active"),
        Err(e) => error!(error = %e, "scheduled backup failed"),
    }
    // stop() may have fired while the run was in flight.
    let after = if cancel.is_cancelled() {
        SchedulerState::Idle
    } else {
        SchedulerState::Armed
    };
    set_state(state, after);
}
