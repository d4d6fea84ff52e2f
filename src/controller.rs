//! Run lifecycle: trigger a server-side ranking run and poll it to completion.
//!
//! ```text
//! idle -> queued (predicted) -> running (acknowledged) -> completed | failed | error (server)
//! ```
//!
//! At most one poll loop exists at a time. Every loop is tied to a
//! [`CancellationToken`] derived from the controller's session token, so
//! stopping the loop, starting a new run, or dropping the controller
//! guarantees no orphaned task writes to state afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::RankingBackend;
use crate::config::Config;
use crate::error::{RankingError, Result};
use crate::models::{Filters, FormulaMode, RunOrigin, RunRequest, RunState, RunStatus};
use crate::view::RankingView;

/// Run state plus the flags the toolbar needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    pub state: RunState,
    /// True from trigger until a terminal status, a failure, or a stop.
    pub in_progress: bool,
    /// True while a status poll loop is active.
    pub polling: bool,
}

impl RunSnapshot {
    /// One-line status for display, e.g. `Running 40%...` or `completed • Run #r1`.
    pub fn status_text(&self) -> String {
        if self.in_progress {
            return match self.state.progress {
                Some(p) => format!("Running {p}%..."),
                None => "Running...".to_string(),
            };
        }
        if self.state.origin == RunOrigin::Initial {
            return "Idle".to_string();
        }
        match &self.state.run_id {
            Some(id) => format!("{} • Run #{}", self.state.status, id),
            None => self.state.status.to_string(),
        }
    }
}

struct Shared {
    backend: Arc<dyn RankingBackend>,
    view: Arc<RankingView>,
    snapshot: Mutex<RunSnapshot>,
    poll_interval: Duration,
    fallback_delay: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct TaskHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Drives a single server-side ranking run.
pub struct RunController {
    shared: Arc<Shared>,
    task: Mutex<Option<TaskHandle>>,
    session: CancellationToken,
    /// Bumped by every trigger, stop and shutdown. A start response is only
    /// applied if the generation is unchanged since its trigger.
    generation: AtomicU64,
}

impl RunController {
    pub fn new(backend: Arc<dyn RankingBackend>, view: Arc<RankingView>, config: &Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                view,
                snapshot: Mutex::new(RunSnapshot::default()),
                poll_interval: config.poll_interval,
                fallback_delay: config.fallback_refresh_delay,
            }),
            task: Mutex::new(None),
            session: CancellationToken::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.shared.lock().clone()
    }

    pub fn state(&self) -> RunState {
        self.shared.lock().state.clone()
    }

    pub fn run_id(&self) -> Option<String> {
        self.shared.lock().state.run_id.clone()
    }

    pub fn is_in_progress(&self) -> bool {
        self.shared.lock().in_progress
    }

    pub fn is_polling(&self) -> bool {
        self.shared.lock().polling
    }

    /// Start a run for `formula_mode` with `filters` as run options.
    ///
    /// Rejected with [`RankingError::RunInProgress`] while a run is active.
    /// A start failure leaves the run `failed` with the error message and
    /// no poll loop. A start response without a run id schedules a single
    /// delayed results refresh instead of polling. If the run is stopped or
    /// replaced while the start request is in flight, its response is
    /// discarded and [`RankingError::RunSuperseded`] is returned.
    pub async fn trigger_run(&self, formula_mode: FormulaMode, filters: Filters) -> Result<RunState> {
        if self.session.is_cancelled() {
            return Err(RankingError::InvalidArgument(
                "run controller has been shut down".into(),
            ));
        }
        let generation = {
            let mut slot = self.lock_task();
            let mut snap = self.shared.lock();
            if snap.in_progress {
                debug!(status = %snap.state.status, "Run trigger ignored, run already in progress");
                return Err(RankingError::RunInProgress);
            }
            snap.in_progress = true;
            snap.polling = false;
            snap.state = RunState::predicted_queued();
            cancel(slot.take());
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        info!(%formula_mode, "Starting ranking run");
        let request = RunRequest {
            formula_mode,
            options: filters,
        };
        let response = match self.shared.backend.start_run(&request).await {
            Ok(r) => r,
            Err(e) => {
                let message = e.to_string();
                {
                    let mut snap = self.shared.lock();
                    if self.is_superseded(generation) {
                        debug!(error = %message, "Start failure for a superseded run ignored");
                        return Err(e);
                    }
                    snap.in_progress = false;
                    snap.state = RunState::failed(None, message.clone());
                }
                warn!(error = %message, "Ranking run failed to start");
                self.shared.view.report_error(message);
                return Err(e);
            }
        };

        let run_id = response.run_id().map(str::to_string);
        let mut slot = self.lock_task();
        let state = {
            let mut snap = self.shared.lock();
            if self.is_superseded(generation) {
                debug!(run_id = ?run_id, "Start response for a superseded run discarded");
                return Err(RankingError::RunSuperseded);
            }
            snap.state = RunState {
                run_id: run_id.clone(),
                status: RunStatus::Running,
                progress: Some(0.0),
                message: None,
                origin: RunOrigin::Acknowledged,
            };
            snap.polling = run_id.is_some();
            snap.state.clone()
        };

        let token = self.session.child_token();
        let shared = self.shared.clone();
        let task = match run_id {
            Some(id) => {
                info!(run_id = %id, "Run accepted, polling status");
                tokio::spawn(poll_loop(shared, id, token.clone()))
            }
            None => {
                warn!(
                    delay_ms = self.shared.fallback_delay.as_millis() as u64,
                    "Run accepted without a run id, refreshing after a fixed delay"
                );
                tokio::spawn(delayed_refresh(shared, token.clone()))
            }
        };
        cancel(slot.replace(TaskHandle { token, task }));

        Ok(state)
    }

    /// Stop any poll loop or pending refresh and clear the in-progress flag.
    pub fn stop_polling(&self) {
        let mut slot = self.lock_task();
        let mut snap = self.shared.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        cancel(slot.take());
        snap.in_progress = false;
        snap.polling = false;
    }

    /// Wait for the current poll loop (or delayed refresh) to finish,
    /// including the results refresh it triggers.
    pub async fn join(&self) {
        let handle = self.lock_task().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Run task ended abnormally");
                }
            }
        }
    }

    /// End the session: cancel every task this controller spawned.
    pub fn shutdown(&self) {
        self.session.cancel();
        let mut slot = self.lock_task();
        let mut snap = self.shared.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        cancel(slot.take());
        snap.polling = false;
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.session.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation
    }
}

/// Lock order is task slot, then snapshot. Cancelling under the snapshot lock
/// means a task that checks its token under that lock never writes afterwards.
fn cancel(handle: Option<TaskHandle>) {
    if let Some(handle) = handle {
        handle.token.cancel();
        debug!("Cancelled previous run task");
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn poll_loop(shared: Arc<Shared>, run_id: String, token: CancellationToken) {
    let period = shared.poll_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let response = tokio::select! {
            _ = token.cancelled() => return,
            r = shared.backend.run_status(&run_id) => r,
        };
        let next = response.and_then(|r| r.into_run_state(&run_id));

        let refresh = {
            let mut snap = shared.lock();
            if token.is_cancelled() {
                return;
            }
            match next {
                Ok(state) => {
                    let status = state.status;
                    debug!(run_id = %run_id, %status, progress = ?state.progress, "Run status");
                    snap.state = state;
                    if !status.is_terminal() {
                        continue;
                    }
                    snap.in_progress = false;
                    snap.polling = false;
                    info!(run_id = %run_id, %status, "Run finished, polling stopped");
                    status.refreshes_results()
                }
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "Status poll failed, polling stopped");
                    snap.in_progress = false;
                    snap.polling = false;
                    snap.state = RunState::failed(Some(run_id.clone()), e.to_string());
                    false
                }
            }
        };

        if refresh {
            shared.view.load_data().await;
        }
        return;
    }
}

async fn delayed_refresh(shared: Arc<Shared>, token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(shared.fallback_delay) => {}
    }
    {
        let mut snap = shared.lock();
        if token.is_cancelled() {
            return;
        }
        snap.in_progress = false;
        snap.state = RunState {
            run_id: None,
            status: RunStatus::Completed,
            progress: None,
            message: Some("Run accepted without a run id; assumed complete".to_string()),
            origin: RunOrigin::Predicted,
        };
    }
    shared.view.load_data().await;
}
