//! Run lifecycle controller.
//!
//! Owns the current run, the bounded history, and the single polling session.
//! Presentation layers receive state changes as [`RunEvent`]s and feed user
//! intents back in through the public methods.

use crate::api::JobService;
use crate::model::{AgentRunConfig, Run, RunEvent};
use crate::orchestrator::history::RunHistory;
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// One fetch outcome from the polling task, tagged with the session that
/// produced it so superseded sessions cannot overwrite newer state.
pub struct PollUpdate {
    generation: u64,
    run_id: String,
    outcome: Result<Run>,
}

/// Handle for the active polling task. At most one exists per orchestrator.
struct PollSession {
    run_id: String,
    generation: u64,
    handle: tokio::task::JoinHandle<()>,
}

/// Orchestrates agent runs: submission, the polling state machine, and the
/// run history. Single writer for the "current run" reference.
pub struct RunOrchestrator {
    jobs: Arc<dyn JobService>,
    poll_interval: Duration,
    history_limit: usize,
    history: RunHistory,
    current: Option<Run>,
    session: Option<PollSession>,
    generation: u64,
    update_tx: UnboundedSender<PollUpdate>,
    update_rx: UnboundedReceiver<PollUpdate>,
    event_tx: UnboundedSender<RunEvent>,
}

impl RunOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobService>,
        cfg: &AgentRunConfig,
        event_tx: UnboundedSender<RunEvent>,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            jobs,
            poll_interval: cfg.poll_interval,
            history_limit: cfg.run_history_limit,
            history: RunHistory::new(cfg.run_history_limit),
            current: None,
            session: None,
            generation: 0,
            update_tx,
            update_rx,
            event_tx,
        }
    }

    pub fn current(&self) -> Option<&Run> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[Run] {
        self.history.entries()
    }

    pub fn is_polling(&self) -> bool {
        self.session.is_some()
    }

    /// Submit a new run. Blank prompts are rejected before any network call.
    /// On failure nothing becomes current and a page error is emitted.
    pub async fn submit(&mut self, prompt: &str) -> Result<Run> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            bail!("prompt must not be empty");
        }
        match self.jobs.create(prompt).await {
            Ok(run) => {
                self.adopt(run.clone());
                Ok(run)
            }
            Err(e) => {
                self.emit(RunEvent::PageError {
                    message: format!("failed to submit run: {e:#}"),
                });
                Err(e)
            }
        }
    }

    /// Fetch an existing run by id and make it current (history inspection).
    pub async fn open(&mut self, run_id: &str) -> Result<Run> {
        match self.jobs.get(run_id).await {
            Ok(run) => {
                self.adopt(run.clone());
                Ok(run)
            }
            Err(e) => {
                self.emit(RunEvent::PageError {
                    message: format!("failed to open run {run_id}: {e:#}"),
                });
                Err(e)
            }
        }
    }

    /// Fetch the most recent runs and replace the in-memory history.
    pub async fn refresh_history(&mut self) -> Result<Vec<Run>> {
        match self.jobs.list(self.history_limit).await {
            Ok(runs) => {
                let entries = self.history.replace_all(runs).to_vec();
                self.emit(RunEvent::HistoryUpdated {
                    entries: entries.clone(),
                });
                Ok(entries)
            }
            Err(e) => {
                self.emit(RunEvent::PageError {
                    message: format!("failed to refresh history: {e:#}"),
                });
                Err(e)
            }
        }
    }

    /// Make `run` the current run, record it in history, and (re)start
    /// polling unless it is already terminal. Supersedes any prior session.
    fn adopt(&mut self, run: Run) {
        self.history.upsert(run.clone());
        self.emit(RunEvent::HistoryUpdated {
            entries: self.history.entries().to_vec(),
        });
        self.emit(RunEvent::RunUpdated { run: run.clone() });
        let run_id = run.id.clone();
        let terminal = run.is_terminal();
        self.current = Some(run);
        if terminal {
            self.stop_polling();
        } else {
            self.start_polling(&run_id);
        }
    }

    /// Start the polling session for `run_id`, tearing down any existing
    /// session first. Exactly one timer exists at any moment.
    pub fn start_polling(&mut self, run_id: &str) {
        self.stop_polling();
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let jobs = self.jobs.clone();
        let tx = self.update_tx.clone();
        let id = run_id.to_string();
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Each tick awaits the fetch before the next one is scheduled;
            // Delay keeps the cadence fixed instead of building a backlog
            // under slow networks.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately and
            // the caller already holds a fresh snapshot, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let outcome = jobs.get(&id).await;
                let update = PollUpdate {
                    generation,
                    run_id: id.clone(),
                    outcome,
                };
                if tx.send(update).is_err() {
                    break;
                }
            }
        });
        self.session = Some(PollSession {
            run_id: run_id.to_string(),
            generation,
            handle,
        });
        self.emit(RunEvent::PollingStarted {
            run_id: run_id.to_string(),
        });
    }

    /// Tear down the active polling session, if any.
    pub fn stop_polling(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(run_id = %session.run_id, "stopping poll session");
            session.handle.abort();
            self.emit(RunEvent::PollingStopped {
                run_id: session.run_id,
            });
        }
    }

    /// Deterministic teardown; no orphaned recurring fetches survive this.
    pub fn shutdown(&mut self) {
        self.stop_polling();
    }

    /// Await the next poll update and apply it. Returns the refreshed
    /// current run when an update was applied, `None` when the update was
    /// stale or a transient poll error (which keeps the timer running).
    pub async fn poll_step(&mut self) -> Option<Run> {
        self.session.as_ref()?;
        let update = self.update_rx.recv().await?;
        self.apply_update(update)
    }

    fn apply_update(&mut self, update: PollUpdate) -> Option<Run> {
        let session = self.session.as_ref()?;
        // Stale-response guard: a slow fetch from a superseded session must
        // not overwrite newer state or resurrect a torn-down timer.
        if update.generation != session.generation || update.run_id != session.run_id {
            return None;
        }
        match &self.current {
            Some(current) if current.id == update.run_id => {}
            _ => return None,
        }
        match update.outcome {
            Ok(run) => {
                self.history.upsert(run.clone());
                self.emit(RunEvent::HistoryUpdated {
                    entries: self.history.entries().to_vec(),
                });
                self.emit(RunEvent::RunUpdated { run: run.clone() });
                let terminal = run.is_terminal();
                self.current = Some(run.clone());
                if terminal {
                    self.stop_polling();
                }
                Some(run)
            }
            Err(e) => {
                // Transient poll failures are surfaced but never stop the
                // timer; the next tick retries regardless.
                self.emit(RunEvent::PageError {
                    message: format!("poll failed: {e:#}"),
                });
                None
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Drop for RunOrchestrator {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.handle.abort();
        }
    }
}
