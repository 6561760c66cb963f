use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

/// Lifecycle status of an agent run.
///
/// Transitions are `queued -> running -> {completed, failed}`; the two
/// terminal states are never left for the same run id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of a long-running background analysis job.
///
/// The job service assigns the id and timestamps. Result fields are only
/// meaningfully populated once the status is terminal; every consumer must
/// tolerate them being absent at any status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// Tabular result: ordered key->value rows.
    #[serde(default)]
    pub result_rows: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
    /// Column names parallel to `result_rows`.
    #[serde(default)]
    pub result_columns: Option<Vec<String>>,
    /// Free-form narrative output; may embed fenced raw-data blocks.
    #[serde(default)]
    pub result_markdown: Option<String>,
    /// Failure reason reported by the job itself, present only when failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl Run {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Events emitted by the orchestrator for presentation layers.
///
/// Transport errors never escape into rendering code; they arrive here as
/// overwritable `PageError` messages instead.
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunUpdated { run: Run },
    HistoryUpdated { entries: Vec<Run> },
    PageError { message: String },
    PollingStarted { run_id: String },
    PollingStopped { run_id: String },
}

/// Per-use-case configuration for the agent run surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunConfig {
    pub base_url: String,
    pub default_prompt: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub run_history_limit: usize,
    /// Ordered result view keys to enable; unknown keys are skipped.
    pub result_view_keys: Vec<String>,
    /// Row fields scanned for ticket identifiers.
    pub ticket_id_fields: Vec<String>,
    pub correlation: CorrelationConfig,
    pub user_agent: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    pub enabled: bool,
    /// Ticket fields requested from the secondary store.
    pub fields: Vec<String>,
}
