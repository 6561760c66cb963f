use crate::api::{HttpJobService, HttpTicketStore, JobService};
use crate::correlate::{self, CorrelationOutcome};
use crate::extract::extract_identifiers;
use crate::markdown::sanitize_markdown;
use crate::model::{AgentRunConfig, CorrelationConfig, Run, RunEvent, RunStatus};
use crate::orchestrator::RunOrchestrator;
use crate::views::{self, ResultViewContext};
use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default prompt for the ticket-splitting analysis use case.
const DEFAULT_SPLIT_PROMPT: &str = "Analyze the open tickets and propose which ones should be \
split into smaller tasks. Return one result row per affected ticket with its ticket_id.";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "helpdesk-agent-cli",
    version,
    about = "Submit IT-support agent runs, poll them to completion, and correlate tickets"
)]
pub struct Cli {
    /// Base URL of the helpdesk backend
    #[arg(long, default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Free-form agent prompt (defaults to the ticket-splitting analysis)
    #[arg(long)]
    pub prompt: Option<String>,

    /// Inspect an existing run instead of submitting a new one
    #[arg(long, value_name = "RUN_ID", conflicts_with = "prompt")]
    pub open: Option<String>,

    /// Print recent run history and exit
    #[arg(long)]
    pub history: bool,

    /// Fixed polling cadence while a run is queued or running
    #[arg(long, default_value = "2s")]
    pub poll_interval: humantime::Duration,

    /// Maximum run history entries kept in memory
    #[arg(long, default_value_t = 20)]
    pub history_limit: usize,

    /// Result views to render, in order; unknown keys are skipped
    #[arg(long, default_value = "summary,result-table,tickets", value_delimiter = ',')]
    pub views: Vec<String>,

    /// Row fields scanned for ticket identifiers
    #[arg(long, default_value = "ticket_ids,ticket_id", value_delimiter = ',')]
    pub ticket_id_fields: Vec<String>,

    /// Skip correlating extracted identifiers against the ticket store
    #[arg(long)]
    pub no_correlate: bool,

    /// Ticket fields requested during correlation
    #[arg(long, default_value = "id,subject,status,priority", value_delimiter = ',')]
    pub correlate_fields: Vec<String>,

    /// Print the run and correlated tickets as JSON instead of rendered views
    #[arg(long)]
    pub json: bool,

    /// Per-request HTTP timeout
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,
}

/// Build an `AgentRunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> AgentRunConfig {
    AgentRunConfig {
        base_url: args.base_url.clone(),
        default_prompt: DEFAULT_SPLIT_PROMPT.to_string(),
        poll_interval: Duration::from(args.poll_interval),
        run_history_limit: args.history_limit,
        result_view_keys: args.views.clone(),
        ticket_id_fields: args.ticket_id_fields.clone(),
        correlation: CorrelationConfig {
            enabled: !args.no_correlate,
            fields: args.correlate_fields.clone(),
        },
        user_agent: format!("helpdesk-agent-cli/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: Duration::from(args.timeout),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let jobs: Arc<dyn JobService> = Arc::new(HttpJobService::new(&cfg)?);
    let store = HttpTicketStore::new(&cfg)?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let mut orch = RunOrchestrator::new(jobs, &cfg, event_tx);

    if args.history {
        let entries = orch.refresh_history().await?;
        print_history(&entries);
        return Ok(());
    }

    match args.open.as_deref() {
        Some(run_id) => orch.open(run_id).await?,
        None => {
            let prompt = args
                .prompt
                .clone()
                .unwrap_or_else(|| cfg.default_prompt.clone());
            orch.submit(&prompt).await?
        }
    };

    // Drive the polling session until the current run reaches a terminal
    // status, relaying page-level messages as they arrive.
    loop {
        drain_events(&mut event_rx);
        match orch.current() {
            Some(current) if current.is_terminal() => break,
            Some(_) if orch.is_polling() => {
                let _ = orch.poll_step().await;
            }
            _ => break,
        }
    }
    orch.shutdown();
    drain_events(&mut event_rx);

    let Some(run) = orch.current().cloned() else {
        bail!("no current run after polling");
    };
    if run.status == RunStatus::Failed {
        bail!(
            "run {} failed: {}",
            run.id,
            run.error.as_deref().unwrap_or("no error reported")
        );
    }

    let markdown = run
        .result_markdown
        .as_deref()
        .map(sanitize_markdown)
        .unwrap_or_default();
    let identifiers = run
        .result_rows
        .as_deref()
        .map(|rows| extract_identifiers(rows, &cfg.ticket_id_fields))
        .unwrap_or_default();
    let outcome = if cfg.correlation.enabled {
        correlate::resolve(&store, &identifiers, &cfg.correlation.fields).await
    } else {
        CorrelationOutcome::empty()
    };
    if let Some(message) = &outcome.error {
        eprintln!("warning: {message}");
    }
    if outcome.attempted > 0 {
        eprintln!(
            "correlated {} of {} ticket(s)",
            outcome.tickets.len(),
            outcome.attempted
        );
    }

    if args.json {
        let payload = serde_json::json!({ "run": run, "tickets": outcome.tickets });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let ctx = ResultViewContext {
        run: &run,
        markdown: &markdown,
        tickets: &outcome.tickets,
        loading_tickets: false,
    };
    for view in views::resolve_views(&cfg.result_view_keys) {
        println!("== {} ==", view.title);
        if let Some(description) = view.description {
            println!("   {description}");
        }
        for line in (view.render)(&ctx) {
            println!("{line}");
        }
        println!();
    }
    if let Some(selected) = correlate::next_selection(None, &outcome.tickets) {
        eprintln!("selected ticket: {selected}");
    }
    Ok(())
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<RunEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            RunEvent::PageError { message } => eprintln!("warning: {message}"),
            RunEvent::RunUpdated { run } => eprintln!("run {} {}", run.id, run.status),
            RunEvent::HistoryUpdated { .. }
            | RunEvent::PollingStarted { .. }
            | RunEvent::PollingStopped { .. } => {}
        }
    }
}

fn print_history(entries: &[Run]) {
    if entries.is_empty() {
        println!("(no runs)");
        return;
    }
    for entry in entries {
        let created = entry
            .created_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "-".to_string());
        println!("{created}  {:<9}  {}", entry.status.as_str(), entry.id);
    }
}
