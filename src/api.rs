//! Contracts for the external collaborators and their HTTP implementations.
//!
//! The job service owns run persistence and the analysis itself; the ticket
//! store is the secondary source that correlation resolves against. Both are
//! behind traits so the orchestrator and resolver can be driven by mocks.

use crate::model::{AgentRunConfig, Run};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// External job submission service.
///
/// Must return a run shape with at least id/status/timestamps even before
/// completion.
#[async_trait]
pub trait JobService: Send + Sync {
    async fn create(&self, prompt: &str) -> Result<Run>;
    async fn get(&self, run_id: &str) -> Result<Run>;
    async fn list(&self, limit: usize) -> Result<Vec<Run>>;
}

/// Secondary ticket store used for correlation.
///
/// `get` must fail (not return a silent null) for unknown identifiers so the
/// resolver can convert the failure into a per-ticket placeholder.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get(&self, ticket_id: &str, fields: &[String]) -> Result<serde_json::Value>;
}

fn build_client(cfg: &AgentRunConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.request_timeout)
        .build()
        .context("failed to build HTTP client")
}

pub struct HttpJobService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobService {
    pub fn new(cfg: &AgentRunConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn create(&self, prompt: &str) -> Result<Run> {
        let url = format!("{}/api/agent/runs", self.base_url);
        debug!(%url, "submitting agent run");
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} rejected"))?;
        resp.json::<Run>()
            .await
            .context("invalid run payload in create response")
    }

    async fn get(&self, run_id: &str) -> Result<Run> {
        let url = format!("{}/api/agent/runs/{run_id}", self.base_url);
        debug!(%url, "fetching agent run");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} rejected"))?;
        resp.json::<Run>()
            .await
            .context("invalid run payload in get response")
    }

    async fn list(&self, limit: usize) -> Result<Vec<Run>> {
        let url = format!("{}/api/agent/runs", self.base_url);
        debug!(%url, limit, "listing agent runs");
        let resp = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} rejected"))?;
        resp.json::<Vec<Run>>()
            .await
            .context("invalid run list payload")
    }
}

pub struct HttpTicketStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTicketStore {
    pub fn new(cfg: &AgentRunConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TicketStore for HttpTicketStore {
    async fn get(&self, ticket_id: &str, fields: &[String]) -> Result<serde_json::Value> {
        let url = format!("{}/api/tickets/{ticket_id}", self.base_url);
        debug!(%url, "fetching ticket");
        let mut req = self.client.get(&url);
        if !fields.is_empty() {
            req = req.query(&[("fields", fields.join(","))]);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            // A missing ticket is a 404 and must surface as an error here.
            .error_for_status()
            .with_context(|| format!("GET {url} rejected"))?;
        resp.json::<serde_json::Value>()
            .await
            .context("invalid ticket payload")
    }
}
