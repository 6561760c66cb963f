//! Correlation of extracted identifiers against the ticket store.

use crate::api::TicketStore;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// One resolved identifier. A ticket whose individual fetch failed carries
/// `error` and is excluded from the display list, but still counts toward
/// the attempt total.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedTicket {
    pub id: String,
    pub fields: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one correlation pass.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationOutcome {
    /// Successfully resolved tickets, in identifier order.
    pub tickets: Vec<CorrelatedTicket>,
    /// How many lookups were attempted, failures included.
    pub attempted: usize,
    /// Set only when every lookup in a non-empty batch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CorrelationOutcome {
    /// "Nothing to look up" — distinct from "lookup failed".
    pub fn empty() -> Self {
        Self {
            tickets: Vec::new(),
            attempted: 0,
            error: None,
        }
    }
}

/// Fetch one ticket per identifier, concurrently. Each fetch is isolated:
/// a failure for one identifier never aborts the batch.
pub async fn resolve(
    store: &dyn TicketStore,
    identifiers: &[String],
    fields: &[String],
) -> CorrelationOutcome {
    if identifiers.is_empty() {
        return CorrelationOutcome::empty();
    }
    let fetches = identifiers.iter().map(|id| async move {
        match store.get(id, fields).await {
            Ok(fields) => CorrelatedTicket {
                id: id.clone(),
                fields,
                error: None,
            },
            Err(e) => {
                warn!(ticket_id = %id, "ticket lookup failed: {e:#}");
                CorrelatedTicket {
                    id: id.clone(),
                    fields: Value::Null,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    });
    let resolved = join_all(fetches).await;
    let attempted = resolved.len();
    let tickets: Vec<CorrelatedTicket> = resolved
        .into_iter()
        .filter(|t| t.error.is_none())
        .collect();
    let error = if tickets.is_empty() {
        Some(format!(
            "all {attempted} ticket lookup(s) failed; check the ticket store"
        ))
    } else {
        None
    };
    CorrelationOutcome {
        tickets,
        attempted,
        error,
    }
}

/// Selection stability across reloads: keep the previous selection when the
/// id is still present, otherwise fall back to the first ticket, or none.
pub fn next_selection(previous: Option<&str>, tickets: &[CorrelatedTicket]) -> Option<String> {
    if let Some(prev) = previous {
        if tickets.iter().any(|t| t.id == prev) {
            return Some(prev.to_string());
        }
    }
    tickets.first().map(|t| t.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    /// Ticket store that fails for any id listed in `failing`.
    struct FlakyStore {
        failing: Vec<String>,
    }

    #[async_trait]
    impl TicketStore for FlakyStore {
        async fn get(&self, ticket_id: &str, _fields: &[String]) -> Result<Value> {
            if self.failing.iter().any(|f| f == ticket_id) {
                bail!("ticket {ticket_id} not found");
            }
            Ok(serde_json::json!({ "id": ticket_id, "subject": "printer on fire" }))
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_input_is_not_an_error() {
        let store = FlakyStore { failing: vec![] };
        let outcome = resolve(&store, &[], &[]).await;
        assert!(outcome.tickets.is_empty());
        assert_eq!(outcome.attempted, 0);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn partial_failure_keeps_resolved_tickets_and_no_aggregate_error() {
        let store = FlakyStore {
            failing: ids(&["Y"]),
        };
        let outcome = resolve(&store, &ids(&["X", "Y"]), &[]).await;
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.tickets.len(), 1);
        assert_eq!(outcome.tickets[0].id, "X");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn all_failures_set_an_aggregate_error() {
        let store = FlakyStore {
            failing: ids(&["X"]),
        };
        let outcome = resolve(&store, &ids(&["X"]), &[]).await;
        assert!(outcome.tickets.is_empty());
        assert_eq!(outcome.attempted, 1);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn selection_sticks_while_present_then_falls_back() {
        let tickets = vec![
            CorrelatedTicket {
                id: "a".into(),
                fields: Value::Null,
                error: None,
            },
            CorrelatedTicket {
                id: "b".into(),
                fields: Value::Null,
                error: None,
            },
        ];
        assert_eq!(next_selection(Some("b"), &tickets), Some("b".to_string()));
        assert_eq!(next_selection(Some("z"), &tickets), Some("a".to_string()));
        assert_eq!(next_selection(None, &tickets), Some("a".to_string()));
        assert_eq!(next_selection(Some("b"), &[]), None);
    }
}
