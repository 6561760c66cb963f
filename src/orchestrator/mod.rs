//! Application-level orchestration.
//!
//! This module owns the run lifecycle (submit/open/poll) and the bounded run
//! history. Presentation layers call into it and observe state through
//! [`crate::model::RunEvent`]s to keep responsibilities separated.

mod controller;
mod history;

pub use controller::RunOrchestrator;
pub use history::RunHistory;
