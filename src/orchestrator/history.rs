//! Bounded, ordered run history.

use crate::model::Run;

/// In-memory history of recent runs, newest first, capped at a fixed size.
///
/// Owned exclusively by the orchestrator; pure with respect to its inputs,
/// no hidden I/O.
pub struct RunHistory {
    entries: Vec<Run>,
    cap: usize,
}

impl RunHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap,
        }
    }

    pub fn entries(&self) -> &[Run] {
        &self.entries
    }

    /// Insert or replace a run by id, then re-sort by `created_at` descending
    /// and drop the oldest entries beyond the cap.
    pub fn upsert(&mut self, run: Run) -> &[Run] {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.id == run.id) {
            *slot = run;
        } else {
            self.entries.insert(0, run);
        }
        self.normalize();
        &self.entries
    }

    /// Replace the whole list, e.g. after a history refresh from the service.
    pub fn replace_all(&mut self, runs: Vec<Run>) -> &[Run] {
        self.entries = runs;
        self.normalize();
        &self.entries
    }

    fn normalize(&mut self) {
        self.entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.entries.truncate(self.cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;
    use time::OffsetDateTime;

    fn run(id: &str, status: RunStatus, created_secs: i64) -> Run {
        Run {
            id: id.to_string(),
            status,
            created_at: OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(created_secs),
            started_at: None,
            completed_at: None,
            result_rows: None,
            result_columns: None,
            result_markdown: None,
            error: None,
        }
    }

    #[test]
    fn upsert_keeps_newest_first_and_respects_cap() {
        let mut history = RunHistory::new(3);
        for (id, t) in [("a", 10), ("b", 30), ("c", 20), ("d", 40), ("e", 5)] {
            history.upsert(run(id, RunStatus::Queued, t));
            assert!(history.entries().len() <= 3);
        }
        let ids: Vec<&str> = history.entries().iter().map(|r| r.id.as_str()).collect();
        // "e" (t=5) and "a" (t=10) are the oldest and fall off the cap.
        assert_eq!(ids, vec!["d", "b", "c"]);
        for pair in history.entries().windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn upsert_replaces_same_id_without_duplicating() {
        let mut history = RunHistory::new(5);
        history.upsert(run("a", RunStatus::Queued, 10));
        history.upsert(run("b", RunStatus::Queued, 20));
        history.upsert(run("a", RunStatus::Running, 10));
        assert_eq!(history.entries().len(), 2);
        let a = history.entries().iter().find(|r| r.id == "a").unwrap();
        assert_eq!(a.status, RunStatus::Running);
    }

    #[test]
    fn replace_all_sorts_and_caps() {
        let mut history = RunHistory::new(2);
        history.replace_all(vec![
            run("a", RunStatus::Completed, 1),
            run("b", RunStatus::Completed, 3),
            run("c", RunStatus::Completed, 2),
        ]);
        let ids: Vec<&str> = history.entries().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
