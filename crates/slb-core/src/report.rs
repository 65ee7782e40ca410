use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ClassifiedSnapshot, Outcome, OutcomeRecord, SelectionReason, SnapshotId};

const ID_WIDTH: usize = 35;

pub fn classification_table(rows: &[ClassifiedSnapshot]) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{:<ID_WIDTH$} {:<10} {:<10} {:<6}", "Snapshot", "Status", "State", "Older?");
    for r in rows {
        let older = if r.past_cutoff { "Yes" } else { "No" };
        let _ = writeln!(s, "{:<ID_WIDTH$} {:<10} {:<10} {:<6}", r.id.as_str(), r.lease.status, r.lease.state, older);
    }
    s
}

/// Aggregate of the break ledger.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: Vec<SnapshotId>,
    pub failed: Vec<OutcomeRecord>,
}

impl Summary {
    pub fn from_ledger(ledger: &[OutcomeRecord]) -> Self {
        let mut summary = Self::default();
        for r in ledger {
            match r.outcome {
                Outcome::Success => summary.succeeded.push(r.id.clone()),
                Outcome::Failed => summary.failed.push(r.clone()),
            }
        }
        summary
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Successes first, then failures; totals are printed even for an empty ledger.
    pub fn summary_table(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "=== FINAL SUMMARY ===");
        let _ = writeln!(s, "{:<ID_WIDTH$} Result", "Snapshot");
        for id in &self.succeeded {
            let _ = writeln!(s, "{:<ID_WIDTH$} {}", id.as_str(), Outcome::Success.label());
        }
        for r in &self.failed {
            let _ = writeln!(s, "{:<ID_WIDTH$} {}", r.id.as_str(), Outcome::Failed.label());
        }
        let _ = writeln!(s);
        let _ = writeln!(s, "Total succeeded: {}", self.success_count());
        let _ = writeln!(s, "Total failed: {}", self.failure_count());
        s
    }
}

/// Everything one run decided and did, for `--json` output.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub share: String,
    pub retention_days: u32,
    pub cutoff: DateTime<Utc>,
    pub snapshots: Vec<ClassifiedSnapshot>,
    pub reason: SelectionReason,
    pub ledger: Vec<OutcomeRecord>,
    pub summary: Summary,
}
