use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ids::*, model::*};

/// A snapshot as handed to the classifier: lease info is already resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub lease: LeaseInfo,
}

impl SnapshotRecord {
    pub fn new(id: impl Into<String>, lease: LeaseInfo) -> Self {
        Self { id: SnapshotId::from_str(id), lease }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifiedSnapshot {
    pub id: SnapshotId,
    pub instant: DateTime<Utc>,
    pub lease: LeaseInfo,
    pub past_cutoff: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub to_break: Vec<ClassifiedSnapshot>,
    pub reason: SelectionReason,
}

impl Selection {
    pub fn empty() -> Self {
        Self { to_break: vec![], reason: SelectionReason::None }
    }

    pub fn is_empty(&self) -> bool {
        self.to_break.is_empty()
    }

    pub fn ids(&self) -> Vec<&SnapshotId> {
        self.to_break.iter().map(|c| &c.id).collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub id: SnapshotId,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl OutcomeRecord {
    pub fn success(id: SnapshotId) -> Self {
        Self { id, outcome: Outcome::Success, error_detail: None }
    }

    pub fn failed(id: SnapshotId, detail: impl Into<String>) -> Self {
        Self { id, outcome: Outcome::Failed, error_detail: Some(detail.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}
