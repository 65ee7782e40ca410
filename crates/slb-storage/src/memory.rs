use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use slb_core::{LeaseInfo, LeaseState, LeaseStatus, SnapshotId};

use crate::traits::{RawSnapshot, ShareService};
use crate::StorageError;

/// In-memory share service for tests and dry runs. Not durable.
#[derive(Default)]
pub struct InMemoryShareService {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    shares: BTreeMap<String, Share>,
    fetch_failures: HashSet<String>,
    break_failures: HashMap<String, StorageError>,
    break_calls: Vec<String>,
    forbidden: bool,
}

#[derive(Default)]
struct Share {
    lease: Option<LeaseInfo>,
    snapshots: Vec<(SnapshotId, LeaseInfo)>,
}

impl InMemoryShareService {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_share(&self, share: &str) {
        self.inner().shares.entry(share.to_string()).or_default();
    }

    pub fn add_snapshot(&self, share: &str, snapshot: &str, lease: LeaseInfo) {
        self.inner()
            .shares
            .entry(share.to_string())
            .or_default()
            .snapshots
            .push((SnapshotId::from_str(snapshot), lease));
    }

    /// Every call fails with 403, as a key without the right role would.
    pub fn deny_all(&self) {
        self.inner().forbidden = true;
    }

    pub fn fail_lease_fetch(&self, snapshot: &str) {
        self.inner().fetch_failures.insert(snapshot.to_string());
    }

    pub fn fail_break(&self, snapshot: &str, err: StorageError) {
        self.inner().break_failures.insert(snapshot.to_string(), err);
    }

    /// Snapshot ids passed to `break_lease`, in call order.
    pub fn break_calls(&self) -> Vec<String> {
        self.inner().break_calls.clone()
    }

    pub fn lease_of(&self, share: &str, snapshot: &str) -> Option<LeaseInfo> {
        let inner = self.inner();
        inner
            .shares
            .get(share)?
            .snapshots
            .iter()
            .find(|(id, _)| id.as_str() == snapshot)
            .map(|(_, lease)| *lease)
    }

    fn check_access(inner: &Inner) -> Result<(), StorageError> {
        if inner.forbidden {
            return Err(StorageError::Forbidden("This request is not authorized to perform this operation.".into()));
        }
        Ok(())
    }
}

fn share_not_found(share: &str) -> StorageError {
    StorageError::NotFound(format!("share '{share}'"))
}

fn snapshot_not_found(share: &str, snapshot: &SnapshotId) -> StorageError {
    StorageError::NotFound(format!("snapshot '{snapshot}' of share '{share}'"))
}

impl ShareService for InMemoryShareService {
    fn get_share_properties(&self, share: &str) -> Result<LeaseInfo, StorageError> {
        let inner = self.inner();
        Self::check_access(&inner)?;
        let s = inner.shares.get(share).ok_or_else(|| share_not_found(share))?;
        Ok(s.lease.unwrap_or_else(LeaseInfo::unlocked_available))
    }

    fn list_snapshots(&self, share_prefix: &str) -> Result<Vec<RawSnapshot>, StorageError> {
        let inner = self.inner();
        Self::check_access(&inner)?;
        let mut out = vec![];
        for (name, share) in inner.shares.range(share_prefix.to_string()..) {
            if !name.starts_with(share_prefix) {
                break;
            }
            for (id, lease) in &share.snapshots {
                out.push(RawSnapshot {
                    share_name: name.clone(),
                    snapshot: id.clone(),
                    lease_status: Some(lease.status.as_str().to_string()),
                    lease_state: Some(lease.state.as_str().to_string()),
                });
            }
        }
        Ok(out)
    }

    fn get_lease_info(&self, share: &str, snapshot: &SnapshotId) -> Result<LeaseInfo, StorageError> {
        let inner = self.inner();
        Self::check_access(&inner)?;
        if inner.fetch_failures.contains(snapshot.as_str()) {
            return Err(StorageError::Transport(format!("connection reset while reading {snapshot}")));
        }
        let s = inner.shares.get(share).ok_or_else(|| share_not_found(share))?;
        s.snapshots
            .iter()
            .find(|(id, _)| id == snapshot)
            .map(|(_, lease)| *lease)
            .ok_or_else(|| snapshot_not_found(share, snapshot))
    }

    fn break_lease(&self, share: &str, snapshot: &SnapshotId) -> Result<(), StorageError> {
        let mut inner = self.inner();
        Self::check_access(&inner)?;
        inner.break_calls.push(snapshot.as_str().to_string());
        if let Some(err) = inner.break_failures.get(snapshot.as_str()) {
            return Err(err.clone());
        }

        let s = inner.shares.get_mut(share).ok_or_else(|| share_not_found(share))?;
        let lease = s
            .snapshots
            .iter_mut()
            .find(|(id, _)| id == snapshot)
            .map(|(_, lease)| lease)
            .ok_or_else(|| snapshot_not_found(share, snapshot))?;

        match lease.state {
            LeaseState::Leased | LeaseState::Breaking => {
                *lease = LeaseInfo::new(LeaseStatus::Unlocked, LeaseState::Broken);
                Ok(())
            }
            LeaseState::Broken => Ok(()),
            LeaseState::Available | LeaseState::Expired | LeaseState::Unknown => Err(StorageError::http(
                409,
                "LeaseNotPresentWithLeaseOperation",
                "There is currently no lease on the file share.",
            )),
        }
    }
}
