use slb_core::{LeaseInfo, SnapshotId, SnapshotRecord};

use crate::StorageError;

/// One snapshot as listed by the service, lease fields still raw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSnapshot {
    pub share_name: String,
    pub snapshot: SnapshotId,
    pub lease_status: Option<String>,
    pub lease_state: Option<String>,
}

impl RawSnapshot {
    pub fn lease(&self) -> LeaseInfo {
        LeaseInfo::from_raw(self.lease_status.as_deref(), self.lease_state.as_deref())
    }

    pub fn into_record(self) -> SnapshotRecord {
        let lease = self.lease();
        SnapshotRecord { id: self.snapshot, lease }
    }
}

/// The remote file-share service. Implementations do their own transport
/// timeouts; callers never retry.
pub trait ShareService: Send + Sync {
    /// Lease of the live share. Doubles as the credential/permission/existence check.
    fn get_share_properties(&self, share: &str) -> Result<LeaseInfo, StorageError>;

    /// Snapshots of every share whose name starts with `share_prefix`.
    fn list_snapshots(&self, share_prefix: &str) -> Result<Vec<RawSnapshot>, StorageError>;

    fn get_lease_info(&self, share: &str, snapshot: &SnapshotId) -> Result<LeaseInfo, StorageError>;

    fn break_lease(&self, share: &str, snapshot: &SnapshotId) -> Result<(), StorageError>;
}

/// Prefix listing may include `data-archive` when asking for `data`.
pub fn filter_exact_share(share: &str, listed: Vec<RawSnapshot>) -> Vec<RawSnapshot> {
    listed.into_iter().filter(|s| s.share_name == share).collect()
}
