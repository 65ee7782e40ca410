use chrono::{DateTime, Utc};

use crate::{parse_snapshot_timestamp, ClassifiedSnapshot, CoreError, SnapshotRecord};

/// Tag every record with its decoded instant and whether it is past `cutoff`.
///
/// Output order follows input order. A single unparsable identifier fails the
/// whole batch.
pub fn classify(records: &[SnapshotRecord], cutoff: DateTime<Utc>) -> Result<Vec<ClassifiedSnapshot>, CoreError> {
    records
        .iter()
        .map(|r| {
            let instant = parse_snapshot_timestamp(r.id.as_str())?;
            Ok(ClassifiedSnapshot {
                id: r.id.clone(),
                instant,
                lease: r.lease,
                past_cutoff: instant < cutoff,
            })
        })
        .collect()
}

/// Display order: oldest first. Stable, so equal instants keep listing order.
pub fn sort_oldest_first(items: &mut [ClassifiedSnapshot]) {
    items.sort_by_key(|c| c.instant);
}
