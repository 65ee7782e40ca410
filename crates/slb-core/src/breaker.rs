use std::fmt::Display;

use rayon::prelude::*;

use crate::{CoreError, OutcomeRecord, Selection, SnapshotId};

/// Break every selected lease, one attempt each, in selection order.
///
/// A failing `break_one` is recorded as `Failed` with the error text and the
/// loop moves on. `on_outcome` sees each record right after it is appended.
pub fn break_all<F, E, S>(selection: &Selection, mut break_one: F, mut on_outcome: S) -> Vec<OutcomeRecord>
where
    F: FnMut(&SnapshotId) -> Result<(), E>,
    E: Display,
    S: FnMut(&OutcomeRecord),
{
    let mut ledger = Vec::with_capacity(selection.to_break.len());
    for snap in &selection.to_break {
        let record = attempt(&snap.id, &mut break_one);
        on_outcome(&record);
        ledger.push(record);
    }
    ledger
}

/// Same contract as [`break_all`], spread over at most `workers` threads.
///
/// The returned ledger is still in selection order; `on_outcome` is called in
/// completion order.
pub fn break_all_parallel<F, E, S>(
    selection: &Selection,
    workers: usize,
    break_one: F,
    on_outcome: S,
) -> Result<Vec<OutcomeRecord>, CoreError>
where
    F: Fn(&SnapshotId) -> Result<(), E> + Sync,
    E: Display,
    S: Fn(&OutcomeRecord) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(pool_size(workers, selection.to_break.len()))
        .thread_name(|i| format!("slb-break-{i}"))
        .build()
        .map_err(|e| CoreError::WorkerPool(e.to_string()))?;

    let ledger = pool.install(|| {
        selection
            .to_break
            .par_iter()
            .map(|snap| {
                let record = attempt(&snap.id, &break_one);
                on_outcome(&record);
                record
            })
            .collect()
    });
    Ok(ledger)
}

/// Never more threads than items, never fewer than one.
fn pool_size(workers: usize, items: usize) -> usize {
    workers.clamp(1, items.max(1))
}

fn attempt<F, E>(id: &SnapshotId, break_one: F) -> OutcomeRecord
where
    F: FnOnce(&SnapshotId) -> Result<(), E>,
    E: Display,
{
    match break_one(id) {
        Ok(()) => OutcomeRecord::success(id.clone()),
        Err(e) => OutcomeRecord::failed(id.clone(), e.to_string()),
    }
}
