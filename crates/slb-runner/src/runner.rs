use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use slb_core::{
    break_all, break_all_parallel, classification_table, classify, cutoff_from_days, select, sort_oldest_first,
    ClassifiedSnapshot, LeaseInfo, OutcomeRecord, RunReport, Selection, SelectionReason, SnapshotId, SnapshotRecord,
    Summary,
};
use slb_storage::{filter_exact_share, ShareService};
use tracing::{debug, error, info, warn};

use crate::logging::FILE_ONLY_TARGET;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub days: u32,
    /// Concurrent breaks; 1 (or 0) runs them one after another.
    pub parallel: usize,
    pub isolate_fetch_errors: bool,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(days: u32) -> Self {
        Self { days, parallel: 1, isolate_fetch_errors: false, dry_run: false }
    }
}

/// One retention pass over a single share.
pub struct Runner<'a> {
    pub service: &'a dyn ShareService,
    pub share: String,
    pub opts: RunOptions,
}

impl<'a> Runner<'a> {
    pub fn new(service: &'a dyn ShareService, share: impl Into<String>, opts: RunOptions) -> Self {
        Self { service, share: share.into(), opts }
    }

    /// Snapshots of exactly this share, each with a freshly fetched lease.
    pub fn collect(&self) -> Result<Vec<SnapshotRecord>> {
        let listed = self
            .service
            .list_snapshots(&self.share)
            .with_context(|| format!("list snapshots of share '{}'", self.share))?;
        let listed_count = listed.len();
        let exact = filter_exact_share(&self.share, listed);
        debug!(share = %self.share, listed = listed_count, kept = exact.len(), "listed snapshots");

        let mut records = Vec::with_capacity(exact.len());
        for raw in exact {
            let id = raw.snapshot;
            let lease = match self.service.get_lease_info(&self.share, &id) {
                Ok(lease) => lease,
                Err(e) if self.opts.isolate_fetch_errors => {
                    warn!(snapshot = %id, error = %e, "lease fetch failed, recording lease as unknown");
                    LeaseInfo::unknown()
                }
                Err(e) => return Err(e).with_context(|| format!("fetch lease info for snapshot {id}")),
            };
            records.push(SnapshotRecord { id, lease });
        }
        Ok(records)
    }

    /// List, classify, select, break and summarise. Human-readable progress goes
    /// to `out`; `confirm` is consulted at most once, for the fallback tier.
    pub fn run<C, W>(&self, now: DateTime<Utc>, confirm: C, out: &mut W) -> Result<RunReport>
    where
        C: FnOnce(&[ClassifiedSnapshot]) -> bool,
        W: Write,
    {
        let cutoff = cutoff_from_days(now, self.opts.days).context("compute retention cutoff")?;
        writeln!(out, "Checking snapshots for '{}' older than {} days...\n", self.share, self.opts.days)?;
        info!(share = %self.share, days = self.opts.days, %cutoff, "run started");

        let records = self.collect()?;
        let mut classified = classify(&records, cutoff).context("classify snapshots")?;
        sort_oldest_first(&mut classified);
        write!(out, "{}", classification_table(&classified))?;

        let mut asked = false;
        let selection = select(&classified, |candidates| {
            asked = true;
            let yes = confirm(candidates);
            info!(candidates = candidates.len(), confirmed = yes, "fallback confirmation");
            yes
        });

        let mut report = RunReport {
            share: self.share.clone(),
            retention_days: self.opts.days,
            cutoff,
            snapshots: classified,
            reason: selection.reason,
            ledger: vec![],
            summary: Summary::default(),
        };

        if selection.is_empty() {
            if asked {
                writeln!(out, "Nothing to do. Exiting.")?;
            } else {
                writeln!(out, "\nNo snapshots to process. Exiting.")?;
            }
            info!(share = %self.share, "nothing selected");
            return Ok(report);
        }

        if self.opts.dry_run {
            writeln!(out, "\nDry run: would break {} lease(s) ({}):", selection.to_break.len(), reason_label(selection.reason))?;
            for id in selection.ids() {
                writeln!(out, "- {id}")?;
            }
            return Ok(report);
        }

        writeln!(out)?;
        report.ledger = self.break_selected(&selection, out)?;
        report.summary = Summary::from_ledger(&report.ledger);
        write!(out, "\n{}", report.summary.summary_table())?;
        info!(
            share = %self.share,
            succeeded = report.summary.success_count(),
            failed = report.summary.failure_count(),
            "run finished"
        );
        Ok(report)
    }

    fn break_selected<W: Write>(&self, selection: &Selection, out: &mut W) -> Result<Vec<OutcomeRecord>> {
        let break_one = |id: &SnapshotId| self.service.break_lease(&self.share, id);

        if self.opts.parallel <= 1 {
            let mut write_err = None;
            let ledger = break_all(selection, break_one, |record| {
                log_outcome(record);
                if let Err(e) = writeln!(out, "{}", progress_line(record)) {
                    write_err.get_or_insert(e);
                }
            });
            if let Some(e) = write_err {
                return Err(e).context("write progress");
            }
            return Ok(ledger);
        }

        debug!(workers = self.opts.parallel, "breaking leases in parallel");
        let completed = Mutex::new(0usize);
        let ledger = break_all_parallel(selection, self.opts.parallel, break_one, |record| {
            log_outcome(record);
            let mut n = completed.lock().unwrap_or_else(|e| e.into_inner());
            *n += 1;
            debug!(done = *n, total = selection.to_break.len(), "break progress");
        })
        .context("start break workers")?;
        // Progress lines in selection order once every worker is done.
        for record in &ledger {
            writeln!(out, "{}", progress_line(record))?;
        }
        Ok(ledger)
    }
}

fn progress_line(record: &OutcomeRecord) -> String {
    if record.is_success() {
        format!("Snapshot {} - SUCCESS", record.id)
    } else {
        format!("Snapshot {} - FAILED (check logs)", record.id)
    }
}

/// File log only; the operator sees [`progress_line`] for the same record.
fn log_outcome(record: &OutcomeRecord) {
    match &record.error_detail {
        None => info!(target: FILE_ONLY_TARGET, snapshot = %record.id, "SUCCESS"),
        Some(detail) => error!(target: FILE_ONLY_TARGET, snapshot = %record.id, error = %detail, "FAILED"),
    }
}

fn reason_label(reason: SelectionReason) -> &'static str {
    match reason {
        SelectionReason::CutoffEligible => "older than cutoff",
        SelectionReason::UserConfirmedFallback => "locked, confirmed by operator",
        SelectionReason::None => "none",
    }
}
