use std::cell::Cell;

use chrono::{DateTime, Duration, TimeZone, Utc};
use slb_core::{LeaseInfo, LeaseState, Outcome, SelectionReason};
use slb_runner::{RunOptions, Runner};
use slb_storage::{InMemoryShareService, StorageError};

const SHARE: &str = "data";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 30, 8, 0, 0).unwrap()
}

/// Snapshot id in the service's own 7-digit format.
fn snap_id(days_old: i64) -> String {
    (now() - Duration::days(days_old)).format("%Y-%m-%dT%H:%M:%S.0000000Z").to_string()
}

fn service(snaps: &[(i64, LeaseInfo)]) -> InMemoryShareService {
    let svc = InMemoryShareService::new();
    svc.add_share(SHARE);
    for (days, lease) in snaps {
        svc.add_snapshot(SHARE, &snap_id(*days), *lease);
    }
    svc
}

fn never_asked(_: &[slb_core::ClassifiedSnapshot]) -> bool {
    panic!("confirmation must not be requested");
}

#[test]
fn test_cutoff_tier_breaks_without_prompt() {
    let svc = service(&[
        (45, LeaseInfo::locked_leased()),
        (10, LeaseInfo::unlocked_available()),
        (5, LeaseInfo::locked_leased()),
    ]);
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap();

    assert_eq!(report.reason, SelectionReason::CutoffEligible);
    assert_eq!(report.snapshots.len(), 3);
    assert_eq!(svc.break_calls(), vec![snap_id(45)]);
    assert_eq!(report.summary.success_count(), 1);
    assert_eq!(report.summary.failure_count(), 0);
    assert_eq!(svc.lease_of(SHARE, &snap_id(45)).unwrap().state, LeaseState::Broken);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&format!("Snapshot {} - SUCCESS", snap_id(45))));
    assert!(text.contains("=== FINAL SUMMARY ==="));
    assert!(text.contains("Total succeeded: 1"));
    assert!(text.contains("Total failed: 0"));
}

#[test]
fn test_fallback_breaks_locked_after_one_confirmation() {
    let svc = service(&[(10, LeaseInfo::locked_leased()), (5, LeaseInfo::unlocked_available())]);
    let calls = Cell::new(0);
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30))
        .run(
            now(),
            |candidates| {
                calls.set(calls.get() + 1);
                assert_eq!(candidates.len(), 1);
                true
            },
            &mut out,
        )
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(report.reason, SelectionReason::UserConfirmedFallback);
    assert_eq!(svc.break_calls(), vec![snap_id(10)]);
    assert_eq!(report.ledger.len(), 1);
    assert_eq!(report.ledger[0].outcome, Outcome::Success);
}

#[test]
fn test_declined_fallback_does_nothing() {
    let svc = service(&[(10, LeaseInfo::locked_leased())]);
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), |_| false, &mut out).unwrap();

    assert_eq!(report.reason, SelectionReason::None);
    assert!(report.ledger.is_empty());
    assert!(svc.break_calls().is_empty());
    assert!(String::from_utf8(out).unwrap().contains("Nothing to do."));
}

#[test]
fn test_nothing_locked_and_nothing_old() {
    let svc = service(&[(3, LeaseInfo::unlocked_available())]);
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap();

    assert!(report.ledger.is_empty());
    assert!(String::from_utf8(out).unwrap().contains("No snapshots to process."));
}

#[test]
fn test_unlocked_old_snapshot_fails_but_run_completes() {
    let svc = service(&[
        (60, LeaseInfo::locked_leased()),
        (50, LeaseInfo::unlocked_available()),
        (40, LeaseInfo::locked_leased()),
    ]);
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap();

    let outcomes: Vec<_> = report.ledger.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Success, Outcome::Failed, Outcome::Success]);
    let detail = report.ledger[1].error_detail.as_deref().unwrap();
    assert!(detail.contains("409"), "{detail}");
    assert_eq!(report.summary.failure_count(), 1);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&format!("Snapshot {} - FAILED (check logs)", snap_id(50))));
}

#[test]
fn test_breaks_run_oldest_first() {
    let svc = service(&[(40, LeaseInfo::locked_leased()), (90, LeaseInfo::locked_leased()), (60, LeaseInfo::locked_leased())]);
    let mut out = Vec::new();
    Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap();
    assert_eq!(svc.break_calls(), vec![snap_id(90), snap_id(60), snap_id(40)]);
}

#[test]
fn test_prefix_siblings_are_ignored() {
    let svc = service(&[(45, LeaseInfo::locked_leased())]);
    svc.add_snapshot("data-archive", &snap_id(100), LeaseInfo::locked_leased());
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap();

    assert_eq!(report.snapshots.len(), 1);
    assert_eq!(svc.break_calls(), vec![snap_id(45)]);
    assert_eq!(svc.lease_of("data-archive", &snap_id(100)), Some(LeaseInfo::locked_leased()));
}

#[test]
fn test_lease_fetch_failure_is_fatal_by_default() {
    let svc = service(&[(45, LeaseInfo::locked_leased()), (40, LeaseInfo::locked_leased())]);
    svc.fail_lease_fetch(&snap_id(40));
    let mut out = Vec::new();
    let err = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap_err();

    assert!(format!("{err:#}").contains("fetch lease info"));
    assert!(svc.break_calls().is_empty());
}

#[test]
fn test_lease_fetch_failure_can_be_isolated() {
    let svc = service(&[(45, LeaseInfo::locked_leased()), (40, LeaseInfo::locked_leased())]);
    svc.fail_lease_fetch(&snap_id(40));
    let opts = RunOptions { isolate_fetch_errors: true, ..RunOptions::new(30) };
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, opts).run(now(), never_asked, &mut out).unwrap();

    let unknown = report.snapshots.iter().find(|s| s.id.as_str() == snap_id(40)).unwrap();
    assert_eq!(unknown.lease, LeaseInfo::unknown());
    // still past cutoff, so still attempted
    assert_eq!(svc.break_calls(), vec![snap_id(45), snap_id(40)]);
    assert_eq!(report.summary.success_count(), 2);
}

#[test]
fn test_malformed_snapshot_id_is_fatal() {
    let svc = service(&[(45, LeaseInfo::locked_leased())]);
    svc.add_snapshot(SHARE, "not-a-timestamp", LeaseInfo::locked_leased());
    let mut out = Vec::new();
    let err = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap_err();

    assert!(format!("{err:#}").contains("classify"));
    assert!(svc.break_calls().is_empty());
}

#[test]
fn test_listing_failure_is_fatal() {
    let svc = service(&[(45, LeaseInfo::locked_leased())]);
    svc.deny_all();
    let mut out = Vec::new();
    let err = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap_err();
    assert!(matches!(err.downcast_ref::<StorageError>(), Some(StorageError::Forbidden(_))));
}

#[test]
fn test_dry_run_breaks_nothing() {
    let svc = service(&[(45, LeaseInfo::locked_leased())]);
    let opts = RunOptions { dry_run: true, ..RunOptions::new(30) };
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, opts).run(now(), never_asked, &mut out).unwrap();

    assert_eq!(report.reason, SelectionReason::CutoffEligible);
    assert!(report.ledger.is_empty());
    assert!(svc.break_calls().is_empty());
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Dry run: would break 1 lease(s)"));
    assert!(text.contains(&snap_id(45)));
}

#[test]
fn test_parallel_breaks_keep_selection_order() {
    let days: Vec<i64> = (31..51).collect();
    let snaps: Vec<_> = days.iter().map(|d| (*d, LeaseInfo::locked_leased())).collect();
    let svc = service(&snaps);
    svc.fail_break(&snap_id(40), StorageError::Transport("timed out".into()));
    let opts = RunOptions { parallel: 4, ..RunOptions::new(30) };
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, opts).run(now(), never_asked, &mut out).unwrap();

    let expected: Vec<String> = days.iter().rev().map(|d| snap_id(*d)).collect();
    let ledger_ids: Vec<String> = report.ledger.iter().map(|r| r.id.as_str().to_string()).collect();
    assert_eq!(ledger_ids, expected);
    assert_eq!(svc.break_calls().len(), 20);
    assert_eq!(report.summary.failure_count(), 1);
    assert_eq!(report.summary.failed[0].id.as_str(), snap_id(40));
}

#[test]
fn test_report_serializes_for_json_output() {
    let svc = service(&[(45, LeaseInfo::locked_leased())]);
    let mut out = Vec::new();
    let report = Runner::new(&svc, SHARE, RunOptions::new(30)).run(now(), never_asked, &mut out).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["share"], "data");
    assert_eq!(json["retention_days"], 30);
    assert_eq!(json["ledger"].as_array().unwrap().len(), 1);
}

#[test]
fn test_retention_beyond_calendar_fails_cleanly() {
    let days = slb_runner::validate_days(100_000_000).unwrap();
    let svc = service(&[(45, LeaseInfo::locked_leased())]);
    let mut out = Vec::new();
    let err = Runner::new(&svc, SHARE, RunOptions::new(days)).run(now(), never_asked, &mut out).unwrap_err();

    assert!(format!("{err:#}").contains("retention cutoff"));
    assert!(svc.break_calls().is_empty());
}
