use std::env;

use slb_azure::{AzureShareService, Credential, DEFAULT_ENDPOINT_SUFFIX};
use slb_storage::{filter_exact_share, ShareService};

/// Read-only smoke test against a real account; never breaks a lease.
#[test]
fn list_and_fetch_smoke() {
    if env::var("SLB_ONLINE").ok().as_deref() != Some("1") {
        eprintln!("skipping list_and_fetch_smoke (SLB_ONLINE!=1)");
        return;
    }
    let account = env::var("SLB_ACCOUNT").expect("SLB_ACCOUNT");
    let key = env::var("SLB_KEY").expect("SLB_KEY");
    let share = env::var("SLB_SHARE").expect("SLB_SHARE");

    let svc = AzureShareService::new(&account, DEFAULT_ENDPOINT_SUFFIX, Credential::shared_key(&key).unwrap()).unwrap();
    svc.get_share_properties(&share).unwrap();

    let snapshots = filter_exact_share(&share, svc.list_snapshots(&share).unwrap());
    for s in snapshots.iter().take(3) {
        svc.get_lease_info(&share, &s.snapshot).unwrap();
    }
}
