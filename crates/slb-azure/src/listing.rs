use serde::Deserialize;
use slb_core::SnapshotId;
use slb_storage::{RawSnapshot, StorageError};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    shares: Shares,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Shares {
    #[serde(default, rename = "Share")]
    items: Vec<ShareItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShareItem {
    name: String,
    #[serde(default)]
    snapshot: Option<String>,
    #[serde(default)]
    properties: ShareProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShareProperties {
    #[serde(default)]
    lease_status: Option<String>,
    #[serde(default)]
    lease_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// One page of a List Shares response.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SharePage {
    /// Only entries that carry a snapshot; live shares are dropped.
    pub snapshots: Vec<RawSnapshot>,
    pub next_marker: Option<String>,
}

pub fn parse_share_page(xml: &str) -> Result<SharePage, StorageError> {
    let results: EnumerationResults =
        quick_xml::de::from_str(xml).map_err(|e| StorageError::Decode(format!("list shares: {e}")))?;

    let snapshots = results
        .shares
        .items
        .into_iter()
        .filter_map(|item| {
            let snapshot = non_empty(item.snapshot)?;
            Some(RawSnapshot {
                share_name: item.name,
                snapshot: SnapshotId::from_str(snapshot),
                lease_status: non_empty(item.properties.lease_status),
                lease_state: non_empty(item.properties.lease_state),
            })
        })
        .collect();

    Ok(SharePage { snapshots, next_marker: non_empty(results.next_marker) })
}

/// First line of `<Error><Message>`; the rest is request ids and timestamps.
pub fn parse_error_message(xml: &str) -> Option<String> {
    let body: ErrorBody = quick_xml::de::from_str(xml).ok()?;
    body.message.and_then(|m| m.lines().next().map(|l| l.trim().to_string())).filter(|m| !m.is_empty())
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
