use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use slb_hitl::prompt_until;
use slb_storage::{ShareService, StorageError};
use tracing::{info, warn};

use crate::validate::validate_share;

/// Result of checking that the credential can reach a share.
#[derive(Debug, PartialEq, Eq)]
pub enum AccessCheck {
    /// Share reachable; carries the (possibly re-entered) share name.
    Ready(String),
    /// Credential rejected, or the service could not be asked.
    Denied(StorageError),
}

/// Read the share's properties with the configured credential. A missing share
/// is reported on `out` and a new name is asked for on `input` until one
/// resolves; any other error ends the check.
pub fn verify_share_access<R: BufRead, W: Write>(
    service: &dyn ShareService,
    account: &str,
    mut share: String,
    input: &mut R,
    out: &mut W,
) -> Result<AccessCheck> {
    writeln!(out, "Validating credentials and permissions...")?;
    loop {
        match service.get_share_properties(&share) {
            Ok(lease) => {
                info!(%share, status = %lease.status, state = %lease.state, "share reachable");
                return Ok(AccessCheck::Ready(share));
            }
            Err(StorageError::NotFound(detail)) => {
                warn!(%share, %detail, "share not found");
                writeln!(out, "ERROR: File share '{share}' was not found in account '{account}'.")?;
                share = prompt_until(input, out, "Enter file share name: ", |s| {
                    validate_share(s).map_err(|e| e.to_string())
                })
                .context("read file share name")?;
            }
            Err(e) => return Ok(AccessCheck::Denied(e)),
        }
    }
}
