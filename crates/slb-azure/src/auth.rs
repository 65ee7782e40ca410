use std::fmt;
use std::process::Command;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use slb_storage::StorageError;

type HmacSha256 = Hmac<Sha256>;

const STORAGE_RESOURCE: &str = "https://storage.azure.com/";

#[derive(Clone)]
pub enum Credential {
    /// Decoded storage account key.
    SharedKey(Vec<u8>),
    /// Entra ID access token for the storage resource.
    Bearer(String),
}

impl Credential {
    /// Keys are copied from the portal as base64; anything else can never sign.
    pub fn shared_key(key_b64: &str) -> Result<Self, StorageError> {
        let key = STANDARD
            .decode(key_b64.trim())
            .map_err(|_| StorageError::InvalidCredential("storage account key is not valid base64".into()))?;
        if key.is_empty() {
            return Err(StorageError::InvalidCredential("storage account key is empty".into()));
        }
        Ok(Self::SharedKey(key))
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Borrow the signed-in Azure CLI session.
    pub fn from_azure_cli() -> Result<Self, StorageError> {
        let out = Command::new("az")
            .args(["account", "get-access-token", "--resource", STORAGE_RESOURCE, "--query", "accessToken", "-o", "tsv"])
            .output()
            .map_err(|e| StorageError::InvalidCredential(format!("could not run `az` (is the Azure CLI installed?): {e}")))?;
        if !out.status.success() {
            return Err(StorageError::InvalidCredential(format!(
                "`az account get-access-token` failed; run `az login` first\nstderr:{}",
                String::from_utf8_lossy(&out.stderr)
            )));
        }
        let token = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if token.is_empty() {
            return Err(StorageError::InvalidCredential("`az` returned an empty access token".into()));
        }
        Ok(Self::Bearer(token))
    }

    pub fn is_bearer(&self) -> bool {
        matches!(self, Self::Bearer(_))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey(_) => f.write_str("SharedKey(<redacted>)"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Inputs of a SharedKey signature for requests without a body other than an
/// empty PUT.
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub content_length: Option<u64>,
    pub ms_headers: &'a [(String, String)],
    pub account: &'a str,
    pub path: &'a str,
    pub query: &'a [(&'a str, &'a str)],
}

/// The SharedKey string-to-sign for the file service.
pub fn string_to_sign(req: &SigningRequest<'_>) -> String {
    let content_length = match req.content_length {
        Some(0) | None => String::new(),
        Some(n) => n.to_string(),
    };

    let mut s = String::new();
    s.push_str(req.method);
    s.push('\n');
    // Content-Encoding, Content-Language
    s.push_str("\n\n");
    s.push_str(&content_length);
    s.push('\n');
    // Content-MD5, Content-Type, Date, If-Modified-Since, If-Match,
    // If-None-Match, If-Unmodified-Since, Range
    s.push_str("\n\n\n\n\n\n\n\n");
    s.push_str(&canonicalized_headers(req.ms_headers));
    s.push_str(&canonicalized_resource(req.account, req.path, req.query));
    s
}

fn canonicalized_headers(headers: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, &str)> = headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim()))
        .filter(|(k, _)| k.starts_with("x-ms-"))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.iter().map(|(k, v)| format!("{k}:{v}\n")).collect()
}

fn canonicalized_resource(account: &str, path: &str, query: &[(&str, &str)]) -> String {
    let mut s = format!("/{account}{path}");
    let mut params: Vec<(String, &str)> = query.iter().map(|(k, v)| (k.to_ascii_lowercase(), *v)).collect();
    params.sort();
    for (k, v) in params {
        s.push_str(&format!("\n{k}:{v}"));
    }
    s
}

pub fn sign(key: &[u8], string_to_sign: &str) -> Result<String, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| StorageError::InvalidCredential(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<(String, String)> {
        vec![
            ("x-ms-version".into(), "2024-08-04".into()),
            ("x-ms-date".into(), "Mon, 30 Sep 2024 08:00:00 GMT".into()),
            ("X-MS-Lease-Action".into(), " break ".into()),
        ]
    }

    #[test]
    fn list_string_to_sign() {
        let h = headers()[..2].to_vec();
        let sts = string_to_sign(&SigningRequest {
            method: "GET",
            content_length: None,
            ms_headers: &h,
            account: "acct",
            path: "/",
            query: &[("prefix", "data"), ("include", "snapshots"), ("comp", "list")],
        });
        assert_eq!(
            sts,
            "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:Mon, 30 Sep 2024 08:00:00 GMT\nx-ms-version:2024-08-04\n/acct/\ncomp:list\ninclude:snapshots\nprefix:data"
        );
    }

    #[test]
    fn break_string_to_sign_lowercases_and_trims() {
        let h = headers();
        let sts = string_to_sign(&SigningRequest {
            method: "PUT",
            content_length: Some(0),
            ms_headers: &h,
            account: "acct",
            path: "/data",
            query: &[("restype", "share"), ("comp", "lease"), ("sharesnapshot", "2024-01-01T00:00:00.0000000Z")],
        });
        assert!(sts.starts_with("PUT\n\n\n\n"));
        assert!(sts.contains("x-ms-lease-action:break\nx-ms-version"));
        assert!(sts.ends_with("/acct/data\ncomp:lease\nrestype:share\nsharesnapshot:2024-01-01T00:00:00.0000000Z"));
    }

    #[test]
    fn signature_is_deterministic_and_key_dependent() {
        let a = sign(b"key-one", "payload").unwrap();
        assert_eq!(a, sign(b"key-one", "payload").unwrap());
        assert_ne!(a, sign(b"key-two", "payload").unwrap());
        // 32-byte MAC, base64 encoded
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn non_base64_key_is_rejected() {
        assert!(matches!(Credential::shared_key("not base64!"), Err(StorageError::InvalidCredential(_))));
        assert!(Credential::shared_key("c2VjcmV0").is_ok());
    }

    #[test]
    fn debug_redacts() {
        let c = Credential::bearer("eyJ0eXAi");
        assert_eq!(format!("{c:?}"), "Bearer(<redacted>)");
    }
}
