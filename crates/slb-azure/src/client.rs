use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Method, StatusCode, Url};
use slb_core::{LeaseInfo, SnapshotId};
use slb_storage::{RawSnapshot, ShareService, StorageError};

use crate::auth::{sign, string_to_sign, Credential, SigningRequest};
use crate::listing::{parse_error_message, parse_share_page};

pub const API_VERSION: &str = "2024-08-04";
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("slb/", env!("CARGO_PKG_VERSION"));
const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Azure Files share endpoint for one storage account.
pub struct AzureShareService {
    http: Client,
    account: String,
    endpoint: Url,
    credential: Credential,
}

impl AzureShareService {
    pub fn new(account: &str, endpoint_suffix: &str, credential: Credential) -> Result<Self, StorageError> {
        Self::with_endpoint(account, &format!("https://{account}.file.{endpoint_suffix}"), credential)
    }

    /// Explicit endpoint. A path-style endpoint such as
    /// `http://127.0.0.1:10000/devstoreaccount1` keeps its path as a prefix of
    /// every request path.
    pub fn with_endpoint(account: &str, endpoint: &str, credential: Credential) -> Result<Self, StorageError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| StorageError::Transport(format!("invalid endpoint {endpoint}: {e}")))?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { http, account: account.to_string(), endpoint, credential })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Endpoint path joined with the resource path; also what gets signed.
    fn request_path(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.path().trim_end_matches('/'), path)
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<Response, StorageError> {
        let path = self.request_path(path);
        let path = path.as_str();
        let mut url = self.endpoint.clone();
        url.set_path(path);
        url.query_pairs_mut().extend_pairs(query.iter());

        let mut ms_headers: Vec<(String, String)> = vec![
            ("x-ms-date".into(), Utc::now().format(RFC1123).to_string()),
            ("x-ms-version".into(), API_VERSION.into()),
        ];
        if self.credential.is_bearer() {
            // token auth on the file service is only honoured with a declared intent
            ms_headers.push(("x-ms-file-request-intent".into(), "backup".into()));
        }
        ms_headers.extend(extra_headers.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let content_length = (method == Method::PUT).then_some(0);
        let mut req = self.http.request(method.clone(), url);
        for (k, v) in &ms_headers {
            req = req.header(k.as_str(), v.as_str());
        }
        req = match &self.credential {
            Credential::SharedKey(key) => {
                let sts = string_to_sign(&SigningRequest {
                    method: method.as_str(),
                    content_length,
                    ms_headers: &ms_headers,
                    account: &self.account,
                    path,
                    query,
                });
                req.header(AUTHORIZATION, format!("SharedKey {}:{}", self.account, sign(key, &sts)?))
            }
            Credential::Bearer(token) => req.bearer_auth(token),
        };
        if content_length.is_some() {
            req = req.header(CONTENT_LENGTH, "0").body(Vec::new());
        }

        tracing::debug!(%method, path, ?query, "azure files request");
        let resp = req.send().map_err(|e| StorageError::Transport(e.to_string()))?;
        tracing::debug!(status = resp.status().as_u16(), path, "azure files response");
        check_status(resp, path)
    }
}

fn check_status(resp: Response, what: &str) -> Result<Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = resp.headers().get("x-ms-error-code").and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = resp.text().unwrap_or_default();
    Err(map_error(status, code, &body, what))
}

/// Non-2xx status, `x-ms-error-code` header and XML body to a typed error.
pub fn map_error(status: StatusCode, code: Option<String>, body: &str, what: &str) -> StorageError {
    let message = parse_error_message(body)
        .or_else(|| code.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_string());

    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound(format!("{what}: {message}")),
        StatusCode::FORBIDDEN => StorageError::Forbidden(message),
        _ => StorageError::Http { status: status.as_u16(), code, message },
    }
}

fn lease_from_headers(resp: &Response) -> LeaseInfo {
    let header = |name: &str| resp.headers().get(name).and_then(|v| v.to_str().ok());
    LeaseInfo::from_raw(header("x-ms-lease-status"), header("x-ms-lease-state"))
}

fn share_path(share: &str) -> String {
    format!("/{share}")
}

impl ShareService for AzureShareService {
    fn get_share_properties(&self, share: &str) -> Result<LeaseInfo, StorageError> {
        let resp = self.send(Method::GET, &share_path(share), &[("restype", "share")], &[])?;
        Ok(lease_from_headers(&resp))
    }

    fn list_snapshots(&self, share_prefix: &str) -> Result<Vec<RawSnapshot>, StorageError> {
        let mut out = vec![];
        let mut marker: Option<String> = None;
        loop {
            let mut query = vec![("comp", "list"), ("include", "snapshots"), ("prefix", share_prefix)];
            if let Some(m) = marker.as_deref() {
                query.push(("marker", m));
            }
            let body = self
                .send(Method::GET, "/", &query, &[])?
                .text()
                .map_err(|e| StorageError::Transport(e.to_string()))?;
            let page = parse_share_page(&body)?;
            out.extend(page.snapshots);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(out)
    }

    fn get_lease_info(&self, share: &str, snapshot: &SnapshotId) -> Result<LeaseInfo, StorageError> {
        let resp = self.send(
            Method::GET,
            &share_path(share),
            &[("restype", "share"), ("sharesnapshot", snapshot.as_str())],
            &[],
        )?;
        Ok(lease_from_headers(&resp))
    }

    fn break_lease(&self, share: &str, snapshot: &SnapshotId) -> Result<(), StorageError> {
        self.send(
            Method::PUT,
            &share_path(share),
            &[("comp", "lease"), ("restype", "share"), ("sharesnapshot", snapshot.as_str())],
            &[("x-ms-lease-action", "break")],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_account_and_suffix() {
        let svc = AzureShareService::new("acct", DEFAULT_ENDPOINT_SUFFIX, Credential::bearer("t")).unwrap();
        assert_eq!(svc.endpoint().as_str(), "https://acct.file.core.windows.net/");
    }

    #[test]
    fn sovereign_cloud_suffix() {
        let svc = AzureShareService::new("acct", "core.chinacloudapi.cn", Credential::bearer("t")).unwrap();
        assert_eq!(svc.endpoint().host_str(), Some("acct.file.core.chinacloudapi.cn"));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        assert!(AzureShareService::with_endpoint("acct", "not a url", Credential::bearer("t")).is_err());
    }

    #[test]
    fn share_paths() {
        assert_eq!(share_path("data"), "/data");
    }

    #[test]
    fn path_style_endpoint_keeps_account_segment() {
        let svc = AzureShareService::with_endpoint(
            "devstoreaccount1",
            "http://127.0.0.1:10000/devstoreaccount1",
            Credential::bearer("t"),
        )
        .unwrap();
        assert_eq!(svc.request_path("/data"), "/devstoreaccount1/data");
        assert_eq!(svc.request_path("/"), "/devstoreaccount1/");

        let hosted = AzureShareService::new("acct", DEFAULT_ENDPOINT_SUFFIX, Credential::bearer("t")).unwrap();
        assert_eq!(hosted.request_path("/data"), "/data");
        assert_eq!(hosted.request_path("/"), "/");
    }

    const NO_LEASE: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>LeaseNotPresentWithLeaseOperation</Code><Message>There is currently no lease on the file share.\nRequestId:abc</Message></Error>";

    #[test]
    fn not_found_keeps_resource_and_message() {
        let body = "<Error><Code>ShareNotFound</Code><Message>The specified share does not exist.</Message></Error>";
        let e = map_error(StatusCode::NOT_FOUND, Some("ShareNotFound".into()), body, "/data");
        assert_eq!(e, StorageError::NotFound("/data: The specified share does not exist.".into()));
    }

    #[test]
    fn forbidden_uses_message_then_code() {
        let body = "<Error><Code>AuthenticationFailed</Code><Message>Server failed to authenticate the request.</Message></Error>";
        let e = map_error(StatusCode::FORBIDDEN, Some("AuthenticationFailed".into()), body, "/data");
        assert_eq!(e, StorageError::Forbidden("Server failed to authenticate the request.".into()));

        let e = map_error(StatusCode::FORBIDDEN, Some("AuthorizationPermissionMismatch".into()), "", "/data");
        assert_eq!(e, StorageError::Forbidden("AuthorizationPermissionMismatch".into()));
    }

    #[test]
    fn other_statuses_become_http_with_code_and_message() {
        let e = map_error(StatusCode::CONFLICT, Some("LeaseNotPresentWithLeaseOperation".into()), NO_LEASE, "/data");
        assert_eq!(
            e,
            StorageError::Http {
                status: 409,
                code: Some("LeaseNotPresentWithLeaseOperation".into()),
                message: "There is currently no lease on the file share.".into(),
            }
        );
    }

    #[test]
    fn bare_status_falls_back_to_reason_phrase() {
        let e = map_error(StatusCode::SERVICE_UNAVAILABLE, None, "", "/");
        assert_eq!(e, StorageError::Http { status: 503, code: None, message: "Service Unavailable".into() });
    }
}
