//! Response cache: fingerprint → full HTTP response.
//!
//! # Responsibilities
//! - Compute the deterministic per-page fingerprint
//! - Serve recorded responses (200 replays and memoized redirects)
//! - Persist header + content records written by the recorder
//! - Conditional-GET comparison against the fingerprint token
//!
//! # Design Decisions
//! - Two co-located records per fingerprint: `<token>-headers` and
//!   `<token>-content`; a 200 with either record missing is a full miss,
//!   partial records are never served
//! - The fingerprint is the sole staleness mechanism: any change to the
//!   version, the env vars or the URL changes the token, so entries are
//!   never updated in place
//! - Only whitelisted headers are recorded; everything else is
//!   re-derived per request

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::cache::store::KeyValueStore;
use crate::directory::types::EnvVars;

/// Header-record field carrying the response status.
const STATUS_FIELD: &str = "statusCode";

/// Headers recorded verbatim into the header record.
const BASE_ALLOWLIST: [&str; 5] = [
    "content-type",
    "cache-control",
    "content-encoding",
    "etag",
    "location",
];

/// Compute the fingerprint for one logical page.
///
/// Stable across calls given identical inputs; changes whenever the
/// version, any env var, or the normalized URL changes.
pub fn compute_fingerprint(version_id: &str, env_vars: &EnvVars, normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version_id.as_bytes());
    hasher.update(b"\n");
    for (key, value) in env_vars {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(normalized_url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Protocol + host + path, querystring stripped.
pub fn normalized_url(secure: bool, host: &str, path: &str) -> String {
    let scheme = if secure { "https" } else { "http" };
    format!("{scheme}://{host}{path}")
}

/// Render the fingerprint as an ETag value.
pub fn etag_value(token: &str) -> String {
    format!("\"{token}\"")
}

/// Whether an `If-None-Match` header names the given token.
pub fn if_none_match_matches(header: &str, token: &str) -> bool {
    header.split(',').any(|candidate| {
        let candidate = candidate.trim();
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == token
    })
}

/// A recorded response ready to replay.
#[derive(Debug)]
pub enum CachedResponse {
    /// A memoized 301/302.
    Redirect { status: StatusCode, location: String },
    /// A recorded 200 with its whitelisted headers and body bytes.
    Content {
        headers: Vec<(String, String)>,
        body: Bytes,
    },
}

/// Fingerprint-keyed store of full HTTP responses.
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    allowlist: Vec<String>,
    max_body_bytes: usize,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        header_prefix: &str,
        max_body_bytes: usize,
        enabled: bool,
    ) -> Self {
        let mut allowlist: Vec<String> =
            BASE_ALLOWLIST.iter().map(|h| h.to_string()).collect();
        for suffix in ["app-id", "version-id", "version-name"] {
            allowlist.push(format!("{header_prefix}{suffix}"));
        }
        Self {
            store,
            allowlist,
            max_body_bytes,
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Project a response's headers onto the recording whitelist.
    pub fn filter_headers(&self, headers: &HeaderMap) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        for name in &self.allowlist {
            if let Some(value) = headers.get(name.as_str()) {
                if let Ok(value) = value.to_str() {
                    fields.insert(name.clone(), value.to_string());
                }
            }
        }
        fields
    }

    /// Try to replay a recorded response. Any store failure, malformed
    /// record, or missing half of a 200 pair is a miss.
    pub async fn try_serve(&self, token: &str) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }

        let header_bytes = match self.store.get(&header_key(token)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "Response cache header read failed, treating as miss");
                return None;
            }
        };
        let fields: BTreeMap<String, String> = match serde_json::from_slice(&header_bytes) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "Malformed response cache header record, treating as miss");
                return None;
            }
        };
        let status = fields
            .get(STATUS_FIELD)
            .and_then(|s| s.parse::<u16>().ok())
            .and_then(|s| StatusCode::from_u16(s).ok())?;

        if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
            let location = fields.get("location")?.clone();
            return Some(CachedResponse::Redirect { status, location });
        }

        if status != StatusCode::OK {
            return None;
        }

        let body = match self.store.get(&content_key(token)).await {
            Ok(Some(bytes)) => Bytes::from(bytes),
            Ok(None) => {
                // Content purged independently of the headers: full miss.
                tracing::debug!(token = %token, "Response cache content record missing, treating as miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "Response cache content read failed, treating as miss");
                return None;
            }
        };

        let headers = fields
            .into_iter()
            .filter(|(name, _)| name != STATUS_FIELD)
            .collect();
        Some(CachedResponse::Content { headers, body })
    }

    /// Persist one response under the fingerprint. Called by the recorder
    /// once a response has streamed to completion; write failures are
    /// logged and swallowed.
    pub async fn store_entry(
        &self,
        token: &str,
        status: StatusCode,
        mut fields: BTreeMap<String, String>,
        body: Option<Bytes>,
    ) {
        if !self.enabled {
            return;
        }
        fields.insert(STATUS_FIELD.to_string(), status.as_u16().to_string());

        let header_bytes = match serde_json::to_vec(&fields) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize response cache header record");
                return;
            }
        };
        if let Err(e) = self.store.put(&header_key(token), header_bytes, None).await {
            tracing::warn!(token = %token, error = %e, "Response cache header write failed");
            return;
        }
        if let Some(body) = body {
            if let Err(e) = self.store.put(&content_key(token), body.to_vec(), None).await {
                tracing::warn!(token = %token, error = %e, "Response cache content write failed");
            }
        }
    }
}

fn header_key(token: &str) -> String {
    format!("{token}-headers")
}

fn content_key(token: &str) -> String {
    format!("{token}-content")
}
