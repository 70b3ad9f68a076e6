//! Passive response recorder.
//!
//! # Responsibilities
//! - Capture the header record (whitelisted fields + status) before the
//!   first body byte is written
//! - Mirror outgoing body chunks into the content record
//! - Persist both records only on a clean end-of-stream
//!
//! # Design Decisions
//! - A stream decorator, not a patch: the response body is wrapped and
//!   the original bytes flow through untouched
//! - Completion is an explicit finalize signal (the stream yielding
//!   `None`); a client disconnect drops the recorder before that point
//!   and nothing is written, so truncated bodies are never cached
//! - Bodies over the configured cap abandon recording and keep streaming
//! - The store write runs in a detached task off the response path

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::cache::response::ResponseCache;

/// Statuses the cache is allowed to record.
fn recordable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
    )
}

/// Accumulates one response for the cache.
struct BodyRecorder {
    cache: Arc<ResponseCache>,
    token: String,
    status: StatusCode,
    fields: BTreeMap<String, String>,
    buffer: BytesMut,
    overflowed: bool,
}

impl BodyRecorder {
    fn on_chunk(&mut self, chunk: &Bytes) {
        if self.overflowed {
            return;
        }
        if self.buffer.len() + chunk.len() > self.cache.max_body_bytes() {
            tracing::debug!(
                token = %self.token,
                limit = self.cache.max_body_bytes(),
                "Response body exceeds recording cap, abandoning capture"
            );
            self.overflowed = true;
            self.buffer.clear();
            return;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Finalize: called exactly once, on clean end-of-stream.
    fn on_complete(self) {
        if self.overflowed {
            return;
        }
        let BodyRecorder {
            cache,
            token,
            status,
            fields,
            buffer,
            ..
        } = self;
        tokio::spawn(async move {
            cache
                .store_entry(&token, status, fields, Some(buffer.freeze()))
                .await;
        });
    }
}

/// Wrap a response so that, if its status is recordable, it is captured
/// into the cache as it streams out. Responses with other statuses pass
/// through untouched.
pub fn observe(response: Response, cache: Arc<ResponseCache>, token: String) -> Response {
    let status = response.status();
    if !recordable(status) {
        return response;
    }

    // Header record is captured here, before any body byte moves: the
    // status and header map are final once the response head exists.
    let fields = cache.filter_headers(response.headers());

    // Redirects store no body; persist the header record right away.
    if status != StatusCode::OK {
        tokio::spawn(async move {
            cache.store_entry(&token, status, fields, None).await;
        });
        return response;
    }

    let (parts, body) = response.into_parts();
    let recorder = BodyRecorder {
        cache,
        token,
        status,
        fields,
        buffer: BytesMut::new(),
        overflowed: false,
    };

    let observed = futures_util::stream::unfold(
        (body.into_data_stream(), Some(recorder)),
        |(mut stream, mut recorder)| async move {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    if let Some(rec) = recorder.as_mut() {
                        rec.on_chunk(&chunk);
                    }
                    Some((Ok(chunk), (stream, recorder)))
                }
                Some(Err(e)) => {
                    // A failed stream must never be cached.
                    recorder = None;
                    Some((Err(e), (stream, recorder)))
                }
                None => {
                    if let Some(rec) = recorder.take() {
                        rec.on_complete();
                    }
                    None
                }
            }
        },
    );

    Response::from_parts(parts, Body::from_stream(observed))
}
