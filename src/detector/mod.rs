pub mod filters;
pub mod response;

use std::collections::HashSet;

use crate::fingerprint::Fingerprint;

pub const DEFAULT_ALLOWED_STATUS: [u16; 3] = [200, 201, 204];
pub const DEFAULT_SNIPPET_LEN: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissReason {
    Status,
    Html,
    NotFoundClone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Hit,
    Miss(MissReason),
}

impl Verdict {
    pub fn is_hit(&self) -> bool {
        matches!(self, Verdict::Hit)
    }
}

/// Decides whether a response is a real endpoint.
///
/// A hit needs an allowed status, a non-HTML content type, and a body that
/// differs from the not-found fingerprint.
#[derive(Clone, Debug)]
pub struct Classifier {
    allowed_status: HashSet<u16>,
    fingerprint: Fingerprint,
}

impl Classifier {
    pub fn new(allowed_status: HashSet<u16>, fingerprint: Fingerprint) -> Self {
        Self {
            allowed_status,
            fingerprint,
        }
    }

    pub fn classify(&self, status: u16, content_type: &str, body: &[u8]) -> Verdict {
        if !filters::status_allowed(status, &self.allowed_status) {
            return Verdict::Miss(MissReason::Status);
        }
        if filters::is_html(content_type) {
            return Verdict::Miss(MissReason::Html);
        }
        if self.fingerprint.matches(body) {
            return Verdict::Miss(MissReason::NotFoundClone);
        }
        Verdict::Hit
    }
}

/// First `max_chars` characters of `body`, with `...` when cut.
pub fn snippet(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
