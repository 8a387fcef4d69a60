use rand::distr::Alphanumeric;
use rand::Rng;

use crate::detector::response::{self, ExtraHeader, RequestSpec};

const RANDOM_SEGMENT_LEN: usize = 24;

/// Body of the target's not-found page, captured once per run.
///
/// Used as an exact equality oracle: any byte difference after trimming
/// means the response is not a 404 clone. An unavailable fingerprint
/// matches nothing, so every allowed-status response is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fingerprint {
    body: Option<Vec<u8>>,
    status: Option<u16>,
}

impl Fingerprint {
    pub fn new(status: u16, body: &[u8]) -> Self {
        Self {
            body: Some(body.trim_ascii().to_vec()),
            status: Some(status),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.body.is_some()
    }

    /// Status code the baseline request returned.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Byte equality after trimming ASCII whitespace on both sides.
    pub fn matches(&self, body: &[u8]) -> bool {
        match self.body.as_deref() {
            Some(baseline) => baseline == body.trim_ascii(),
            None => false,
        }
    }
}

/// `base_url` joined with a random segment that should not exist.
pub fn not_found_url(base_url: &str) -> String {
    let segment: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SEGMENT_LEN)
        .map(char::from)
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), segment)
}

/// Requests a nonexistent path under `base_url` and remembers the body.
pub async fn capture(
    client: &reqwest::Client,
    base_url: &str,
    header: Option<&ExtraHeader>,
) -> Fingerprint {
    let url = not_found_url(base_url);
    let spec = RequestSpec {
        method: &reqwest::Method::GET,
        url: &url,
        header,
    };
    match response::fetch(client, spec).await {
        Ok(snapshot) => {
            tracing::debug!(
                url = %url,
                status = snapshot.status,
                len = snapshot.body.len(),
                "captured not-found fingerprint"
            );
            Fingerprint::new(snapshot.status, &snapshot.body)
        }
        Err(e) => {
            tracing::warn!(
                url = %url,
                error = %e,
                "fingerprint request failed, soft-404 suppression disabled"
            );
            Fingerprint::unavailable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignores_surrounding_whitespace_only() {
        let fp = Fingerprint::new(404, b"  <h1>Not Found</h1>\n");
        assert!(fp.matches(b"<h1>Not Found</h1>"));
        assert!(fp.matches(b"\n<h1>Not Found</h1>  \r\n"));
        assert!(!fp.matches(b"<h1>Not found</h1>"));
        assert!(!fp.matches(b"<h1>Not Found</h1>."));
    }

    #[test]
    fn invalid_utf8_bodies_compare_by_bytes() {
        let fp = Fingerprint::new(200, &[0xFF]);
        assert!(fp.matches(&[0xFF]));
        assert!(fp.matches(b"\n\xFF "));
        assert!(!fp.matches(&[0xFE]));
        assert!(!fp.matches(&[0xEF, 0xBF, 0xBD]));
    }

    #[test]
    fn unavailable_fingerprint_matches_nothing() {
        let fp = Fingerprint::unavailable();
        assert!(!fp.is_available());
        assert!(!fp.matches(b""));
        assert!(!fp.matches(b"anything"));
    }

    #[test]
    fn not_found_url_appends_random_segment() {
        let a = not_found_url("http://x.test/");
        let b = not_found_url("http://x.test");
        assert!(a.starts_with("http://x.test/"));
        assert_eq!(a.len(), "http://x.test/".len() + RANDOM_SEGMENT_LEN);
        assert!(!a["http://x.test/".len()..].contains('/'));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn capture_degrades_when_target_is_unreachable() {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let fp = capture(&client, "http://127.0.0.1:1", None).await;
        assert_eq!(fp, Fingerprint::unavailable());
    }
}
