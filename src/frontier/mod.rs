//! Run-wide set of every URL that has been scheduled.
//!
//! Seeds and discovered paths both pass through [`Frontier::try_claim`], so a
//! normalized URL becomes a task at most once no matter how many responses
//! point back at it.

use std::collections::HashSet;
use std::sync::Mutex;

/// Joins a candidate path onto the base URL with exactly one slash between
/// them. `/foo` and `foo` produce the same URL.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    )
}

#[derive(Debug)]
pub struct Frontier {
    base_url: String,
    seen: Mutex<HashSet<String>>,
}

impl Frontier {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Records `url` and returns true the first time it is seen.
    pub fn try_claim(&self, url: &str) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(seen) => seen,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.insert(url.to_string())
    }

    /// Joins `path` onto the base URL and claims the result.
    pub fn claim_path(&self, path: &str) -> Option<String> {
        let url = join_url(&self.base_url, path);
        if self.try_claim(&url) {
            Some(url)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
