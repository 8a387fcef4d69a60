//! Mines API-looking paths out of script and JSON response bodies.

use std::collections::HashSet;

use itertools::Itertools;
use regex::Regex;

use crate::detector::filters;

pub const DEFAULT_EXTRACT_PREFIXES: [&str; 1] = ["/api/"];

#[derive(Clone, Debug)]
pub struct PathExtractor {
    pattern: Regex,
}

impl PathExtractor {
    /// Matches any of `prefixes` followed by word, slash or hyphen characters.
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self, String> {
        let alternatives = prefixes
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(regex::escape)
            .join("|");
        if alternatives.is_empty() {
            return Err("no extraction prefixes configured".to_string());
        }
        let pattern = Regex::new(&format!(r"(?i)((?:{alternatives})[\w/-]+)"))
            .map_err(|e| format!("invalid extraction pattern: {e}"))?;
        Ok(Self { pattern })
    }

    pub fn applies_to(&self, content_type: &str) -> bool {
        filters::is_script_or_json(content_type)
    }

    /// Distinct matches in order of first appearance.
    pub fn extract(&self, body: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.pattern
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }
}

impl Default for PathExtractor {
    fn default() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(/api/[\w/-]+)").expect("default extraction pattern"),
        }
    }
}
