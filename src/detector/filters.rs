use std::collections::HashSet;

pub(crate) fn is_html(content_type: &str) -> bool {
    content_type.to_lowercase().contains("html")
}

/// Content types whose bodies are mined for further paths.
pub(crate) fn is_script_or_json(content_type: &str) -> bool {
    let lower = content_type.to_lowercase();
    lower.contains("javascript") || lower.contains("json")
}

pub(in crate::detector) fn status_allowed(status: u16, allowed: &HashSet<u16>) -> bool {
    allowed.contains(&status)
}
