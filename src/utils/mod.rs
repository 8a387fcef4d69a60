use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

pub const OUTPUT_SUFFIX: &str = "_found_apis.json";

pub fn parse_http_methods_csv(value: &str) -> Result<Vec<reqwest::Method>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("methods list is empty".to_string());
    }

    let mut out: Vec<reqwest::Method> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let canonical = item.to_ascii_uppercase();
        let method = reqwest::Method::from_bytes(canonical.as_bytes())
            .map_err(|_| format!("invalid method '{item}'"))?;
        if seen.insert(method.as_str().to_string()) {
            out.push(method);
        }
    }

    if out.is_empty() {
        return Err("methods list is empty".to_string());
    }
    Ok(out)
}

pub fn parse_u16_set_csv(value: &str) -> Result<HashSet<u16>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("list is empty".to_string());
    }
    let mut out = HashSet::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let code: u16 = item
            .parse()
            .map_err(|_| format!("invalid status code '{item}'"))?;
        out.insert(code);
    }
    if out.is_empty() {
        return Err("list is empty".to_string());
    }
    Ok(out)
}

/// Comma separated values, trimmed, empties and repeats dropped, order kept.
pub fn parse_string_list_csv(value: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(|s| s.to_string())
        .collect()
}

pub fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Prefixes `https://` when the host answers over TLS with a status below
/// 400, otherwise `http://`. URLs that already carry a scheme are kept.
pub async fn ensure_scheme(client: &reqwest::Client, raw_url: &str) -> String {
    let raw_url = raw_url.trim();
    if has_scheme(raw_url) {
        return raw_url.to_string();
    }

    let https_url = format!("https://{raw_url}");
    match client.head(&https_url).send().await {
        Ok(resp) if resp.status().as_u16() < 400 => {
            tracing::debug!(url = %https_url, "target reachable over https");
            https_url
        }
        Ok(resp) => {
            tracing::debug!(
                url = %https_url,
                status = resp.status().as_u16(),
                "https rejected, falling back to http"
            );
            format!("http://{raw_url}")
        }
        Err(e) => {
            tracing::debug!(url = %https_url, error = %e, "https request failed, falling back to http");
            format!("http://{raw_url}")
        }
    }
}

fn unsafe_filename_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_\-.]").expect("static filename pattern"))
}

/// Host and path of `raw_url` flattened into a filesystem-safe name.
pub fn sanitize_filename(raw_url: &str) -> String {
    let url = match reqwest::Url::parse(raw_url) {
        Ok(url) => url,
        Err(_) => return raw_url.replace("://", "_").replace('/', "_"),
    };
    let host = url.host_str().unwrap_or_default();
    let path = match url.path() {
        "" | "/" => "root".to_string(),
        p => p.replace('/', "_"),
    };
    unsafe_filename_chars()
        .replace_all(&format!("{host}{path}"), "")
        .into_owned()
}

pub fn default_output_path(base_url: &str) -> String {
    format!("{}{}", sanitize_filename(base_url), OUTPUT_SUFFIX)
}
