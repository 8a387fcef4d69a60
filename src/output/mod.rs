pub mod report;

use std::sync::Mutex;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// A confirmed endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub snippet: String,
    pub content_type: String,
}

/// Append-only collection of findings shared by all workers.
#[derive(Debug, Default)]
pub struct ResultSink {
    findings: Mutex<Vec<Finding>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, finding: Finding) {
        match self.findings.lock() {
            Ok(mut findings) => findings.push(finding),
            Err(poisoned) => poisoned.into_inner().push(finding),
        }
    }

    pub fn len(&self) -> usize {
        match self.findings.lock() {
            Ok(findings) => findings.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Table projection of everything recorded so far.
    pub fn rows(&self) -> Vec<[String; 4]> {
        match self.findings.lock() {
            Ok(findings) => table_rows(&findings),
            Err(poisoned) => table_rows(&poisoned.into_inner()),
        }
    }

    /// Takes all findings in the order they were recorded. Call once the
    /// worker pool has stopped.
    pub fn finalize(&self) -> Vec<Finding> {
        match self.findings.lock() {
            Ok(mut findings) => std::mem::take(&mut *findings),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

/// URL, method, status and snippet columns for the summary table.
pub fn table_rows(findings: &[Finding]) -> Vec<[String; 4]> {
    findings
        .iter()
        .map(|f| {
            [
                f.url.clone(),
                f.method.clone(),
                f.status.to_string(),
                f.snippet.clone(),
            ]
        })
        .collect()
}

pub fn render_text(findings: &[Finding]) -> Vec<u8> {
    let mut out = String::new();
    for f in findings {
        out.push_str(&format!("{} {} {}\n", f.method, f.url, f.status));
    }
    out.into_bytes()
}

pub fn render_json(findings: &[Finding]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = serde_json::to_vec_pretty(findings)?;
    out.push(b'\n');
    Ok(out)
}

pub fn render(findings: &[Finding], format: OutputFormat) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(findings)),
        OutputFormat::Json => render_json(findings),
    }
}
