use std::str::FromStr;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use tokio::time::Instant;

/// One extra `Key: Value` header sent with every request.
#[derive(Clone, Debug)]
pub struct ExtraHeader {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl ExtraHeader {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (key, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("expected 'Key: Value', got '{raw}'"))?;
        let name = HeaderName::from_str(key.trim())
            .map_err(|e| format!("invalid header name '{}': {e}", key.trim()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| format!("invalid header value for '{}': {e}", key.trim()))?;
        Ok(Self { name, value })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RequestSpec<'a> {
    pub method: &'a reqwest::Method,
    pub url: &'a str,
    pub header: Option<&'a ExtraHeader>,
}

#[derive(Clone, Debug)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub content_type: String,
    /// Raw body bytes, never decoded.
    pub body: Vec<u8>,
    pub duration_ms: u128,
}

impl ResponseSnapshot {
    /// Body as text for display and path mining. Invalid UTF-8 is replaced.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Sends one request and reads the whole body.
pub async fn fetch(
    client: &reqwest::Client,
    spec: RequestSpec<'_>,
) -> Result<ResponseSnapshot, reqwest::Error> {
    let mut builder = client.request(spec.method.clone(), spec.url);
    if let Some(header) = spec.header {
        builder = builder.header(header.name.clone(), header.value.clone());
    }
    let req = builder.build()?;

    let start = Instant::now();
    let resp = client.execute(req).await?;
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body_bytes = resp.bytes().await?;
    let duration_ms = start.elapsed().as_millis();

    Ok(ResponseSnapshot {
        status,
        content_type,
        body: body_bytes.to_vec(),
        duration_ms,
    })
}
