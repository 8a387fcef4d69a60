use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err("invalid workers, expected positive integer".to_string());
        }
    }
    if let Some(rate) = args.rate {
        if rate == 0 {
            return Err("invalid rate, expected positive integer".to_string());
        }
    }
    if let Some(capacity) = args.queue_capacity {
        if capacity == 0 {
            return Err("invalid queue-capacity, expected positive integer".to_string());
        }
    }
    if let Some(url) = args.url.as_deref() {
        if url.trim().is_empty() {
            return Err("invalid --url, expected a non-empty URL".to_string());
        }
    }
    if let Some(raw) = args.allowed_status.as_deref() {
        crate::utils::parse_u16_set_csv(raw)
            .map_err(|e| format!("invalid --allowed-status '{raw}': {e}"))?;
    }
    if let Some(raw) = args.methods.as_deref() {
        crate::utils::parse_http_methods_csv(raw)
            .map_err(|e| format!("invalid --methods '{raw}': {e}"))?;
    }
    if let Some(raw) = args.header.as_deref() {
        crate::detector::response::ExtraHeader::parse(raw)
            .map_err(|e| format!("invalid --header '{raw}': {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected json or text"
            ));
        }
    }
    if let Some(raw) = args.extract_prefixes.as_deref() {
        if crate::utils::parse_string_list_csv(raw).is_empty() {
            return Err(format!("invalid --extract-prefixes '{raw}': list is empty"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["pathfinder", "-u", "http://x.test"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn accepts_defaults() {
        assert!(validate(&args(&[])).is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(validate(&args(&["--workers", "0"])).is_err());
        assert!(validate(&args(&["--allowed-status", "200,ok"])).is_err());
        assert!(validate(&args(&["--methods", " , "])).is_err());
        assert!(validate(&args(&["--header", "missing-colon"])).is_err());
        assert!(validate(&args(&["--format", "xml"])).is_err());
        assert!(validate(&args(&["--extract-prefixes", ","])).is_err());
    }
}
