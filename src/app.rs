use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::output::report::{self, RunSummary};
use crate::output::{self, OutputFormat};
use crate::runner::{Options, Runner, SeedSource};
use crate::utils;

fn print_banner() {
    const BANNER: &str = r#"
                 __  __    _____           __
    ____  ____ _/ /_/ /_  / __(_)___  ____/ /__  _____
   / __ \/ __ `/ __/ __ \/ /_/ / __ \/ __  / _ \/ ___/
  / /_/ / /_/ / /_/ / / / __/ / / / / /_/ /  __/ /
 / .___/\__,_/\__/_/ /_/_/ /_/_/ /_/\__,_/\___/_/
/_/
       v0.1.0 - recursive API endpoint discovery
    "#;
    print!("{}", BANNER.bright_magenta());
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    output: Option<String>,
    output_format: Option<OutputFormat>,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;
    let defaults = Options::default();

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .url
        .or(cfg.base_url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "missing target URL (use -u/--url or base_url in the config file)".to_string())?;

    let seeds = match args.seeds.or(cfg.seeds) {
        Some(dir) => SeedSource::Directory(dir),
        None => defaults.seeds.clone(),
    };

    let workers = args.workers.or(cfg.workers).unwrap_or(defaults.workers);
    if workers == 0 {
        return Err("invalid workers, expected positive integer".to_string());
    }
    let delay = args
        .delay_ms
        .or(cfg.delay_ms)
        .map(Duration::from_millis)
        .unwrap_or(defaults.delay);
    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(defaults.timeout_seconds);
    let rate = args.rate.or(cfg.rate).filter(|r| *r > 0);
    let queue_capacity = args
        .queue_capacity
        .or(cfg.queue_capacity)
        .unwrap_or(defaults.queue_capacity)
        .max(1);

    let methods = match args.methods.or(cfg.methods) {
        Some(raw) => utils::parse_http_methods_csv(&raw)
            .map_err(|e| format!("invalid methods '{raw}': {e}"))?,
        None => defaults.methods.clone(),
    };
    let payloads = match args.payloads.or(cfg.payloads) {
        Some(raw) => utils::parse_string_list_csv(&raw),
        None => defaults.payloads.clone(),
    };
    let allowed_status = match args.allowed_status.or(cfg.allowed_status) {
        Some(raw) => utils::parse_u16_set_csv(&raw)
            .map_err(|e| format!("invalid allowed status '{raw}': {e}"))?,
        None => defaults.allowed_status.clone(),
    };
    let snippet_len = args
        .snippet_len
        .or(cfg.snippet_len)
        .unwrap_or(defaults.snippet_len);
    let extract_prefixes = match args.extract_prefixes.or(cfg.extract_prefixes) {
        Some(raw) => {
            let prefixes = utils::parse_string_list_csv(&raw);
            if prefixes.is_empty() {
                return Err(format!("invalid extract prefixes '{raw}': list is empty"));
            }
            prefixes
        }
        None => defaults.extract_prefixes.clone(),
    };

    let header = args.header.or(cfg.header).filter(|h| !h.trim().is_empty());
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(p.trim()))
        .filter(|p| !p.is_empty());
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => Some(
            OutputFormat::parse(&raw)
                .ok_or_else(|| format!("invalid output format '{raw}', expected json or text"))?,
        ),
        None => None,
    };

    Ok(RunConfig {
        options: Options {
            base_url,
            seeds,
            workers,
            delay,
            timeout_seconds,
            rate,
            queue_capacity,
            methods,
            payloads,
            allowed_status,
            snippet_len,
            extract_prefixes,
            header,
            proxy,
        },
        output,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Output path and format. The default file name only needs host and path,
/// so a scheme-less target is named as if it were http.
fn resolve_output(run: &RunConfig) -> (String, OutputFormat) {
    let path = match run.output.as_ref() {
        Some(path) => path.clone(),
        None => {
            let base = &run.options.base_url;
            if utils::has_scheme(base) {
                utils::default_output_path(base)
            } else {
                utils::default_output_path(&format!("http://{base}"))
            }
        }
    };
    let format = run
        .output_format
        .or_else(|| output::infer_format_from_path(&path))
        .unwrap_or(OutputFormat::Json);
    (path, format)
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let (output_path, output_format) = resolve_output(&run);
    let runner = Runner::new(run.options).map_err(|e| e.to_string())?;

    let options = runner.options();
    let seeds_label = match &options.seeds {
        SeedSource::Directory(dir) => dir.clone(),
        SeedSource::Inline(paths) => format!("{} inline paths", paths.len()),
    };
    let methods_label = options
        .methods
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(",");
    format_kv_line("Target", &options.base_url);
    format_kv_line("Seeds", &seeds_label);
    format_kv_line("Workers", &options.workers.to_string());
    format_kv_line("Methods", &methods_label);
    format_kv_line("Payloads", &options.payloads.join(","));
    format_kv_line("Delay", &format!("{}ms", options.delay.as_millis()));
    format_kv_line("Output", &output_path);
    println!();

    let existed = tokio::fs::metadata(&output_path).await.is_ok();
    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&output_path)
        .await
        .map_err(|e| format!("failed to open output file '{output_path}': {e}"))?;

    let pb = ProgressBar::new(1);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: {per_sec} :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );
    let runner = runner.with_progress(pb.clone());

    let result = match runner.run_until(wait_for_ctrl_c()).await {
        Ok(result) => result,
        Err(e) => {
            pb.finish_and_clear();
            drop(outfile);
            if !existed {
                let _ = tokio::fs::remove_file(&output_path).await;
            }
            return Err(e.to_string());
        }
    };
    pb.finish_and_clear();

    let fingerprint_label = match (result.fingerprint.status(), result.fingerprint.body()) {
        (Some(status), Some(body)) => format!("status {status}, {} bytes", body.len()),
        _ => "unavailable".to_string(),
    };
    format_kv_line("Baseline", &fingerprint_label);

    let rendered = output::render(&result.findings, output_format)
        .map_err(|e| format!("failed to serialize findings: {e}"))?;
    outfile
        .set_len(0)
        .await
        .map_err(|e| format!("failed to truncate output file: {e}"))?;
    outfile
        .write_all(&rendered)
        .await
        .map_err(|_| "failed to write output file".to_string())?;
    outfile
        .flush()
        .await
        .map_err(|_| "failed to write output file".to_string())?;

    println!();
    if !result.findings.is_empty() {
        print!("{}", report::render_table(&result.findings));
        println!();
    }
    print!(
        "{}",
        report::render_summary(&RunSummary {
            files_scanned: result.files_scanned,
            urls_checked: result.urls_checked,
            endpoints_found: result.endpoints_found,
            output_path,
            aborted: result.aborted(),
        })
    );
    println!();
    println!(
        ":: Completed :: scan took {}s ::",
        result.elapsed.as_secs()
    );

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let (config_path, explicit) = match args.config.as_deref() {
        Some(p) => (Some(config::expand_tilde(p)), true),
        None => (config::default_config_path(), false),
    };

    if args.init_config {
        let path = config_path.ok_or_else(|| "could not determine config path".to_string())?;
        config::ensure_default_config_file(&path)?;
        println!("config written to {}", path.display());
        return Ok(());
    }

    let cfg = match config_path.as_ref() {
        Some(path) => config::load_config(path, !explicit)?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let args = CliArgs::parse_from(["pathfinder", "-u", "http://example.com/"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(run.options.workers, 20);
        assert_eq!(run.options.delay, Duration::ZERO);
        assert_eq!(run.options.payloads.len(), 3);
        assert!(matches!(run.options.seeds, SeedSource::Directory(ref d) if d == "web-content"));
        assert!(!run.no_color);
    }

    #[test]
    fn cli_values_override_config_file() {
        let args = CliArgs::parse_from([
            "pathfinder",
            "--workers",
            "5",
            "--methods",
            "post,get",
            "--no-color",
        ]);
        let cfg = ConfigFile {
            base_url: Some("example.com".to_string()),
            workers: Some(50),
            delay_ms: Some(250),
            payloads: Some("?debug=1".to_string()),
            ..Default::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.options.base_url, "example.com");
        assert_eq!(run.options.workers, 5);
        assert_eq!(run.options.delay, Duration::from_millis(250));
        assert_eq!(
            run.options.methods,
            vec![reqwest::Method::POST, reqwest::Method::GET]
        );
        assert_eq!(run.options.payloads, vec!["?debug=1".to_string()]);
        assert!(run.no_color);
    }

    #[test]
    fn missing_target_is_an_error() {
        let args = CliArgs::parse_from(["pathfinder"]);
        assert!(build_run_config(args, ConfigFile::default()).is_err());
    }

    #[test]
    fn invalid_config_values_are_rejected() {
        let args = CliArgs::parse_from(["pathfinder", "-u", "x.test"]);
        let cfg = ConfigFile {
            allowed_status: Some("200,abc".to_string()),
            ..Default::default()
        };
        assert!(build_run_config(args, cfg).is_err());
    }

    #[test]
    fn output_defaults_to_host_and_path_json() {
        let args = CliArgs::parse_from(["pathfinder", "-u", "x.test/v1"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(
            resolve_output(&run),
            ("x.test_v1_found_apis.json".to_string(), OutputFormat::Json)
        );

        let args = CliArgs::parse_from(["pathfinder", "-u", "x.test", "-o", "found.txt"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(
            resolve_output(&run),
            ("found.txt".to_string(), OutputFormat::Text)
        );
    }
}
