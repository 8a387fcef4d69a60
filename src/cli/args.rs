use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pathfinder",
    version,
    about = "recursive API endpoint discovery tool",
    long_about = "Pathfinder fuzzes a target with seed paths from a wordlist directory, keeps responses that differ from the target's not-found page and follows /api/ paths it finds in JSON and JavaScript bodies.\n\nExamples:\n  pathfinder -u https://target.tld/\n  pathfinder -u target.tld -J ./web-content -w 50 --delay 100\n  pathfinder -u https://target.tld/ --config ~/.pathfinder/config.yml\n\nTip: Use --init-config to write a default config file and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write findings to a file (defaults to <host><path>_found_apis.json)."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_aliases = ["output-format", "format"],
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (json or text). Inferred from the output extension when omitted."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "Input",
        help = "Target base URL. Without a scheme, https is tried first."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'J',
        long = "wd",
        visible_aliases = ["wordlist-dir", "seeds"],
        value_name = "DIR",
        help_heading = "Input",
        help = "Directory of .txt seed wordlists, searched recursively (default: web-content)."
    )]
    pub seeds: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.pathfinder/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config file to the config path and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'w',
        long = "wrk",
        visible_alias = "workers",
        value_name = "N",
        help_heading = "Performance",
        help = "Number of concurrent workers (default: 20)."
    )]
    pub workers: Option<usize>,

    #[arg(
        short = 'd',
        long = "dl",
        visible_alias = "delay",
        value_name = "MS",
        help_heading = "Performance",
        help = "Pause after each request, per worker, in milliseconds."
    )]
    pub delay_ms: Option<u64>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "Performance",
        help = "Global request rate limit (requests per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        short = 'q',
        long = "qc",
        visible_alias = "queue-capacity",
        value_name = "N",
        help_heading = "Performance",
        help = "Task queue buffer size (default: 1000)."
    )]
    pub queue_capacity: Option<usize>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'm',
        long = "mth",
        visible_alias = "methods",
        value_name = "METHODS",
        help_heading = "HTTP",
        help = "Comma-separated HTTP methods to try (default: GET,HEAD)."
    )]
    pub methods: Option<String>,

    #[arg(
        short = 'Y',
        long = "pl",
        visible_alias = "payloads",
        value_name = "SUFFIXES",
        help_heading = "HTTP",
        help = "Comma-separated query suffixes tried after the bare URL (default: ?id=1,?user=admin,?q=test)."
    )]
    pub payloads: Option<String>,

    #[arg(
        short = 'H',
        long = "hdr",
        visible_alias = "header",
        value_name = "HEADER",
        help_heading = "HTTP",
        help = "Add a header to all requests (format: 'Key: Value')."
    )]
    pub header: Option<String>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'S',
        long = "as",
        visible_alias = "allowed-status",
        value_name = "CODES",
        help_heading = "Matching",
        help = "Status codes that can count as a hit (default: 200,201,204)."
    )]
    pub allowed_status: Option<String>,

    #[arg(
        long = "sl",
        visible_alias = "snippet-len",
        value_name = "CHARS",
        help_heading = "Matching",
        help = "Characters of body kept in each finding's snippet (default: 100)."
    )]
    pub snippet_len: Option<usize>,

    #[arg(
        short = 'E',
        long = "ep",
        visible_alias = "extract-prefixes",
        value_name = "PREFIXES",
        help_heading = "Matching",
        help = "Comma-separated path prefixes harvested from JSON/JS bodies (default: /api/)."
    )]
    pub extract_prefixes: Option<String>,
}
