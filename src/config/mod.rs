use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(alias = "url")]
    pub base_url: Option<String>,
    #[serde(alias = "wordlist_dir")]
    pub seeds: Option<String>,
    pub workers: Option<usize>,
    pub delay_ms: Option<u64>,
    pub timeout: Option<u64>,
    pub rate: Option<u32>,
    pub queue_capacity: Option<usize>,
    pub methods: Option<String>,
    pub payloads: Option<String>,
    pub allowed_status: Option<String>,
    pub snippet_len: Option<usize>,
    pub extract_prefixes: Option<String>,
    pub header: Option<String>,
    pub proxy: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".pathfinder").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# Pathfinder config
#
# Location (default):
#   ~/.pathfinder/config.yml

# Target (a scheme is detected when omitted)
# base_url: https://example.com

# Seed paths: every .txt file under this directory, one path per line
seeds: ./web-content

# Performance
workers: 20
delay_ms: 0
timeout: 10
# rate: 100
queue_capacity: 1000

# Fuzzing matrix
methods: "GET,HEAD"
payloads: "?id=1,?user=admin,?q=test"

# Matching
allowed_status: "200,201,204"
snippet_len: 100
extract_prefixes: "/api/"

# HTTP (optional)
# header: "Authorization: Bearer <token>"
# proxy: http://127.0.0.1:8080

# Output (defaults to <host><path>_found_apis.json)
# output: ./found.json
# output_format: json
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
