use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const DEFAULT_SEED_DIR: &str = "web-content";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed directory '{path}' does not exist or is not a directory")]
    MissingDirectory { path: String },

    #[error("failed to list seed directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Candidate paths gathered from every `.txt` file under a directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedList {
    pub files_scanned: usize,
    pub paths: Vec<String>,
}

fn is_seed_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

async fn read_seed_file(path: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    let handle = File::open(path).await?;
    let mut lines = BufReader::new(handle).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        out.push(line.to_string());
    }
    Ok(())
}

/// Walks `dir` recursively in sorted order. Files that cannot be read are
/// logged and skipped.
pub async fn load_seed_paths(dir: &str) -> Result<SeedList, SeedError> {
    let root = PathBuf::from(crate::config::expand_tilde_string(dir));
    match tokio::fs::metadata(&root).await {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            return Err(SeedError::MissingDirectory {
                path: root.display().to_string(),
            })
        }
    }

    let mut seeds = SeedList::default();
    let mut stack = vec![root];
    while let Some(dir) = stack.pop() {
        let mut rd = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SeedError::ReadDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        let mut entries: Vec<PathBuf> = Vec::new();
        loop {
            match rd.next_entry().await {
                Ok(Some(entry)) => entries.push(entry.path()),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "error while listing seed directory");
                    break;
                }
            }
        }
        entries.sort();

        let mut subdirs: Vec<PathBuf> = Vec::new();
        for path in entries {
            let is_dir = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                subdirs.push(path);
                continue;
            }
            if !is_seed_file(&path) {
                continue;
            }
            seeds.files_scanned += 1;
            if let Err(e) = read_seed_file(&path, &mut seeds.paths).await {
                tracing::warn!(file = %path.display(), error = %e, "could not read seed file");
            }
        }
        // reversed so the stack pops subdirectories in sorted order
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_txt_files_recursively_skipping_noise() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "admin\n\n# comment\n  /login  \n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored\n").unwrap();
        std::fs::create_dir(dir.path().join("api")).unwrap();
        std::fs::write(dir.path().join("api").join("B.TXT"), "api/users\n").unwrap();

        let seeds = load_seed_paths(dir.path().to_str().unwrap()).await.unwrap();
        assert_eq!(seeds.files_scanned, 2);
        assert_eq!(seeds.paths, vec!["admin", "/login", "api/users"]);
    }

    #[tokio::test]
    async fn missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = load_seed_paths(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, SeedError::MissingDirectory { .. }));
    }

    #[tokio::test]
    async fn a_file_is_not_a_seed_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("seeds.txt");
        std::fs::write(&file, "admin\n").unwrap();
        assert!(load_seed_paths(file.to_str().unwrap()).await.is_err());
    }
}
