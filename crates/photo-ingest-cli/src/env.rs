//! Settings from the process environment and the repository `.env` file.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const PHOTOS_DIR_ENV: &str = "PHOTOS_DIR";
pub const PHOTOS_DB_ENV: &str = "PHOTOS_DB";
pub const PHOTOS_COLLECTION_ENV: &str = "PHOTOS_COLLECTION";
pub const DROP_COLLECTION_ENV: &str = "DROP_COLLECTION";

/// Files whose presence marks the repository root
const REPO_MARKERS: [&str; 3] = ["docker-compose.yml", ".env", ".git"];

/// Walk up from `start` to the first directory holding a repository marker,
/// or `start` itself when none does
pub fn find_repo_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| REPO_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}

/// Looks a key up in the process environment, then in `.env`
#[derive(Debug, Clone)]
pub struct EnvSource {
    dotenv_path: PathBuf,
    values: HashMap<String, String>,
}

impl EnvSource {
    /// Read `<repo_root>/.env` if it exists
    pub fn load(repo_root: &Path) -> Result<Self> {
        let dotenv_path = repo_root.join(".env");
        let values = load_dotenv(&dotenv_path)?;
        Ok(Self {
            dotenv_path,
            values,
        })
    }

    pub fn dotenv_path(&self) -> &Path {
        &self.dotenv_path
    }

    /// Non-empty value for `key`; the process environment wins over `.env`
    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.values.get(key).filter(|v| !v.is_empty()).cloned())
    }
}

/// Parse a `.env` file without touching the process environment
pub fn load_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    #[allow(deprecated)]
    let entries = dotenv::from_path_iter(path);
    entries
        .with_context(|| format!("Failed to read {}", path.display()))?
        .map(|item| item.with_context(|| format!("Failed to parse {}", path.display())))
        .collect()
}

/// Quote a value for `.env` when it holds whitespace, `#` or `"`
pub fn format_env_value(value: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || c == '#' || c == '"')
    {
        return format!("\"{}\"", value.replace('"', "\\\""));
    }
    value.to_string()
}

/// Merge `updates` into the `.env` file at `path`.
///
/// Existing assignments are rewritten in place, comments and unrelated lines
/// are kept, and new keys are appended.
pub fn update_dotenv_file(path: &Path, updates: &[(&str, String)]) -> Result<()> {
    let lines: Vec<String> = if path.exists() {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(String::from)
            .collect()
    } else {
        vec!["# Local environment overrides".to_string()]
    };

    let mut seen = HashSet::new();
    let mut updated = Vec::with_capacity(lines.len() + updates.len());
    for line in lines {
        let trimmed = line.trim();
        let key = match line.split_once('=') {
            Some((key, _)) if !trimmed.is_empty() && !trimmed.starts_with('#') => key.trim(),
            _ => {
                updated.push(line);
                continue;
            }
        };
        match updates.iter().find(|(k, _)| *k == key) {
            Some((k, v)) => {
                updated.push(format!("{}={}", k, format_env_value(v)));
                seen.insert(*k);
            }
            None => updated.push(line),
        }
    }

    for (key, value) in updates {
        if !seen.contains(key) {
            updated.push(format!("{}={}", key, format_env_value(value)));
        }
    }

    fs::write(path, updated.join("\n") + "\n")
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Expand a leading `~` and make the path absolute
pub fn normalize_path(value: &Path) -> Result<PathBuf> {
    let expanded = match value.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .context("Cannot expand ~: no home directory")?
            .join(rest),
        Err(_) => value.to_path_buf(),
    };
    std::path::absolute(&expanded)
        .with_context(|| format!("Failed to resolve {}", expanded.display()))
}
