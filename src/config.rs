// src/config.rs

//! Configuration loading utilities.
//!
//! Environment files are read first so `RUST_LOG` and `SITEWATCH_HOME` can
//! come from `.env`. Relative paths in `config.toml` resolve against the
//! base directory.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::MonitorConfig;

/// Overrides the base directory for relative paths.
pub const HOME_VAR: &str = "SITEWATCH_HOME";

/// Load `.env` from the working directory, then `~/.config/sitewatch/env`.
///
/// Variables already set in the process environment are never replaced.
/// Returns the files that were read.
pub fn load_env() -> Vec<PathBuf> {
    let mut loaded = Vec::new();

    match dotenvy::dotenv() {
        Ok(path) => loaded.push(path),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env: {}", e),
    }

    if let Some(path) = user_env_file() {
        match dotenvy::from_path(&path) {
            Ok(()) => loaded.push(path),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable {}: {}", path.display(), e),
        }
    }

    loaded
}

fn user_env_file() -> Option<PathBuf> {
    let home = env::var_os("HOME").filter(|h| !h.is_empty())?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("sitewatch")
            .join("env"),
    )
}

/// `SITEWATCH_HOME` when set, otherwise the working directory.
pub fn base_dir() -> PathBuf {
    match env::var_os(HOME_VAR).filter(|v| !v.is_empty()) {
        Some(home) => PathBuf::from(home),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load and validate configuration from a TOML file.
///
/// A missing file falls back to the built-in defaults; a file that exists
/// but does not parse or validate is an error.
pub fn load_config(path: &Path) -> Result<MonitorConfig> {
    let config = if path.exists() {
        log::info!("Loading configuration from {}", path.display());
        MonitorConfig::load(path)?
    } else {
        log::warn!(
            "Config file {} not found. Using default configuration.",
            path.display()
        );
        MonitorConfig::default()
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        let keys: Vec<_> = config.sites.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["nt", "unitel", "skytel"]);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[run]
max_concurrent_sites = 1
run_timeout_secs = 60

[[sites]]
key = "blog"
kind = "static_html"
listing_url = "https://blog.example.com/news"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.run.max_concurrent_sites, 1);
        assert_eq!(config.run.run_timeout_secs, 60);
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].key, "blog");
        assert!(config.sites[0].enabled);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[run\nmax_concurrent_sites = ").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "[run]\nmax_concurrent_sites = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/srv/sitewatch");
        assert_eq!(
            resolve_path(base, Path::new("config.toml")),
            PathBuf::from("/srv/sitewatch/config.toml")
        );
        assert_eq!(
            resolve_path(base, Path::new("/etc/sitewatch.toml")),
            PathBuf::from("/etc/sitewatch.toml")
        );
    }
}
