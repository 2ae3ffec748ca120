//! Utility functions for Hopper
//!
//! Provides safe string truncation for logging untrusted payloads and env-file loading.

use std::path::Path;

/// Safely truncate a string at character boundaries (not byte boundaries).
///
/// Wire payloads are arbitrary text, so anything echoed into a log line goes
/// through here first.
///
/// # Example
/// ```
/// use hopper_core::util::safe_truncate;
///
/// assert_eq!(safe_truncate("{'estado': '0101'}", 4), "{'es");
/// assert_eq!(safe_truncate("Direção", 6), "Direçã");
/// ```
#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Load environment variables from the Hopper env file if not already set.
/// Searches standard locations in order:
/// 1. /usr/local/etc/hopper/hopper.env
/// 2. User's config directory/hopper/hopper.env
/// 3. ~/.config/hopper/hopper.env
pub fn load_env_file() {
    let env_paths = [
        "/usr/local/etc/hopper/hopper.env".to_string(),
        dirs::config_dir()
            .map(|p| p.join("hopper/hopper.env").to_string_lossy().to_string())
            .unwrap_or_default(),
        dirs::home_dir()
            .map(|p| p.join(".config/hopper/hopper.env").to_string_lossy().to_string())
            .unwrap_or_default(),
    ];

    for path in &env_paths {
        if path.is_empty() {
            continue;
        }
        if Path::new(path).exists() {
            if let Ok(contents) = std::fs::read_to_string(path) {
                parse_env_file(&contents);
            }
            break;
        }
    }
}

/// Parse env file contents and set environment variables (only if not already set).
/// Supports formats:
/// - `KEY=value`
/// - `export KEY=value`
/// - `KEY="quoted value"`
/// - Comments starting with #
pub fn parse_env_file(contents: &str) {
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}
