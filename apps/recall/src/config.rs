use std::{fs, io, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "recall.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub user_id: Option<String>,
    pub request_timeout_seconds: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5173".into(),
            user_id: None,
            request_timeout_seconds: 30,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    user_id: Option<String>,
    request_timeout_seconds: Option<u64>,
    log_filter: Option<String>,
}

/// Reads `path` if it exists, then applies `RECALL_*` and `APP__*` overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    let settings = resolve_settings(raw.as_deref(), |key| std::env::var(key).ok())
        .with_context(|| format!("invalid configuration in '{}'", path.display()))?;
    Ok(settings)
}

fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        let file_cfg: FileSettings = toml::from_str(raw).context("malformed TOML")?;
        if let Some(v) = file_cfg.server_url {
            settings.server_url = v;
        }
        if let Some(v) = file_cfg.user_id {
            settings.user_id = Some(v);
        }
        if let Some(v) = file_cfg.request_timeout_seconds {
            settings.request_timeout_seconds = v;
        }
        if let Some(v) = file_cfg.log_filter {
            settings.log_filter = v;
        }
    }

    if let Some(v) = env("RECALL_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("RECALL_USER_ID") {
        settings.user_id = Some(v);
    }
    if let Some(v) = env("APP__USER_ID") {
        settings.user_id = Some(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings.server_url = validate_server_url(&settings.server_url)?;
    Ok(settings)
}

/// Accepts absolute http(s) URLs and strips any trailing slash.
pub fn validate_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    let parsed =
        Url::parse(trimmed).with_context(|| format!("server url '{trimmed}' is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("server url '{trimmed}' must use http or https");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
