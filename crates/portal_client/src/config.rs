use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_SETTINGS_FILE: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub expiry_leeway_secs: i64,
    pub login_path: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".into(),
            request_timeout_secs: 15,
            expiry_leeway_secs: 0,
            login_path: "/login".into(),
        }
    }
}

impl ClientSettings {
    pub fn base_url(&self) -> Result<Url, ClientError> {
        Url::parse(self.api_base_url.trim()).map_err(|source| ClientError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn expiry_leeway(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiry_leeway_secs.max(0))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    expiry_leeway_secs: Option<i64>,
    login_path: Option<String>,
}

pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |name| std::env::var(name).ok())
}

/// Defaults, then the optional toml file, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
            if let Some(v) = file_cfg.api_url {
                settings.api_base_url = v;
            }
            if let Some(v) = file_cfg.request_timeout_secs {
                settings.request_timeout_secs = v;
            }
            if let Some(v) = file_cfg.expiry_leeway_secs {
                settings.expiry_leeway_secs = v;
            }
            if let Some(v) = file_cfg.login_path {
                settings.login_path = v;
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    if let Some(v) = env("PORTAL_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__EXPIRY_LEEWAY_SECS") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.expiry_leeway_secs = parsed;
        }
    }

    if let Some(v) = env("APP__LOGIN_PATH") {
        settings.login_path = v;
    }

    settings
        .base_url()
        .context("api base url is not a valid absolute url")?;
    Ok(settings)
}
