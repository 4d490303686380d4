use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use client_core::IdentityProfile;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "campus.toml";
const STORE_FILE: &str = "storage.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub email_domain: String,
    pub default_department: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".into(),
            data_dir: None,
            request_timeout_secs: 30,
            email_domain: "univ.edu".into(),
            default_department: "CSE".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn identity_profile(&self) -> IdentityProfile {
        IdentityProfile {
            email_domain: self.email_domain.clone(),
            department: self.default_department.clone(),
        }
    }

    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        let root = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or_else(|| anyhow!("unable to resolve local app data dir"))?
                .join("campus_events"),
        };
        Ok(root.join(STORE_FILE))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_base_url: Option<String>,
    data_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    email_domain: Option<String>,
    default_department: Option<String>,
}

/// Defaults, then the config file, then the environment.
///
/// An explicitly requested config file must exist; the default `campus.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && config_path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.api_base_url = normalize_base_url(&settings.api_base_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.data_dir {
        settings.data_dir = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.email_domain {
        settings.email_domain = v;
    }
    if let Some(v) = file_cfg.default_department {
        settings.default_department = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CAMPUS_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__DATA_DIR") {
        settings.data_dir = Some(PathBuf::from(v));
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = lookup("APP__EMAIL_DOMAIN") {
        settings.email_domain = v;
    }
    if let Some(v) = lookup("APP__DEFAULT_DEPARTMENT") {
        settings.default_department = v;
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Settings::default().api_base_url;
    }
    trimmed.to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
