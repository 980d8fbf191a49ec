use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

pub(crate) const DEV_SESSION_SECRET: &str = "hoa-dev-session-secret";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl_seconds: u64,
    pub secure_cookies: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            database_url: "sqlite://./data/hoa.db".into(),
            session_secret: DEV_SESSION_SECRET.into(),
            session_ttl_seconds: 86_400,
            secure_cookies: false,
        }
    }
}

impl Settings {
    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }
}

/// Defaults, then `server.toml`, then the environment.
pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    load_settings_from(file.as_deref(), &|key| std::env::var(key).ok())
}

pub(crate) fn load_settings_from(file: Option<&str>, env: &dyn Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                let file_cfg: HashMap<String, String> = file_cfg
                    .into_iter()
                    .map(|(key, value)| {
                        let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                        (key, value)
                    })
                    .collect();
                apply(&mut settings, &|key| file_cfg.get(key).cloned());
            }
            Err(err) => tracing::warn!(error = %err, "ignoring malformed server.toml"),
        }
    }

    // legacy names first so the APP__ variants win
    let env_cfg = |key: &str| {
        let legacy = match key {
            "bind_addr" => env("SERVER_BIND"),
            "database_url" => env("DATABASE_URL"),
            "session_secret" => env("SESSION_SECRET"),
            _ => None,
        };
        env(&format!("APP__{}", key.to_ascii_uppercase())).or(legacy)
    };
    apply(&mut settings, &env_cfg);

    settings
}

fn apply(settings: &mut Settings, source: &dyn Fn(&str) -> Option<String>) {
    if let Some(v) = source("bind_addr") {
        settings.bind_addr = v;
    }
    if let Some(v) = source("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = source("session_secret").filter(|v| !v.is_empty()) {
        settings.session_secret = v;
    }
    if let Some(v) = source("session_ttl_seconds") {
        match v.trim().parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.session_ttl_seconds = parsed,
            _ => tracing::warn!(value = %v, "ignoring invalid session_ttl_seconds"),
        }
    }
    if let Some(v) = source("secure_cookies") {
        settings.secure_cookies = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_letter(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        if has_drive_letter(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url.replace('\\', "/");
    if has_drive_letter(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
