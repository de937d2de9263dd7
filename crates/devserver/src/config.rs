use std::{collections::HashMap, fs, path::Path, path::PathBuf};

use anyhow::{bail, Context};
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Address of the proxy and fixture servers.
    pub api_bind: String,
    /// Address of the static file server.
    pub static_bind: String,
    pub upstream_url: String,
    pub fixture_path: PathBuf,
    pub static_dir: PathBuf,
    /// File answered for `/` by the static server.
    pub index_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_bind: "127.0.0.1:8000".into(),
            static_bind: "127.0.0.1:3000".into(),
            upstream_url: "https://ci.freebsd.org".into(),
            fixture_path: PathBuf::from("example.json"),
            static_dir: PathBuf::from("."),
            index_file: "index.html".into(),
        }
    }
}

/// Defaults, then `path` if it exists, then the environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable config file");
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("api_bind") {
        settings.api_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("static_bind") {
        settings.static_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("upstream_url") {
        settings.upstream_url = v.clone();
    }
    if let Some(v) = file_cfg.get("fixture_path") {
        settings.fixture_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("static_dir") {
        settings.static_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("index_file") {
        settings.index_file = v.clone();
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("DEVSERVER_API_BIND") {
        settings.api_bind = v;
    }
    if let Some(v) = var("DEVSERVER_STATIC_BIND") {
        settings.static_bind = v;
    }
    if let Some(v) = var("DEVSERVER_UPSTREAM_URL") {
        settings.upstream_url = v;
    }
    if let Some(v) = var("DEVSERVER_FIXTURE_PATH") {
        settings.fixture_path = PathBuf::from(v);
    }
    if let Some(v) = var("DEVSERVER_STATIC_DIR") {
        settings.static_dir = PathBuf::from(v);
    }
    if let Some(v) = var("DEVSERVER_INDEX_FILE") {
        settings.index_file = v;
    }
}

/// Upstream base URL without a trailing slash, ready to prefix request paths.
pub fn normalize_upstream(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).with_context(|| format!("invalid upstream url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("upstream url '{raw}' must use http or https");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
