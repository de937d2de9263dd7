use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use board::LabelStyle;
use jenkins_client::Environment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub environment: Environment,
    /// Falls back to the environment's CI endpoint when unset.
    pub base_url: Option<String>,
    pub jobs_path: Option<String>,
    pub label_style: LabelStyle,
    pub lookup_failing_since: bool,
    pub title: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `-` writes the page to stdout.
    pub output: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            jobs_path: None,
            label_style: LabelStyle::default(),
            lookup_failing_since: false,
            title: "FreeBSD CI status".into(),
            username: None,
            password: None,
            output: PathBuf::from("index.html"),
        }
    }
}

impl Settings {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.default_base_url())
    }

    pub fn jobs_path(&self) -> &str {
        self.jobs_path
            .as_deref()
            .unwrap_or_else(|| self.environment.default_jobs_path())
    }
}

const KEYS: [&str; 9] = [
    "environment",
    "base_url",
    "jobs_path",
    "label_style",
    "lookup_failing_since",
    "title",
    "username",
    "password",
    "output",
];

/// Defaults, then `path` if it exists, then `DASHBOARD_*` variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let table: toml::Table = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        apply_file(&mut settings, &table)
            .with_context(|| format!("invalid value in '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, table: &toml::Table) -> anyhow::Result<()> {
    for key in KEYS {
        let Some(value) = table.get(key) else {
            continue;
        };
        let value = match value {
            toml::Value::String(v) => v.clone(),
            toml::Value::Boolean(v) => v.to_string(),
            toml::Value::Integer(v) => v.to_string(),
            other => bail!("'{key}' must be a string or boolean, got {}", other.type_str()),
        };
        apply_value(settings, key, value)?;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    for key in KEYS {
        let name = format!("DASHBOARD_{}", key.to_ascii_uppercase());
        if let Some(value) = var(&name) {
            apply_value(settings, key, value).with_context(|| format!("invalid {name}"))?;
        }
    }
    Ok(())
}

fn apply_value(settings: &mut Settings, key: &str, value: String) -> anyhow::Result<()> {
    match key {
        "environment" => settings.environment = value.parse().map_err(|e: String| anyhow!(e))?,
        "base_url" => settings.base_url = Some(value),
        "jobs_path" => settings.jobs_path = Some(value),
        "label_style" => settings.label_style = value.parse().map_err(|e: String| anyhow!(e))?,
        "lookup_failing_since" => settings.lookup_failing_since = parse_flag(&value)?,
        "title" => settings.title = value,
        "username" => settings.username = Some(value),
        "password" => settings.password = Some(value),
        "output" => settings.output = PathBuf::from(value),
        other => bail!("unknown setting '{other}'"),
    }
    Ok(())
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
