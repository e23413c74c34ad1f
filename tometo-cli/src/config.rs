use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tometo_core::{parse_timezone, TimerSettings};
use tometo_store::{RestConfig, RetryPolicy, DEFAULT_BOARD_ID};

use crate::state::{default_board_path, ensure_tometo_home};

pub const ENV_BACKEND_URL: &str = "TOMETO_BACKEND_URL";
pub const ENV_API_KEY: &str = "TOMETO_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "TOMETO_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone used to read due dates (local midnight) and "today".
    pub timezone: String,
    pub backend: BackendSection,
    pub retry: RetryPolicy,
    pub suggest: SuggestSection,
    pub timer: TimerSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    pub board_id: String,

    /// For kind = "local": board file (default: ~/.tometo/board.json)
    pub path: Option<PathBuf>,

    /// For kind = "rest": project URL, e.g. https://xyz.supabase.co
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Signed-in user's access token; the API key is used when absent.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestSection {
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSection {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_every: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            backend: BackendSection::default(),
            retry: RetryPolicy::default(),
            suggest: SuggestSection::default(),
            timer: TimerSection::default(),
        }
    }
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            board_id: DEFAULT_BOARD_ID.to_string(),
            path: None,
            url: None,
            api_key: None,
            access_token: None,
            timeout_secs: 15,
        }
    }
}

impl Default for SuggestSection {
    fn default() -> Self {
        Self {
            concurrency: tometo_store::service::DEFAULT_SUGGEST_CONCURRENCY,
        }
    }
}

impl Default for TimerSection {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
        }
    }
}

impl Config {
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings::from_minutes(
            self.timer.work_minutes,
            self.timer.short_break_minutes,
            self.timer.long_break_minutes,
            self.timer.long_break_every,
        )
    }

    /// Fill backend credentials from the environment; set variables win.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend.url = Some(url);
        }
        if let Some(key) = non_empty(ENV_API_KEY) {
            self.backend.api_key = Some(key);
        }
        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.backend.access_token = Some(token);
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(mut self) -> Self {
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("<redacted>".to_string());
            }
        };
        mask(&mut self.backend.api_key);
        mask(&mut self.backend.access_token);
        self
    }

    pub fn local_path(&self) -> Result<PathBuf> {
        match &self.backend.path {
            Some(p) => Ok(p.clone()),
            None => default_board_path(),
        }
    }

    pub fn rest_config(&self) -> Result<RestConfig> {
        let Some(url) = self.backend.url.clone() else {
            bail!("backend.kind = \"rest\" needs backend.url or ${ENV_BACKEND_URL}");
        };
        let Some(api_key) = self.backend.api_key.clone() else {
            bail!("backend.kind = \"rest\" needs backend.api_key or ${ENV_API_KEY}");
        };
        let mut cfg = RestConfig::new(url, api_key);
        cfg.access_token = self.backend.access_token.clone();
        cfg.timeout = std::time::Duration::from_secs(self.backend.timeout_secs.max(1));
        cfg.retry = self.retry;
        Ok(cfg)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tometo_home()?.join("config.toml"))
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

/// Load the config file (if any), then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut cfg = match path {
        Some(p) => load_config_from(p)?,
        None => load_config_from(&config_path()?)?,
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    cfg.tz().context("config timezone")?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(&Config::default(), path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
