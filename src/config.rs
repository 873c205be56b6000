use crate::api_client::{Credentials, RetryPolicy, Site};
use crate::error::AppError;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "statcard";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_THEME: &str = "light";
const DEFAULT_OUT_DIR: &str = "stats";

/// Optional settings file. Every key can be overridden by the environment.
#[derive(Deserialize, Default, Debug)]
struct FileConfig {
    username: Option<String>,
    theme: Option<String>,
    site: Option<String>,
    out_dir: Option<PathBuf>,
    endpoint: Option<String>,
    session: Option<String>,
    csrf_token: Option<String>,
    max_attempts: Option<u32>,
    backoff_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub username: String,
    pub theme: String,
    pub site: Site,
    pub endpoint: Option<String>,
    pub credentials: Option<Credentials>,
    pub out_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn svg_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.svg", self.username))
    }

    pub fn json_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.json", self.username))
    }

    /// Environment first, then the settings file, then defaults.
    pub fn load() -> Result<Self, AppError> {
        let file = load_file_config()?;
        Self::from_sources(|key| std::env::var(key).ok(), file)
    }

    fn from_sources<F>(env: F, file: FileConfig) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let username = var("LEETCODE_USERNAME")
            .or(file.username)
            .ok_or_else(|| AppError::Config("LEETCODE_USERNAME is not set".to_string()))?;
        if username.contains(['/', '\\']) || username.starts_with('.') {
            return Err(AppError::Config(format!(
                "username '{}' cannot be used as a file name",
                username
            )));
        }

        let site = match var("LEETCODE_SITE").or(file.site) {
            Some(name) => name.parse::<Site>()?,
            None => Site::default(),
        };

        let credentials = var("LEETCODE_SESSION")
            .or(file.session)
            .map(|session| Credentials {
                session,
                csrf_token: var("LEETCODE_CSRF_TOKEN").or(file.csrf_token),
            });

        let defaults = RetryPolicy::default();
        let max_attempts = match var("FETCH_MAX_ATTEMPTS") {
            Some(raw) => parse_number::<u32>("FETCH_MAX_ATTEMPTS", &raw)?,
            None => file.max_attempts.unwrap_or(defaults.max_attempts),
        };
        if max_attempts == 0 {
            return Err(AppError::Config(
                "FETCH_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let backoff = match var("FETCH_BACKOFF_MS") {
            Some(raw) => Duration::from_millis(parse_number::<u64>("FETCH_BACKOFF_MS", &raw)?),
            None => file
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
        };

        Ok(Self {
            username,
            theme: var("THEME")
                .or(file.theme)
                .unwrap_or_else(|| DEFAULT_THEME.to_string()),
            site,
            endpoint: var("LEETCODE_ENDPOINT").or(file.endpoint),
            credentials,
            out_dir: var("STATS_OUT_DIR")
                .map(PathBuf::from)
                .or(file.out_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.parse::<T>()
        .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("STATCARD_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path.trim()));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn load_file_config() -> Result<FileConfig, AppError> {
    let Some(config_path) = get_config_path() else {
        return Ok(FileConfig::default());
    };

    if !config_path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(&config_path)
        .map_err(|e| AppError::Config(format!("{}: {}", config_path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| AppError::Config(format!("{}: {}", config_path.display(), e)))
}
