use crate::utils::error::{RedbiomError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_HOSTNAME: &str = "http://127.0.0.1:7379";
pub const HOST_ENV: &str = "REDBIOM_HOST";
pub const CONFIG_ENV: &str = "REDBIOM_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedbiomConfig {
    pub hostname: String,
    pub timeout_seconds: u64,
    pub log_format: LogFormat,
}

impl Default for RedbiomConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            timeout_seconds: 30,
            log_format: LogFormat::Compact,
        }
    }
}

impl RedbiomConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            RedbiomError::config(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed)
            .map_err(|e| RedbiomError::config(format!("TOML parsing error: {}", e)))
    }

    /// Resolves the effective configuration.
    ///
    /// Precedence: `host` argument, `REDBIOM_HOST`, the config file (explicit
    /// path or `REDBIOM_CONFIG`), then defaults.
    pub fn resolve(config_path: Option<&Path>, host: Option<&str>) -> Result<Self> {
        let mut config = match Self::source_path(config_path) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(env_host) = std::env::var(HOST_ENV) {
            if !env_host.trim().is_empty() {
                config.hostname = env_host;
            }
        }
        if let Some(host) = host {
            config.hostname = host.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// The config file `resolve` reads: the explicit path, else `REDBIOM_CONFIG`.
    pub fn source_path(config_path: Option<&Path>) -> Option<PathBuf> {
        config_path.map(Path::to_path_buf).or_else(|| {
            std::env::var_os(CONFIG_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Validate for RedbiomConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("hostname", &self.hostname)?;
        validation::validate_positive_number("timeout_seconds", self.timeout_seconds, 1)?;
        Ok(())
    }
}

/// 替換環境變數 (例如 ${REDBIOM_HOST})
fn substitute_env_vars(content: &str) -> String {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid pattern"));

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}
