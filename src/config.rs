use crate::backend::BackendConfig;
use anyhow::{Context, Result, anyhow};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const ENV_ENDPOINT: &str = "SHELLMATE_API_ENDPOINT";
const ENV_API_KEY: &str = "SHELLMATE_API_KEY";
const ENV_SHOW_PROMPT: &str = "SHELLMATE_SHOW_PROMPT";

/// Client-side configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_show_prompt")]
    pub show_prompt: bool,
}

fn default_show_prompt() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            show_prompt: default_show_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from file, then let environment variables override it
    pub fn load() -> Result<Self> {
        let config = match Self::get_config_path() {
            Ok(path) => Self::load_or_default(&path),
            Err(_) => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Reads `path`, falling back to defaults. An absent file is normal; an
    /// unreadable or malformed one is reported.
    fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        Self::load_from_file(path).unwrap_or_else(|e| {
            warn!("Ignoring config file: {:#}", e);
            Self::default()
        })
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Config file not found"));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Applies overrides from a variable lookup (the process environment in production).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.endpoint = Some(endpoint.trim().to_string());
        }
        if let Some(api_key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(api_key.trim().to_string());
        }
        if let Some(flag) = lookup(ENV_SHOW_PROMPT) {
            self.show_prompt = parse_flag(&flag);
        }
        self
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".shellmate"))
    }

    /// The service endpoint. Its absence is a startup error.
    pub fn require_endpoint(&self) -> Result<&str> {
        self.endpoint.as_deref().ok_or_else(|| {
            anyhow!("{} environment variable not set", ENV_ENDPOINT)
        })
    }

    pub fn show_config_info() -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());

        if config_path.exists() {
            println!("Status: Found");
        } else {
            println!("Status: Not found (using defaults)");
        }

        let config = Self::load()?;
        println!("Endpoint: {}", config.endpoint.as_deref().unwrap_or("Not set"));
        println!("API Key: {}", if config.api_key.is_some() { "Set" } else { "Not set" });
        println!("Show prompt: {}", config.show_prompt);

        println!("\nEnvironment variables (override the file):");
        println!("  export {}=<service-url>", ENV_ENDPOINT);
        println!("  export {}=<key>", ENV_API_KEY);
        println!("  export {}=true|false", ENV_SHOW_PROMPT);

        Ok(())
    }
}

/// `true`, `1` and `yes` (any case) enable a flag; anything else disables it.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Service-side configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: String,
    pub use_mock: bool,
    pub backend: BackendConfig,
    pub backend_timeout: Duration,
}

impl ServiceConfig {
    pub const DEFAULT_LISTEN: &'static str = "127.0.0.1:8080";
    pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let use_mock = lookup("SHELLMATE_USE_MOCK").is_some();
        let api_key = match non_empty("ANTHROPIC_API_KEY") {
            Some(key) => key,
            None if use_mock => String::new(),
            None => {
                return Err(anyhow!(
                    "No Anthropic API key found. Set ANTHROPIC_API_KEY, \
                     or SHELLMATE_USE_MOCK=1 for the offline backend."
                ));
            }
        };

        let backend_timeout = match non_empty("SHELLMATE_BACKEND_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(value = %raw, "Invalid SHELLMATE_BACKEND_TIMEOUT_SECS; using default");
                    Self::DEFAULT_BACKEND_TIMEOUT_SECS
                }
            },
            None => Self::DEFAULT_BACKEND_TIMEOUT_SECS,
        };

        let url = non_empty("SHELLMATE_BACKEND_URL")
            .unwrap_or_else(|| BackendConfig::DEFAULT_URL.to_string());
        let model_id = non_empty("SHELLMATE_MODEL_ID")
            .unwrap_or_else(|| BackendConfig::DEFAULT_MODEL_ID.to_string());
        let listen =
            non_empty("SHELLMATE_LISTEN").unwrap_or_else(|| Self::DEFAULT_LISTEN.to_string());

        Ok(Self {
            listen,
            use_mock,
            backend: BackendConfig::new(&url, &api_key, &model_id),
            backend_timeout: Duration::from_secs(backend_timeout),
        })
    }
}
