use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_URL: &str = "https://gemini.google.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GagipressConfig {
    pub supabase: SupabaseSection,
    #[serde(default)]
    pub openai: OpenAiSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub amazon: AmazonSection,
}

impl GagipressConfig {
    pub fn validate(&self) -> Result<()> {
        if self.supabase.url.trim().is_empty() {
            return Err(ConfigError::Invalid("supabase URL is required".into()));
        }
        if self.supabase.anon_key.trim().is_empty() {
            return Err(ConfigError::Invalid("supabase anon key is required".into()));
        }
        for (name, value) in [
            ("supabase.url", &self.supabase.url),
            ("openai.base_url", &self.openai.base_url),
            ("gemini.url", &self.gemini.url),
        ] {
            Url::parse(value)
                .map_err(|err| ConfigError::Invalid(format!("{name} {value:?}: {err}")))?;
        }
        Ok(())
    }

    /// Environment variables win over values read from disk.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(value) = read("OPENAI_API_KEY") {
            self.openai.api_key = value;
        }
        if let Some(value) = read("SUPABASE_URL") {
            self.supabase.url = value;
        }
        if let Some(value) = read("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = value;
        }
        if let Some(value) = read("SUPABASE_SERVICE_KEY") {
            self.supabase.service_key = Some(value);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSection {
    pub url: String,
    pub anon_key: String,
    #[serde(default)]
    pub service_key: Option<String>,
}

impl SupabaseSection {
    /// Service key when present, anon key otherwise.
    pub fn api_key(&self) -> &str {
        self.service_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(&self.anon_key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSection {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_openai_retry")]
    pub retry: RetryPolicy,
}

impl OpenAiSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_openai_base_url(),
            timeout_seconds: default_openai_timeout(),
            max_tokens: default_max_tokens(),
            retry: default_openai_retry(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSection {
    #[serde(default = "default_gemini_url")]
    pub url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_prompt_selector")]
    pub prompt_selector: String,
    #[serde(default = "default_response_selector")]
    pub response_selector: String,
    #[serde(default = "default_true")]
    pub sandbox: bool,
}

impl GeminiSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            url: default_gemini_url(),
            headless: true,
            executable_path: None,
            user_agents: default_user_agents(),
            timeout_seconds: default_gemini_timeout(),
            settle_ms: default_settle_ms(),
            prompt_selector: default_prompt_selector(),
            response_selector: default_response_selector(),
            sandbox: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmazonSection {
    #[serde(default = "default_marketplace")]
    pub marketplace: String,
}

impl AmazonSection {
    pub fn product_url(&self, asin: Option<&str>) -> String {
        match asin.map(str::trim).filter(|asin| !asin.is_empty()) {
            Some(asin) => format!("https://www.{}/dp/{}", self.marketplace, asin),
            None => String::new(),
        }
    }
}

impl Default for AmazonSection {
    fn default() -> Self {
        Self {
            marketplace: default_marketplace(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_openai_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_openai_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(4), 2.0)
}

fn default_gemini_url() -> String {
    DEFAULT_GEMINI_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_user_agents() -> Vec<String> {
    vec![DEFAULT_USER_AGENT.to_string()]
}

fn default_gemini_timeout() -> u64 {
    120
}

fn default_settle_ms() -> u64 {
    5_000
}

fn default_prompt_selector() -> String {
    r#"textarea[placeholder*="Enter a prompt"]"#.to_string()
}

fn default_response_selector() -> String {
    r#"div[data-test-id="conversation-turn-2"]"#.to_string()
}

fn default_marketplace() -> String {
    "amazon.it".to_string()
}

/// `~/.gagipress/config.toml`, or a relative fallback when no home is set.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gagipress")
        .join("config.toml")
}

pub fn load_gagipress_config<P: AsRef<Path>>(path: P) -> Result<GagipressConfig> {
    let mut config: GagipressConfig = load_toml(path)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
