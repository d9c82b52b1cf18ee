use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
/// Per-attempt upstream LLM timeout. Past this, the call is classified as
/// a network error and failover proceeds to the next provider.
pub const LLM_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Top-level config (pet.toml + PET_* env overrides, plus the handful of
/// bare env vars documented for this service — AI_PROVIDER_PRIORITY,
/// SILICONFLOW_*, OPENAI_*, REDIS_*).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub kv: KvConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            kv: KvConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    #[serde(default)]
    pub redis_db: i64,
    pub redis_password: Option<String>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            redis_host: default_redis_host(),
            redis_port: DEFAULT_REDIS_PORT,
            redis_db: 0,
            redis_password: None,
        }
    }
}

/// Ordered provider slots plus per-kind credentials. `priority` lists names
/// in the order they should be attempted; a name with no matching entry
/// below (no api key configured) is silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
    pub siliconflow: Option<SiliconflowConfig>,
    pub openai: Option<OpenAiConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiliconflowConfig {
    pub api_key: String,
    #[serde(default = "default_siliconflow_model")]
    pub model: String,
    #[serde(default = "default_siliconflow_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}
fn default_redis_port() -> u16 {
    DEFAULT_REDIS_PORT
}
fn default_priority() -> Vec<String> {
    vec!["siliconflow".to_string(), "openai".to_string()]
}
fn default_siliconflow_model() -> String {
    "Qwen/QwQ-32B".to_string()
}
fn default_siliconflow_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl PetConfig {
    /// Load config from an optional TOML file, then the `AI_PROVIDER_PRIORITY` /
    /// `SILICONFLOW_*` / `OPENAI_*` / `REDIS_*` / `PORT` / `HOST` env vars
    /// documented for this service, then finally a `PET_`-prefixed layer for
    /// anything not covered by those bare names.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(
            PetConfig::default(),
        ));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("PET_").split("_"));

        let mut config: PetConfig = figment
            .extract()
            .map_err(|e| crate::error::PetError::Config(e.to_string()))?;

        // The handful of bare (unprefixed) env vars documented for this
        // service take precedence over both the file and the PET_ layer —
        // they're the ones an operator following the README actually sets.
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.parse() {
                config.http.port = port;
            }
        }
        if let Ok(v) = std::env::var("HOST") {
            config.http.host = v;
        }
        if let Ok(v) = std::env::var("REDIS_HOST") {
            config.kv.redis_host = v;
        }
        if let Ok(v) = std::env::var("REDIS_PORT") {
            if let Ok(port) = v.parse() {
                config.kv.redis_port = port;
            }
        }
        if let Ok(v) = std::env::var("REDIS_DB") {
            if let Ok(db) = v.parse() {
                config.kv.redis_db = db;
            }
        }
        if let Ok(v) = std::env::var("REDIS_PASSWORD") {
            config.kv.redis_password = Some(v);
        }
        if let Ok(v) = std::env::var("AI_PROVIDER_PRIORITY") {
            config.providers.priority = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(api_key) = std::env::var("SILICONFLOW_API_KEY") {
            config.providers.siliconflow = Some(SiliconflowConfig {
                api_key,
                model: std::env::var("SILICONFLOW_MODEL").unwrap_or_else(|_| default_siliconflow_model()),
                base_url: std::env::var("SILICONFLOW_BASE_URL")
                    .unwrap_or_else(|_| default_siliconflow_base_url()),
            });
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config.providers.openai = Some(OpenAiConfig {
                api_key,
                model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| default_openai_model()),
                base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| default_openai_base_url()),
            });
        }

        Ok(config)
    }
}
