use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::error::ShopscoutError;
use crate::provider::ProviderId;
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_AI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub country: String,
    pub language: String,
    pub no_cache: bool,
    pub debug: bool,
    /// Hard ceiling for one adapter call.
    pub timeout: Duration,
    pub max_attempts: u32,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    /// Direct AI calls may be forbidden by runtime policy; the relay is
    /// the sanctioned path in that case.
    pub allow_direct_ai: bool,
    pub ai_endpoint: String,
    pub ai_model: String,
    pub ai_api_key: Option<String>,
    pub relay_url: Option<String>,
    pub catalog_endpoint: Option<String>,
    pub catalog_api_key: Option<String>,
    pub provider_preference: Option<ProviderId>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: ConfigDefaults,
    #[serde(default)]
    providers: ConfigProviders,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigDefaults {
    country: Option<String>,
    language: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    cache_ttl_secs: Option<u64>,
    cache_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigProviders {
    preference: Option<String>,
    allow_direct_ai: Option<bool>,
    ai_endpoint: Option<String>,
    ai_model: Option<String>,
    ai_api_key: Option<String>,
    relay_url: Option<String>,
    catalog_endpoint: Option<String>,
    catalog_api_key: Option<String>,
}

impl AppConfig {
    pub fn load(
        country: Option<String>,
        language: Option<String>,
        no_cache: bool,
        timeout_secs: Option<u64>,
        provider: Option<String>,
        debug: bool,
    ) -> Result<Self, ShopscoutError> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| ".".into())
            .join("shopscout");
        let file_config = load_config_file(&config_dir.join("config.toml"));

        // Priority: CLI flags -> env vars -> config file -> defaults
        let country = country
            .or_else(|| std::env::var("SHOPSCOUT_COUNTRY").ok())
            .or(file_config.defaults.country)
            .unwrap_or_else(|| "us".to_string())
            .to_lowercase();

        let language = language
            .or_else(|| std::env::var("SHOPSCOUT_LANGUAGE").ok())
            .or(file_config.defaults.language)
            .unwrap_or_else(|| "en".to_string())
            .to_lowercase();

        let timeout_secs = timeout_secs
            .or(file_config.defaults.timeout_secs)
            .unwrap_or(15);

        let ai_api_key = std::env::var("SHOPSCOUT_AI_API_KEY")
            .ok()
            .or(file_config.providers.ai_api_key);

        let relay_url = std::env::var("SHOPSCOUT_RELAY_URL")
            .ok()
            .or(file_config.providers.relay_url);

        let catalog_endpoint = std::env::var("SHOPSCOUT_CATALOG_ENDPOINT")
            .ok()
            .or(file_config.providers.catalog_endpoint);

        let catalog_api_key = std::env::var("SHOPSCOUT_CATALOG_API_KEY")
            .ok()
            .or(file_config.providers.catalog_api_key);

        let preference_str = provider
            .or_else(|| std::env::var("SHOPSCOUT_PROVIDER").ok())
            .or(file_config.providers.preference);
        let provider_preference = match preference_str {
            Some(ref s) => Some(ProviderId::parse(s).ok_or_else(|| {
                ShopscoutError::Config(format!(
                    "Unknown provider '{}'. Use one of: proxy, direct, catalog",
                    s
                ))
            })?),
            None => None,
        };

        Self::validate_country(&country)?;

        Ok(AppConfig {
            country,
            language,
            no_cache,
            debug,
            timeout: Duration::from_secs(timeout_secs),
            max_attempts: file_config.defaults.max_attempts.unwrap_or(3),
            cache_ttl: file_config
                .defaults
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TTL),
            cache_capacity: file_config
                .defaults
                .cache_capacity
                .unwrap_or(DEFAULT_CAPACITY),
            allow_direct_ai: file_config.providers.allow_direct_ai.unwrap_or(true),
            ai_endpoint: file_config
                .providers
                .ai_endpoint
                .unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string()),
            ai_model: file_config
                .providers
                .ai_model
                .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            ai_api_key,
            relay_url,
            catalog_endpoint,
            catalog_api_key,
            provider_preference,
        })
    }

    pub fn validate_country(country: &str) -> Result<(), ShopscoutError> {
        const KNOWN_COUNTRIES: &[&str] = &[
            "us", "ca", "gb", "au", "nz", "de", "fr", "es", "it", "nl", "be", "at", "ch", "se",
            "no", "dk", "fi", "pl", "cz", "ie", "pt", "gr", "ru", "ua", "tr", "in", "jp", "kr",
            "cn", "sg", "hk", "tw", "th", "my", "ph", "id", "vn", "br", "mx", "cl", "co", "ar",
            "za", "ae", "sa", "il", "eg",
        ];
        if !KNOWN_COUNTRIES.contains(&country) {
            return Err(ShopscoutError::Config(format!(
                "Unknown country code '{}'. Use a two-letter code like us, de, ch, jp",
                country
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            ..RetryPolicy::default()
        }
    }
}

fn load_config_file(config_path: &Path) -> ConfigFile {
    if config_path.exists() {
        match std::fs::read_to_string(config_path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => ConfigFile::default(),
        }
    } else {
        ConfigFile::default()
    }
}
