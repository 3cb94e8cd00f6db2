use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, resolved from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub adzuna_country: String,
    pub rapidapi_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub db_path: Option<PathBuf>,
    pub max_results: u32,
    pub enrich_cap: usize,     // max postings sent to the AI enricher per batch
    pub enrich_prefix: usize,  // max description chars per enrichment call
    pub cache_ttl: Duration,   // fetch cache lifetime
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adzuna_app_id: None,
            adzuna_app_key: None,
            adzuna_country: "us".to_string(),
            rapidapi_key: None,
            gemini_api_key: None,
            db_path: None,
            max_results: 100,
            enrich_cap: 25,
            enrich_prefix: 2000,
            cache_ttl: Duration::from_secs(1200),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            adzuna_app_id: env::var("ADZUNA_APP_ID").ok(),
            adzuna_app_key: env::var("ADZUNA_APP_KEY").ok(),
            adzuna_country: env::var("ADZUNA_COUNTRY").unwrap_or_else(|_| "us".to_string()),
            rapidapi_key: env::var("RAPIDAPI_KEY").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            db_path: env::var("SKILLPULSE_DB").ok().map(PathBuf::from),
            ..Self::default()
        }
    }
}
