use crate::services::fetcher::{HttpFetcher, PageFetcher};
use crate::services::store::MemoryStore;
use crate::AppState;
use anyhow::Result;
use env_logger::{Builder, Env};
use lazy_static::lazy_static;
use log::info;
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_INVIDIOUS_INSTANCES: &[&str] = &[
    "https://inv.vern.cc",
    "https://invidious.lunar.icu",
    "https://vid.puffyan.us",
    "https://invidious.privacydev.net",
    "https://inv.odyssey346.dev",
    "https://invidious.slipfox.xyz",
    "https://invidious.weblibre.org",
    "https://iv.ggtyler.dev",
];

lazy_static! {
    pub static ref INVIDIOUS_INSTANCES: Vec<String> = env::var("INVIDIOUS_INSTANCES")
        .map(|raw| split_list(&raw))
        .ok()
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| DEFAULT_INVIDIOUS_INSTANCES.iter().map(|s| s.to_string()).collect());
    pub static ref YOUTUBE_BASE_URL: String =
        env::var("YOUTUBE_BASE_URL").unwrap_or_else(|_| "https://www.youtube.com".to_string());
    pub static ref BROWSER_USER_AGENT: String = env::var("BROWSER_USER_AGENT").unwrap_or_else(|_| {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
    });
    pub static ref API_USER_AGENT: String = env::var("API_USER_AGENT")
        .unwrap_or_else(|_| "Mozilla/5.0 (compatible; TubeProxy/1.0)".to_string());
    pub static ref CACHE_CAPACITY: usize = env::var("CACHE_CAPACITY")
        .unwrap_or_else(|_| "1000".to_string())
        .parse::<usize>()
        .unwrap_or(1000);
    pub static ref CACHE_TTL_SECS: u64 = env::var("CACHE_TTL_SECS")
        .unwrap_or_else(|_| "3600".to_string())
        .parse::<u64>()
        .unwrap_or(3600);
    pub static ref SEARCH_LOG_CAPACITY: usize = env::var("SEARCH_LOG_CAPACITY")
        .unwrap_or_else(|_| "100".to_string())
        .parse::<usize>()
        .unwrap_or(100);
    pub static ref CORS_ALLOWED_ORIGINS: Vec<String> = split_list(
        &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string())
    );
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Values the resolvers need. Built once from the environment and handed
/// down by reference so tests can swap anything out.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub invidious_instances: Vec<String>,
    pub youtube_base_url: String,
    pub browser_user_agent: String,
    pub api_user_agent: String,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub search_log_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            invidious_instances: INVIDIOUS_INSTANCES.clone(),
            youtube_base_url: YOUTUBE_BASE_URL.trim_end_matches('/').to_string(),
            browser_user_agent: BROWSER_USER_AGENT.clone(),
            api_user_agent: API_USER_AGENT.clone(),
            cache_capacity: *CACHE_CAPACITY,
            cache_ttl: Duration::from_secs(*CACHE_TTL_SECS),
            search_log_capacity: *SEARCH_LOG_CAPACITY,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            invidious_instances: DEFAULT_INVIDIOUS_INSTANCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            youtube_base_url: "https://www.youtube.com".to_string(),
            browser_user_agent: "Mozilla/5.0".to_string(),
            api_user_agent: "Mozilla/5.0".to_string(),
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(3600),
            search_log_capacity: 100,
        }
    }
}

pub fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting Rocket backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub fn create_app_state() -> Result<AppState> {
    let config = AppConfig::from_env();
    info!(
        "Using {} Invidious instances, YouTube at {}",
        config.invidious_instances.len(),
        config.youtube_base_url
    );

    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(
        &config.browser_user_agent,
        &config.api_user_agent,
    )?);

    Ok(AppState::new(config, fetcher))
}

impl AppState {
    pub fn new(config: AppConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let store = MemoryStore::new(
            config.cache_capacity,
            config.cache_ttl,
            config.search_log_capacity,
        );
        AppState {
            config,
            fetcher,
            store,
        }
    }
}

pub fn create_cors() -> Result<rocket_cors::Cors> {
    let origins: Vec<&str> = CORS_ALLOWED_ORIGINS.iter().map(String::as_str).collect();
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&origins))
        .allowed_methods(
            vec![Method::Get, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .allow_credentials(false)
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}
