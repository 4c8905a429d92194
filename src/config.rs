use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "VetKB";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default completion model for extraction and chat assistants.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

pub fn default_log_filter() -> String {
    "vetkb=info,tower_http=info".to_string()
}

/// Get the application data directory (~/VetKB/)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    /// None ⇒ degraded mode: extraction and chat endpoints answer 503.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("VETKB_BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.parse().expect("valid default addr"));

        let db_path = std::env::var("VETKB_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir().join("vetkb.db"));

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self {
            bind_addr,
            db_path,
            openai_api_key,
            openai_base_url,
            model,
        }
    }
}
