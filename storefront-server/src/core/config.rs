//! Server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storefront server configuration, loaded once at startup and passed down
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// HTTP port (API, webhooks, sockets)
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub log_level: String,
    /// Daily rolling log files go here when set
    pub log_dir: Option<String>,
    /// Crypto Pay API base URL
    pub wallet_api_url: String,
    /// Crypto Pay API token (also keys the webhook signature)
    pub wallet_api_token: String,
    /// Telegram Bot API base URL
    pub bot_api_url: String,
    pub bot_token: String,
    /// Mini-app URL used for deep links in bot pushes
    pub webapp_url: String,
    /// Static admin console token
    pub admin_token: String,
    pub wallet_timeout: Duration,
    /// Bot API request timeout
    pub bot_timeout: Duration,
    pub reconcile_timeout: Duration,
    /// Per-session outbound queue size
    pub session_buffer: usize,
    pub push_queue_capacity: usize,
    /// Pending settlement retries; producers wait when it is full
    pub settlement_queue_capacity: usize,
    pub settlement_max_attempts: u32,
    /// First retry delay; doubles per attempt
    pub settlement_retry_delay: Duration,
    /// Maximum age of Telegram init data
    pub init_data_max_age_secs: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any `name -> value` source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());
        let parse_or = |name: &str, default: u64| -> u64 {
            lookup(name).and_then(|v| v.parse().ok()).unwrap_or(default)
        };
        let millis = |name: &str, default: u64| Duration::from_millis(parse_or(name, default));

        let environment = var("ENVIRONMENT", "development");
        // secrets must be set and non-empty outside development
        let require_secret = |name: &str| -> Result<String, BoxError> {
            match lookup(name) {
                Some(v) if !v.is_empty() || environment == "development" => Ok(v),
                Some(_) => Err(format!("{name} must not be empty in {environment} environment").into()),
                None if environment == "development" => Ok(format!("dev-{name}-not-for-production")),
                None => Err(format!("{name} must be set in {environment} environment").into()),
            }
        };

        Ok(Self {
            database_url: var("DATABASE_URL", "sqlite:storefront.db"),
            http_port: lookup("HTTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            log_level: var("LOG_LEVEL", "info"),
            log_dir: lookup("LOG_DIR").filter(|s| !s.is_empty()),
            wallet_api_url: var("WALLET_API_URL", "https://pay.crypt.bot/api"),
            wallet_api_token: require_secret("WALLET_API_TOKEN")?,
            bot_api_url: var("BOT_API_URL", "https://api.telegram.org"),
            bot_token: require_secret("BOT_TOKEN")?,
            webapp_url: var("WEBAPP_URL", "http://localhost:5173"),
            admin_token: require_secret("ADMIN_TOKEN")?,
            wallet_timeout: millis("WALLET_TIMEOUT_MS", 10_000),
            bot_timeout: millis("BOT_TIMEOUT_MS", 10_000),
            reconcile_timeout: millis("RECONCILE_TIMEOUT_MS", 15_000),
            session_buffer: parse_or("SESSION_BUFFER", 64) as usize,
            push_queue_capacity: parse_or("PUSH_QUEUE_CAPACITY", 1024) as usize,
            settlement_queue_capacity: parse_or("SETTLEMENT_QUEUE_CAPACITY", 256) as usize,
            settlement_max_attempts: parse_or("SETTLEMENT_MAX_ATTEMPTS", 5) as u32,
            settlement_retry_delay: millis("SETTLEMENT_RETRY_DELAY_MS", 2_000),
            init_data_max_age_secs: parse_or("INIT_DATA_MAX_AGE_SECS", 86_400) as i64,
            environment,
        })
    }

    /// Development defaults with explicit secrets
    pub fn for_tests(wallet_api_token: &str, bot_token: &str, admin_token: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            http_port: 0,
            environment: "development".into(),
            log_level: "debug".into(),
            log_dir: None,
            wallet_api_url: "http://127.0.0.1:9/api".into(),
            wallet_api_token: wallet_api_token.into(),
            bot_api_url: "http://127.0.0.1:9".into(),
            bot_token: bot_token.into(),
            webapp_url: "https://shop.example".into(),
            admin_token: admin_token.into(),
            wallet_timeout: Duration::from_millis(500),
            bot_timeout: Duration::from_millis(500),
            reconcile_timeout: Duration::from_secs(5),
            session_buffer: 16,
            push_queue_capacity: 64,
            settlement_queue_capacity: 16,
            settlement_max_attempts: 3,
            settlement_retry_delay: Duration::from_millis(10),
            init_data_max_age_secs: 86_400,
        }
    }
}
