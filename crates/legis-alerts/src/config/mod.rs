use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::workflows::monitoring::RunMode;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub monitor: MonitorConfig,
    pub telegram: TelegramConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            monitor: MonitorConfig::from_env()?,
            telegram: TelegramConfig {
                enabled: parse_flag("NOTIFY_TELEGRAM", true)?,
                bot_token: optional_var("TELEGRAM_BOT_TOKEN"),
                chat_id: optional_var("TELEGRAM_CHAT_ID"),
            },
            email: EmailConfig {
                enabled: parse_flag("NOTIFY_EMAIL", true)?,
                smtp_server: var_or("EMAIL_SMTP_SERVER", "smtp.gmail.com"),
                smtp_port: parse_var("EMAIL_SMTP_PORT", 587u16)?,
                sender: optional_var("EMAIL_SENDER"),
                password: optional_var("EMAIL_PASSWORD"),
                recipients: split_list(&var_or("EMAIL_RECIPIENTS", "")),
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables for the monitoring cycle itself.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub run_mode: RunMode,
    pub profile_path: PathBuf,
    pub state_dir: PathBuf,
    pub lookback_days: u32,
    pub agenda_lookahead_days: u32,
    pub include_agenda: bool,
    pub min_score: u8,
    pub per_type_limit: usize,
    pub fetch_concurrency: usize,
    pub status_cache_capacity: usize,
    pub http_timeout: Duration,
    pub send_interval: Duration,
    pub timezone: Tz,
    pub camara_api_base: String,
    pub brand_name: String,
    pub panel_url: Option<String>,
}

impl MonitorConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_mode = var_or("RUN_MODE", "scan");
        let run_mode = raw_mode
            .parse::<RunMode>()
            .map_err(|_| ConfigError::InvalidRunMode(raw_mode.clone()))?;

        let raw_tz = var_or("OPERATING_TZ", "America/Sao_Paulo");
        let timezone = raw_tz
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(raw_tz.clone()))?;

        Ok(Self {
            run_mode,
            profile_path: PathBuf::from(var_or("PROFILE_PATH", "profile.toml")),
            state_dir: PathBuf::from(var_or("STATE_DIR", "state")),
            lookback_days: parse_var("LOOKBACK_DAYS", 7u32)?,
            agenda_lookahead_days: parse_var("AGENDA_LOOKAHEAD_DAYS", 7u32)?,
            include_agenda: parse_flag("INCLUDE_AGENDA", true)?,
            min_score: parse_var("MIN_SCORE", 0u8)?.min(100),
            per_type_limit: parse_var("PER_TYPE_LIMIT", 50usize)?,
            fetch_concurrency: parse_var("FETCH_CONCURRENCY", 10usize)?.max(1),
            status_cache_capacity: parse_var("STATUS_CACHE_CAPACITY", 500usize)?,
            http_timeout: Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", 15u64)?),
            send_interval: Duration::from_millis(parse_var("SEND_INTERVAL_MS", 1000u64)?),
            timezone,
            camara_api_base: var_or(
                "CAMARA_API_BASE",
                "https://dadosabertos.camara.leg.br/api/v2",
            ),
            brand_name: var_or("BRAND_NAME", "Monitor de Interesses"),
            panel_url: optional_var("PANEL_URL"),
        })
    }
}

/// Telegram bot credentials for the real-time channel.
#[derive(Clone)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    /// Token and chat id, when the channel is enabled and fully configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if !self.enabled {
            return None;
        }
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) => Some((token, chat)),
            _ => None,
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enabled", &self.enabled)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// SMTP settings for the consolidated channel.
#[derive(Clone)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: Option<String>,
    pub password: Option<String>,
    pub recipients: Vec<String>,
}

impl EmailConfig {
    pub fn is_complete(&self) -> bool {
        self.enabled
            && self.sender.is_some()
            && self.password.is_some()
            && !self.recipients.is_empty()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender", &self.sender)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("recipients", &self.recipients.len())
            .finish()
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { name, value: raw })
        }
        _ => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
    InvalidTimezone(String),
    InvalidRunMode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
            ConfigError::InvalidTimezone(value) => {
                write!(f, "OPERATING_TZ '{value}' is not a known IANA timezone")
            }
            ConfigError::InvalidRunMode(value) => write!(
                f,
                "RUN_MODE '{value}' must be one of greeting, scan, summary"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "RUN_MODE",
            "LOOKBACK_DAYS",
            "MIN_SCORE",
            "FETCH_CONCURRENCY",
            "OPERATING_TZ",
            "NOTIFY_TELEGRAM",
            "NOTIFY_EMAIL",
            "TELEGRAM_BOT_TOKEN",
            "TELEGRAM_CHAT_ID",
            "EMAIL_SENDER",
            "EMAIL_PASSWORD",
            "EMAIL_RECIPIENTS",
            "PANEL_URL",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.monitor.run_mode, RunMode::Scan);
        assert_eq!(config.monitor.lookback_days, 7);
        assert_eq!(config.monitor.fetch_concurrency, 10);
        assert_eq!(config.monitor.timezone, chrono_tz::America::Sao_Paulo);
        assert!(config.monitor.panel_url.is_none());
        assert!(config.telegram.credentials().is_none());
        assert!(!config.email.is_complete());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn legacy_run_mode_names_are_accepted() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RUN_MODE", "bom_dia");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.monitor.run_mode, RunMode::Greeting);
        env::remove_var("RUN_MODE");
    }

    #[test]
    fn rejects_unparseable_numbers_and_modes() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LOOKBACK_DAYS", "a week");
        match AppConfig::load() {
            Err(ConfigError::InvalidValue { name, .. }) => assert_eq!(name, "LOOKBACK_DAYS"),
            other => panic!("expected invalid value, got {other:?}"),
        }
        reset_env();
        env::set_var("RUN_MODE", "weekly");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidRunMode(_))
        ));
        reset_env();
    }

    #[test]
    fn channel_credentials_require_every_field() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("TELEGRAM_CHAT_ID", "-1001");
        env::set_var("EMAIL_SENDER", "monitor@example.org");
        env::set_var("EMAIL_PASSWORD", "secret");
        env::set_var("EMAIL_RECIPIENTS", " a@example.org, ,b@example.org ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telegram.credentials(), Some(("123:abc", "-1001")));
        assert_eq!(config.email.recipients, vec!["a@example.org", "b@example.org"]);
        assert!(config.email.is_complete());
        assert!(!format!("{:?}", config.email).contains("secret"));

        env::set_var("NOTIFY_TELEGRAM", "off");
        let config = AppConfig::load().expect("config loads");
        assert!(config.telegram.credentials().is_none());
        reset_env();
    }
}
