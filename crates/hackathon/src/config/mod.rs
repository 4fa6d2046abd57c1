use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_UPLOAD_MAX_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_MENTOR_FORMS_URL: &str =
    "https://drive.google.com/open?id=0B8MqIMxG0xUJcmU5RFppWUNhWUE";

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
    pub event: EventConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            event: EventConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Event-specific settings handed to the application service at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventConfig {
    /// Display name used in confirmation emails.
    pub event_name: String,
    /// Sender address for outgoing mail.
    pub email_from: String,
    /// Permanent directory uploaded files are moved into.
    pub upload_root: PathBuf,
    /// Scratch directory multipart uploads are streamed into before validation.
    pub upload_temp_dir: PathBuf,
    /// JSON document describing the application branches and their questions.
    pub questions_path: PathBuf,
    /// Largest multipart submission body accepted, in bytes.
    pub upload_max_bytes: usize,
    /// Where mentors fetch their background check forms; quoted in the mentor confirmation.
    pub mentor_forms_url: String,
}

impl EventConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let event_name = env::var("EVENT_NAME").unwrap_or_else(|_| "HackGT".to_string());
        if event_name.trim().is_empty() {
            return Err(ConfigError::Blank { key: "EVENT_NAME" });
        }

        let email_from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "HackGT Team <hello@hack.gt>".to_string());
        if email_from.trim().is_empty() {
            return Err(ConfigError::Blank { key: "EMAIL_FROM" });
        }

        let upload_root = env::var("UPLOAD_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let upload_temp_dir = env::var("UPLOAD_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("hackathon-uploads"));
        let questions_path = env::var("QUESTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/questions.json"));

        let upload_max_bytes = match env::var("UPLOAD_MAX_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidUploadLimit)?,
            Err(_) => DEFAULT_UPLOAD_MAX_BYTES,
        };

        let mentor_forms_url =
            env::var("MENTOR_FORMS_URL").unwrap_or_else(|_| DEFAULT_MENTOR_FORMS_URL.to_string());
        if mentor_forms_url.trim().is_empty() {
            return Err(ConfigError::Blank {
                key: "MENTOR_FORMS_URL",
            });
        }

        Ok(Self {
            event_name,
            email_from,
            upload_root,
            upload_temp_dir,
            questions_path,
            upload_max_bytes,
            mentor_forms_url,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidUploadLimit,
    InvalidHost { source: std::net::AddrParseError },
    Blank { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidUploadLimit => {
                write!(f, "UPLOAD_MAX_BYTES must be a positive number of bytes")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Blank { key } => write!(f, "{key} must not be blank"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidUploadLimit
            | ConfigError::Blank { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
