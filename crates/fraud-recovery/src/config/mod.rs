use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::intake::MoneyAmount;

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
    pub documents: DocumentConfig,
    pub payment: PaymentConfig,
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
        let brand = env::var("APP_BRAND").unwrap_or_else(|_| DEFAULT_BRAND.to_string());

        let product_code =
            env::var("APP_PRODUCT_CODE").unwrap_or_else(|_| DEFAULT_PRODUCT_CODE.to_string());
        let price_cents = env::var("APP_PRICE_CENTS")
            .unwrap_or_else(|_| DEFAULT_PRICE_CENTS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPrice)?;
        if price_cents == 0 {
            return Err(ConfigError::InvalidPrice);
        }

        let poll_interval_secs = env::var("APP_PAYMENT_POLL_SECS")
            .unwrap_or_else(|_| DEFAULT_POLL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPollInterval)?;
        let request_timeout_secs = env::var("APP_PAYMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let gateway_url = env::var("APP_PAYMENT_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let api_key = env::var("APP_PAYMENT_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            documents: DocumentConfig { brand },
            payment: PaymentConfig {
                product_code,
                price: MoneyAmount::from_cents(price_cents),
                gateway_url,
                api_key,
                poll_interval_secs,
                request_timeout_secs,
            },
        })
    }
}

const DEFAULT_BRAND: &str = "Fraud Recovery Kit";
const DEFAULT_PRODUCT_CODE: &str = "fraud-kit-complete";
const DEFAULT_PRICE_CENTS: u64 = 4990;
const DEFAULT_POLL_SECS: u64 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MIN_POLL_SECS: u64 = 2;

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

/// Branding stamped on rendered document headers.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub brand: String,
}

/// Product and processor settings for the one-time document purchase.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub product_code: String,
    pub price: MoneyAmount,
    /// Processor base URL. Only development may run without one, against the sandbox gateway.
    pub gateway_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl PaymentConfig {
    /// Poll cadence for settlement checks, never below two seconds.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPrice,
    InvalidPollInterval,
    InvalidTimeout,
    MissingPaymentGateway { environment: AppEnvironment },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPrice => {
                write!(f, "APP_PRICE_CENTS must be a positive whole number of cents")
            }
            ConfigError::InvalidPollInterval => {
                write!(f, "APP_PAYMENT_POLL_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "APP_PAYMENT_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::MissingPaymentGateway { environment } => write!(
                f,
                "APP_PAYMENT_URL is required in the {environment:?} environment; sandbox charges are development only"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPrice
            | ConfigError::InvalidPollInterval
            | ConfigError::InvalidTimeout
            | ConfigError::MissingPaymentGateway { .. } => None,
        }
    }
}
