//! Configuration management

use std::{env, fmt, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix for environment variable overrides (`VIDEO_TOKEN_SERVER__PORT=8080`).
pub const ENV_PREFIX: &str = "VIDEO_TOKEN_";

/// Origins allowed by default in development (typical frontend dev servers).
const DEV_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:5175",
];

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before secrets are read.
    /// Paths support ~ expansion. Loaded in order; variables already set in
    /// the process environment are not overridden.
    pub env_files: Vec<String>,
    /// Deployment environment
    pub environment: Environment,
    /// Server configuration
    pub server: ServerConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Token signing configuration
    pub signing: SigningConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_files: vec![".env".to_string()],
            environment: Environment::default(),
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: permissive CORS, generous rate limits
    #[default]
    Development,
    /// Production
    Production,
    /// Test runs
    Test,
}

impl Environment {
    /// Whether this is the development environment
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        })
    }
}

impl Config {
    /// Load configuration from defaults, an optional YAML file and
    /// `VIDEO_TOKEN_`-prefixed environment variables (in increasing priority).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    pub fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Origins allowed by CORS.
    ///
    /// Explicit `cors.allowed_origins` wins. Otherwise development gets the
    /// local dev-server origins and other environments read the
    /// comma-separated `ALLOWED_ORIGINS` variable (empty if unset).
    #[must_use]
    pub fn allowed_origins(&self) -> Vec<String> {
        if let Some(ref origins) = self.cors.allowed_origins {
            return origins.clone();
        }
        if self.environment.is_development() {
            return DEV_ALLOWED_ORIGINS.iter().map(ToString::to_string).collect();
        }
        env::var("ALLOWED_ORIGINS")
            .map(|v| parse_origin_list(&v))
            .unwrap_or_default()
    }

    /// Requests allowed per client within one rate limit window.
    #[must_use]
    pub fn max_requests_per_window(&self) -> u32 {
        self.rate_limit.max_requests.unwrap_or(match self.environment {
            Environment::Production => 100,
            Environment::Development | Environment::Test => 1000,
        })
    }
}

fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// How long to wait for in-flight requests after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `None` selects the environment default.
    pub allowed_origins: Option<Vec<String>>,
}

/// Rate limiting configuration (per client IP, `/api/*` only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Length of the rate limit window
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Requests allowed per window. `None` selects the environment default.
    pub max_requests: Option<u32>,
    /// Key clients on `X-Forwarded-For` / `X-Real-IP` instead of the socket
    /// peer. Only enable behind a proxy that overwrites these headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(15 * 60),
            max_requests: None,
            trust_proxy_headers: false,
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Upper bound on a single signing call; the request fails past it
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Token lifetime in seconds. `None` issues tokens without `exp`.
    pub token_ttl_secs: Option<u64>,
    /// Include an `iat` claim
    pub issue_at: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            token_ttl_secs: None,
            issue_at: false,
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s", "250ms")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse "30s", "5m", "100ms" or a bare number of seconds.
    pub fn parse(s: &str) -> Result<Duration, std::num::ParseIntError> {
        let s = s.trim();
        // "ms" before "s" and "m", both of which it ends with / starts with
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>().map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>().map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>().map(|m| Duration::from_secs(m * 60))
        } else {
            s.parse::<u64>().map(Duration::from_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.env_files, vec![".env".to_string()]);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
        assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
        assert!(!config.rate_limit.trust_proxy_headers);
    }

    #[test]
    fn test_rate_limit_default_depends_on_environment() {
        let mut config = Config::default();
        assert_eq!(config.max_requests_per_window(), 1000);

        config.environment = Environment::Production;
        assert_eq!(config.max_requests_per_window(), 100);

        config.rate_limit.max_requests = Some(5);
        assert_eq!(config.max_requests_per_window(), 5);
    }

    #[test]
    fn test_development_origins_default() {
        let config = Config::default();
        let origins = config.allowed_origins();
        assert_eq!(origins.len(), 4);
        assert!(origins.contains(&"http://localhost:5173".to_string()));
    }

    #[test]
    fn test_explicit_origins_win() {
        let config = Config {
            environment: Environment::Production,
            cors: CorsConfig {
                allowed_origins: Some(vec!["https://app.example.com".to_string()]),
            },
            ..Default::default()
        };
        assert_eq!(config.allowed_origins(), vec!["https://app.example.com"]);
    }

    #[test]
    fn test_parse_origin_list_trims_and_skips_empty() {
        assert_eq!(
            parse_origin_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_humantime_parse() {
        assert_eq!(humantime_serde::parse("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(humantime_serde::parse("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(humantime_serde::parse("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(humantime_serde::parse("7").unwrap(), Duration::from_secs(7));
        assert!(humantime_serde::parse("soon").is_err());
    }

    #[test]
    fn test_load_env_files_sets_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("test.env");
        let mut f = std::fs::File::create(&env_path).unwrap();
        writeln!(f, "VTS_TEST_KEY_A=hello_from_env_file").unwrap();
        writeln!(f, "VTS_TEST_KEY_B=42").unwrap();
        drop(f);

        let config = Config {
            env_files: vec![env_path.to_string_lossy().to_string()],
            ..Default::default()
        };
        config.load_env_files();

        assert_eq!(env::var("VTS_TEST_KEY_A").unwrap(), "hello_from_env_file");
        assert_eq!(env::var("VTS_TEST_KEY_B").unwrap(), "42");
    }

    #[test]
    fn test_load_env_files_skips_missing() {
        let config = Config {
            env_files: vec!["/nonexistent/path/.env".to_string()],
            ..Default::default()
        };
        // Should not panic
        config.load_env_files();
    }

    #[test]
    fn test_config_deserialized_from_yaml() {
        let yaml = r#"
environment: production
server:
  host: "0.0.0.0"
  port: 8080
  shutdown_timeout: 5s
rate_limit:
  window: 1m
  max_requests: 10
  trust_proxy_headers: true
signing:
  timeout: 500ms
  token_ttl_secs: 3600
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.max_requests_per_window(), 10);
        assert!(config.rate_limit.trust_proxy_headers);
        assert_eq!(config.signing.timeout, Duration::from_millis(500));
        assert_eq!(config.signing.token_ttl_secs, Some(3600));
        // Unspecified sections keep defaults
        assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/video-token.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_merges_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "service.yaml",
                "server:\n  port: 4000\nenvironment: test\n",
            )?;
            jail.set_env("VIDEO_TOKEN_SERVER__PORT", "4100");

            let config = Config::load(Some(Path::new("service.yaml"))).unwrap();
            assert_eq!(config.server.port, 4100);
            assert_eq!(config.environment, Environment::Test);
            Ok(())
        });
    }
}
