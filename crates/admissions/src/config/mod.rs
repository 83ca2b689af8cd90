use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::admissions::{GradeStandards, StandardsError};

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

/// Top-level configuration for the admissions service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub standards: GradeStandards,
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
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        let standards = load_standards()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            standards,
        })
    }
}

/// Inline JSON wins over a file path; neither set means the built-in table.
fn load_standards() -> Result<GradeStandards, ConfigError> {
    if let Ok(inline) = env::var("ADMISSIONS_GRADE_STANDARDS") {
        if !inline.trim().is_empty() {
            return GradeStandards::from_json(&inline).map_err(ConfigError::GradeStandards);
        }
    }

    if let Ok(path) = env::var("ADMISSIONS_GRADE_STANDARDS_FILE") {
        let path = PathBuf::from(path);
        let raw = fs::read_to_string(&path)
            .map_err(|source| ConfigError::StandardsFile { path, source })?;
        return GradeStandards::from_json(&raw).map_err(ConfigError::GradeStandards);
    }

    Ok(GradeStandards::default())
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    StandardsFile {
        path: PathBuf,
        source: std::io::Error,
    },
    GradeStandards(StandardsError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::StandardsFile { path, .. } => {
                write!(f, "unable to read grade standards from {}", path.display())
            }
            ConfigError::GradeStandards(err) => write!(f, "invalid grade standards: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::StandardsFile { source, .. } => Some(source),
            ConfigError::GradeStandards(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::admissions::GradeLevel;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_LOG_FORMAT");
        env::remove_var("ADMISSIONS_GRADE_STANDARDS");
        env::remove_var("ADMISSIONS_GRADE_STANDARDS_FILE");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.standards, GradeStandards::default());
    }

    #[test]
    fn inline_standards_override_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "ADMISSIONS_GRADE_STANDARDS",
            r#"{"excellent":{"min_score":90,"max_students":6},
                "good":{"min_score":70,"max_students":4},
                "qualified":{"min_score":50,"max_students":2}}"#,
        );
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.standards.get(GradeLevel::Excellent).max_students, 6);
        assert_eq!(config.standards.get(GradeLevel::Unqualified).max_students, 0);
        reset_env();
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "ADMISSIONS_GRADE_STANDARDS",
            r#"{"excellent":{"min_score":50,"max_students":6},
                "good":{"min_score":70,"max_students":4},
                "qualified":{"min_score":30,"max_students":2}}"#,
        );
        let err = AppConfig::load().expect_err("inverted thresholds fail");
        assert!(matches!(err, ConfigError::GradeStandards(_)));
        reset_env();
    }

    #[test]
    fn missing_standards_file_is_reported() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "ADMISSIONS_GRADE_STANDARDS_FILE",
            "/nonexistent/admissions/standards.json",
        );
        let err = AppConfig::load().expect_err("missing file fails");
        assert!(matches!(err, ConfigError::StandardsFile { .. }));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
