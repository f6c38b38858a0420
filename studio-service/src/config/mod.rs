use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 604_800;
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC secret for session tokens. `None` makes every verification fail.
    pub secret: Option<Secret<String>>,
    pub max_age_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_bytes: usize,
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Secret::new);

        let config = StudioConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("studio-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            session: SessionConfig {
                secret,
                max_age_seconds: parse_env(
                    "SESSION_MAX_AGE_SECONDS",
                    &DEFAULT_SESSION_MAX_AGE_SECONDS.to_string(),
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            uploads: UploadConfig {
                dir: get_env("UPLOAD_DIR", Some("uploads"), is_prod)?,
                max_bytes: parse_env(
                    "UPLOAD_MAX_BYTES",
                    &DEFAULT_UPLOAD_MAX_BYTES.to_string(),
                    is_prod,
                )?,
            },
            static_dir: get_env("STATIC_DIR", Some("studio-service/static"), is_prod)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Prod
    }

    /// Problems that do not stop startup. Logged once tracing is up.
    pub fn startup_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.session.secret.is_none() {
            warnings.push("JWT_SECRET is not set; all session tokens will be rejected");
        }
        warnings
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_MAX_AGE_SECONDS must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        // Credentialed CORS cannot be combined with a wildcard origin.
        if self.security.allowed_origins.iter().any(|o| o == "*") {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(environment: Environment) -> StudioConfig {
        StudioConfig {
            common: core_config::Config::default(),
            environment,
            service_name: "studio-service".to_string(),
            service_version: "0.1.0".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: "postgres://localhost/studio".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            session: SessionConfig {
                secret: Some(Secret::new("secret".to_string())),
                max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            uploads: UploadConfig {
                dir: "uploads".to_string(),
                max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            },
            static_dir: "static".to_string(),
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config(Environment::Dev).validate().is_ok());
        assert!(sample_config(Environment::Prod).validate().is_ok());
    }

    #[test]
    fn test_wildcard_origin_rejected_in_every_environment() {
        for environment in [Environment::Dev, Environment::Prod] {
            let mut config = sample_config(environment);
            config.security.allowed_origins = vec![
                "http://localhost:3000".to_string(),
                "*".to_string(),
            ];
            let err = config.validate().unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)));
        }
    }

    #[test]
    fn test_missing_secret_is_a_startup_warning() {
        let mut config = sample_config(Environment::Dev);
        assert!(config.startup_warnings().is_empty());

        config.session.secret = None;
        let warnings = config.startup_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("JWT_SECRET"));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Prod));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Dev));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: i64 = parse_env("STUDIO_TEST_UNSET_VARIABLE", "604800", false).unwrap();
        assert_eq!(value, DEFAULT_SESSION_MAX_AGE_SECONDS);
    }

    #[test]
    fn test_missing_variable_in_production_is_an_error() {
        let err = get_env("STUDIO_TEST_UNSET_VARIABLE", Some("x"), true).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
