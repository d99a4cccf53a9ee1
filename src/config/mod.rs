use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    pub audit_page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Signing secret for short-lived access tokens.
    pub access_token_secret: String,
    /// Signing secret for refresh tokens. Kept separate so a leaked access
    /// secret cannot mint refresh tokens.
    pub refresh_token_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub verification_code_minutes: i64,
    /// Minimum seconds between two codes for the same email+purpose pair.
    pub verification_resend_seconds: i64,
    /// How long a consumed reset code stays trusted for completing the reset.
    pub reset_trust_window_minutes: i64,
    pub settings_cache_seconds: u64,
    pub bcrypt_cost: u32,
    /// Role assigned to newly registered accounts.
    pub default_role: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_AUDIT_PAGE_SIZE") {
            self.api.audit_page_size = v.parse().unwrap_or(self.api.audit_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_ACCESS_SECRET") {
            self.security.access_token_secret = v;
        }
        if let Ok(v) = env::var("JWT_REFRESH_SECRET") {
            self.security.refresh_token_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_MINUTES") {
            self.security.access_token_minutes = v.parse().unwrap_or(self.security.access_token_minutes);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_DAYS") {
            self.security.refresh_token_days = v.parse().unwrap_or(self.security.refresh_token_days);
        }
        if let Ok(v) = env::var("SECURITY_VERIFICATION_CODE_MINUTES") {
            self.security.verification_code_minutes =
                v.parse().unwrap_or(self.security.verification_code_minutes);
        }
        if let Ok(v) = env::var("SECURITY_VERIFICATION_RESEND_SECONDS") {
            self.security.verification_resend_seconds =
                v.parse().unwrap_or(self.security.verification_resend_seconds);
        }
        if let Ok(v) = env::var("SECURITY_RESET_TRUST_WINDOW_MINUTES") {
            self.security.reset_trust_window_minutes =
                v.parse().unwrap_or(self.security.reset_trust_window_minutes);
        }
        if let Ok(v) = env::var("SECURITY_SETTINGS_CACHE_SECONDS") {
            self.security.settings_cache_seconds =
                v.parse().unwrap_or(self.security.settings_cache_seconds);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_DEFAULT_ROLE") {
            self.security.default_role = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                audit_page_size: 100,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                access_token_secret: "campus-dev-access-secret".to_string(),
                refresh_token_secret: "campus-dev-refresh-secret".to_string(),
                access_token_minutes: 15,
                refresh_token_days: 7,
                verification_code_minutes: 10,
                verification_resend_seconds: 60,
                reset_trust_window_minutes: 10,
                settings_cache_seconds: 60,
                bcrypt_cost: 4, // keep local registration fast
                default_role: "student".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
                audit_page_size: 100,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.campus.example.com".to_string()],
                // Secrets must come from JWT_ACCESS_SECRET / JWT_REFRESH_SECRET
                access_token_secret: String::new(),
                refresh_token_secret: String::new(),
                access_token_minutes: 15,
                refresh_token_days: 7,
                verification_code_minutes: 10,
                verification_resend_seconds: 60,
                reset_trust_window_minutes: 10,
                settings_cache_seconds: 60,
                bcrypt_cost: 12,
                default_role: "student".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 1024 * 1024, // 1MB
                audit_page_size: 50,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://campus.example.com".to_string()],
                access_token_secret: String::new(),
                refresh_token_secret: String::new(),
                access_token_minutes: 15,
                refresh_token_days: 7,
                verification_code_minutes: 10,
                verification_resend_seconds: 60,
                reset_trust_window_minutes: 10,
                settings_cache_seconds: 60,
                bcrypt_cost: 12,
                default_role: "student".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.security.access_token_minutes, 15);
        assert_eq!(config.security.refresh_token_days, 7);
        assert!(!config.security.access_token_secret.is_empty());
        assert_eq!(config.security.default_role, "student");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        // Production refuses to ship baked-in secrets
        assert!(config.security.access_token_secret.is_empty());
        assert!(config.security.refresh_token_secret.is_empty());
        assert_eq!(config.security.bcrypt_cost, 12);
        assert!(!config.api.enable_request_logging);
    }
}
