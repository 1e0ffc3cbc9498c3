use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub features: FeatureFlags,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the server runs on the in-memory store
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Upper bound for `JWT_EXPIRY_HOURS`, one leap year
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

/// Route groups that can be switched off at boot.
///
/// Read once when the router is built. Changing the environment afterwards
/// has no effect until the process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub journalists: bool,
    pub outreach: bool,
    pub governance: bool,
    pub billing: bool,
}

impl FeatureFlags {
    pub fn all_enabled() -> Self {
        Self {
            journalists: true,
            outreach: true,
            governance: true,
            billing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Allow orgs to switch plans themselves via POST /billing/plan-switch
    pub self_serve: bool,
    /// Optional YAML file replacing the built-in plan catalogue
    pub plans_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            match v.parse::<u64>() {
                Ok(hours) if (1..=MAX_JWT_EXPIRY_HOURS).contains(&hours) => self.security.jwt_expiry_hours = hours,
                _ => tracing::warn!(value = %v, "ignoring JWT_EXPIRY_HOURS outside 1..={}", MAX_JWT_EXPIRY_HOURS),
            }
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Feature flags
        if let Some(v) = lookup("FEATURE_JOURNALISTS") {
            self.features.journalists = parse_flag(&v).unwrap_or(self.features.journalists);
        }
        if let Some(v) = lookup("FEATURE_OUTREACH") {
            self.features.outreach = parse_flag(&v).unwrap_or(self.features.outreach);
        }
        if let Some(v) = lookup("FEATURE_GOVERNANCE") {
            self.features.governance = parse_flag(&v).unwrap_or(self.features.governance);
        }
        if let Some(v) = lookup("FEATURE_BILLING") {
            self.features.billing = parse_flag(&v).unwrap_or(self.features.billing);
        }

        // Billing overrides
        if let Some(v) = lookup("BILLING_SELF_SERVE") {
            self.billing.self_serve = parse_flag(&v).unwrap_or(self.billing.self_serve);
        }
        if let Some(v) = lookup("BILLING_PLANS_FILE") {
            self.billing.plans_file = Some(v).filter(|s| !s.trim().is_empty());
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "pravado-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            features: FeatureFlags::all_enabled(),
            billing: BillingConfig {
                self_serve: true,
                plans_file: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.pravado.com".to_string()],
            },
            features: FeatureFlags::all_enabled(),
            billing: BillingConfig {
                self_serve: true,
                plans_file: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.pravado.com".to_string()],
            },
            features: FeatureFlags::all_enabled(),
            billing: BillingConfig {
                self_serve: false,
                plans_file: None,
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Accepts the usual spellings of a boolean env var.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.features, FeatureFlags::all_enabled());
        assert!(config.billing.self_serve);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert!(!config.billing.self_serve);
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn feature_flags_are_overridden_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("FEATURE_OUTREACH", "false"),
            ("FEATURE_BILLING", "0"),
            ("FEATURE_GOVERNANCE", "garbage"),
        ]));
        assert!(!config.features.outreach);
        assert!(!config.features.billing);
        assert!(config.features.governance);
        assert!(config.features.journalists);
    }

    #[test]
    fn app_env_selects_preset_before_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "prod"),
            ("PORT", "9001"),
            ("SECURITY_CORS_ORIGINS", "https://a.example, ,https://b.example"),
        ]));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.security.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn out_of_range_jwt_expiry_keeps_preset() {
        let preset = AppConfig::development().security.jwt_expiry_hours;
        for value in ["0", "18446744073709551615", "-3", "forever"] {
            let config = AppConfig::from_lookup(lookup_from(&[("JWT_EXPIRY_HOURS", value)]));
            assert_eq!(config.security.jwt_expiry_hours, preset, "value {value}");
        }

        let config = AppConfig::from_lookup(lookup_from(&[("JWT_EXPIRY_HOURS", "48")]));
        assert_eq!(config.security.jwt_expiry_hours, 48);
    }

    #[test]
    fn blank_database_url_means_memory_store() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "  ")]));
        assert!(config.database.url.is_none());
    }
}
