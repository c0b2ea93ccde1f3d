//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,

    /// Upper bound of the connection pool.
    pub db_max_connections: u32,

    /// Connections kept open while idle.
    pub db_min_connections: u32,

    /// Connection attempts at startup before giving up.
    pub db_connect_attempts: u32,

    /// Fixed pause between connection attempts, in seconds.
    pub db_connect_backoff_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Worker-pool size for per-student fan-out.
    pub assignment_concurrency: usize,

    /// Deadline for one fan-out, in seconds. Kept below the request timeout
    /// so compensation still runs inside the request.
    pub fanout_deadline_seconds: u64,

    /// bcrypt cost for mentor and owner passwords.
    pub password_hash_cost: u32,

    /// Frontend URL for payment redirects.
    pub frontend_url: String,

    /// Public key id handed to the checkout page (optional).
    pub payment_key_id: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// `main` loads an optional `.env` file first.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: database_url_from_env(),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_min_connections: env_or("DB_MIN_CONNECTIONS", defaults.db_min_connections),
            db_connect_attempts: env_or("DB_CONNECT_ATTEMPTS", defaults.db_connect_attempts),
            db_connect_backoff_seconds: env_or(
                "DB_CONNECT_BACKOFF_SECONDS",
                defaults.db_connect_backoff_seconds,
            ),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            assignment_concurrency: env_or(
                "ASSIGNMENT_CONCURRENCY",
                defaults.assignment_concurrency,
            )
            .max(1),
            fanout_deadline_seconds: env_or(
                "FANOUT_DEADLINE_SECONDS",
                defaults.fanout_deadline_seconds,
            ),
            password_hash_cost: env_or("PASSWORD_HASH_COST", defaults.password_hash_cost),
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            payment_key_id: std::env::var("PAYMENT_KEY_ID")
                .ok()
                .filter(|key| !key.trim().is_empty()),
        }
    }

    /// Pause between database connection attempts.
    #[must_use]
    pub fn db_connect_backoff(&self) -> Duration {
        Duration::from_secs(self.db_connect_backoff_seconds)
    }

    /// Deadline for one assignment or sweep fan-out.
    #[must_use]
    pub fn fanout_deadline(&self) -> Duration {
        Duration::from_secs(self.fanout_deadline_seconds)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            db_max_connections: 100,
            db_min_connections: 10,
            db_connect_attempts: 5,
            db_connect_backoff_seconds: 2,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            assignment_concurrency: 8,
            fanout_deadline_seconds: 20,
            password_hash_cost: bcrypt::DEFAULT_COST,
            frontend_url: "http://localhost:3000".into(),
            payment_key_id: None,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or
/// malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// `DATABASE_URL`, or a URL composed from the discrete `DB_*` variables.
fn database_url_from_env() -> Option<String> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Some(url);
        }
    }

    let host = std::env::var("DB_HOST").ok()?;
    let user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".into());
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let name = std::env::var("DB_NAME").unwrap_or_else(|_| "guidance".into());
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".into());

    Some(compose_database_url(&host, &user, &password, &name, &port))
}

fn compose_database_url(host: &str, user: &str, password: &str, name: &str, port: &str) -> String {
    if password.is_empty() {
        format!("postgres://{user}@{host}:{port}/{name}")
    } else {
        format!("postgres://{user}:{password}@{host}:{port}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.db_max_connections, 100);
        assert_eq!(config.db_min_connections, 10);
        assert_eq!(config.db_connect_attempts, 5);
        assert_eq!(config.db_connect_backoff(), Duration::from_secs(2));
        assert!(config.fanout_deadline_seconds < config.request_timeout_seconds);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn composes_url_from_parts() {
        assert_eq!(
            compose_database_url("db", "app", "s3cret", "guidance", "5432"),
            "postgres://app:s3cret@db:5432/guidance"
        );
        assert_eq!(
            compose_database_url("localhost", "app", "", "guidance", "6543"),
            "postgres://app@localhost:6543/guidance"
        );
    }
}
