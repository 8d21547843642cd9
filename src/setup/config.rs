use std::{env, str::FromStr, time::Duration};

use derive_more::Display;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ConfigError {
    #[display("missing required environment variable {_0}")]
    Missing(&'static str),
    #[display("invalid value {value:?} for environment variable {key}")]
    Invalid { key: &'static str, value: String },
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// `ws://host:port`, `wss://...` or `mem://`.
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub query_timeout: Duration,
}

impl DatabaseSettings {
    pub fn is_embedded(&self) -> bool {
        self.endpoint.starts_with("mem://")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub purge_interval: Duration,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub csrf_enabled: bool,
    pub landing_page: String,
    pub error_page: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_addr: String,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub hashing: HashingSettings,
    pub auth: AuthSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Database credentials
    /// have no fallback values; remote databases require both.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let endpoint = normalize_endpoint(&vars.required("DB_HOST")?);
        let embedded = endpoint.starts_with("mem://");

        let (username, password) = if embedded {
            (vars.optional("DB_USER"), vars.optional("DB_PASS"))
        } else {
            (Some(vars.required("DB_USER")?), Some(vars.required("DB_PASS")?))
        };

        let database = DatabaseSettings {
            endpoint,
            namespace: vars.optional("DB_NAMESPACE").unwrap_or_else(|| "fansite".to_string()),
            database: vars.required("DB_NAME")?,
            username,
            password,
            query_timeout: Duration::from_millis(vars.parsed("DB_QUERY_TIMEOUT_MS", 5_000)?),
        };

        let session = SessionSettings {
            ttl: Duration::from_secs(vars.positive("SESSION_TTL_SECS", 43_200)?),
            purge_interval: Duration::from_secs(vars.positive("SESSION_PURGE_INTERVAL_SECS", 300)?),
            cookie_secure: vars.flag("COOKIE_SECURE", true)?,
        };

        // 19 MiB, 2 passes, 1 lane.
        let hashing = HashingSettings {
            memory_kib: vars.parsed("ARGON2_MEMORY_KIB", 19_456)?,
            iterations: vars.parsed("ARGON2_ITERATIONS", 2)?,
            parallelism: vars.parsed("ARGON2_PARALLELISM", 1)?,
        };

        let auth = AuthSettings {
            csrf_enabled: vars.flag("CSRF_ENABLED", true)?,
            landing_page: vars
                .optional("LANDING_PAGE")
                .unwrap_or_else(|| "/index.html".to_string()),
            error_page: vars.optional("ERROR_PAGE").unwrap_or_else(|| "/error.html".to_string()),
        };

        Ok(Self {
            server_addr: vars
                .optional("SERVER_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database,
            session,
            hashing,
            auth,
        })
    }
}

fn normalize_endpoint(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("ws://{}", host)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value }),
        }
    }

    fn positive(&self, key: &'static str, default: u64) -> Result<u64, ConfigError> {
        match self.parsed(key, default)? {
            0 => Err(ConfigError::Invalid {
                key,
                value: "0".to_string(),
            }),
            value => Ok(value),
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid { key, value }),
            },
        }
    }
}
