use std::env;

use crate::error::ConfigError;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_FIREBASE_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_url: String,
    pub firestore_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Where accounts and profiles live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Firebase(FirebaseConfig),
    Postgres {
        database_url: String,
        smtp: SmtpConfig,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub login_route: String,
    pub allowed_origin: Option<String>,
    pub backend: Backend,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let port = match var("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => 8080,
        };

        let backend = match var("SIGNUP_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => Backend::Memory,
            "firebase" => Backend::Firebase(FirebaseConfig {
                api_key: required("FIREBASE_API_KEY")?,
                project_id: required("FIREBASE_PROJECT_ID")?,
                auth_url: var("FIREBASE_AUTH_URL")
                    .unwrap_or_else(|| DEFAULT_FIREBASE_AUTH_URL.to_string()),
                firestore_url: var("FIRESTORE_URL")
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_URL.to_string()),
            }),
            "postgres" => Backend::Postgres {
                database_url: required("DATABASE_URL")?,
                smtp: SmtpConfig {
                    host: required("SMTP_HOST")?,
                    username: required("SMTP_USERNAME")?,
                    password: required("SMTP_PASSWORD")?,
                    from: required("MAIL_FROM")?,
                },
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "SIGNUP_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let login_route = var("LOGIN_ROUTE").unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_string());
        if !login_route.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "LOGIN_ROUTE",
                value: login_route,
            });
        }

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            login_route,
            allowed_origin: var("CORS_ALLOWED_ORIGIN"),
            backend,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
