use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub secret: String,
    pub bind_addr: SocketAddr,
    pub media_root: PathBuf,
    pub token_ttl_hours: i64,
    pub admin: Option<AdminSeed>,
}

/// Credentials for the admin account created on startup when it is missing.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is malformed: {value}")]
    Malformed { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(AdminSeed { username, password }),
            _ => None,
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            secret: required("SECRET")?,
            bind_addr: parsed("BIND_ADDR", "0.0.0.0:3000")?,
            media_root: PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "./uploads".into())),
            token_ttl_hours: parsed("TOKEN_TTL_HOURS", "24")?,
            admin,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_owned());
    value
        .parse()
        .map_err(|_| ConfigError::Malformed { name, value })
}
