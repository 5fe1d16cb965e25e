pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod services;

use axum::Router;
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use thiserror::Error;

use crate::api::create_api_router;
use crate::config::{Config, ConfigError};
use crate::entities::{seed_admin, setup_schema};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connects to the database, creates missing tables, seeds the admin account
/// and makes sure the media root exists.
pub async fn prepare(config: &Config) -> Result<DatabaseConnection, StartupError> {
    let db = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;
    if let Some(admin) = &config.admin {
        seed_admin(&db, admin).await?;
    }
    tokio::fs::create_dir_all(&config.media_root).await?;
    Ok(db)
}

pub async fn build_app(config: Config) -> Result<Router, StartupError> {
    let db = prepare(&config).await?;
    Ok(create_api_router(Arc::new(db), Arc::new(config)))
}
