//! Database connection construction.
//!
//! The connection is built once at process start and handed to each
//! component that needs it (flag store, audit recorder). Components never
//! reach for a process-wide connection singleton.

use crate::app_config;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Connect to the database using pool settings from the application config.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let cfg = app_config::database();

    let mut options = ConnectOptions::new(url.to_owned());
    options
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_seconds));

    Database::connect(options).await
}
