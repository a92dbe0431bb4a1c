//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "acb".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Read the configuration from the process environment.
    ///
    /// `DATABASE_URI` and `DATABASE_NAME` are required.
    /// `DATABASE_NAMESPACE`, `DATABASE_USER` and `DATABASE_PASSWORD`
    /// fall back to the defaults.
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| DbError::Config(format!("{key} must be set")))
        };

        let defaults = Self::default();
        let url = required("DATABASE_URI")?;
        let url = url
            .strip_prefix("ws://")
            .map(str::to_owned)
            .unwrap_or(url);

        Ok(Self {
            url,
            namespace: var("DATABASE_NAMESPACE").unwrap_or(defaults.namespace),
            database: required("DATABASE_NAME")?,
            username: var("DATABASE_USER").unwrap_or(defaults.username),
            password: var("DATABASE_PASSWORD").unwrap_or(defaults.password),
        })
    }
}

/// Live client for the bulletin store.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open a WebSocket session, sign in as root and select the store's
    /// namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening bulletin store"
        );

        let db = Surreal::new::<Ws>(config.url.as_str()).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(|e| DbError::Config(format!("root sign-in as {} refused: {e}", config.username)))?;
        db.use_ns(&config.namespace).use_db(&config.database).await?;

        debug!(database = %config.database, "Bulletin store ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
