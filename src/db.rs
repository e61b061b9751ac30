use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub type DbPool = DatabaseConnection;

/// Pool settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

impl DbConfig {
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Pool bounds actually applied.
    ///
    /// SQLite allows one writer at a time, and an in-memory database exists per connection,
    /// so SQLite pools are pinned to a single connection and concurrent transactions queue
    /// on the pool instead of failing with `database is locked`.
    pub fn pool_bounds(&self) -> (u32, u32) {
        if self.is_sqlite() {
            return (1, 1);
        }
        let max = self.max_connections.max(1);
        (self.min_connections.min(max), max)
    }
}

/// Connects with the default pool settings.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };
    establish_connection_with_config(&config).await
}

pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let (min, max) = config.pool_bounds();
    if (min, max) != (config.min_connections, config.max_connections) {
        warn!(
            requested_max = config.max_connections,
            applied_max = max,
            "Adjusted database pool bounds"
        );
    }

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(max)
        .min_connections(min)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("epack_db.max_connections", max as f64);
    let backend = if config.is_sqlite() { "sqlite" } else { "postgres" };
    info!(backend, max_connections = max, "Connecting to database");

    Database::connect(opt).await.map_err(|e| {
        error!(error = %e, backend, "Database connection failed");
        counter!("epack_db.connection_failures", 1);
        ServiceError::DatabaseError(e)
    })
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// Applies pending migrations. Safe to run on every start.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    let pending = crate::migrator::Migrator::get_pending_migrations(pool)
        .await
        .map_err(ServiceError::DatabaseError)?
        .len();
    if pending == 0 {
        debug!("Database schema is up to date");
        return Ok(());
    }

    info!(pending, "Applying database migrations");
    crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(|e| {
            error!(error = %e, "Database migrations failed");
            ServiceError::DatabaseError(e)
        })?;
    info!(pending, elapsed_ms = started.elapsed().as_millis() as u64, "Database migrations applied");
    Ok(())
}

/// Pings the database and returns the round trip.
pub async fn check_connection(pool: &DbPool) -> Result<Duration, ServiceError> {
    let started = Instant::now();
    match pool.ping().await {
        Ok(()) => {
            let elapsed = started.elapsed();
            histogram!("epack_db.ping_seconds", elapsed.as_secs_f64());
            Ok(elapsed)
        }
        Err(e) => {
            counter!("epack_db.connection_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, min: u32, max: u32) -> DbConfig {
        DbConfig {
            url: url.to_string(),
            min_connections: min,
            max_connections: max,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sqlite_pool_connects_and_migrates() {
        let pool = establish_connection("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        assert!(check_connection(&pool).await.is_ok());
        assert!(run_migrations(&pool).await.is_ok());
        // second run finds nothing pending
        assert!(run_migrations(&pool).await.is_ok());
    }

    #[test]
    fn db_config_follows_app_config() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        cfg.db_max_connections = 3;
        cfg.db_acquire_timeout_secs = 2;
        let db_cfg = DbConfig::from(&cfg);
        assert_eq!(db_cfg.max_connections, 3);
        assert_eq!(db_cfg.acquire_timeout, Duration::from_secs(2));
        assert_eq!(db_cfg.url, "sqlite::memory:");
    }

    #[test]
    fn sqlite_uses_one_connection() {
        assert_eq!(config("sqlite::memory:", 2, 16).pool_bounds(), (1, 1));
        assert_eq!(config("sqlite://epack.db?mode=memory", 2, 16).pool_bounds(), (1, 1));
        assert_eq!(config("sqlite://epack.db?mode=rwc", 2, 16).pool_bounds(), (1, 1));
        assert_eq!(config("postgres://localhost/epack", 2, 16).pool_bounds(), (2, 16));
    }

    #[test]
    fn min_never_exceeds_max() {
        assert_eq!(config("postgres://localhost/epack", 8, 4).pool_bounds(), (4, 4));
        assert_eq!(config("postgres://localhost/epack", 0, 0).pool_bounds(), (0, 1));
    }
}
