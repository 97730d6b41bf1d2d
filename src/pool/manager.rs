//! Pool manager implementation
//!
//! The pool slot is the only shared mutable state in the service. The slot
//! lock is held just long enough to read or swap the handle, never across a
//! connect attempt: concurrent reconnects may race and the last successful
//! install wins.

use std::time::Duration;

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::RwLock;

use crate::config::DbConfig;
use crate::errors::{self, BridgeError, BridgeResult};
use crate::observability::Logger;

/// Default number of connect attempts when establishing the pool
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;

/// Backoff unit; the wait before retry N is `N × RETRY_DELAY_UNIT`
const RETRY_DELAY_UNIT: Duration = Duration::from_millis(2000);

/// Lightweight statement used to validate a fresh pool and probe health
const VALIDATION_QUERY: &str = "SELECT 1";

/// Result of a health probe; never an error
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub connected: bool,
    pub detail: String,
}

/// Owner of the process-wide connection pool
pub struct PoolManager {
    config: DbConfig,
    slot: RwLock<Option<PgPool>>,
}

impl PoolManager {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(None),
        }
    }

    /// The live pool, if one has been installed
    pub async fn current(&self) -> Option<PgPool> {
        self.slot.read().await.clone()
    }

    /// Return the live pool, establishing one if absent.
    ///
    /// A present pool is returned immediately without validation. Otherwise
    /// up to `max_attempts` connect attempts are made, waiting
    /// `2000ms × attempt` between them; the last driver failure is carried
    /// in the `Connection` error once attempts are exhausted.
    pub async fn ensure_pool(&self, max_attempts: u32) -> BridgeResult<PgPool> {
        if let Some(pool) = self.current().await {
            return Ok(pool);
        }

        let attempts = max_attempts.max(1);
        let mut last_error: Option<sqlx::Error> = None;

        for attempt in 1..=attempts {
            self.close_stale().await;

            match self.connect_once().await {
                Ok(pool) => {
                    // Last successful install wins; racing callers are tolerated
                    *self.slot.write().await = Some(pool.clone());
                    Logger::info(
                        "pool.connected",
                        &[
                            ("attempt", attempt.to_string()),
                            ("host", self.config.host.clone()),
                            ("database", self.config.database.clone()),
                        ],
                    );
                    return Ok(pool);
                }
                Err(e) => {
                    Logger::warn(
                        "pool.connect_failed",
                        &[
                            ("attempt", attempt.to_string()),
                            ("max_attempts", attempts.to_string()),
                            ("error", e.to_string()),
                        ],
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(RETRY_DELAY_UNIT * attempt).await;
                    }
                }
            }
        }

        Err(BridgeError::Connection {
            attempts,
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no connection attempt made".to_string()),
        })
    }

    /// Open a fresh pool and run the validation query against it
    async fn connect_once(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .connect_with(self.config.connect_options())
            .await?;

        sqlx::query(VALIDATION_QUERY).execute(&pool).await?;
        Ok(pool)
    }

    /// Take and close whatever handle is installed; failures here are
    /// logged and ignored
    async fn close_stale(&self) {
        let stale = self.slot.write().await.take();
        if let Some(pool) = stale {
            pool.close().await;
            Logger::info("pool.closed_stale", &[]);
        }
    }

    /// Probe connectivity without raising
    pub async fn check_health(&self) -> HealthStatus {
        let Some(pool) = self.current().await else {
            return HealthStatus {
                connected: false,
                detail: "connection pool not initialized".to_string(),
            };
        };

        match sqlx::query(VALIDATION_QUERY).execute(&pool).await {
            Ok(_) => HealthStatus {
                connected: true,
                detail: "database responding".to_string(),
            },
            Err(e) => HealthStatus {
                connected: false,
                detail: e.to_string(),
            },
        }
    }

    /// Shutdown path: drain and drop the current pool
    pub async fn close(&self) {
        self.close_stale().await;
    }

    /// Convert a failed operation's driver error into a `BridgeError`,
    /// attempting exactly one reconnect first when the failure is
    /// connection-class. The reconnect is best-effort (its own failure is
    /// only logged) and the original request is never retried.
    pub async fn surface_failure(&self, err: sqlx::Error) -> BridgeError {
        let bridged = errors::execution_error(&err);
        if bridged.is_connection_class() {
            self.close_stale().await;
            if let Err(reconnect_err) = self.ensure_pool(1).await {
                Logger::warn(
                    "pool.reconnect_failed",
                    &[("error", reconnect_err.to_string())],
                );
            }
        }
        bridged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> DbConfig {
        DbConfig {
            // Reserved TEST-NET-1 address: never a live database
            host: "192.0.2.1".to_string(),
            ..DbConfig::default()
        }
    }

    fn lazy_pool(config: &DbConfig) -> PgPool {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(config.connect_options())
    }

    #[tokio::test]
    async fn test_ensure_pool_short_circuits_when_pool_exists() {
        let config = unreachable_config();
        let manager = PoolManager::new(config.clone());
        *manager.slot.write().await = Some(lazy_pool(&config));

        // The host is unreachable, so returning Ok proves no connection
        // attempt was made.
        let pool = manager.ensure_pool(1).await;
        assert!(pool.is_ok());
        assert!(manager.current().await.is_some());
    }

    #[tokio::test]
    async fn test_check_health_without_pool_reports_disconnected() {
        let manager = PoolManager::new(unreachable_config());
        let health = manager.check_health().await;
        assert!(!health.connected);
        assert!(health.detail.contains("not initialized"));
    }

    #[tokio::test]
    async fn test_close_clears_the_slot() {
        let config = unreachable_config();
        let manager = PoolManager::new(config.clone());
        *manager.slot.write().await = Some(lazy_pool(&config));

        manager.close().await;
        assert!(manager.current().await.is_none());
    }

    #[test]
    fn test_backoff_is_linear_in_attempt_number() {
        assert_eq!(RETRY_DELAY_UNIT * 1, Duration::from_millis(2000));
        assert_eq!(RETRY_DELAY_UNIT * 3, Duration::from_millis(6000));
    }

    // Paused clock: the inter-attempt sleeps are advanced, not waited out
    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_surface_connection_error() {
        let config = DbConfig {
            // Loopback on a closed port refuses fast instead of blackholing
            host: "127.0.0.1".to_string(),
            port: 1,
            ..DbConfig::default()
        };
        let manager = PoolManager::new(config);

        let err = manager.ensure_pool(2).await.unwrap_err();
        match err {
            BridgeError::Connection { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected a connection error, got {:?}", other),
        }
        // No pool is installed after exhausting attempts
        assert!(manager.current().await.is_none());
    }
}
