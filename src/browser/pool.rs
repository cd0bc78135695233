use crate::core::config::PoolConfig;
use crate::core::{DriverFactory, DriverTrait};
use crate::errors::{FormpilotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

/// One live browser session, owned by exactly one caller between
/// `acquire` and `release`.
pub struct BrowserHandle<D: DriverTrait> {
    id: Uuid,
    created_at: DateTime<Utc>,
    driver: D,
}

impl<D: DriverTrait> BrowserHandle<D> {
    fn new(driver: D) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            driver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolStatus {
    pub available_count: usize,
    pub active_count: usize,
}

/// Fixed-size pool of ready browser sessions.
///
/// Sessions that fail cleanup on release are discarded and replaced, so the
/// total handle count trends back to the configured size. Constructed
/// explicitly and injected; there is no process-wide instance.
pub struct BrowserPool<F: DriverFactory> {
    factory: F,
    config: PoolConfig,
    available: Mutex<VecDeque<BrowserHandle<F::Driver>>>,
    permits: Semaphore,
    active: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl<F: DriverFactory> BrowserPool<F> {
    /// Eagerly create the configured number of sessions. Individual
    /// creation failures are logged and the slot omitted; the pool starts
    /// under capacity rather than failing init.
    pub async fn init(factory: F, config: PoolConfig) -> Self {
        let mut handles = VecDeque::with_capacity(config.size);

        for slot in 0..config.size {
            match factory.create().await {
                Ok(driver) => handles.push_back(BrowserHandle::new(driver)),
                Err(e) => error!(slot, error = %e, "failed to create pooled browser session"),
            }
        }

        info!(
            requested = config.size,
            created = handles.len(),
            "browser pool initialized"
        );

        let permits = Semaphore::new(handles.len());
        Self {
            factory,
            config,
            available: Mutex::new(handles),
            permits,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Wait up to the configured bound for a free session.
    pub async fn acquire(&self) -> Result<BrowserHandle<F::Driver>> {
        let timeout_ms = self.config.acquire_timeout_ms;
        let permit = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.permits.acquire(),
        )
        .await
        .map_err(|_| FormpilotError::PoolExhausted(timeout_ms))?
        .map_err(|_| FormpilotError::PoolExhausted(timeout_ms))?;
        permit.forget();

        // each permit corresponds to one queued handle
        let handle = self
            .available
            .lock()
            .await
            .pop_front()
            .ok_or(FormpilotError::PoolExhausted(timeout_ms))?;

        self.active.lock().await.insert(handle.id, Utc::now());
        Ok(handle)
    }

    /// Clear the session's cookies and return it to the available set. A
    /// session that fails cleanup is discarded and a replacement enqueued.
    pub async fn release(&self, handle: BrowserHandle<F::Driver>) {
        self.active.lock().await.remove(&handle.id);

        match handle.driver.delete_all_cookies().await {
            Ok(()) => {
                self.available.lock().await.push_back(handle);
                self.permits.add_permits(1);
            }
            Err(e) => {
                warn!(handle = %handle.id, error = %e, "session cleanup failed, replacing");
                if let Err(close_err) = handle.driver.close().await {
                    warn!(handle = %handle.id, error = %close_err, "failed to close broken session");
                }
                drop(handle);
                self.replace_session().await;
            }
        }
    }

    async fn replace_session(&self) {
        match self.factory.create().await {
            Ok(driver) => {
                let handle = BrowserHandle::new(driver);
                info!(handle = %handle.id, "replacement session created");
                self.available.lock().await.push_back(handle);
                self.permits.add_permits(1);
            }
            Err(e) => {
                error!(error = %e, "failed to create replacement session, pool runs under capacity");
            }
        }
    }

    pub async fn status(&self) -> PoolStatus {
        PoolStatus {
            available_count: self.available.lock().await.len(),
            active_count: self.active.lock().await.len(),
        }
    }

    /// Close every idle session and stop handing new ones out.
    pub async fn cleanup(&self) {
        let mut available = self.available.lock().await;
        while self.permits.try_acquire().map(|p| p.forget()).is_ok() {}

        while let Some(handle) = available.pop_front() {
            if let Err(e) = handle.driver.close().await {
                warn!(handle = %handle.id, error = %e, "failed to close session during cleanup");
            }
        }

        let active = self.active.lock().await.len();
        if active > 0 {
            warn!(active, "pool cleanup with sessions still checked out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriverFactory;

    fn pool_config(size: usize, acquire_timeout_ms: u64) -> PoolConfig {
        PoolConfig {
            size,
            acquire_timeout_ms,
        }
    }

    #[tokio::test]
    async fn init_fills_every_slot() {
        let pool = BrowserPool::init(MockDriverFactory::new(), pool_config(3, 100)).await;
        let status = pool.status().await;
        assert_eq!(status.available_count, 3);
        assert_eq!(status.active_count, 0);
    }

    #[tokio::test]
    async fn init_survives_creation_failures() {
        let factory = MockDriverFactory::new();
        factory.fail_next_creations(2);
        let pool = BrowserPool::init(factory, pool_config(3, 100)).await;
        assert_eq!(pool.status().await.available_count, 1);
    }

    #[tokio::test]
    async fn acquire_release_keeps_total_count_invariant() {
        let pool = BrowserPool::init(MockDriverFactory::new(), pool_config(2, 100)).await;

        for _ in 0..5 {
            let a = pool.acquire().await.unwrap();
            let b = pool.acquire().await.unwrap();
            let status = pool.status().await;
            assert_eq!(status.available_count + status.active_count, 2);
            pool.release(a).await;
            pool.release(b).await;
        }

        let status = pool.status().await;
        assert_eq!(status.available_count, 2);
        assert_eq!(status.active_count, 0);
    }

    #[tokio::test]
    async fn acquire_times_out_when_exhausted() {
        let pool = BrowserPool::init(MockDriverFactory::new(), pool_config(1, 50)).await;
        let held = pool.acquire().await.unwrap();

        let result = pool.acquire().await;
        assert!(matches!(result, Err(FormpilotError::PoolExhausted(_))));

        pool.release(held).await;
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn failing_release_heals_within_one_cycle() {
        let factory = MockDriverFactory::new();
        let pool = BrowserPool::init(factory, pool_config(2, 100)).await;

        let handle = pool.acquire().await.unwrap();
        handle.driver().fail_cookie_clear();
        let broken = handle.driver().clone();
        pool.release(handle).await;

        assert!(broken.is_closed());
        let status = pool.status().await;
        assert_eq!(status.available_count + status.active_count, 2);
    }

    #[tokio::test]
    async fn heal_failure_leaves_pool_under_capacity() {
        let factory = MockDriverFactory::new();
        let pool = BrowserPool::init(factory, pool_config(1, 50)).await;

        let handle = pool.acquire().await.unwrap();
        handle.driver().fail_cookie_clear();
        pool.factory.fail_next_creations(1);
        pool.release(handle).await;

        assert_eq!(pool.status().await.available_count, 0);
        assert!(matches!(
            pool.acquire().await,
            Err(FormpilotError::PoolExhausted(_))
        ));
    }

    #[tokio::test]
    async fn released_handles_come_back_with_cookies_cleared() {
        let pool = BrowserPool::init(MockDriverFactory::new(), pool_config(1, 100)).await;

        let handle = pool.acquire().await.unwrap();
        let driver = handle.driver().clone();
        driver
            .push_cookie(crate::core::CookieRecord {
                name: "sid".to_string(),
                value: "1".to_string(),
                domain: "example.com".to_string(),
                path: "/".to_string(),
                expires: None,
                http_only: false,
                secure: false,
            });
        pool.release(handle).await;

        assert!(driver.cookie_names().is_empty());
    }

    #[tokio::test]
    async fn cleanup_closes_idle_sessions() {
        let factory = MockDriverFactory::new();
        let pool = BrowserPool::init(factory, pool_config(2, 50)).await;
        let drivers = pool.factory.spawned();

        pool.cleanup().await;

        assert_eq!(pool.status().await.available_count, 0);
        for driver in drivers {
            assert!(driver.is_closed());
        }
        assert!(matches!(
            pool.acquire().await,
            Err(FormpilotError::PoolExhausted(_))
        ));
    }
}
