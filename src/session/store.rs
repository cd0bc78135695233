use crate::core::config::SessionConfig;
use crate::core::{CookieRecord, DriverTrait, Locator};
use crate::errors::Result;
use crate::utils::wait::wait_for_present;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Snapshot of one browser session, persisted as `<name>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub cookies: Vec<CookieRecord>,
    pub current_url: String,
    pub timestamp: DateTime<Utc>,
    pub window_handles: Vec<String>,
    pub current_window: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_storage: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_storage: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub login_url: String,
    pub username_locator: Locator,
    pub password_locator: Locator,
    pub submit_locator: Locator,
    pub username: String,
    pub password: String,
    pub success_indicator: Locator,
}

/// Persists and restores browser sessions across calls, with expiry.
///
/// Saves are whole-record replaces; concurrent saves under one name race
/// and the last writer wins.
pub struct SessionStore {
    config: SessionConfig,
    session_dir: PathBuf,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let session_dir = PathBuf::from(&config.session_dir);
        std::fs::create_dir_all(&session_dir)?;
        Ok(Self {
            config,
            session_dir,
        })
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.session_dir.join(format!("{}.json", name))
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        Utc::now() - record.timestamp > ChronoDuration::minutes(self.config.timeout_minutes)
    }

    /// Snapshot the driver's state under `name`. Storage capture is
    /// best-effort: a failure there is logged and the save continues.
    pub async fn save<D: DriverTrait>(&self, driver: &D, name: &str) -> Result<()> {
        let local_storage = match driver.local_storage().await {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(session = name, error = %e, "could not capture local storage");
                None
            }
        };
        let session_storage = match driver.session_storage().await {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(session = name, error = %e, "could not capture session storage");
                None
            }
        };

        let record = SessionRecord {
            cookies: driver.cookies().await?,
            current_url: driver.current_url().await?,
            timestamp: Utc::now(),
            window_handles: driver.window_handles().await?,
            current_window: driver.current_window().await?,
            local_storage,
            session_storage,
        };

        let json = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(self.record_path(name), json).await?;
        info!(session = name, "session saved");
        Ok(())
    }

    /// Restore a saved session into the driver. Returns `false` (with no
    /// navigation performed) when the record is missing or expired.
    pub async fn load<D: DriverTrait>(&self, driver: &D, name: &str) -> Result<bool> {
        let path = self.record_path(name);
        if !path.exists() {
            warn!(session = name, "session record not found");
            return Ok(false);
        }

        let json = tokio::fs::read_to_string(&path).await?;
        let record: SessionRecord = serde_json::from_str(&json)?;

        if self.is_expired(&record) {
            warn!(session = name, "session has expired");
            return Ok(false);
        }

        driver.navigate(&record.current_url).await?;
        for cookie in &record.cookies {
            driver.add_cookie(cookie).await?;
        }
        if let Some(ref items) = record.local_storage {
            for (key, value) in items {
                driver.set_local_storage_item(key, value).await?;
            }
        }
        if let Some(ref items) = record.session_storage {
            for (key, value) in items {
                driver.set_session_storage_item(key, value).await?;
            }
        }

        info!(session = name, "session loaded");
        Ok(true)
    }

    /// Run a login flow and auto-save the resulting session. Never raises:
    /// timeouts and driver failures are logged and reported as `false`.
    pub async fn handle_login<D: DriverTrait>(&self, driver: &D, request: &LoginRequest) -> bool {
        match self.try_login(driver, request).await {
            Ok(true) => true,
            Ok(false) => {
                error!(
                    url = %request.login_url,
                    "login failed: timeout waiting for elements"
                );
                false
            }
            Err(e) => {
                error!(url = %request.login_url, error = %e, "login failed");
                false
            }
        }
    }

    async fn try_login<D: DriverTrait>(&self, driver: &D, request: &LoginRequest) -> Result<bool> {
        let timeout = Duration::from_millis(self.config.login_wait_timeout_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        driver.navigate(&request.login_url).await?;

        if !wait_for_present(driver, &request.username_locator, timeout, poll).await? {
            return Ok(false);
        }
        driver.clear_value(&request.username_locator).await?;
        driver
            .type_text(&request.username_locator, &request.username)
            .await?;

        driver.clear_value(&request.password_locator).await?;
        driver
            .type_text(&request.password_locator, &request.password)
            .await?;

        driver.click(&request.submit_locator).await?;

        if !wait_for_present(driver, &request.success_indicator, timeout, poll).await? {
            return Ok(false);
        }

        let session_name = format!(
            "session_{}_{}",
            request.username,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        self.save(driver, &session_name).await?;
        Ok(true)
    }

    /// Delete every record older than the configured timeout. Unreadable
    /// records are logged and left in place.
    pub async fn cleanup_expired_sessions(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.session_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let record = match read_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable session record");
                    continue;
                }
            };

            if self.is_expired(&record) {
                tokio::fs::remove_file(&path).await?;
                info!(path = %path.display(), "removed expired session");
                removed += 1;
            }
        }

        Ok(removed)
    }
}

async fn read_record(path: &Path) -> Result<SessionRecord> {
    let json = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;
    use uuid::Uuid;

    fn test_store(timeout_minutes: i64) -> SessionStore {
        let dir = std::env::temp_dir().join(format!("formpilot-sessions-{}", Uuid::new_v4()));
        SessionStore::new(SessionConfig {
            session_dir: dir.to_string_lossy().into_owned(),
            timeout_minutes,
            login_wait_timeout_ms: 50,
            poll_interval_ms: 5,
        })
        .unwrap()
    }

    fn cookie(name: &str) -> CookieRecord {
        CookieRecord {
            name: name.to_string(),
            value: "v".to_string(),
            domain: "example.com".to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: true,
        }
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let store = test_store(30);
        let driver = MockDriver::new();
        driver.navigate("https://court.example.com/dash").await.unwrap();
        driver.push_cookie(cookie("sid"));
        driver.set_local_storage(
            [("token".to_string(), "abc".to_string())].into_iter().collect(),
        );
        store.save(&driver, "filing").await.unwrap();

        let fresh = MockDriver::new();
        assert!(store.load(&fresh, "filing").await.unwrap());
        assert!(fresh
            .calls()
            .contains(&"navigate:https://court.example.com/dash".to_string()));
        assert_eq!(fresh.cookie_names(), vec!["sid"]);
        assert_eq!(
            fresh.local_storage_items().get("token"),
            Some(&"abc".to_string())
        );
    }

    #[tokio::test]
    async fn load_missing_record_returns_false() {
        let store = test_store(30);
        let driver = MockDriver::new();
        assert!(!store.load(&driver, "nope").await.unwrap());
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn expired_record_is_not_replayed() {
        let store = test_store(30);
        let driver = MockDriver::new();
        driver.navigate("https://example.com").await.unwrap();
        store.save(&driver, "old").await.unwrap();

        // age the record past the timeout
        let path = store.record_path("old");
        let json = tokio::fs::read_to_string(&path).await.unwrap();
        let mut record: SessionRecord = serde_json::from_str(&json).unwrap();
        record.timestamp = Utc::now() - ChronoDuration::minutes(60);
        tokio::fs::write(&path, serde_json::to_string(&record).unwrap())
            .await
            .unwrap();

        let fresh = MockDriver::new();
        assert!(!store.load(&fresh, "old").await.unwrap());
        assert!(fresh.calls().is_empty());
    }

    #[tokio::test]
    async fn storage_capture_failure_does_not_abort_save() {
        let store = test_store(30);
        let driver = MockDriver::new();
        driver.fail_storage();
        store.save(&driver, "partial").await.unwrap();

        let json = tokio::fs::read_to_string(store.record_path("partial"))
            .await
            .unwrap();
        let record: SessionRecord = serde_json::from_str(&json).unwrap();
        assert!(record.local_storage.is_none());
        assert!(record.session_storage.is_none());
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_records() {
        let store = test_store(30);
        let driver = MockDriver::new();
        store.save(&driver, "fresh").await.unwrap();
        store.save(&driver, "stale").await.unwrap();

        let path = store.record_path("stale");
        let json = tokio::fs::read_to_string(&path).await.unwrap();
        let mut record: SessionRecord = serde_json::from_str(&json).unwrap();
        record.timestamp = Utc::now() - ChronoDuration::minutes(90);
        tokio::fs::write(&path, serde_json::to_string(&record).unwrap())
            .await
            .unwrap();

        let removed = store.cleanup_expired_sessions().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.record_path("fresh").exists());
        assert!(!store.record_path("stale").exists());
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            login_url: "https://example.com/login".to_string(),
            username_locator: Locator::id("user"),
            password_locator: Locator::id("pass"),
            submit_locator: Locator::id("submit"),
            username: "clerk".to_string(),
            password: "s3cret".to_string(),
            success_indicator: Locator::id("dashboard"),
        }
    }

    #[tokio::test]
    async fn login_success_auto_saves_session() {
        let store = test_store(30);
        let driver = MockDriver::new();
        let request = login_request();
        driver.add_element(&request.username_locator);
        driver.add_element(&request.password_locator);
        driver.add_element(&request.submit_locator);
        driver.add_element(&request.success_indicator);

        assert!(store.handle_login(&driver, &request).await);
        assert_eq!(
            driver.value_of(&request.username_locator),
            Some("clerk".to_string())
        );

        let mut entries = std::fs::read_dir(&store.session_dir).unwrap();
        let saved = entries.next().unwrap().unwrap();
        assert!(saved
            .file_name()
            .to_string_lossy()
            .starts_with("session_clerk_"));
    }

    #[tokio::test]
    async fn login_timeout_returns_false_without_raising() {
        let store = test_store(30);
        let driver = MockDriver::new();
        let request = login_request();
        driver.add_element(&request.username_locator);
        driver.add_element(&request.password_locator);
        driver.add_element(&request.submit_locator);
        // success indicator never appears

        assert!(!store.handle_login(&driver, &request).await);
    }
}
