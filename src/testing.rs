//! Scripted in-memory driver for exercising the pool, automator, and
//! session store without a real browser.

use crate::core::{CookieRecord, DriverFactory, DriverTrait, Locator};
use crate::errors::{FormpilotError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    url: String,
    title: String,
    page_source: String,
    present: HashSet<String>,
    attributes: HashMap<(String, String), String>,
    values: HashMap<String, String>,
    selected: HashSet<String>,
    cookies: Vec<CookieRecord>,
    local_storage: HashMap<String, String>,
    session_storage: HashMap<String, String>,
    windows: Vec<String>,
    script_results: HashMap<String, Value>,
    calls: Vec<String>,
    fail_cookie_clear: bool,
    fail_storage: bool,
    closed: bool,
}

/// Shared-state driver double. Clones share one underlying state, so a test
/// can keep a clone for assertions after handing the driver to a pool.
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        let mut state = MockState {
            windows: vec!["window-0".to_string()],
            ..Default::default()
        };
        state.url = "about:blank".to_string();
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn add_element(&self, locator: &Locator) {
        self.lock().present.insert(locator.to_string());
    }

    pub fn remove_element(&self, locator: &Locator) {
        self.lock().present.remove(&locator.to_string());
    }

    pub fn set_attribute(&self, locator: &Locator, name: &str, value: &str) {
        self.lock()
            .attributes
            .insert((locator.to_string(), name.to_string()), value.to_string());
    }

    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        self.lock().values.get(&locator.to_string()).cloned()
    }

    pub fn set_field_value(&self, locator: &Locator, value: &str) {
        self.lock()
            .values
            .insert(locator.to_string(), value.to_string());
    }

    pub fn set_selected(&self, locator: &Locator, selected: bool) {
        let key = locator.to_string();
        let mut state = self.lock();
        if selected {
            state.selected.insert(key);
        } else {
            state.selected.remove(&key);
        }
    }

    pub fn set_page_source(&self, html: &str) {
        self.lock().page_source = html.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.lock().title = title.to_string();
    }

    pub fn set_script_result(&self, script: &str, result: Value) {
        self.lock()
            .script_results
            .insert(script.to_string(), result);
    }

    pub fn push_cookie(&self, cookie: CookieRecord) {
        self.lock().cookies.push(cookie);
    }

    pub fn set_local_storage(&self, items: HashMap<String, String>) {
        self.lock().local_storage = items;
    }

    pub fn local_storage_items(&self) -> HashMap<String, String> {
        self.lock().local_storage.clone()
    }

    pub fn session_storage_items(&self) -> HashMap<String, String> {
        self.lock().session_storage.clone()
    }

    pub fn cookie_names(&self) -> Vec<String> {
        self.lock().cookies.iter().map(|c| c.name.clone()).collect()
    }

    pub fn fail_cookie_clear(&self) {
        self.lock().fail_cookie_clear = true;
    }

    pub fn fail_storage(&self) {
        self.lock().fail_storage = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverTrait for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{}", url));
        self.lock().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.lock().title.clone())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.lock().page_source.clone())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.record(format!("script:{}", script));
        Ok(self
            .lock()
            .script_results
            .get(script)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn is_element_present(&self, locator: &Locator) -> Result<bool> {
        Ok(self.lock().present.contains(&locator.to_string()))
    }

    async fn element_attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let key = locator.to_string();
        let state = self.lock();
        if name == "value" {
            if let Some(value) = state.values.get(&key) {
                return Ok(Some(value.clone()));
            }
        }
        Ok(state.attributes.get(&(key, name.to_string())).cloned())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let key = locator.to_string();
        self.record(format!("click:{}", key));
        let mut state = self.lock();
        // clicking toggles checkbox/radio style selection
        if !state.selected.insert(key.clone()) {
            state.selected.remove(&key);
        }
        Ok(())
    }

    async fn clear_value(&self, locator: &Locator) -> Result<()> {
        let key = locator.to_string();
        self.record(format!("clear:{}", key));
        self.lock().values.remove(&key);
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let key = locator.to_string();
        self.record(format!("type:{}:{}", key, text));
        self.lock()
            .values
            .entry(key)
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()> {
        let key = locator.to_string();
        self.record(format!("set_value:{}:{}", key, value));
        self.lock().values.insert(key, value.to_string());
        Ok(())
    }

    async fn is_selected(&self, locator: &Locator) -> Result<bool> {
        Ok(self.lock().selected.contains(&locator.to_string()))
    }

    async fn select_option(&self, locator: &Locator, value: &str, by_value: bool) -> Result<()> {
        let key = locator.to_string();
        self.record(format!(
            "select:{}:{}:{}",
            key,
            value,
            if by_value { "value" } else { "text" }
        ));
        self.lock().values.insert(key, value.to_string());
        Ok(())
    }

    async fn send_file(&self, locator: &Locator, path: &str) -> Result<()> {
        self.record(format!("send_file:{}:{}", locator, path));
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<CookieRecord>> {
        Ok(self.lock().cookies.clone())
    }

    async fn add_cookie(&self, cookie: &CookieRecord) -> Result<()> {
        self.record(format!("add_cookie:{}", cookie.name));
        self.lock().cookies.push(cookie.clone());
        Ok(())
    }

    async fn delete_all_cookies(&self) -> Result<()> {
        self.record("delete_all_cookies");
        let mut state = self.lock();
        if state.fail_cookie_clear {
            return Err(FormpilotError::ChromeError(
                "cookie clear failed".to_string(),
            ));
        }
        state.cookies.clear();
        Ok(())
    }

    async fn local_storage(&self) -> Result<HashMap<String, String>> {
        let state = self.lock();
        if state.fail_storage {
            return Err(FormpilotError::ScriptFailed(
                "storage unavailable".to_string(),
            ));
        }
        Ok(state.local_storage.clone())
    }

    async fn session_storage(&self) -> Result<HashMap<String, String>> {
        let state = self.lock();
        if state.fail_storage {
            return Err(FormpilotError::ScriptFailed(
                "storage unavailable".to_string(),
            ));
        }
        Ok(state.session_storage.clone())
    }

    async fn set_local_storage_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()
            .local_storage
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_session_storage_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()
            .session_storage
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        Ok(self.lock().windows.clone())
    }

    async fn current_window(&self) -> Result<String> {
        Ok(self
            .lock()
            .windows
            .first()
            .cloned()
            .unwrap_or_else(|| "window-0".to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.record("screenshot");
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        self.lock().closed = true;
        Ok(())
    }
}

/// Factory double: hands out prepared drivers in order, optionally failing
/// the next N creations, and remembers a clone of everything it created.
pub struct MockDriverFactory {
    prepared: Mutex<VecDeque<MockDriver>>,
    spawned: Mutex<Vec<MockDriver>>,
    fail_remaining: AtomicUsize,
    created_count: AtomicUsize,
}

impl MockDriverFactory {
    pub fn new() -> Self {
        Self {
            prepared: Mutex::new(VecDeque::new()),
            spawned: Mutex::new(Vec::new()),
            fail_remaining: AtomicUsize::new(0),
            created_count: AtomicUsize::new(0),
        }
    }

    /// Queue a preconfigured driver; `create` hands queued drivers out
    /// before falling back to fresh ones.
    pub fn prepare(&self, driver: MockDriver) {
        self.prepared
            .lock()
            .expect("factory state poisoned")
            .push_back(driver);
    }

    pub fn fail_next_creations(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created_count.load(Ordering::SeqCst)
    }

    pub fn spawned(&self) -> Vec<MockDriver> {
        self.spawned.lock().expect("factory state poisoned").clone()
    }
}

impl Default for MockDriverFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    type Driver = MockDriver;

    async fn create(&self) -> Result<MockDriver> {
        loop {
            let remaining = self.fail_remaining.load(Ordering::SeqCst);
            if remaining == 0 {
                break;
            }
            if self
                .fail_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(FormpilotError::DriverCreationFailed(
                    "scripted creation failure".to_string(),
                ));
            }
        }

        let driver = self
            .prepared
            .lock()
            .expect("factory state poisoned")
            .pop_front()
            .unwrap_or_default();
        self.created_count.fetch_add(1, Ordering::SeqCst);
        self.spawned
            .lock()
            .expect("factory state poisoned")
            .push(driver.clone());
        Ok(driver)
    }
}
