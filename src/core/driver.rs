use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Locator strategies matching what real automation drivers accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    Id,
    Name,
    ClassName,
    Tag,
    Css,
    XPath,
}

/// A (strategy, value) pair identifying one element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Id, value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Name, value)
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::ClassName, value)
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::XPath, value)
    }

    /// JavaScript expression that resolves to the element or null.
    pub fn to_js_expr(&self) -> String {
        let escaped = self.value.replace('\\', "\\\\").replace('\'', "\\'");
        match self.strategy {
            LocatorStrategy::Id => format!("document.getElementById('{}')", escaped),
            LocatorStrategy::Name => {
                format!("document.querySelector('[name=\"{}\"]')", escaped)
            }
            LocatorStrategy::ClassName => {
                format!("document.getElementsByClassName('{}')[0] || null", escaped)
            }
            LocatorStrategy::Tag => {
                format!("document.getElementsByTagName('{}')[0] || null", escaped)
            }
            LocatorStrategy::Css => format!("document.querySelector('{}')", escaped),
            LocatorStrategy::XPath => format!(
                "document.evaluate('{}', document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                escaped
            ),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}={}", self.strategy, self.value)
    }
}

/// One browser cookie as snapshotted from or replayed into a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<f64>,
    pub http_only: bool,
    pub secure: bool,
}

/// Capability boundary over one live browser automation session.
///
/// Everything above this trait (pool, analyzer, automator, session store)
/// only talks to the browser through these calls, so tests can substitute
/// a scripted implementation.
#[async_trait]
pub trait DriverTrait: Send + Sync {
    /// Navigate to a URL and wait for the page to settle
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Get current URL
    async fn current_url(&self) -> Result<String>;

    /// Get page title
    async fn title(&self) -> Result<String>;

    /// Get the rendered page source
    async fn page_source(&self) -> Result<String>;

    /// Execute JavaScript in the page, returning the result as JSON
    async fn execute_script(&self, script: &str) -> Result<Value>;

    /// Single presence probe, no waiting
    async fn is_element_present(&self, locator: &Locator) -> Result<bool>;

    /// Read an attribute or property of an element
    async fn element_attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    /// Click an element
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Clear an input's value
    async fn clear_value(&self, locator: &Locator) -> Result<()>;

    /// Type text into an element
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Write a value directly, bypassing keyboard simulation
    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Whether a checkbox/radio is currently selected
    async fn is_selected(&self, locator: &Locator) -> Result<bool>;

    /// Select a dropdown option by value or by visible text
    async fn select_option(&self, locator: &Locator, value: &str, by_value: bool) -> Result<()>;

    /// Attach a local file to a file input
    async fn send_file(&self, locator: &Locator, path: &str) -> Result<()>;

    /// All cookies visible to the current page
    async fn cookies(&self) -> Result<Vec<CookieRecord>>;

    async fn add_cookie(&self, cookie: &CookieRecord) -> Result<()>;

    async fn delete_all_cookies(&self) -> Result<()>;

    async fn local_storage(&self) -> Result<HashMap<String, String>>;

    async fn session_storage(&self) -> Result<HashMap<String, String>>;

    async fn set_local_storage_item(&self, key: &str, value: &str) -> Result<()>;

    async fn set_session_storage_item(&self, key: &str, value: &str) -> Result<()>;

    /// Handles of all open windows/tabs
    async fn window_handles(&self) -> Result<Vec<String>>;

    /// Handle of the window currently in focus
    async fn current_window(&self) -> Result<String>;

    /// Capture a PNG screenshot of the current page
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Tear the session down
    async fn close(&self) -> Result<()>;
}

/// Creates fresh driver sessions for the pool.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: DriverTrait + 'static;

    async fn create(&self) -> Result<Self::Driver>;
}
