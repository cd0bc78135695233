use crate::core::config::BrowserConfig;
use crate::core::{CookieRecord, DriverFactory, DriverTrait, Locator, LocatorStrategy};
use crate::errors::{FormpilotError, Result};
use crate::utils::wait::wait_for_condition;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::{ClearBrowserCookies, CookieParam};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::DOM::SetFileInputFiles;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// One Chrome session driven over CDP. DOM manipulation goes through
/// injected script; native date widgets and framework-rendered inputs
/// behave too differently for synthesized keystrokes to be reliable.
const PAGE_READY_CONDITION: &str = "document.readyState === 'complete'";
const PAGE_READY_POLL: Duration = Duration::from_millis(100);

pub struct ChromeDriver {
    // dropping the Browser tears the process down
    _browser: Browser,
    tab: Arc<Tab>,
    page_load_timeout: Duration,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-extensions"),
            OsStr::new("--disable-infobars"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        if config.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            // pooled sessions sit idle between calls
            .idle_browser_timeout(Duration::from_secs(3600))
            .build()
            .map_err(|e| FormpilotError::LaunchFailed(e.to_string()))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| FormpilotError::LaunchFailed(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FormpilotError::LaunchFailed(e.to_string()))?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        Ok(Self {
            _browser: browser,
            tab,
            page_load_timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn eval(&self, script: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| FormpilotError::ScriptFailed(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    /// Run a script against a located element; the element is bound to `el`.
    fn eval_on_element(&self, locator: &Locator, body: &str) -> Result<Value> {
        let script = format!(
            r#"(function() {{
    const el = {};
    if (!el) return null;
    {}
}})()"#,
            locator.to_js_expr(),
            body
        );
        self.eval(&script)
    }

    fn css_for(locator: &Locator) -> Option<String> {
        match locator.strategy {
            LocatorStrategy::Id => Some(format!("[id=\"{}\"]", locator.value)),
            LocatorStrategy::Name => Some(format!("[name=\"{}\"]", locator.value)),
            LocatorStrategy::ClassName => Some(format!(".{}", locator.value)),
            LocatorStrategy::Tag => Some(locator.value.clone()),
            LocatorStrategy::Css => Some(locator.value.clone()),
            LocatorStrategy::XPath => None,
        }
    }

    fn storage_snapshot(&self, storage: &str) -> Result<HashMap<String, String>> {
        let script = format!(
            "JSON.stringify(Object.assign({{}}, window.{}))",
            storage
        );
        let raw = self.eval(&script)?;
        let json = raw
            .as_str()
            .ok_or_else(|| FormpilotError::ScriptFailed(format!("{} unavailable", storage)))?;
        Ok(serde_json::from_str(json)?)
    }
}

/// Embed a Rust string as a quoted, escaped JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl DriverTrait for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| FormpilotError::NavigationFailed(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| FormpilotError::NavigationFailed(e.to_string()))?;

        // navigation events can settle before subresources finish loading
        let ready = wait_for_condition(
            self,
            PAGE_READY_CONDITION,
            self.page_load_timeout,
            PAGE_READY_POLL,
        )
        .await?;
        if !ready {
            return Err(FormpilotError::NavigationFailed(format!(
                "page did not finish loading within {}ms",
                self.page_load_timeout.as_millis()
            )));
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn title(&self) -> Result<String> {
        let result = self.eval("document.title")?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn page_source(&self) -> Result<String> {
        let result = self.eval("document.documentElement.outerHTML")?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.eval(script)
    }

    async fn is_element_present(&self, locator: &Locator) -> Result<bool> {
        let script = format!("({}) !== null", locator.to_js_expr());
        Ok(self.eval(&script)?.as_bool().unwrap_or(false))
    }

    async fn element_attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let body = format!(
            "if ({name} === 'value' && 'value' in el) return el.value; return el.getAttribute({name});",
            name = js_string(name)
        );
        let result = self.eval_on_element(locator, &body)?;
        Ok(result.as_str().map(|s| s.to_string()))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let result = self.eval_on_element(locator, "el.click(); return true;")?;
        if result.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(FormpilotError::ElementNotFound(locator.to_string()))
        }
    }

    async fn clear_value(&self, locator: &Locator) -> Result<()> {
        let body = "el.value = ''; \
            el.dispatchEvent(new Event('input', { bubbles: true })); \
            return true;";
        let result = self.eval_on_element(locator, body)?;
        if result.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(FormpilotError::ElementNotFound(locator.to_string()))
        }
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let body = format!(
            "el.value = (el.value || '') + {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            js_string(text)
        );
        let result = self.eval_on_element(locator, &body)?;
        if result.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(FormpilotError::ElementNotFound(locator.to_string()))
        }
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()> {
        let body = format!(
            "el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            js_string(value)
        );
        let result = self.eval_on_element(locator, &body)?;
        if result.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(FormpilotError::ElementNotFound(locator.to_string()))
        }
    }

    async fn is_selected(&self, locator: &Locator) -> Result<bool> {
        let result = self.eval_on_element(locator, "return el.checked === true;")?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn select_option(&self, locator: &Locator, value: &str, by_value: bool) -> Result<()> {
        let needle = js_string(value);
        let condition = if by_value {
            format!("opt.value === {}", needle)
        } else {
            format!("opt.text.trim() === {}", needle)
        };
        let body = format!(
            "for (const opt of el.options) {{ \
                 if ({}) {{ \
                     el.value = opt.value; \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                     return true; \
                 }} \
             }} \
             return false;",
            condition
        );
        let result = self.eval_on_element(locator, &body)?;
        if result.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(FormpilotError::ElementNotFound(format!(
                "option '{}' in {}",
                value, locator
            )))
        }
    }

    async fn send_file(&self, locator: &Locator, path: &str) -> Result<()> {
        let element = match Self::css_for(locator) {
            Some(css) => self
                .tab
                .find_element(&css)
                .map_err(|e| FormpilotError::ElementNotFound(e.to_string()))?,
            None => self
                .tab
                .find_element_by_xpath(&locator.value)
                .map_err(|e| FormpilotError::ElementNotFound(e.to_string()))?,
        };

        self.tab
            .call_method(SetFileInputFiles {
                files: vec![path.to_string()],
                node_id: Some(element.node_id),
                backend_node_id: None,
                object_id: None,
            })
            .map_err(|e| FormpilotError::ChromeError(e.to_string()))?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<CookieRecord>> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| FormpilotError::ChromeError(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| CookieRecord {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: Some(c.expires),
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect())
    }

    async fn add_cookie(&self, cookie: &CookieRecord) -> Result<()> {
        let param = CookieParam {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            url: None,
            domain: Some(cookie.domain.clone()),
            path: Some(cookie.path.clone()),
            secure: Some(cookie.secure),
            http_only: Some(cookie.http_only),
            same_site: None,
            expires: cookie.expires,
            priority: None,
            same_party: None,
            source_scheme: None,
            source_port: None,
            partition_key: None,
        };
        self.tab
            .set_cookies(vec![param])
            .map_err(|e| FormpilotError::ChromeError(e.to_string()))?;
        Ok(())
    }

    async fn delete_all_cookies(&self) -> Result<()> {
        self.tab
            .call_method(ClearBrowserCookies(None))
            .map_err(|e| FormpilotError::ChromeError(e.to_string()))?;
        Ok(())
    }

    async fn local_storage(&self) -> Result<HashMap<String, String>> {
        self.storage_snapshot("localStorage")
    }

    async fn session_storage(&self) -> Result<HashMap<String, String>> {
        self.storage_snapshot("sessionStorage")
    }

    async fn set_local_storage_item(&self, key: &str, value: &str) -> Result<()> {
        let script = format!(
            "window.localStorage.setItem({}, {})",
            js_string(key),
            js_string(value)
        );
        self.eval(&script)?;
        Ok(())
    }

    async fn set_session_storage_item(&self, key: &str, value: &str) -> Result<()> {
        let script = format!(
            "window.sessionStorage.setItem({}, {})",
            js_string(key),
            js_string(value)
        );
        self.eval(&script)?;
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        let tabs = self._browser.get_tabs();
        let tabs = tabs
            .lock()
            .map_err(|_| FormpilotError::ChromeError("tab registry poisoned".to_string()))?;
        Ok(tabs.iter().map(|t| t.get_target_id().clone()).collect())
    }

    async fn current_window(&self) -> Result<String> {
        Ok(self.tab.get_target_id().clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| FormpilotError::ChromeError(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        // the Chrome process exits when the Browser handle drops
        Ok(())
    }
}

/// Launches one Chrome session per pool slot.
pub struct ChromeDriverFactory {
    config: BrowserConfig,
}

impl ChromeDriverFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    type Driver = ChromeDriver;

    async fn create(&self) -> Result<ChromeDriver> {
        ChromeDriver::launch(&self.config)
            .map_err(|e| FormpilotError::DriverCreationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes_and_newlines() {
        assert_eq!(js_string("it's"), "\"it's\"");
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string("a\nb"), "\"a\\nb\"");
    }

    #[test]
    fn css_for_maps_strategies() {
        assert_eq!(
            ChromeDriver::css_for(&Locator::id("x")).as_deref(),
            Some("[id=\"x\"]")
        );
        assert_eq!(
            ChromeDriver::css_for(&Locator::name("y")).as_deref(),
            Some("[name=\"y\"]")
        );
        assert!(ChromeDriver::css_for(&Locator::xpath("//input")).is_none());
    }
}
