pub mod browser;
pub mod core;
pub mod data;
pub mod errors;
pub mod form;
pub mod service;
pub mod session;
pub mod testing;
pub mod utils;

pub use browser::pool::{BrowserHandle, BrowserPool, PoolStatus};
pub use crate::core::config::Config;
pub use crate::core::{CookieRecord, DriverFactory, DriverTrait, Locator, LocatorStrategy};
pub use data::matcher::FieldMatcher;
pub use data::processor::{DataProcessor, ValidationResult};
pub use errors::{FormpilotError, Result};
pub use form::analyzer::FormAnalyzer;
pub use form::automator::FormAutomator;
pub use form::schema::{FieldCategory, FieldDescriptor, FormSchema, FormType, PageAnalysis};
pub use service::AutomationService;
pub use session::{LoginRequest, SessionRecord, SessionStore};
pub use browser::chrome::{ChromeDriver, ChromeDriverFactory};
