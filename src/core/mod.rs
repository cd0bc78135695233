pub mod config;
pub mod driver;

pub use config::{
    AnalyzerConfig, AutomatorConfig, BrowserConfig, Config, MatcherConfig, PoolConfig,
    SessionConfig, Viewport,
};
pub use driver::{CookieRecord, DriverFactory, DriverTrait, Locator, LocatorStrategy};
