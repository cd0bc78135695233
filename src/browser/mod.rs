pub mod chrome;
pub mod pool;

pub use chrome::{ChromeDriver, ChromeDriverFactory};
pub use pool::{BrowserHandle, BrowserPool, PoolStatus};
