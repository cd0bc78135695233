pub mod types;

pub use types::{FormpilotError, Result};
