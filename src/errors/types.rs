use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormpilotError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser session creation failed: {0}")]
    DriverCreationFailed(String),

    #[error("No browser available within {0}ms")]
    PoolExhausted(u64),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("JavaScript execution failed: {0}")]
    ScriptFailed(String),

    #[error("Page analysis failed: {0}")]
    Parse(String),

    #[error("No forms found on the page")]
    NoFormsFound,

    #[error("Form index {index} out of range ({count} forms)")]
    FormIndexOutOfRange { index: usize, count: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chrome error: {0}")]
    ChromeError(String),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, FormpilotError>;

// Convert anyhow::Error to FormpilotError
impl From<anyhow::Error> for FormpilotError {
    fn from(err: anyhow::Error) -> Self {
        FormpilotError::AnyhowError(err.to_string())
    }
}
