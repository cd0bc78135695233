pub mod matcher;
pub mod processor;
pub mod validators;

pub use matcher::FieldMatcher;
pub use processor::{DataProcessor, FieldError, ValidationResult};
