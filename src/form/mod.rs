pub mod analyzer;
pub mod automator;
pub mod schema;

pub use analyzer::FormAnalyzer;
pub use automator::{FieldRule, FieldValidation, FormAutomator};
pub use schema::{
    FieldCategory, FieldDescriptor, FieldGroup, FieldKind, FormSchema, FormType, PageAnalysis,
    SelectOption,
};
