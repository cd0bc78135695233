use crate::data::validators::{validate_category, FieldOutcome};
use crate::form::schema::{FieldDescriptor, FormSchema};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Per-form validation outcome. Validation failures are data here, never
/// errors: a required field that is simply absent lands in
/// `missing_fields`, not in `errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub processed_data: BTreeMap<String, String>,
    pub errors: Vec<FieldError>,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// Validates user-supplied values against a form schema.
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Required fields are checked first; anything present then runs its
    /// category validator followed by the field's declared rule list.
    pub fn process_form_data(
        &self,
        schema: &FormSchema,
        user_data: &HashMap<String, String>,
    ) -> ValidationResult {
        let mut processed_data = BTreeMap::new();
        let mut errors = Vec::new();
        let mut missing_fields = Vec::new();

        for name in &schema.required_fields {
            let Some(field) = schema.field(name) else {
                continue;
            };
            let Some(value) = user_data.get(name) else {
                missing_fields.push(name.clone());
                continue;
            };

            match self.process_field(field, value) {
                Ok(normalized) => {
                    processed_data.insert(name.clone(), normalized);
                }
                Err(error) => errors.push(FieldError {
                    field: name.clone(),
                    error,
                }),
            }
        }

        for field in &schema.fields {
            if processed_data.contains_key(&field.name)
                || errors.iter().any(|e| e.field == field.name)
                || missing_fields.contains(&field.name)
            {
                continue;
            }
            let Some(value) = user_data.get(&field.name) else {
                continue;
            };

            match self.process_field(field, value) {
                Ok(normalized) => {
                    processed_data.insert(field.name.clone(), normalized);
                }
                Err(error) => errors.push(FieldError {
                    field: field.name.clone(),
                    error,
                }),
            }
        }

        let success = errors.is_empty() && missing_fields.is_empty();
        debug!(
            success,
            errors = errors.len(),
            missing = missing_fields.len(),
            "form data processed"
        );

        ValidationResult {
            success,
            processed_data,
            errors,
            missing_fields,
        }
    }

    /// Category validator first, then the `name=value` rules in declared
    /// order; the first failing rule ends checking for the field. Rules
    /// inspect the raw value, the stored result is the normalized one.
    fn process_field(&self, field: &FieldDescriptor, value: &str) -> FieldOutcome {
        let normalized = validate_category(field.category, value)?;

        for rule in &field.validation {
            if let Some(min) = rule.strip_prefix("minlength=") {
                let min: usize = min
                    .parse()
                    .map_err(|_| format!("Invalid minlength rule: {}", rule))?;
                if value.chars().count() < min {
                    return Err(format!("Value must be at least {} characters long", min));
                }
            } else if let Some(max) = rule.strip_prefix("maxlength=") {
                let max: usize = max
                    .parse()
                    .map_err(|_| format!("Invalid maxlength rule: {}", rule))?;
                if value.chars().count() > max {
                    return Err(format!("Value must be at most {} characters long", max));
                }
            } else if let Some(pattern) = rule.strip_prefix("pattern=") {
                // pattern rules anchor at the start of the value
                let regex = Regex::new(&format!("^(?:{})", pattern))
                    .map_err(|_| format!("Invalid pattern rule: {}", rule))?;
                if !regex.is_match(value) {
                    return Err("Value does not match required pattern".to_string());
                }
            }
        }

        Ok(normalized)
    }
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new()
    }
}
