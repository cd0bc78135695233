use crate::core::config::AutomatorConfig;
use crate::core::{DriverTrait, Locator, LocatorStrategy};
use crate::errors::{FormpilotError, Result};
use crate::utils::wait::wait_for_present;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info};

/// Bounded-wait DOM primitives for driving a form on the current page.
///
/// Every element interaction first waits (up to the default or a
/// caller-supplied timeout) for the locator to resolve; exceeding the bound
/// is an `ElementNotFound`, logged and propagated.
pub struct FormAutomator<'a, D: DriverTrait> {
    driver: &'a D,
    config: AutomatorConfig,
}

/// Rules checked by [`FormAutomator::validate_form`] against live values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub locator: Locator,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValidation {
    pub value: String,
    pub errors: Vec<String>,
}

const CAPTCHA_LOCATORS: [(LocatorStrategy, &str); 3] = [
    (LocatorStrategy::Id, "recaptcha"),
    (LocatorStrategy::ClassName, "g-recaptcha"),
    (LocatorStrategy::Css, "iframe[title*='reCAPTCHA']"),
];

impl<'a, D: DriverTrait> FormAutomator<'a, D> {
    pub fn new(driver: &'a D, config: AutomatorConfig) -> Self {
        Self { driver, config }
    }

    /// Wait for an element to be present, up to `timeout` or the configured
    /// default.
    pub async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout.unwrap_or(Duration::from_millis(self.config.element_timeout_ms));
        let present = wait_for_present(
            self.driver,
            locator,
            timeout,
            Duration::from_millis(self.config.poll_interval_ms),
        )
        .await?;

        if present {
            Ok(())
        } else {
            error!(locator = %locator, timeout_ms = timeout.as_millis() as u64, "element not found");
            Err(FormpilotError::ElementNotFound(locator.to_string()))
        }
    }

    /// Clear the field, then write the text.
    pub async fn fill_text_field(&self, locator: &Locator, text: &str) -> Result<()> {
        self.wait_for_element(locator, None).await?;
        self.driver.clear_value(locator).await?;
        self.driver.type_text(locator, text).await
    }

    /// Select a dropdown option by value or by visible text.
    pub async fn select_dropdown(
        &self,
        locator: &Locator,
        value: &str,
        by_value: bool,
    ) -> Result<()> {
        self.wait_for_element(locator, None).await?;
        self.driver.select_option(locator, value, by_value).await
    }

    /// Check or uncheck; clicks only when the current state differs.
    pub async fn click_checkbox(&self, locator: &Locator, check: bool) -> Result<()> {
        self.wait_for_element(locator, None).await?;
        if self.driver.is_selected(locator).await? != check {
            self.driver.click(locator).await?;
        }
        Ok(())
    }

    /// Select a radio button; already-selected buttons are left alone.
    pub async fn click_radio(&self, locator: &Locator) -> Result<()> {
        self.wait_for_element(locator, None).await?;
        if !self.driver.is_selected(locator).await? {
            self.driver.click(locator).await?;
        }
        Ok(())
    }

    /// Attach a local file. The file must exist before any DOM interaction
    /// happens.
    pub async fn upload_file(&self, locator: &Locator, file_path: &str) -> Result<()> {
        if tokio::fs::metadata(file_path).await.is_err() {
            return Err(FormpilotError::FileNotFound(file_path.to_string()));
        }
        let absolute = tokio::fs::canonicalize(file_path)
            .await
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| file_path.to_string());

        self.wait_for_element(locator, None).await?;
        self.driver.send_file(locator, &absolute).await
    }

    /// Write a date value directly through script; native date widgets vary
    /// too much for typed input.
    pub async fn set_date(&self, locator: &Locator, date_value: &str) -> Result<()> {
        self.wait_for_element(locator, None).await?;
        self.driver.set_value(locator, date_value).await
    }

    pub async fn submit_form(&self, submit_locator: &Locator) -> Result<()> {
        self.wait_for_element(submit_locator, None).await?;
        info!(locator = %submit_locator, "submitting form");
        self.driver.click(submit_locator).await
    }

    /// Probe the known CAPTCHA containers; absence of all of them is a
    /// normal `false`, not an error.
    pub async fn is_captcha_present(&self) -> Result<bool> {
        for (strategy, value) in CAPTCHA_LOCATORS {
            let locator = Locator::new(strategy, value);
            if self.driver.is_element_present(&locator).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read each rule-bound field's current value and check it, keyed by
    /// the element's `name` attribute with the locator value as fallback.
    pub async fn validate_form(
        &self,
        rules: &[FieldRule],
    ) -> Result<HashMap<String, FieldValidation>> {
        let mut results = HashMap::new();

        for rule in rules {
            self.wait_for_element(&rule.locator, None).await?;

            let value = self
                .driver
                .element_attribute(&rule.locator, "value")
                .await?
                .unwrap_or_default();
            let field_name = self
                .driver
                .element_attribute(&rule.locator, "name")
                .await?
                .unwrap_or_else(|| rule.locator.value.clone());

            let mut errors = Vec::new();
            if rule.required && value.is_empty() {
                errors.push("Field is required".to_string());
            }
            if let Some(min) = rule.min_length {
                if value.chars().count() < min {
                    errors.push(format!("Minimum length should be {}", min));
                }
            }
            if let Some(max) = rule.max_length {
                if value.chars().count() > max {
                    errors.push(format!("Maximum length should be {}", max));
                }
            }
            if let Some(ref pattern) = rule.pattern {
                // anchored at the start of the value
                match Regex::new(&format!("^(?:{})", pattern)) {
                    Ok(regex) => {
                        if !regex.is_match(&value) {
                            errors.push("Value does not match required pattern".to_string());
                        }
                    }
                    Err(_) => errors.push(format!("Invalid validation pattern: {}", pattern)),
                }
            }

            results.insert(field_name, FieldValidation { value, errors });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    fn automator_config() -> AutomatorConfig {
        AutomatorConfig {
            element_timeout_ms: 50,
            poll_interval_ms: 5,
        }
    }

    #[tokio::test]
    async fn fill_clears_before_typing() {
        let driver = MockDriver::new();
        let field = Locator::id("email");
        driver.add_element(&field);
        driver.set_field_value(&field, "stale");

        let automator = FormAutomator::new(&driver, automator_config());
        automator.fill_text_field(&field, "a@b.co").await.unwrap();

        assert_eq!(driver.value_of(&field), Some("a@b.co".to_string()));
    }

    #[tokio::test]
    async fn missing_element_times_out_with_element_not_found() {
        let driver = MockDriver::new();
        let automator = FormAutomator::new(&driver, automator_config());

        let result = automator
            .fill_text_field(&Locator::id("ghost"), "x")
            .await;
        assert!(matches!(result, Err(FormpilotError::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn checkbox_click_is_idempotent() {
        let driver = MockDriver::new();
        let check = Locator::name("agree");
        driver.add_element(&check);
        driver.set_selected(&check, true);

        let automator = FormAutomator::new(&driver, automator_config());
        automator.click_checkbox(&check, true).await.unwrap();

        // already in desired state: no click recorded
        assert!(!driver.calls().iter().any(|c| c.starts_with("click:")));

        automator.click_checkbox(&check, false).await.unwrap();
        assert!(driver.calls().iter().any(|c| c.starts_with("click:")));
    }

    #[tokio::test]
    async fn upload_rejects_missing_file_before_dom() {
        let driver = MockDriver::new();
        let input = Locator::id("attachment");
        driver.add_element(&input);

        let automator = FormAutomator::new(&driver, automator_config());
        let result = automator
            .upload_file(&input, "/no/such/file.pdf")
            .await;

        assert!(matches!(result, Err(FormpilotError::FileNotFound(_))));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn set_date_writes_value_directly() {
        let driver = MockDriver::new();
        let date = Locator::id("dob");
        driver.add_element(&date);

        let automator = FormAutomator::new(&driver, automator_config());
        automator.set_date(&date, "1990-01-01").await.unwrap();

        assert_eq!(driver.value_of(&date), Some("1990-01-01".to_string()));
        assert!(driver
            .calls()
            .iter()
            .any(|c| c.starts_with("set_value:")));
    }

    #[tokio::test]
    async fn captcha_probe_reports_presence_without_error() {
        let driver = MockDriver::new();
        let automator = FormAutomator::new(&driver, automator_config());
        assert!(!automator.is_captcha_present().await.unwrap());

        driver.add_element(&Locator::class_name("g-recaptcha"));
        assert!(automator.is_captcha_present().await.unwrap());
    }

    #[tokio::test]
    async fn validate_form_aggregates_per_field() {
        let driver = MockDriver::new();
        let email = Locator::id("email");
        driver.add_element(&email);
        driver.set_field_value(&email, "ab");
        driver.set_attribute(&email, "name", "email");

        let empty = Locator::id("city");
        driver.add_element(&empty);

        let automator = FormAutomator::new(&driver, automator_config());
        let rules = vec![
            FieldRule {
                locator: email.clone(),
                required: true,
                min_length: Some(5),
                max_length: None,
                pattern: Some("^[^@]+@[^@]+$".to_string()),
            },
            FieldRule {
                locator: empty.clone(),
                required: true,
                min_length: None,
                max_length: None,
                pattern: None,
            },
        ];

        let results = automator.validate_form(&rules).await.unwrap();

        let email_result = &results["email"];
        assert_eq!(email_result.value, "ab");
        assert_eq!(email_result.errors.len(), 2);

        // no name attribute: keyed by locator value
        let city_result = &results["city"];
        assert_eq!(city_result.errors, vec!["Field is required"]);
    }

    #[tokio::test]
    async fn validate_form_anchors_pattern_and_counts_characters() {
        let driver = MockDriver::new();
        let case_number = Locator::id("case_number");
        driver.add_element(&case_number);
        driver.set_field_value(&case_number, "abc123");
        driver.set_attribute(&case_number, "name", "case_number");

        let petitioner = Locator::id("petitioner");
        driver.add_element(&petitioner);
        // four characters, five bytes
        driver.set_field_value(&petitioner, "José");
        driver.set_attribute(&petitioner, "name", "petitioner");

        let automator = FormAutomator::new(&driver, automator_config());
        let rules = vec![
            FieldRule {
                locator: case_number.clone(),
                required: true,
                min_length: None,
                max_length: None,
                pattern: Some("[0-9]+".to_string()),
            },
            FieldRule {
                locator: petitioner.clone(),
                required: true,
                min_length: Some(4),
                max_length: Some(4),
                pattern: None,
            },
        ];

        let results = automator.validate_form(&rules).await.unwrap();

        // digits exist in the value but not at the start
        assert_eq!(
            results["case_number"].errors,
            vec!["Value does not match required pattern"]
        );
        assert!(results["petitioner"].errors.is_empty());
    }

    #[tokio::test]
    async fn select_dropdown_by_visible_text() {
        let driver = MockDriver::new();
        let court = Locator::name("court");
        driver.add_element(&court);

        let automator = FormAutomator::new(&driver, automator_config());
        automator
            .select_dropdown(&court, "District Court", false)
            .await
            .unwrap();

        assert!(driver
            .calls()
            .iter()
            .any(|c| c.contains("District Court") && c.ends_with(":text")));
    }
}
