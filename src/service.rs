use crate::browser::pool::{BrowserPool, PoolStatus};
use crate::core::config::Config;
use crate::core::{DriverFactory, DriverTrait};
use crate::data::matcher::FieldMatcher;
use crate::data::processor::{DataProcessor, ValidationResult};
use crate::data::validators::validate_category;
use crate::errors::{FormpilotError, Result};
use crate::form::analyzer::FormAnalyzer;
use crate::form::schema::{FieldCategory, FormSchema, FormType, PageAnalysis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateResponse {
    pub url: String,
    pub title: String,
    pub screenshot_base64: String,
}

/// Outcome of validating a single value against one category validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The exposed operation surface. Owns the pool and the analysis pipeline;
/// every browser-touching operation acquires a pooled handle and releases
/// it whether the work succeeded or not.
pub struct AutomationService<F: DriverFactory> {
    pool: BrowserPool<F>,
    analyzer: FormAnalyzer,
    processor: DataProcessor,
    matcher: FieldMatcher,
}

impl<F: DriverFactory> AutomationService<F> {
    pub async fn init(factory: F, config: Config) -> Result<Self> {
        let analyzer = FormAnalyzer::new(config.analyzer)?;
        let pool = BrowserPool::init(factory, config.pool).await;
        Ok(Self {
            pool,
            analyzer,
            processor: DataProcessor::new(),
            matcher: FieldMatcher::new(config.matcher),
        })
    }

    pub async fn navigate(&self, url: &str) -> Result<NavigateResponse> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FormpilotError::InvalidUrl(format!("{}: {}", url, e)))?;

        let handle = self.pool.acquire().await?;
        let result = self.navigate_with(handle.driver(), parsed.as_str()).await;
        self.pool.release(handle).await;
        result
    }

    async fn navigate_with<D: DriverTrait>(
        &self,
        driver: &D,
        url: &str,
    ) -> Result<NavigateResponse> {
        driver.navigate(url).await?;
        let title = driver.title().await?;
        let screenshot = driver.screenshot().await?;
        info!(url, title, "navigated");
        Ok(NavigateResponse {
            url: driver.current_url().await?,
            title,
            screenshot_base64: base64::encode(screenshot),
        })
    }

    pub async fn pool_status(&self) -> PoolStatus {
        self.pool.status().await
    }

    pub async fn pool_cleanup(&self) {
        self.pool.cleanup().await;
    }

    pub async fn analyze(&self, url: &str) -> Result<PageAnalysis> {
        let handle = self.pool.acquire().await?;
        let result = self.analyze_with(handle.driver(), url).await;
        self.pool.release(handle).await;
        result
    }

    async fn analyze_with<D: DriverTrait>(&self, driver: &D, url: &str) -> Result<PageAnalysis> {
        driver.navigate(url).await?;
        self.analyzer.analyze_page(driver).await
    }

    pub async fn detect_form_types(&self, url: &str) -> Result<Vec<FormType>> {
        let analysis = self.analyze(url).await?;
        Ok(analysis.forms.iter().map(|f| f.form_type).collect())
    }

    pub async fn extract_schema(&self, url: &str, form_index: usize) -> Result<FormSchema> {
        let analysis = self.analyze(url).await?;
        if analysis.forms.is_empty() {
            return Err(FormpilotError::NoFormsFound);
        }
        let count = analysis.forms.len();
        analysis
            .forms
            .into_iter()
            .nth(form_index)
            .ok_or(FormpilotError::FormIndexOutOfRange {
                index: form_index,
                count,
            })
    }

    pub fn process(
        &self,
        schema: &FormSchema,
        user_data: &HashMap<String, String>,
    ) -> ValidationResult {
        self.processor.process_form_data(schema, user_data)
    }

    pub fn match_fields(
        &self,
        target_fields: &[String],
        user_data: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        self.matcher.match_fields(target_fields, user_data)
    }

    pub fn validate_field(&self, category: FieldCategory, value: &str) -> FieldCheck {
        match validate_category(category, value) {
            Ok(normalized) => FieldCheck {
                valid: true,
                value: Some(normalized),
                error: None,
            },
            Err(error) => FieldCheck {
                valid: false,
                value: None,
                error: Some(error),
            },
        }
    }
}
