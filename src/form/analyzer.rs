use crate::core::config::AnalyzerConfig;
use crate::core::{DriverTrait, Locator, LocatorStrategy};
use crate::errors::{FormpilotError, Result};
use crate::form::schema::{
    FieldCategory, FieldDescriptor, FieldGroup, FieldKind, FormSchema, FormType, PageAnalysis,
    SelectOption,
};
use crate::utils::wait::wait_for_present;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Derives a structural schema for every form on a rendered page.
///
/// Classification is regex-over-attributes and keyword scanning, driven
/// entirely by the tables in [`AnalyzerConfig`] so fixtures can exercise it
/// without a live browser.
pub struct FormAnalyzer {
    config: AnalyzerConfig,
    category_patterns: Vec<(FieldCategory, Regex)>,
}

impl FormAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let mut category_patterns = Vec::with_capacity(config.category_patterns.len());
        for entry in &config.category_patterns {
            let regex = Regex::new(&entry.pattern).map_err(|e| {
                FormpilotError::Parse(format!(
                    "invalid category pattern '{}': {}",
                    entry.pattern, e
                ))
            })?;
            category_patterns.push((entry.category, regex));
        }

        Ok(Self {
            config,
            category_patterns,
        })
    }

    /// Analyze the page currently loaded in the driver.
    ///
    /// Waits (bounded) for at least one form element before parsing; a
    /// form-less page after the timeout is a `Parse` error, not a panic.
    pub async fn analyze_page<D: DriverTrait>(&self, driver: &D) -> Result<PageAnalysis> {
        let form_locator = Locator::new(LocatorStrategy::Tag, "form");
        let present = wait_for_present(
            driver,
            &form_locator,
            Duration::from_millis(self.config.form_wait_timeout_ms),
            Duration::from_millis(self.config.poll_interval_ms),
        )
        .await?;

        if !present {
            return Err(FormpilotError::Parse(format!(
                "no form element found within {}ms",
                self.config.form_wait_timeout_ms
            )));
        }

        let html = driver.page_source().await?;
        self.analyze_html(&html)
    }

    /// Analyze raw HTML. Pure function over the markup, used directly by
    /// tests with synthetic fixtures.
    pub fn analyze_html(&self, html: &str) -> Result<PageAnalysis> {
        let document = Html::parse_document(html);
        let form_selector = selector("form")?;

        let forms: Vec<FormSchema> = document
            .select(&form_selector)
            .map(|form| self.analyze_form(form))
            .collect::<Result<_>>()?;

        debug!(form_count = forms.len(), "page analysis complete");

        Ok(PageAnalysis {
            form_count: forms.len(),
            forms,
        })
    }

    fn analyze_form(&self, form: ElementRef) -> Result<FormSchema> {
        let fields = self.extract_form_fields(form)?;
        let required_fields = fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.clone())
            .collect();
        let field_groups = self.group_related_fields(&fields);

        Ok(FormSchema {
            id: attr(form, "id"),
            name: attr(form, "name"),
            method: form
                .value()
                .attr("method")
                .unwrap_or("get")
                .to_lowercase(),
            action: attr(form, "action"),
            form_type: self.detect_form_type(form),
            fields,
            required_fields,
            field_groups,
        })
    }

    fn extract_form_fields(&self, form: ElementRef) -> Result<Vec<FieldDescriptor>> {
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();

        let input_selector = selector("input")?;
        for input in form.select(&input_selector) {
            if let Some(field) = self.analyze_input_field(input) {
                push_unique(&mut fields, &mut seen_names, field);
            }
        }

        let select_selector = selector("select")?;
        for select in form.select(&select_selector) {
            let field = self.analyze_select_field(select)?;
            push_unique(&mut fields, &mut seen_names, field);
        }

        let textarea_selector = selector("textarea")?;
        for textarea in form.select(&textarea_selector) {
            let field = self.analyze_textarea_field(textarea);
            push_unique(&mut fields, &mut seen_names, field);
        }

        Ok(fields)
    }

    fn analyze_input_field(&self, input: ElementRef) -> Option<FieldDescriptor> {
        let input_type = input.value().attr("type").unwrap_or("text");
        if matches!(input_type, "submit" | "button" | "reset" | "hidden") {
            return None;
        }

        let mut field = FieldDescriptor::new(attr(input, "name"), input_kind(input_type));
        field.id = attr(input, "id");
        field.required = input.value().attr("required").is_some();
        field.placeholder = attr(input, "placeholder");
        field.value = attr(input, "value");
        field.pattern = attr(input, "pattern");
        field.category = self.categorize_field(&field);

        // Rule order matters downstream: minlength, maxlength, pattern
        if let Some(min) = input.value().attr("minlength") {
            field.validation.push(format!("minlength={}", min));
        }
        if let Some(max) = input.value().attr("maxlength") {
            field.validation.push(format!("maxlength={}", max));
        }
        if let Some(pattern) = input.value().attr("pattern") {
            field.validation.push(format!("pattern={}", pattern));
        }

        Some(field)
    }

    fn analyze_select_field(&self, select: ElementRef) -> Result<FieldDescriptor> {
        let option_selector = selector("option")?;
        let options = select
            .select(&option_selector)
            .map(|option| SelectOption {
                value: attr(option, "value"),
                text: option.text().collect::<String>().trim().to_string(),
                selected: option.value().attr("selected").is_some(),
            })
            .collect();

        let mut field = FieldDescriptor::new(attr(select, "name"), FieldKind::Select);
        field.id = attr(select, "id");
        field.required = select.value().attr("required").is_some();
        field.options = options;
        field.multiple = select.value().attr("multiple").is_some();
        field.category = self.categorize_field(&field);

        Ok(field)
    }

    fn analyze_textarea_field(&self, textarea: ElementRef) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(attr(textarea, "name"), FieldKind::Textarea);
        field.id = attr(textarea, "id");
        field.required = textarea.value().attr("required").is_some();
        field.placeholder = attr(textarea, "placeholder");
        field.rows = textarea.value().attr("rows").and_then(|v| v.parse().ok());
        field.cols = textarea.value().attr("cols").and_then(|v| v.parse().ok());
        field.category = self.categorize_field(&field);
        field
    }

    /// First matching entry in the ordered category table wins; no scoring.
    fn categorize_field(&self, field: &FieldDescriptor) -> FieldCategory {
        let haystack = format!("{} {} {}", field.name, field.id, field.placeholder).to_lowercase();

        for (category, regex) in &self.category_patterns {
            if regex.is_match(&haystack) {
                return *category;
            }
        }

        FieldCategory::Other
    }

    /// Keyword sets are checked in table order, so text matching several
    /// categories resolves to the earliest one.
    fn detect_form_type(&self, form: ElementRef) -> FormType {
        let form_text = form.text().collect::<Vec<_>>().join(" ").to_lowercase();

        for entry in &self.config.form_type_keywords {
            if entry.keywords.iter().any(|k| form_text.contains(k)) {
                return entry.form_type;
            }
        }

        FormType::Unknown
    }

    /// Walk fields in extraction order; each unconsumed field anchors a group
    /// holding every other unconsumed field that shares its digit-stripped
    /// name or its same non-Other category. The anchor-order tie-break is
    /// preserved from observed behavior and pinned by tests.
    fn group_related_fields(&self, fields: &[FieldDescriptor]) -> Vec<FieldGroup> {
        let mut groups = Vec::new();
        let mut consumed: HashSet<&str> = HashSet::new();

        for field in fields {
            if consumed.contains(field.name.as_str()) {
                continue;
            }

            let base_name = strip_trailing_digits(&field.name);
            let mut members = Vec::new();

            for other in fields {
                if consumed.contains(other.name.as_str()) {
                    continue;
                }

                let same_base = strip_trailing_digits(&other.name) == base_name;
                let same_category =
                    other.category == field.category && field.category != FieldCategory::Other;

                if same_base || same_category {
                    members.push(other.name.clone());
                    consumed.insert(other.name.as_str());
                }
            }

            if !members.is_empty() {
                groups.push(FieldGroup {
                    name: base_name.to_string(),
                    fields: members,
                });
            }
        }

        groups
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| FormpilotError::Parse(format!("bad selector '{}': {}", css, e)))
}

fn attr(element: ElementRef, name: &str) -> String {
    element.value().attr(name).unwrap_or("").to_string()
}

fn input_kind(input_type: &str) -> FieldKind {
    match input_type {
        "checkbox" => FieldKind::Checkbox,
        "radio" => FieldKind::Radio,
        "file" => FieldKind::File,
        "date" | "datetime-local" => FieldKind::Date,
        "text" | "email" | "tel" | "password" | "number" | "search" | "url" => FieldKind::Text,
        _ => FieldKind::Other,
    }
}

fn strip_trailing_digits(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

fn push_unique(
    fields: &mut Vec<FieldDescriptor>,
    seen: &mut HashSet<String>,
    field: FieldDescriptor,
) {
    if field.name.is_empty() {
        return;
    }
    if !seen.insert(field.name.clone()) {
        warn!(field = %field.name, "duplicate field name in form, keeping first");
        return;
    }
    fields.push(field);
}
