use crate::form::schema::{FieldCategory, FormType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub browser: BrowserConfig,
    pub pool: PoolConfig,
    pub analyzer: AnalyzerConfig,
    pub matcher: MatcherConfig,
    pub automator: AutomatorConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub size: usize,
    pub acquire_timeout_ms: u64,
}

/// Heuristic tables driving form analysis. Both tables are ordered: the
/// first matching entry wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub form_wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub category_patterns: Vec<CategoryPattern>,
    pub form_type_keywords: Vec<FormTypeKeywords>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPattern {
    pub category: FieldCategory,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormTypeKeywords {
    pub form_type: FormType,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum normalized similarity (0..1) for a fuzzy field match
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomatorConfig {
    pub element_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_dir: String,
    pub timeout_minutes: i64,
    pub login_wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            pool: PoolConfig::default(),
            analyzer: AnalyzerConfig::default(),
            matcher: MatcherConfig::default(),
            automator: AutomatorConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            disable_images: false,
            args: vec![],
            timeout_ms: 30000,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 3,
            acquire_timeout_ms: 30000,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            form_wait_timeout_ms: 10000,
            poll_interval_ms: 100,
            category_patterns: default_category_patterns(),
            form_type_keywords: default_form_type_keywords(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
        }
    }
}

impl Default for AutomatorConfig {
    fn default() -> Self {
        Self {
            element_timeout_ms: 10000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_dir: "sessions".to_string(),
            timeout_minutes: 30,
            login_wait_timeout_ms: 10000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

fn default_category_patterns() -> Vec<CategoryPattern> {
    let table = [
        (
            FieldCategory::Name,
            r"name|full[_\s-]*name|first[_\s-]*name|last[_\s-]*name",
        ),
        (FieldCategory::Email, r"email|e-mail|mail"),
        (FieldCategory::Phone, r"phone|mobile|contact|tel"),
        (FieldCategory::Address, r"address|location|residence"),
        (FieldCategory::Date, r"date|dob|birth|day|month|year"),
        (FieldCategory::Id, r"id|identification|aadhar|pan|passport"),
        (FieldCategory::Case, r"case|matter|petition|filing"),
        (FieldCategory::Court, r"court|tribunal|forum|jurisdiction"),
    ];

    table
        .into_iter()
        .map(|(category, pattern)| CategoryPattern {
            category,
            pattern: pattern.to_string(),
        })
        .collect()
}

fn default_form_type_keywords() -> Vec<FormTypeKeywords> {
    let table = [
        (FormType::Login, &["login", "signin", "sign in"][..]),
        (FormType::Registration, &["register", "signup", "sign up"]),
        (FormType::LegalFiling, &["petition", "complaint", "file"]),
        (FormType::Contact, &["contact", "enquiry", "inquiry"]),
    ];

    table
        .into_iter()
        .map(|(form_type, keywords)| FormTypeKeywords {
            form_type,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pool.size, config.pool.size);
        assert_eq!(
            back.analyzer.category_patterns.len(),
            config.analyzer.category_patterns.len()
        );
    }

    #[test]
    fn category_table_checks_name_before_email() {
        let patterns = default_category_patterns();
        assert_eq!(patterns[0].category, FieldCategory::Name);
        assert_eq!(patterns[1].category, FieldCategory::Email);
    }

    #[test]
    fn form_type_table_checks_login_first() {
        let keywords = default_form_type_keywords();
        assert_eq!(keywords[0].form_type, FormType::Login);
    }
}
