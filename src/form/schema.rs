use serde::{Deserialize, Serialize};

/// Structural description of one form on a page, as the analyzer sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    pub name: String,
    pub method: String,
    pub action: String,
    pub form_type: FormType,
    pub fields: Vec<FieldDescriptor>,
    /// Names of the required fields; always a subset of `fields`
    pub required_fields: Vec<String>,
    pub field_groups: Vec<FieldGroup>,
}

impl FormSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub id: String,
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: String,
    pub value: String,
    pub pattern: String,
    pub category: FieldCategory,
    /// Options for select fields, empty otherwise
    pub options: Vec<SelectOption>,
    pub multiple: bool,
    pub rows: Option<u32>,
    pub cols: Option<u32>,
    /// Declared-order rule strings of shape `name=value`
    /// (minlength, maxlength, pattern)
    pub validation: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            kind,
            required: false,
            placeholder: String::new(),
            value: String::new(),
            pattern: String::new(),
            category: FieldCategory::Other,
            options: Vec::new(),
            multiple: false,
            rows: None,
            cols: None,
            validation: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Select,
    Textarea,
    Checkbox,
    Radio,
    File,
    Date,
    Other,
}

/// Semantic classification used to pick a validator for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Name,
    Email,
    Phone,
    Address,
    Date,
    Id,
    Case,
    Court,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Login,
    Registration,
    LegalFiling,
    Contact,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

/// Related fields grouped under a shared base name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGroup {
    pub name: String,
    pub fields: Vec<String>,
}

/// Result of analyzing one page: every form found on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub form_count: usize,
    pub forms: Vec<FormSchema>,
}
