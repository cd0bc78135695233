use crate::form::schema::FieldCategory;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Outcome of one category validation: the normalized value or a message.
pub type FieldOutcome = std::result::Result<String, String>;

/// Date layouts tried in order; the first that parses wins.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z\s'-]+$").expect("static regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
    })
}

fn pan_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("static regex"))
}

fn aadhar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{12}$").expect("static regex"))
}

/// Run the validator for a semantic category. Categories without a
/// dedicated validator accept the value as-is.
pub fn validate_category(category: FieldCategory, value: &str) -> FieldOutcome {
    match category {
        FieldCategory::Name => validate_name(value),
        FieldCategory::Email => validate_email(value),
        FieldCategory::Phone => validate_phone(value),
        FieldCategory::Date => validate_date(value),
        FieldCategory::Id => validate_id(value),
        _ => validate_generic(value),
    }
}

pub fn validate_generic(value: &str) -> FieldOutcome {
    Ok(value.to_string())
}

pub fn validate_name(value: &str) -> FieldOutcome {
    let value = value.trim();
    if value.len() < 2 {
        return Err("Name must be at least 2 characters long".to_string());
    }
    if !name_regex().is_match(value) {
        return Err("Name contains invalid characters".to_string());
    }
    Ok(value.to_string())
}

pub fn validate_email(value: &str) -> FieldOutcome {
    let value = value.trim();
    if !email_regex().is_match(value) {
        return Err("Invalid email format".to_string());
    }
    Ok(value.to_lowercase())
}

pub fn validate_phone(value: &str) -> FieldOutcome {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return Err("Phone number must be 10 digits".to_string());
    }
    Ok(digits)
}

pub fn validate_date(value: &str) -> FieldOutcome {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }
    Err("Invalid date format".to_string())
}

/// Accepts PAN-shaped (5 letters, 4 digits, 1 letter) or Aadhar-shaped
/// (12 digits) identifiers, normalized to uppercase.
pub fn validate_id(value: &str) -> FieldOutcome {
    let value = value.trim().to_uppercase();
    if pan_regex().is_match(&value) || aadhar_regex().is_match(&value) {
        return Ok(value);
    }
    Err("Invalid ID format".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_accepts_letters_spaces_apostrophes_hyphens() {
        assert_eq!(validate_name("  Anita D'Souza-Rao "), Ok("Anita D'Souza-Rao".to_string()));
    }

    #[test]
    fn name_rejects_short_and_invalid() {
        assert!(validate_name("A").is_err());
        assert!(validate_name("R2D2").is_err());
    }

    #[test]
    fn email_normalizes_to_lowercase() {
        assert_eq!(
            validate_email("USER@Example.com"),
            Ok("user@example.com".to_string())
        );
    }

    #[test]
    fn email_rejects_malformed() {
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("user@nodomain").is_err());
    }

    #[test]
    fn phone_strips_formatting() {
        assert_eq!(
            validate_phone("(123) 456-7890"),
            Ok("1234567890".to_string())
        );
    }

    #[test]
    fn phone_rejects_wrong_digit_count() {
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("123456789012").is_err());
    }

    #[test]
    fn date_layouts_all_normalize_to_iso() {
        for input in ["1990-01-01", "01-01-1990", "01/01/1990", "1990/01/01"] {
            assert_eq!(validate_date(input), Ok("1990-01-01".to_string()), "{}", input);
        }
    }

    #[test]
    fn date_rejects_prose_dates() {
        assert!(validate_date("Jan 1 1990").is_err());
    }

    #[test]
    fn date_first_parsing_layout_wins() {
        // day-month ambiguity resolves to the earliest layout in the list
        assert_eq!(validate_date("02-03-1990"), Ok("1990-03-02".to_string()));
    }

    #[test]
    fn id_accepts_pan_and_aadhar_shapes() {
        assert_eq!(validate_id(" abcde1234f "), Ok("ABCDE1234F".to_string()));
        assert_eq!(validate_id("123456789012"), Ok("123456789012".to_string()));
    }

    #[test]
    fn id_rejects_other_shapes() {
        assert!(validate_id("AB1234").is_err());
        assert!(validate_id("1234567890123").is_err());
    }

    #[test]
    fn unmapped_categories_fall_back_to_generic() {
        assert_eq!(
            validate_category(FieldCategory::Court, "District Court"),
            Ok("District Court".to_string())
        );
        assert_eq!(
            validate_category(FieldCategory::Other, "anything"),
            Ok("anything".to_string())
        );
    }
}
