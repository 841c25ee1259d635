//! Field validation for todo requests.
//!
//! Every check records its failure under the request field it concerns, so a
//! single [`ValidationErrors`] can describe everything wrong with a request.

use std::collections::BTreeMap;

use chrono::NaiveDate;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field-keyed validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("One or more validation errors occurred.")]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding one failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn into_errors(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Records the error of `result` under `field` and returns its value.
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }
}

/// Validates a title and returns it trimmed.
pub fn validate_title(title: &str) -> Result<String, String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title is required.".to_string());
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title must be between 1 and {MAX_TITLE_LENGTH} characters."
        ));
    }
    Ok(trimmed.to_string())
}

/// Parses an optional `YYYY-MM-DD` date. Missing or blank input yields `None`.
pub fn parse_date(field: &str, input: Option<&str>) -> Result<Option<NaiveDate>, String> {
    let Some(raw) = input.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    // chrono accepts unpadded fields, so the shape is checked separately.
    let well_formed = raw.len() == 10 && raw.as_bytes()[4] == b'-' && raw.as_bytes()[7] == b'-';
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) if well_formed => Ok(Some(date)),
        _ => Err(format!("{} must be in YYYY-MM-DD format.", capitalize(field))),
    }
}

/// Rejects a range whose lower bound lies after its upper bound.
pub fn ensure_date_range(after: Option<NaiveDate>, before: Option<NaiveDate>) -> Result<(), String> {
    match (after, before) {
        (Some(after), Some(before)) if after > before => {
            Err("dueAfter must be earlier than or equal to dueBefore.".to_string())
        }
        _ => Ok(()),
    }
}

pub fn validate_page(page: u32) -> Result<u32, String> {
    if page < 1 {
        return Err("Page must be greater than or equal to 1.".to_string());
    }
    Ok(page)
}

pub fn validate_page_size(page_size: u32) -> Result<u32, String> {
    if page_size < 1 {
        return Err("PageSize must be greater than or equal to 1.".to_string());
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(format!(
            "PageSize must be less than or equal to {MAX_PAGE_SIZE}."
        ));
    }
    Ok(page_size)
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_valid_title() {
        assert_eq!(validate_title("  ship it  ").unwrap(), "ship it");
    }

    #[test]
    fn rejects_blank_title() {
        assert_eq!(validate_title("   ").unwrap_err(), "Title is required.");
    }

    #[test]
    fn enforces_title_length_in_characters() {
        let longest = "é".repeat(MAX_TITLE_LENGTH);
        let too_long = "a".repeat(MAX_TITLE_LENGTH + 1);

        assert!(validate_title(&longest).is_ok());
        assert_eq!(
            validate_title(&too_long).unwrap_err(),
            "Title must be between 1 and 200 characters."
        );
    }

    #[test]
    fn parses_iso_dates_and_ignores_blank_input() {
        assert_eq!(
            parse_date("dueDate", Some(" 2025-01-31 ")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(parse_date("dueDate", Some("  ")).unwrap(), None);
        assert_eq!(parse_date("dueDate", None).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_dates() {
        for input in ["2025/01/31", "31-01-2025", "2025-1-3", "2025-02-30", "tomorrow"] {
            assert_eq!(
                parse_date("dueDate", Some(input)).unwrap_err(),
                "DueDate must be in YYYY-MM-DD format.",
                "input {input}"
            );
        }
    }

    #[test]
    fn date_range_must_be_ordered() {
        let early = NaiveDate::from_ymd_opt(2025, 1, 1);
        let late = NaiveDate::from_ymd_opt(2025, 2, 1);

        assert!(ensure_date_range(early, late).is_ok());
        assert!(ensure_date_range(early, early).is_ok());
        assert!(ensure_date_range(None, late).is_ok());
        assert!(ensure_date_range(late, early).is_err());
    }

    #[test]
    fn page_size_is_bounded() {
        assert!(validate_page(0).is_err());
        assert!(validate_page(1).is_ok());
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(100).is_ok());
        assert!(validate_page_size(101).is_err());
    }

    #[test]
    fn collects_errors_per_field() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.check("page", validate_page(3)), Some(3));
        assert_eq!(errors.check("page", validate_page(0)), None);
        errors.add("page", "another");
        errors.add("title", "Title is required.");

        let map = errors.clone().into_errors();
        assert_eq!(map["page"].len(), 2);
        assert_eq!(map["title"], vec!["Title is required.".to_string()]);
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
