//! Checks applied to user input before it reaches storage.

use tally_domain::MonthKey;

use crate::CoreError;

fn numeric_part(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Parses a transaction amount, keeping only digits and `.`, and requires it to be positive.
pub fn parse_amount(input: &str) -> Result<f64, CoreError> {
    let cleaned = numeric_part(input);
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| CoreError::Validation(format!("`{}` is not a valid amount", input.trim())))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::Validation(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    Ok(amount)
}

/// Parses a category limit; blank or unparsable input means "no limit" (0).
pub fn parse_limit(input: &str) -> f64 {
    numeric_part(input)
        .parse::<f64>()
        .ok()
        .filter(|limit| limit.is_finite() && *limit >= 0.0)
        .unwrap_or(0.0)
}

/// Returns the trimmed name, rejecting blank input.
pub fn require_name(kind: &str, input: &str) -> Result<String, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{kind} name cannot be empty")));
    }
    Ok(trimmed.to_string())
}

pub fn require_month(month: u32, year: i32) -> Result<MonthKey, CoreError> {
    MonthKey::new(year, month)
        .ok_or_else(|| CoreError::Validation(format!("month must be 1-12, got {month}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_filters_non_numeric_characters() {
        assert_eq!(parse_amount("$12.50").unwrap(), 12.5);
        assert_eq!(parse_amount(" 300 ").unwrap(), 300.0);
    }

    #[test]
    fn amount_rejects_zero_and_garbage() {
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("0.00").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1.2.3").is_err());
    }

    #[test]
    fn negative_sign_is_stripped_like_other_symbols() {
        assert_eq!(parse_amount("-5").unwrap(), 5.0);
    }

    #[test]
    fn limit_defaults_to_zero() {
        assert_eq!(parse_limit(""), 0.0);
        assert_eq!(parse_limit("abc"), 0.0);
        assert_eq!(parse_limit("250"), 250.0);
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(require_name("habit", "  Read ").unwrap(), "Read");
        assert!(require_name("habit", "   ").is_err());
    }

    #[test]
    fn month_must_be_in_range() {
        assert!(require_month(13, 2025).is_err());
        assert_eq!(require_month(2, 2025).unwrap().prefix(), "2025-02");
    }
}
