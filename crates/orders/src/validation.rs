//! Small input checks shared by orders, claims and reviews.

use tukangin_core::DomainError;

pub const MIN_PHONE_LEN: usize = 10;
pub const MAX_ATTACHMENTS: usize = 5;

pub fn required(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Digits plus the usual separators, at least [`MIN_PHONE_LEN`] digits.
pub fn phone(value: &str) -> Result<(), DomainError> {
    let value = value.trim();
    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
    {
        return Err(DomainError::validation("receiverPhone contains invalid characters"));
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_LEN {
        return Err(DomainError::validation(format!(
            "receiverPhone must have at least {MIN_PHONE_LEN} digits"
        )));
    }
    Ok(())
}

pub fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.chars().any(char::is_whitespace))
}

pub fn urls(field: &str, values: &[String], max: usize) -> Result<(), DomainError> {
    if values.len() > max {
        return Err(DomainError::validation(format!("{field} accepts at most {max} entries")));
    }
    if let Some(bad) = values.iter().find(|u| !is_http_url(u)) {
        return Err(DomainError::validation(format!("{field} contains an invalid URL: {bad}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_needs_enough_digits() {
        assert!(phone("0812-3456-7890").is_ok());
        assert!(phone("+62 812 3456 789").is_ok());
        assert!(phone("0812").is_err());
        assert!(phone("0812345678x").is_err());
    }

    #[test]
    fn urls_must_be_http() {
        assert!(is_http_url("https://cdn.example.com/a.jpg"));
        assert!(!is_http_url("ftp://example.com/a.jpg"));
        assert!(!is_http_url("https://"));
        assert!(urls("attachments", &["javascript:alert(1)".into()], 5).is_err());
    }
}
