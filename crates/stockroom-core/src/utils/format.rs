/// Parse a stock quantity string.
/// Decimal values are floored, negatives clamp to zero and non-numeric input counts as zero.
pub fn parse_quantity(quantity: &str) -> u64 {
    let trimmed = quantity.trim();
    if let Ok(whole) = trimmed.parse::<u64>() {
        return whole;
    }
    match parse_decimal(trimmed) {
        Some(value) if value > 0.0 => value.floor() as u64,
        _ => 0,
    }
}

/// Parse a decimal amount such as a cost field.
/// Returns None for empty or non-numeric input.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("5"), 5);
        assert_eq!(parse_quantity(" 12 "), 12);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity("-3"), 0);
        assert_eq!(parse_quantity("-0.5"), 0);
        assert_eq!(parse_quantity("2.5"), 2);
        assert_eq!(parse_quantity("10.00"), 10);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1250.50"), Some(1250.5));
        assert_eq!(parse_decimal(" 7 "), Some(7.0));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_decimal("NaN"), None);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }
}
