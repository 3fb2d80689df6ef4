//! Per-tenant, per-year quote numbers of the form `COT-{year}-{seq:04}`.
//!
//! Sequences past 9999 simply grow wider; ordering by length then text keeps
//! "COT-2025-10000" after "COT-2025-9999".

pub const QUOTE_NUMBER_PREFIX: &str = "COT";

pub fn year_prefix(year: i32) -> String {
    format!("{QUOTE_NUMBER_PREFIX}-{year}-")
}

pub fn format_quote_number(year: i32, sequence: u32) -> String {
    format!("{}{sequence:04}", year_prefix(year))
}

/// Trailing digit run after the final `-`, if any.
pub fn parse_sequence(quote_number: &str) -> Option<u32> {
    let (_, tail) = quote_number.rsplit_once('-')?;
    if tail.is_empty() || !tail.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// Next sequence given the last issued number and the stored counter. The
/// greater of the two wins so imported numbers and the counter never collide.
pub fn next_sequence(last_number: Option<&str>, counter: Option<u32>) -> u32 {
    let from_number = last_number.and_then(parse_sequence).unwrap_or(0);
    from_number.max(counter.unwrap_or(0)).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::{format_quote_number, next_sequence, parse_sequence, year_prefix};

    #[test]
    fn formats_with_four_digit_padding() {
        assert_eq!(year_prefix(2025), "COT-2025-");
        assert_eq!(format_quote_number(2025, 1), "COT-2025-0001");
        assert_eq!(format_quote_number(2025, 42), "COT-2025-0042");
    }

    #[test]
    fn grows_past_four_digits() {
        assert_eq!(format_quote_number(2025, 10_000), "COT-2025-10000");
        assert_eq!(next_sequence(Some("COT-2025-9999"), None), 10_000);
    }

    #[test]
    fn parses_trailing_digits_only() {
        assert_eq!(parse_sequence("COT-2025-0042"), Some(42));
        assert_eq!(parse_sequence("COT-2025-"), None);
        assert_eq!(parse_sequence("COT-2025-00A1"), None);
        assert_eq!(parse_sequence("legacy"), None);
    }

    #[test]
    fn next_sequence_starts_at_one_and_honours_counter() {
        assert_eq!(next_sequence(None, None), 1);
        assert_eq!(next_sequence(Some("COT-2025-0041"), None), 42);
        assert_eq!(next_sequence(Some("garbage"), None), 1);
        assert_eq!(next_sequence(Some("COT-2025-0003"), Some(7)), 8);
        assert_eq!(next_sequence(Some("COT-2025-0010"), Some(7)), 11);
    }
}
