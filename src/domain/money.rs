use std::fmt;

/// Amounts are plain 64-bit floats. Sums accumulate without rounding;
/// rounding to two decimals only happens when formatting for display.
pub type Amount = f64;

/// Format an amount as a human-readable currency string.
/// Example: 50.0 -> "50.00", -12.345 -> "-12.35"
pub fn format_amount(amount: Amount) -> String {
    format!("{:.2}", amount)
}

/// Parse a decimal string into an amount.
/// Example: "50.00" -> 50.0, "12.5" -> 12.5, "100" -> 100.0
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    // Only plain decimal notation; no exponents, no "inf"/"NaN"
    let digits = input.strip_prefix('-').unwrap_or(input);
    if digits.is_empty()
        || digits.matches('.').count() > 1
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        || digits == "."
    {
        return Err(ParseAmountError::InvalidFormat);
    }

    input
        .parse::<f64>()
        .map_err(|_| ParseAmountError::InvalidFormat)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
