use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

/// Decimals of the chain's native token.
const TOKEN_DECIMALS: i32 = 18;

/// Converts a raw 18-decimal token amount into whole tokens.
#[allow(clippy::cast_precision_loss)]
pub fn to_tokens(raw: &str) -> Option<f64> {
    let raw = raw.trim();

    let units = raw
        .parse::<u128>()
        .map(|units| units as f64)
        .or_else(|_| raw.parse::<f64>())
        .ok()?;

    Some(units / 10f64.powi(TOKEN_DECIMALS))
}

/// Deserializes a raw token amount, sent as a string or a number, into whole
/// tokens. A null amount reads as zero.
pub fn tokens<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::String(text) => {
            to_tokens(&text).ok_or_else(|| de::Error::custom(format!("invalid amount '{text}'")))
        }
        Value::Number(number) => to_tokens(&number.to_string())
            .ok_or_else(|| de::Error::custom(format!("invalid amount {number}"))),
        other => Err(de::Error::custom(format!("invalid amount {other}"))),
    }
}

/// Deserializes an integer sent as a string or a number.
pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("invalid integer {number}"))),
        Value::String(text) => text
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid integer '{text}'"))),
        other => Err(de::Error::custom(format!("invalid integer {other}"))),
    }
}

/// Formats an integer with `,` thousands separators.
#[must_use]
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if value < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_tokens() {
        assert!((to_tokens("1000000000000000000").unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((to_tokens("150000000000000000000000").unwrap() - 150_000.0).abs() < 1e-6);
        assert!((to_tokens("0").unwrap() - 0.0).abs() < f64::EPSILON);
        assert!(to_tokens("lots").is_none());
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1999), "1,999");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_thousands(-2500), "-2,500");
    }
}
