use serde::Deserialize;

/// Coerces a user-typed dollar amount into a finite, non-negative number.
///
/// Accepts a leading `$` and `,` thousands separators. Anything that cannot be
/// read as such a number (empty, garbage, negative, NaN, infinite) becomes `0.0`
/// rather than an error, matching how the input form treats blank fields.
pub fn sanitize_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('$').unwrap_or(trimmed).trim_start();
    let digits: String = unsigned.chars().filter(|c| *c != ',').collect();

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// Coerces a percentage such as `"7.5"` or `"7.5%"` into a fraction (`0.075`).
pub fn sanitize_percent(raw: &str) -> f64 {
    let trimmed = raw.trim();
    sanitize_amount(trimmed.strip_suffix('%').unwrap_or(trimmed)) / 100.0
}

/// A form field that may arrive as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

impl RawField {
    pub fn into_raw(self) -> String {
        match self {
            RawField::Number(n) => n.to_string(),
            RawField::Text(s) => s,
        }
    }
}
