//! Size limits: raw byte counts or human unit strings.

use serde::{Deserialize, Serialize};

/// A size bound as given to a schema builder.
///
/// String forms are kept verbatim and resolved at validation time, so the
/// builder chain stays infallible; an unparsable spec surfaces as an
/// `invalid_value` issue for the schema author to fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Bytes(u64),
    Text(String),
}

impl SizeSpec {
    pub fn resolve(&self) -> Result<u64, String> {
        match self {
            SizeSpec::Bytes(b) => Ok(*b),
            SizeSpec::Text(t) => parse_size(t),
        }
    }
}

impl From<u64> for SizeSpec {
    fn from(bytes: u64) -> Self {
        SizeSpec::Bytes(bytes)
    }
}

impl From<&str> for SizeSpec {
    fn from(s: &str) -> Self {
        SizeSpec::Text(s.to_string())
    }
}

impl From<String> for SizeSpec {
    fn from(s: String) -> Self {
        SizeSpec::Text(s)
    }
}

/// Parse `"10MB"`-style strings: numeric mantissa × 1024^rank.
///
/// Accepted units are B, KB, MB, GB, TB (case-insensitive); a bare number
/// is bytes. The mantissa may be fractional (`"1.5GB"`).
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty size string".to_string());
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (mantissa_str, unit_str) = trimmed.split_at(split);

    let mantissa: f64 = mantissa_str
        .parse()
        .map_err(|_| format!("invalid size number in '{trimmed}'"))?;
    if mantissa < 0.0 {
        return Err(format!("negative size in '{trimmed}'"));
    }

    let rank = match unit_str.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "KB" => 1,
        "MB" => 2,
        "GB" => 3,
        "TB" => 4,
        other => return Err(format!("unknown size unit '{other}'")),
    };

    Ok((mantissa * 1024f64.powi(rank)).round() as u64)
}
