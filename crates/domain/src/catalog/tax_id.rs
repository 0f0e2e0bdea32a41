//! Chilean tax identifier (RUT).

use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// A validated RUT, stored in the normalized `12345678-5` form.
///
/// Input may carry thousands separators and a lowercase `k`; the check
/// digit is verified with the modulo 11 algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

/// Reasons a tax identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxIdError {
    #[error("tax id must look like 12.345.678-5")]
    Format,
    #[error("tax id check digit does not match")]
    CheckDigit,
}

impl TaxId {
    /// Parses and normalizes a RUT.
    pub fn parse(input: &str) -> Result<Self, TaxIdError> {
        let cleaned: String = input
            .chars()
            .filter(|c| !matches!(c, '.' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();

        let (body, check) = match cleaned.split_once('-') {
            Some((body, check)) => (body.to_string(), check.to_string()),
            None if cleaned.len() > 1 => {
                let (body, check) = cleaned.split_at(cleaned.len() - 1);
                (body.to_string(), check.to_string())
            }
            None => return Err(TaxIdError::Format),
        };

        if body.is_empty() || body.len() > 8 || !body.chars().all(|c| c.is_ascii_digit()) {
            return Err(TaxIdError::Format);
        }
        let check = match check.as_str() {
            c if c.len() == 1 && (c == "K" || c.chars().all(|d| d.is_ascii_digit())) => {
                c.chars().next().ok_or(TaxIdError::Format)?
            }
            _ => return Err(TaxIdError::Format),
        };

        if check_digit(&body) != check {
            return Err(TaxIdError::CheckDigit);
        }

        let body = body.trim_start_matches('0');
        if body.is_empty() {
            return Err(TaxIdError::Format);
        }
        Ok(Self(format!("{body}-{check}")))
    }

    /// Returns the normalized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_digit(body: &str) -> char {
    let sum: u32 = body
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .zip([2, 3, 4, 5, 6, 7].into_iter().cycle())
        .map(|(digit, weight)| digit * weight)
        .sum();

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

impl std::fmt::Display for TaxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaxId {
    type Error = TaxIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaxId::parse(&value)
    }
}

impl From<TaxId> for String {
    fn from(id: TaxId) -> Self {
        id.0
    }
}

/// `validator` hook for raw tax id input fields.
pub fn validate_tax_id(value: &str) -> Result<(), ValidationError> {
    TaxId::parse(value).map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("tax_id");
        error.message = Some(e.to_string().into());
        error
    })
}
