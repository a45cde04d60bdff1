//! Book record model, ISBN normalization and field validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// A catalog book record as stored and served
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or updating a book.
///
/// `isbn` may be left empty on update to keep the stored one; `published`
/// accepts either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default, deserialize_with = "deserialize_published")]
    #[schema(value_type = Option<String>, example = "1965-01-01")]
    pub published: Option<DateTime<Utc>>,
}

fn deserialize_published<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            match NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
            {
                Some(dt) => Ok(Some(dt.and_utc())),
                None => Err(serde::de::Error::custom(format!(
                    "invalid published date: {}",
                    s
                ))),
            }
        }
    }
}

/// Keep only ASCII digits from a raw ISBN string.
fn isbn_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Verify the ISBN-13 check digit (alternating 1/3 weights over the first
/// 12 digits, mod 10). Expects exactly 13 digit characters.
fn isbn13_checksum_ok(digits: &str) -> bool {
    let ds: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if ds.len() != 13 {
        return false;
    }
    let sum: u32 = ds[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { 3 * d })
        .sum();
    (10 - sum % 10) % 10 == ds[12]
}

/// Normalize an ISBN-13 into canonical hyphenated form `AAA-B-CCC-DDDDD-E`.
///
/// Separators are stripped first; if the result is not a valid 13-digit
/// ISBN the input is returned unchanged so validation can report it.
/// Idempotent: formatting an already canonical ISBN yields the same string.
pub fn format_isbn(raw: &str) -> String {
    let digits = isbn_digits(raw);
    if digits.len() != 13 || !isbn13_checksum_ok(&digits) {
        return raw.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &digits[..3],
        &digits[3..4],
        &digits[4..7],
        &digits[7..12],
        &digits[12..]
    )
}

impl BookPayload {
    /// Replace `isbn` with its canonical hyphenated form when valid.
    pub fn format_isbn(&mut self) {
        self.isbn = format_isbn(&self.isbn);
    }

    /// Validate all fields in order (title, author, ISBN, published) and
    /// report the first failure. Returns the publication date on success.
    pub fn validate(&self) -> AppResult<DateTime<Utc>> {
        let title_len = self.title.chars().count();
        if title_len == 0 || title_len > 200 {
            return Err(AppError::Validation(
                "title must be between 1 and 200 characters".to_string(),
            ));
        }

        let author_len = self.author.chars().count();
        if author_len == 0 || author_len > 100 {
            return Err(AppError::Validation(
                "author must be between 1 and 100 characters".to_string(),
            ));
        }

        let digits = isbn_digits(&self.isbn);
        if digits.len() != 13 {
            return Err(AppError::Validation(
                "ISBN must contain exactly 13 digits".to_string(),
            ));
        }
        if !isbn13_checksum_ok(&digits) {
            return Err(AppError::Validation(
                "ISBN has an invalid check digit".to_string(),
            ));
        }

        let published = self
            .published
            .ok_or_else(|| AppError::Validation("published date is required".to_string()))?;
        if published > Utc::now() {
            return Err(AppError::Validation(
                "published date cannot be in the future".to_string(),
            ));
        }

        Ok(published)
    }
}
