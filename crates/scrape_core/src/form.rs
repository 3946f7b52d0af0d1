use std::ops::RangeInclusive;

use serde::Serialize;

pub const DEFAULT_MAX_RESULTS: u32 = 50;
pub const MAX_RESULTS_RANGE: RangeInclusive<u32> = 1..=500;

/// Raw user input for a new scraping job, as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapeForm {
    pub url: String,
    pub date_start: String,
    pub date_end: String,
    pub search_term: String,
    pub max_results: String,
}

impl ScrapeForm {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Checks the only hard requirement (a URL) and normalizes the rest.
    pub fn validate(&self) -> Result<ScrapeRequest, FormError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(FormError::MissingUrl);
        }
        Ok(ScrapeRequest {
            url: url.to_string(),
            date_debut: non_empty(&self.date_start),
            date_fin: non_empty(&self.date_end),
            search_term: self.search_term.trim().to_string(),
            max_results: parse_max_results(&self.max_results),
        })
    }
}

/// Body of `POST /api/scrape`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeRequest {
    pub url: String,
    pub date_debut: Option<String>,
    pub date_fin: Option<String>,
    pub search_term: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("a URL is required")]
    MissingUrl,
}

/// Lenient parse that reads the leading integer, so `"12.5"` and `"12abc"`
/// give 12. No digits (or zero) becomes the default; numbers outside the
/// accepted range are clamped.
pub fn parse_max_results(raw: &str) -> u32 {
    match leading_integer(raw) {
        None | Some(0) => DEFAULT_MAX_RESULTS,
        Some(value) => {
            let min = i64::from(*MAX_RESULTS_RANGE.start());
            let max = i64::from(*MAX_RESULTS_RANGE.end());
            value.clamp(min, max) as u32
        }
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let text = raw.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    // Too many digits saturates; the result is clamped anyway.
    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Rough duration estimate shown next to the form: three seconds per result.
pub fn estimated_minutes(max_results: u32) -> u32 {
    (max_results * 3).div_ceil(60)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
