//! Input validation applied before any store access.

use crate::error::ValidationError;
use crate::knowledge::types::MemoryType;

pub const MAX_TOPIC_LEN: usize = 100;
pub const MAX_CONTENT_LEN: usize = 2000;
pub const MAX_USER_ID_LEN: usize = 50;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_RECENT_HOURS: u32 = 720;
pub const MIN_DUPLICATE_THRESHOLD: f64 = 0.3;
pub const MAX_DUPLICATE_THRESHOLD: f64 = 0.95;
pub const DEFAULT_USER_ID: &str = "unknown";

fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}

pub fn topic(value: &str) -> Result<(), ValidationError> {
    bounded_text("topic", value, MAX_TOPIC_LEN)
}

pub fn content(value: &str) -> Result<(), ValidationError> {
    bounded_text("content", value, MAX_CONTENT_LEN)
}

/// Missing user ids default to `"unknown"`.
pub fn user_id(value: Option<&str>) -> Result<String, ValidationError> {
    match value {
        None => Ok(DEFAULT_USER_ID.to_string()),
        Some(v) => {
            bounded_text("user_id", v, MAX_USER_ID_LEN)?;
            Ok(v.trim().to_string())
        }
    }
}

pub fn source(value: &str, known: &[String]) -> Result<(), ValidationError> {
    if known.iter().any(|k| k == value) {
        Ok(())
    } else {
        Err(ValidationError::UnknownSource(value.to_string()))
    }
}

/// Trim, drop duplicates (first spelling wins), and bound the tag set.
pub fn tags(values: Option<Vec<String>>) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::new();
    for tag in values.unwrap_or_default() {
        bounded_text("tag", &tag, MAX_TAG_LEN)?;
        let tag = tag.trim().to_string();
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags {
            max: MAX_TAGS,
            count: out.len(),
        });
    }
    Ok(out)
}

pub fn confidence(value: Option<f64>) -> Result<f64, ValidationError> {
    let value = value.unwrap_or(1.0);
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::Confidence(value))
    }
}

pub fn memory_type(value: Option<&str>) -> Result<Option<MemoryType>, ValidationError> {
    value
        .map(|v| {
            v.parse::<MemoryType>()
                .map_err(|_| ValidationError::UnknownMemoryType(v.to_string()))
        })
        .transpose()
}

pub fn id(value: i64) -> Result<i64, ValidationError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidId(value))
    }
}

pub fn limit(value: Option<usize>, default: usize, max: usize) -> Result<usize, ValidationError> {
    let value = value.unwrap_or(default);
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: "limit",
            min: 1.0,
            max: max as f64,
            value: value as f64,
        })
    }
}

pub fn hours(value: Option<u32>) -> Result<u32, ValidationError> {
    let value = value.unwrap_or(24);
    if (1..=MAX_RECENT_HOURS).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: "hours",
            min: 1.0,
            max: MAX_RECENT_HOURS as f64,
            value: value as f64,
        })
    }
}

pub fn duplicate_threshold(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && (MIN_DUPLICATE_THRESHOLD..=MAX_DUPLICATE_THRESHOLD).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: "threshold",
            min: MIN_DUPLICATE_THRESHOLD,
            max: MAX_DUPLICATE_THRESHOLD,
            value,
        })
    }
}

pub fn query(value: &str) -> Result<(), ValidationError> {
    bounded_text("query", value, MAX_CONTENT_LEN)
}

pub fn merge_ids(keep_id: i64, delete_id: i64) -> Result<(), ValidationError> {
    id(keep_id)?;
    id(delete_id)?;
    if keep_id == delete_id {
        return Err(ValidationError::SelfMerge(keep_id));
    }
    Ok(())
}
