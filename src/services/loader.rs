//! CSV loading and normalization.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate};

use crate::error::LoaderError;
use crate::models::Record;

/// Alternative names accepted for the text column when no `text`
/// header is present.
const TEXT_ALIASES: &[&str] = &["content", "body"];

/// Date formats tried, in order, when normalizing a `date` column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// Load a CSV into normalized records.
///
/// Header names are lowercased with whitespace collapsed to underscores,
/// so "Policy Name" and "policy_name" address the same column. Rows whose
/// text is empty or whitespace-only are dropped. A `date` column, when
/// present, gains a best-effort ISO sibling `date_iso`; unparseable dates
/// become empty strings rather than errors.
pub fn load_records(path: &Path) -> Result<Vec<Record>, LoaderError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_column_name)
        .collect();
    if headers.is_empty() {
        return Err(LoaderError::EmptyHeader);
    }

    // An exact `text` header always wins; aliases only stand in when
    // the CSV has no `text` column at all.
    let text_column = headers
        .iter()
        .find(|h| h.as_str() == "text")
        .or_else(|| headers.iter().find(|h| TEXT_ALIASES.contains(&h.as_str())))
        .cloned();
    let Some(text_column) = text_column else {
        return Err(LoaderError::MissingColumns(vec!["text".to_string()]));
    };

    let has_date = headers.iter().any(|h| h == "date");

    let mut records = Vec::new();
    for (row_index, row) in reader.records().enumerate() {
        let row = row?;

        let mut text = String::new();
        let mut fields = BTreeMap::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            if header == &text_column {
                text = value.to_string();
            } else {
                fields.insert(header.clone(), value.to_string());
            }
        }

        if text.trim().is_empty() {
            continue;
        }

        if has_date {
            let date_iso = fields
                .get("date")
                .map(|d| normalize_date(d))
                .unwrap_or_default();
            fields.insert("date_iso".to_string(), date_iso);
        }

        records.push(Record::new(row_index, text, fields));
    }

    Ok(records)
}

fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize a free-form date string to `YYYY-MM-DD`, or empty on failure.
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    String::new()
}
