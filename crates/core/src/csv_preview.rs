//! CSV preview parser.
//!
//! Turns the raw text of an uploaded file into a [`CsvPreview`]: the header
//! row, the first [`PREVIEW_ROW_LIMIT`] data rows and a total data row
//! count. Blank lines are ignored everywhere, including for the count.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum number of data rows kept in a preview.
pub const PREVIEW_ROW_LIMIT: usize = 5;

/// Header row, a bounded sample of data rows and the total data row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    /// At most [`PREVIEW_ROW_LIMIT`] rows regardless of `total_row_count`.
    pub rows: Vec<Vec<String>>,
    /// Non-blank records minus the header record.
    pub total_row_count: usize,
}

impl CsvPreview {
    /// Values of column `index` across the preview rows, skipping short rows.
    pub fn sample_values(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).map(String::as_str))
            .collect()
    }
}

/// How records are split into fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Quote-aware: commas and line breaks inside double quotes belong to
    /// the value and `""` is an escaped quote.
    #[default]
    Standard,
    /// Split on line breaks, strip every `"` and split on commas. Quoted
    /// values containing commas come apart; kept for comparing output with
    /// older exports.
    Legacy,
}

/// Parse CSV text into a preview using [`ParseMode::Standard`].
pub fn parse_csv_preview(text: &str) -> Result<CsvPreview, CoreError> {
    parse_csv_preview_with(text, ParseMode::Standard)
}

/// Decode `data` as UTF-8 and parse it.
pub fn parse_csv_bytes(data: &[u8], mode: ParseMode) -> Result<CsvPreview, CoreError> {
    let text =
        std::str::from_utf8(data).map_err(|e| CoreError::Parse(format!("Invalid UTF-8: {e}")))?;
    parse_csv_preview_with(text, mode)
}

/// Parse CSV text into a preview with an explicit [`ParseMode`].
pub fn parse_csv_preview_with(text: &str, mode: ParseMode) -> Result<CsvPreview, CoreError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let records = match mode {
        ParseMode::Standard => split_records_quoted(text),
        ParseMode::Legacy => split_records_legacy(text),
    };

    let mut records = records.into_iter();
    let headers = records
        .next()
        .ok_or_else(|| CoreError::Parse("The file contains no data".to_string()))?;

    let mut rows = Vec::with_capacity(PREVIEW_ROW_LIMIT);
    let mut total_row_count = 0;
    for record in records {
        if rows.len() < PREVIEW_ROW_LIMIT {
            rows.push(record);
        }
        total_row_count += 1;
    }

    Ok(CsvPreview {
        headers,
        rows,
        total_row_count,
    })
}

// ---------------------------------------------------------------------------
// Tokenizers
// ---------------------------------------------------------------------------

fn split_records_legacy(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(',')
                .map(|value| value.replace('"', "").trim().to_string())
                .collect()
        })
        .collect()
}

/// Quote-aware record splitter. Blank records are dropped.
fn split_records_quoted(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    // A record that had a quoted value is never blank, even if empty.
    let mut saw_quote = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                saw_quote = true;
            }
            ',' => fields.push(finish_field(&mut current)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                fields.push(finish_field(&mut current));
                push_record(&mut records, std::mem::take(&mut fields), saw_quote);
                saw_quote = false;
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || !fields.is_empty() || saw_quote {
        fields.push(finish_field(&mut current));
        push_record(&mut records, fields, saw_quote);
    }

    records
}

fn finish_field(current: &mut String) -> String {
    let value = current.trim().to_string();
    current.clear();
    value
}

fn push_record(records: &mut Vec<Vec<String>>, fields: Vec<String>, saw_quote: bool) {
    let blank = !saw_quote && fields.len() == 1 && fields[0].is_empty();
    if !blank {
        records.push(fields);
    }
}
