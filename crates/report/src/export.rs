//! Tabular data export as CSV or JSON.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::models::Post;
use crate::summary::{ReportError, ReportRow};

/// Supported download formats.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ReportError::InvalidExportFormat(s.to_string())),
        }
    }
}

/// Named columns plus rows of values, ready to be written out.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Summary report rows as `username, fullname, postcount, replycount`.
    pub fn from_report_rows(rows: &[ReportRow]) -> Self {
        let mut dataset = Self::new(&["username", "fullname", "postcount", "replycount"]);
        for row in rows {
            dataset.push(vec![
                Value::from(row.username.clone()),
                Value::from(row.fullname()),
                Value::from(row.post_count),
                Value::from(row.reply_count),
            ]);
        }
        dataset
    }

    /// Discussion posts as `id, subject, message`.
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut dataset = Self::new(&["id", "subject", "message"]);
        for post in posts {
            dataset.push(vec![
                Value::from(post.id),
                Value::from(post.subject.clone()),
                Value::from(post.message.clone()),
            ]);
        }
        dataset
    }

    /// Render in the given format.
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => Ok(self.to_csv()),
            ExportFormat::Json => self.to_json(),
        }
    }

    /// Header line followed by one line per row.
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let header: Vec<String> = self.fields.iter().map(|f| csv_escape(f)).collect();
        lines.push(header.join(","));

        for row in &self.rows {
            let parts: Vec<String> = row
                .iter()
                .map(|v| csv_escape(&json_value_to_csv(v)))
                .collect();
            lines.push(parts.join(","));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Array of objects keyed by field name, keys in field order.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<Record<'_>> = self
            .rows
            .iter()
            .map(|row| Record {
                fields: &self.fields,
                values: row,
            })
            .collect();

        serde_json::to_string_pretty(&records).context("failed to serialize export")
    }
}

/// One row written as an object in column order.
struct Record<'a> {
    fields: &'a [String],
    values: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in self.fields.iter().zip(self.values) {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Quote a CSV field if it contains a separator, quote or line break.
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn json_value_to_csv(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
