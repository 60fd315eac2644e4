//! Report endpoints, chart series extraction and CSV downloads.
//!
//! Drawing charts and parsing CSV are left to whatever consumes the data;
//! this module only fetches and shapes it.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, RequestOptions};
use crate::error::ApiError;

pub struct Reports<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn reports(&self) -> Reports<'_> {
        Reports { api: self }
    }
}

impl Reports<'_> {
    pub async fn performance(&self, course_id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/reports/performance-report/{course_id}")).await
    }

    pub async fn courses(&self) -> Result<Value, ApiError> {
        self.get("/reports/course-report").await
    }

    pub async fn schedule(&self, start: NaiveDate, end: NaiveDate) -> Result<Value, ApiError> {
        self.get(&format!("/reports/schedule-report/{start}/{end}")).await
    }

    pub async fn student_performance(&self, student_id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/reports/student-performance/{student_id}")).await
    }

    pub async fn students_by_course(&self, course_id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/reports/students-by-course/{course_id}")).await
    }

    /// Fetch the students-of-course CSV export
    pub async fn export_students_csv(&self, course_id: i64) -> Result<Download, ApiError> {
        let payload = self
            .get(&format!("/reports/export/csv/students/{course_id}"))
            .await?;
        Download::from_payload(payload, &format!("students_course_{course_id}.csv"))
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.api.get(path, RequestOptions::new()).await
    }
}

/// Labels and values for a bar chart of average grades
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl PerformanceSeries {
    /// One bar per entry of the report's `students` list: label from
    /// `student_name` (or first and last name), value from `average_grade`
    /// (0 when missing).
    pub fn from_report(report: &Value) -> Self {
        let mut series = Self::default();
        let Some(students) = report.get("students").and_then(Value::as_array) else {
            return series;
        };

        for student in students {
            let label = match student.get("student_name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => format!(
                    "{} {}",
                    student.get("first_name").and_then(Value::as_str).unwrap_or(""),
                    student.get("last_name").and_then(Value::as_str).unwrap_or("")
                )
                .trim()
                .to_string(),
            };
            let value = match student.get("average_grade") {
                Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
                _ => 0.0,
            };
            series.labels.push(label);
            series.values.push(value);
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A file offered for download
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub content: String,
}

impl Download {
    /// Accept either a raw CSV body or `{content, filename?, content_type?}`
    pub fn from_payload(payload: Value, default_name: &str) -> Result<Self, ApiError> {
        match payload {
            Value::String(content) => Ok(Self {
                filename: default_name.to_string(),
                content_type: "text/csv;charset=utf-8".to_string(),
                content,
            }),
            Value::Object(ref map) => {
                let Some(content) = map.get("content").and_then(Value::as_str).filter(|c| !c.is_empty()) else {
                    return Err(ApiError::decode("export payload has no content", payload.clone()));
                };
                let filename = map
                    .get("filename")
                    .and_then(Value::as_str)
                    .and_then(safe_file_name)
                    .unwrap_or_else(|| default_name.to_string());
                let content_type = map
                    .get("content_type")
                    .and_then(Value::as_str)
                    .unwrap_or("text/csv")
                    .to_string();
                Ok(Self {
                    filename,
                    content_type,
                    content: content.to_string(),
                })
            }
            other => Err(ApiError::decode("unexpected export payload", other)),
        }
    }

    /// Write into `dir` under the download's file name
    pub fn save_in(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

// Server-provided names must not escape the target directory
fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
