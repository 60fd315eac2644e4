use std::io::{self, BufRead, Read, Write};

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::ApiError;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Report an API failure. JSON output gets an error envelope on stdout; the
/// returned error carries the `detail`-first message for stderr.
pub fn api_failure(output_format: &OutputFormat, err: &ApiError) -> anyhow::Error {
    if let OutputFormat::Json = output_format {
        let envelope = json!({
            "success": false,
            "error": err.display_detail(),
            "status": err.status_code(),
            "body": err.body(),
        });
        if let Ok(text) = serde_json::to_string_pretty(&envelope) {
            println!("{}", text);
        }
    }
    anyhow::anyhow!(err.display_detail())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output a response body: pretty JSON, or one line per record as text
pub fn output_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match (output_format, value) {
        (OutputFormat::Json, _) => println!("{}", serde_json::to_string_pretty(value)?),
        (OutputFormat::Text, Value::String(text)) => println!("{}", text),
        (OutputFormat::Text, Value::Array(rows)) => {
            for row in rows {
                println!("{}", summarize(row));
            }
        }
        (OutputFormat::Text, other) => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn summarize(row: &Value) -> String {
    let id = row
        .get("id")
        .map(|v| v.to_string())
        .or_else(|| {
            match (row.get("student_id"), row.get("course_id")) {
                (Some(s), Some(c)) => Some(format!("{s}:{c}")),
                _ => None,
            }
        })
        .unwrap_or_else(|| "-".to_string());
    format!("{:<8} {}", id, row)
}

/// Read a JSON document from stdin
pub fn read_json_stdin() -> anyhow::Result<Value> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        anyhow::bail!("expected a JSON document on stdin");
    }
    Ok(serde_json::from_str(&input)?)
}

/// Ask on stderr, read one line from stdin
pub fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Confirmation before destructive operations
pub fn confirm(question: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let answer = prompt(&format!("{} [y/N]", question))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
