use std::path::PathBuf;

use serde_json::json;

use crate::cli::{build_context, OutputFormat};
use crate::views::ViewRules;

pub async fn handle(file: Option<PathBuf>, output_format: OutputFormat) -> anyhow::Result<()> {
    let rules = match file.or_else(|| crate::config::config().views.rules_file.clone()) {
        Some(path) => ViewRules::load(&path)?,
        None => ViewRules::admin_console(),
    };

    let ctx = build_context()?;
    let visibility = ctx.visibility(&rules).await;

    match output_format {
        OutputFormat::Json => {
            let views: serde_json::Map<String, serde_json::Value> =
                visibility.iter().map(|(view, shown)| (view.to_string(), json!(shown))).collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "views": views }))?);
        }
        OutputFormat::Text => {
            for (view, shown) in visibility.iter() {
                println!("{} {}", if shown { "+" } else { "-" }, view);
            }
        }
    }
    Ok(())
}
