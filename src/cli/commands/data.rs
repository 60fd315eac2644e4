use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::*;
use crate::cli::{build_context, OutputFormat};
use crate::resources::{raw, Entity, ListQuery, RecordId};

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "Select record(s); enrollments use student_id:course_id as id")]
    Select {
        #[arg(value_enum, help = "Entity collection")]
        entity: Entity,
        #[arg(help = "Record ID to retrieve (optional)")]
        id: Option<RecordId>,
        #[arg(long, help = "JSON filter for query parameters (skip, limit, student_id, ...)")]
        filter: Option<String>,
    },

    #[command(about = "Create record from stdin")]
    Create {
        #[arg(value_enum, help = "Entity collection")]
        entity: Entity,
    },

    #[command(about = "Update record from stdin")]
    Update {
        #[arg(value_enum, help = "Entity collection")]
        entity: Entity,
        #[arg(help = "Record ID to update")]
        id: RecordId,
    },

    #[command(about = "Delete record")]
    Delete {
        #[arg(value_enum, help = "Entity collection")]
        entity: Entity,
        #[arg(help = "Record ID to delete")]
        id: RecordId,
        #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

pub async fn handle(cmd: DataCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = build_context()?;
    let api = ctx.api();

    let result = match cmd {
        DataCommands::Select { entity, id, filter } => {
            let query = match filter {
                Some(filter) => ListQuery::from_json(&serde_json::from_str::<Value>(&filter)?)?,
                None => ListQuery::new(),
            };
            match raw::select(api, entity, id, query).await {
                Ok(Value::Array(rows)) if rows.is_empty() => {
                    return output_empty_collection(&output_format, entity.name(), &format!("No {} found", entity));
                }
                other => other,
            }
        }
        DataCommands::Create { entity } => {
            let body = read_json_stdin()?;
            raw::create(api, entity, body).await
        }
        DataCommands::Update { entity, id } => {
            let body = read_json_stdin()?;
            raw::update(api, entity, id, body).await
        }
        DataCommands::Delete { entity, id, yes } => {
            if !confirm(&format!("Delete {} '{}'?", entity, id), yes)? {
                return output_success(&output_format, "Cancelled", Some(json!({ "deleted": false })));
            }
            match raw::delete(api, entity, id).await {
                Ok(_) => {
                    return output_success(
                        &output_format,
                        &format!("Deleted {} '{}'", entity, id),
                        Some(json!({ "deleted": true })),
                    );
                }
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(value) => output_value(&output_format, &value),
        Err(err) => Err(api_failure(&output_format, &err)),
    }
}
