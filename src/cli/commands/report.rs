use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::*;
use crate::cli::{build_context, OutputFormat};
use crate::reports::PerformanceSeries;

#[derive(Subcommand)]
pub enum ReportCommands {
    #[command(about = "Average grades per student for a course")]
    Performance {
        #[arg(help = "Course ID")]
        course: i64,
    },

    #[command(about = "Per-course statistics")]
    Courses,

    #[command(about = "Schedule between two dates (YYYY-MM-DD)")]
    Schedule {
        #[arg(help = "First day")]
        start: NaiveDate,
        #[arg(help = "Last day")]
        end: NaiveDate,
    },

    #[command(about = "Performance report for one student")]
    Student {
        #[arg(help = "Student ID")]
        id: i64,
    },

    #[command(name = "students-by-course", about = "Students enrolled in a course")]
    StudentsByCourse {
        #[arg(help = "Course ID")]
        course: i64,
    },

    #[command(about = "Export a course's students as CSV")]
    Export {
        #[arg(help = "Course ID")]
        course: i64,
        #[arg(long, short = 'o', help = "Target directory (defaults to the current directory)")]
        output: Option<PathBuf>,
    },
}

pub async fn handle(cmd: ReportCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = build_context()?;
    let reports = ctx.api().reports();

    let result = match cmd {
        ReportCommands::Performance { course } => match reports.performance(course).await {
            Ok(report) => return output_performance(&output_format, &report),
            Err(e) => Err(e),
        },
        ReportCommands::Courses => reports.courses().await,
        ReportCommands::Schedule { start, end } => {
            if end < start {
                anyhow::bail!("end date {} is before start date {}", end, start);
            }
            reports.schedule(start, end).await
        }
        ReportCommands::Student { id } => reports.student_performance(id).await,
        ReportCommands::StudentsByCourse { course } => reports.students_by_course(course).await,
        ReportCommands::Export { course, output } => {
            let download = reports
                .export_students_csv(course)
                .await
                .map_err(|err| api_failure(&output_format, &err))?;
            let dir = output.unwrap_or_else(|| PathBuf::from("."));
            let path = download.save_in(&dir)?;
            tracing::info!(path = %path.display(), bytes = download.content.len(), "export saved");
            return output_success(
                &output_format,
                &format!("Saved {}", path.display()),
                Some(json!({ "path": path, "content_type": download.content_type })),
            );
        }
    };

    match result {
        Ok(value) => output_value(&output_format, &value),
        Err(err) => Err(api_failure(&output_format, &err)),
    }
}

fn output_performance(output_format: &OutputFormat, report: &Value) -> anyhow::Result<()> {
    let series = PerformanceSeries::from_report(report);

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "report": report, "series": series }))?
            );
        }
        OutputFormat::Text => {
            if series.is_empty() {
                println!("No grades recorded");
                return Ok(());
            }
            let width = series.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            for (label, value) in series.labels.iter().zip(&series.values) {
                let bar = "#".repeat((value.max(0.0) * 4.0).round() as usize);
                println!("{:<width$}  {:>5.2} {}", label, value, bar, width = width);
            }
        }
    }
    Ok(())
}
