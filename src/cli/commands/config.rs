use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{get_config_dir, load_settings, save_settings};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show effective configuration")]
    Show,

    #[command(name = "set-url", about = "Store the backend URL")]
    SetUrl {
        #[arg(help = "Base URL, e.g. http://localhost:8000")]
        url: String,
    },
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let settings = load_settings()?;
            let config = crate::config::config();
            let summary = json!({
                "base_url": settings.effective_base_url(),
                "login_path": config.api.login_path,
                "views_file": config.views.rules_file,
                "config_dir": get_config_dir()?,
                "updated_at": settings.updated_at,
            });

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => {
                    println!("Base URL:   {}", settings.effective_base_url());
                    println!("Login path: {}", config.api.login_path);
                    if let Some(file) = &config.views.rules_file {
                        println!("View rules: {}", file.display());
                    }
                    println!("Config dir: {}", get_config_dir()?.display());
                }
            }
            Ok(())
        }
        ConfigCommands::SetUrl { url } => {
            let parsed = url::Url::parse(url.trim())
                .map_err(|e| anyhow::anyhow!("invalid URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("unsupported URL scheme '{}'", parsed.scheme());
            }

            let mut settings = load_settings()?;
            settings.set_base_url(url.trim());
            save_settings(&settings)?;

            output_success(
                &output_format,
                &format!("Base URL set to {}", url.trim()),
                Some(json!({ "base_url": settings.base_url })),
            )
        }
    }
}
