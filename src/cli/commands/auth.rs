use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{build_context, OutputFormat};
use crate::error::SessionError;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from server")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Show the role set used for view visibility")]
    Roles,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = build_context()?;

    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password")?,
            };

            match ctx.login(&username, &password).await {
                Ok(_) => output_success(
                    &output_format,
                    &format!("Logged in as '{}'", username.trim()),
                    Some(json!({ "username": username.trim() })),
                ),
                Err(SessionError::Api(err)) => Err(api_failure(&output_format, &err)),
                Err(e) => Err(e.into()),
            }
        }
        AuthCommands::Logout => {
            ctx.logout().await?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let session = ctx.session();
            let authenticated = session.is_authenticated();
            let claims = session.claims();
            let expires_at = claims
                .as_ref()
                .and_then(|c| c.expires_at())
                .and_then(|exp| chrono::DateTime::from_timestamp(exp, 0));

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "authenticated": authenticated,
                            "has_token": session.token().is_some(),
                            "decodable": claims.is_some(),
                            "expires_at": expires_at,
                        }))?
                    );
                }
                OutputFormat::Text => {
                    if authenticated {
                        println!("Authenticated");
                    } else if session.token().is_some() {
                        println!("Token expired");
                    } else {
                        println!("Not logged in");
                    }
                    if let Some(expires_at) = expires_at {
                        println!("Expires: {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Whoami => {
            let Some(user) = ctx.user_info().await else {
                anyhow::bail!("Not logged in");
            };

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                OutputFormat::Text => {
                    println!("User: {}", user.display_name());
                    if let Some(id) = &user.id {
                        println!("ID: {}", id);
                    }
                    if let Some(email) = &user.email {
                        println!("Email: {}", email);
                    }
                    if !user.role_names.is_empty() {
                        println!("Roles: {}", user.role_names.join(", "));
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Roles => {
            let roles = ctx.role_set().await;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "roles": roles }))?),
                OutputFormat::Text => {
                    if roles.is_empty() {
                        println!("No roles");
                    }
                    for role in roles.iter() {
                        println!("{}", role);
                    }
                }
            }
            Ok(())
        }
    }
}
