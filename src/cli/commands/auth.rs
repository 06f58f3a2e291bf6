use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Account email")]
        email: String,
        #[arg(long, env = "PAWCARE_PASSWORD", help = "Password (or set PAWCARE_PASSWORD)")]
        password: String,
        #[arg(long, help = "Server URL to log in to (saved for later commands)")]
        server: Option<String>,
    },

    #[command(about = "Logout from server")]
    Logout,

    #[command(about = "Show current authentication status and server health")]
    Status,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut env_config = load_environment_config()?;

    match cmd {
        AuthCommands::Login { email, password, server } => {
            if let Some(server) = server {
                env_config.server_url = Some(server);
            }
            let client = env_config.client()?;
            let login = client
                .login(&email, &password)
                .await
                .with_context(|| format!("login to {} failed", client.base_url()))?;

            let now = Utc::now();
            env_config.token = Some(login.token);
            env_config.session = Some(SessionInfo {
                user_id: login.user.id,
                email: login.user.email.clone(),
                is_admin: login.user.is_admin,
                logged_in_at: now,
                expires_at: now + Duration::seconds(login.expires_in as i64),
            });
            save_environment_config(&env_config)?;

            output_success(
                &output_format,
                &format!("Logged in as {}", login.user.email),
                Some(json!({ "user": login.user, "server": env_config.server_url() })),
            )
        }
        AuthCommands::Logout => {
            env_config.clear_session();
            save_environment_config(&env_config)?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let client = env_config.client()?;
            let healthy = client.health().await.is_ok();

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "server": env_config.server_url(),
                            "healthy": healthy,
                            "session": env_config.session,
                            "expired": env_config.is_expired(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    println!("Server: {} ({})", env_config.server_url(), if healthy { "up" } else { "down" });
                    match &env_config.session {
                        Some(s) if env_config.is_expired() => println!("Session: {} (expired)", s.email),
                        Some(s) => println!(
                            "Session: {}{} until {}",
                            s.email,
                            if s.is_admin { " [admin]" } else { "" },
                            s.expires_at
                        ),
                        None => println!("Session: not logged in"),
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Whoami => {
            let whoami = env_config.client()?.whoami().await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&whoami)?),
                OutputFormat::Text => {
                    println!("ID: {}", whoami["id"].as_str().unwrap_or("-"));
                    println!("Email: {}", whoami["email"].as_str().unwrap_or("-"));
                    println!("Admin: {}", whoami["isAdmin"].as_bool().unwrap_or(false));
                    println!("Tier: {}", whoami["user"]["subscriptionTier"].as_str().unwrap_or("-"));
                }
            }
            Ok(())
        }
    }
}
