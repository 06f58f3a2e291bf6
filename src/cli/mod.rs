pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "pawcare")]
#[command(about = "PawCare CLI - Feature entitlements and admin settings")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Feature flags and per-user overrides")]
    Features {
        #[command(subcommand)]
        cmd: commands::features::FeatureCommands,
    },

    #[command(about = "System settings")]
    Settings {
        #[command(subcommand)]
        cmd: commands::settings::SettingsCommands,
    },

    #[command(about = "User accounts")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Features { cmd } => commands::features::handle(cmd, output_format).await,
        Commands::Settings { cmd } => commands::settings::handle(cmd, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from(["pawcare", "--json", "features", "bulk", "reset-to-defaults"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Features {
                cmd: commands::features::FeatureCommands::Bulk { .. }
            }
        ));
    }

    #[test]
    fn rejects_unknown_tiers() {
        let id = uuid::Uuid::nil().to_string();
        assert!(Cli::try_parse_from(["pawcare", "users", "update", &id, "--tier", "gold"]).is_err());
    }
}
