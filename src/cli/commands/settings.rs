use clap::Subcommand;
use serde_json::json;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::SettingInput;

#[derive(Subcommand)]
pub enum SettingsCommands {
    #[command(about = "List system settings (admin)")]
    List,

    #[command(about = "Create or update one setting (admin)")]
    Set {
        #[arg(help = "Setting key, e.g. max_pets_free")]
        key: String,
        #[arg(help = "New value")]
        value: String,
        #[arg(long, help = "Description shown in the admin UI")]
        description: Option<String>,
        #[arg(long, help = "Category, e.g. ai, billing, limits")]
        category: Option<String>,
    },

    #[command(about = "Insert any missing default settings (admin)")]
    Seed,
}

pub async fn handle(cmd: SettingsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_environment_config()?.client()?;

    match cmd {
        SettingsCommands::List => {
            let settings = client.settings().await?;
            output_collection(&output_format, "settings", &settings, |s| {
                format!(
                    "{:<10} {:<24} = {}",
                    s.category.as_deref().unwrap_or("-"),
                    s.key,
                    s.value
                )
            })
        }
        SettingsCommands::Set { key, value, description, category } => {
            let input = SettingInput { key, value, description, category };
            let saved = client.update_settings(std::slice::from_ref(&input)).await?;
            output_success(
                &output_format,
                &format!("Set {} = {}", input.key, input.value),
                Some(json!({ "settings": saved })),
            )
        }
        SettingsCommands::Seed => {
            let inserted = client.seed_settings().await?;
            output_success(
                &output_format,
                &format!("Seeded default settings ({} inserted)", inserted),
                Some(json!({ "inserted": inserted })),
            )
        }
    }
}
