use std::time::Duration;

use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::client::EntitlementCache;
use crate::features::BulkAction;

#[derive(Subcommand)]
pub enum FeatureCommands {
    #[command(about = "List features enabled for you (or another user, admins only)")]
    List {
        #[arg(long, help = "User id to resolve overrides for")]
        user: Option<Uuid>,
    },

    #[command(about = "Check whether one feature is enabled for the current session")]
    Check {
        #[arg(help = "Feature name, e.g. ai-vet")]
        name: String,
    },

    #[command(about = "Show the tier limits for the current session")]
    Limits,

    #[command(about = "List every feature row with its global flag (admin)")]
    All,

    #[command(about = "Enable a feature globally or for one user (admin)")]
    Enable {
        #[arg(help = "Feature name")]
        name: String,
        #[arg(long, help = "Only for this user id")]
        user: Option<Uuid>,
    },

    #[command(about = "Disable a feature globally or for one user (admin)")]
    Disable {
        #[arg(help = "Feature name")]
        name: String,
        #[arg(long, help = "Only for this user id")]
        user: Option<Uuid>,
    },

    #[command(about = "Remove a user's override so they follow the global flag (admin)")]
    Clear {
        #[arg(help = "Feature name")]
        name: String,
        #[arg(long, help = "User id")]
        user: Uuid,
    },

    #[command(about = "Set the global flag of a feature row by id (admin)")]
    Set {
        #[arg(help = "Feature id")]
        id: Uuid,
        #[arg(long, action = clap::ArgAction::Set, help = "true or false")]
        enabled: bool,
    },

    #[command(about = "Delete a non-core feature row by id (admin)")]
    Delete {
        #[arg(help = "Feature id")]
        id: Uuid,
    },

    #[command(about = "Apply enable-all-non-core, disable-all-optional or reset-to-defaults (admin)")]
    Bulk {
        #[arg(help = "Bulk action name")]
        action: String,
    },

    #[command(about = "Seed missing registry features (admin)")]
    Init,
}

pub async fn handle(cmd: FeatureCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let env_config = load_environment_config()?;
    let client = env_config.client()?;

    match cmd {
        FeatureCommands::List { user } => {
            let features = client.features(user).await?;
            output_collection(&output_format, "features", &features, |f| {
                format!("{} {:<16} {}", check_mark(f.is_enabled), f.name, f.display_name)
            })
        }
        FeatureCommands::Check { name } => {
            let ttl = Duration::from_secs(crate::config::config().features.client_cache_ttl_secs);
            let mut cache = EntitlementCache::new(client, ttl);
            cache.set_user(env_config.session.as_ref().map(|s| s.user_id));
            cache.load_features().await;

            let enabled = cache.is_feature_enabled(&name);
            match output_format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "feature": name,
                        "enabled": enabled,
                        "fallback": cache.is_fallback(),
                    }))?
                ),
                OutputFormat::Text => {
                    let suffix = if cache.is_fallback() { " (server unreachable, using defaults)" } else { "" };
                    println!("{} {}{}", check_mark(enabled), name, suffix);
                }
            }
            Ok(())
        }
        FeatureCommands::Limits => {
            let body = client.limits().await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body)?),
                OutputFormat::Text => {
                    let limits = &body["limits"];
                    println!("Tier: {}", limits["tier"].as_str().unwrap_or("-"));
                    println!("AI enabled: {}", limits["aiEnabled"].as_bool().unwrap_or(false));
                    println!("AI questions per day: {}", limits["aiDailyLimit"]);
                    println!("Max pets: {}", limits["maxPets"]);
                }
            }
            Ok(())
        }
        FeatureCommands::All => {
            let features = client.admin_features().await?;
            output_collection(&output_format, "features", &features, |f| {
                format!(
                    "{} {:<16} {:<12} {}{}",
                    check_mark(f.is_enabled),
                    f.name,
                    f.category,
                    f.id,
                    if f.is_core { " (core)" } else { "" }
                )
            })
        }
        FeatureCommands::Enable { name, user } => {
            client.set_feature(&name, user, true).await?;
            output_success(&output_format, &toggle_message(&name, user, true), None)
        }
        FeatureCommands::Disable { name, user } => {
            client.set_feature(&name, user, false).await?;
            output_success(&output_format, &toggle_message(&name, user, false), None)
        }
        FeatureCommands::Clear { name, user } => {
            let removed = client.clear_override(&name, user).await?;
            let message = if removed {
                format!("Cleared override for '{}' (user {})", name, user)
            } else {
                format!("User {} had no override for '{}'", user, name)
            };
            output_success(&output_format, &message, Some(json!({ "removed": removed })))
        }
        FeatureCommands::Set { id, enabled } => {
            let feature = client.patch_feature(id, enabled).await?;
            output_success(
                &output_format,
                &format!("Feature '{}' is now {}", feature.name, if feature.is_enabled { "enabled" } else { "disabled" }),
                Some(json!({ "feature": feature })),
            )
        }
        FeatureCommands::Delete { id } => {
            client.delete_feature(id).await?;
            output_success(&output_format, &format!("Feature {} deleted", id), None)
        }
        FeatureCommands::Bulk { action } => {
            let action: BulkAction = action.parse()?;
            let outcome = client.bulk(action).await?;
            output_success(
                &output_format,
                &format!(
                    "Applied '{}': {} enabled, {} disabled",
                    action.as_str(),
                    outcome.enabled_count,
                    outcome.disabled_count
                ),
                Some(json!({ "enabledCount": outcome.enabled_count, "disabledCount": outcome.disabled_count })),
            )
        }
        FeatureCommands::Init => {
            let inserted = client.initialize_features().await?;
            output_success(
                &output_format,
                &format!("Initialized features ({} inserted)", inserted),
                Some(json!({ "inserted": inserted })),
            )
        }
    }
}

fn toggle_message(name: &str, user: Option<Uuid>, enabled: bool) -> String {
    let verb = if enabled { "Enabled" } else { "Disabled" };
    match user {
        Some(user) => format!("{} '{}' for user {}", verb, name, user),
        None => format!("{} '{}' globally", verb, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_messages_name_the_scope() {
        assert_eq!(toggle_message("expenses", None, true), "Enabled 'expenses' globally");
        let user = Uuid::nil();
        assert_eq!(
            toggle_message("ai-vet", Some(user), false),
            format!("Disabled 'ai-vet' for user {}", user)
        );
    }
}
