use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::{SubscriptionTier, UserPatch};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List accounts (admin)")]
    List,

    #[command(about = "Change a user's admin flag or subscription tier (admin)")]
    Update {
        #[arg(help = "User id")]
        id: Uuid,
        #[arg(long, help = "Grant or revoke admin access")]
        admin: Option<bool>,
        #[arg(long, value_parser = parse_tier, help = "free or premium")]
        tier: Option<SubscriptionTier>,
    },
}

fn parse_tier(raw: &str) -> Result<SubscriptionTier, String> {
    SubscriptionTier::parse(raw).ok_or_else(|| format!("unknown tier '{}', expected free or premium", raw))
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_environment_config()?.client()?;

    match cmd {
        UserCommands::List => {
            let users = client.users().await?;
            output_collection(&output_format, "users", &users, |u| {
                format!(
                    "{} {:<28} {:<8}{}",
                    u.id,
                    u.email,
                    u.subscription_tier,
                    if u.is_admin { " [admin]" } else { "" }
                )
            })
        }
        UserCommands::Update { id, admin, tier } => {
            let patch = UserPatch {
                is_admin: admin,
                subscription_tier: tier,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update, pass --admin and/or --tier");
            }
            let user = client.update_user(id, &patch).await?;
            output_success(
                &output_format,
                &format!("Updated {}", user.email),
                Some(json!({ "user": user })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parser_accepts_known_tiers() {
        assert_eq!(parse_tier("premium").unwrap(), SubscriptionTier::Premium);
        assert!(parse_tier("gold").is_err());
    }
}
