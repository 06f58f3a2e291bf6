mod common;

use std::time::Duration;

use anyhow::Result;
use pawcare_api::client::{ApiClient, ClientError, EntitlementCache};
use pawcare_api::features::BulkAction;

#[tokio::test]
async fn api_client_drives_admin_flows() -> Result<()> {
    let server = common::start_server().await?;

    let anonymous = ApiClient::new(&server.base_url)?;
    let login = anonymous.login(common::ADMIN_EMAIL, common::ADMIN_PASSWORD).await?;
    assert!(login.user.is_admin);

    let client = anonymous.with_token(Some(login.token));
    let outcome = client.bulk(BulkAction::EnableAllNonCore).await?;
    assert_eq!(outcome.disabled_count, 0);

    let features = client.features(None).await?;
    assert!(features.iter().any(|f| f.name == "ai-vet"));

    match client.set_feature("dashboard", None, false).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Core features cannot be disabled");
        }
        other => panic!("expected a 400, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn entitlement_cache_reads_live_features() -> Result<()> {
    let server = common::start_server().await?;
    let token = server.admin_token().await?;
    let client = ApiClient::new(&server.base_url)?.with_token(Some(token));
    client.set_feature("expenses", None, true).await?;

    let mut cache = EntitlementCache::new(client, Duration::from_secs(300));
    cache.load_features().await;
    assert!(cache.is_feature_enabled("expenses"));
    assert!(!cache.is_feature_enabled("stories"));
    assert!(!cache.is_fallback());
    Ok(())
}

#[tokio::test]
async fn entitlement_cache_falls_back_when_server_is_down() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let client = ApiClient::new(format!("http://127.0.0.1:{}", port))?.with_token(Some("t".into()));

    let mut cache = EntitlementCache::new(client, Duration::from_secs(300));
    let features = cache.load_features().await;
    assert!(cache.is_fallback());
    assert!(features.contains("reminders"));
    assert!(cache.is_feature_enabled("dashboard"));
    Ok(())
}
