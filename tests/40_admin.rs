mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn admin_features(server: &common::TestServer, token: &str) -> Result<Vec<Value>> {
    let body: Value = server
        .client
        .get(server.url("/api/admin/features"))
        .bearer_auth(token)
        .send()
        .await?
        .json()
        .await?;
    body.as_array().cloned().context("expected an array of features")
}

#[tokio::test]
async fn patching_a_core_feature_off_is_rejected() -> Result<()> {
    let server = common::start_server().await?;
    let token = server.admin_token().await?;

    let features = admin_features(&server, &token).await?;
    let dashboard = features
        .iter()
        .find(|f| f["name"] == "dashboard")
        .context("dashboard row")?;
    let id = dashboard["id"].as_str().context("id")?;

    let res = server
        .client
        .patch(server.url(&format!("/api/admin/features/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "isEnabled": false }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "error": "Core features cannot be disabled" })
    );

    let after = admin_features(&server, &token).await?;
    let dashboard = after.iter().find(|f| f["name"] == "dashboard").context("dashboard row")?;
    assert_eq!(dashboard["isEnabled"], true);
    Ok(())
}

#[tokio::test]
async fn bulk_actions_report_row_counts() -> Result<()> {
    let server = common::start_server().await?;
    let token = server.admin_token().await?;
    let total = admin_features(&server, &token).await?.len() as u64;

    let bulk = |action: &'static str| {
        server
            .client
            .post(server.url("/api/admin/features/bulk"))
            .bearer_auth(&token)
            .json(&json!({ "action": action }))
            .send()
    };

    let body: Value = bulk("enable-all-non-core").await?.json().await?;
    assert_eq!(body, json!({ "enabledCount": total, "disabledCount": 0 }));

    let body: Value = bulk("reset-to-defaults").await?.json().await?;
    assert_eq!(body, json!({ "enabledCount": 4, "disabledCount": total - 4 }));

    let res = bulk("explode").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn settings_are_seeded_and_editable() -> Result<()> {
    let server = common::start_server().await?;
    let token = server.admin_token().await?;

    let body: Value = server
        .client
        .get(server.url("/api/admin/settings"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let settings = body["settings"].as_array().context("settings array")?;
    assert_eq!(settings.len(), 6);

    let res = server
        .client
        .post(server.url("/api/admin/settings"))
        .bearer_auth(&token)
        .json(&json!({ "settings": [{ "key": "ai_daily_limit_free", "value": "10", "category": "ai" }] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .put(server.url("/api/admin/settings"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["inserted"], 0);
    Ok(())
}
