mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn disabled_group_is_not_registered() -> Result<()> {
    let app = common::spawn_app_with(|c| c.features.billing = false).await?;
    let (_, token) = app.new_org().await;

    let res = app.get(&token, "/billing/plans").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Other groups are unaffected
    let res = app.get(&token, "/journalists/profiles").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn disabled_group_404s_before_auth() -> Result<()> {
    let app = common::spawn_app_with(|c| c.features.governance = false).await?;

    let res = app.client.get(app.api("/governance/policies")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn outreach_flag_also_gates_tracking_webhook() -> Result<()> {
    let app = common::spawn_app_with(|c| c.features.outreach = false).await?;

    let res = app
        .client
        .post(app.api("/webhooks/track"))
        .json(&json!({"eventId": "evt-1", "eventType": "open"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    Ok(())
}
