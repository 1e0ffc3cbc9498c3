mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app.client.get(app.api("/journalists/profiles")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() -> Result<()> {
    let app = common::spawn_app().await?;
    let other = common::spawn_app_with(|c| c.security.jwt_secret = "another-secret".into()).await?;

    let foreign_token = other.token_for(Uuid::new_v4());
    let res = app.get(&foreign_token, "/me").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

/// Scenario A
#[tokio::test]
async fn user_without_org_gets_no_org() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.token_for(Uuid::new_v4());

    let res = app.get(&token, "/journalists/profiles").send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body: Value = res.json().await?;
    assert_eq!(
        body,
        serde_json::json!({
            "success": false,
            "error": {"code": "NO_ORG", "message": "User has no organization"}
        })
    );
    Ok(())
}

#[tokio::test]
async fn me_reports_resolved_org() -> Result<()> {
    let app = common::spawn_app().await?;
    let (org_id, token) = app.new_org().await;

    let body: Value = app.get(&token, "/me").send().await?.json().await?;
    assert_eq!(body["data"]["org_id"], org_id.to_string());
    Ok(())
}
