mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Scenario C
#[tokio::test]
async fn deleting_another_orgs_policy_is_not_found() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, owner) = app.new_org().await;
    let (_, intruder) = app.new_org().await;

    let created: Value = app
        .post(&owner, "/governance/policies")
        .json(&json!({"name": "Embargo", "category": "compliance", "severity": "high"}))
        .send()
        .await?
        .json()
        .await?;
    let id = created["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = app.delete(&intruder, &format!("/governance/policies/{}", id)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "POLICY_NOT_FOUND");

    let res = app.get(&owner, &format!("/governance/policies/{}", id)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.delete(&owner, &format!("/governance/policies/{}", id)).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn listings_only_show_own_org() -> Result<()> {
    let app = common::spawn_app().await?;
    let (org_a, token_a) = app.new_org().await;
    let (_, token_b) = app.new_org().await;
    let colleague = app.member_of(org_a).await;

    let res = app
        .post(&token_a, "/journalists/profiles")
        .json(&json!({"name": "Ada Reporter", "beats": ["tech"]}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let mine: Value = app.get(&colleague, "/journalists/profiles").send().await?.json().await?;
    assert_eq!(mine["data"].as_array().map(Vec::len), Some(1));

    let theirs: Value = app.get(&token_b, "/journalists/profiles").send().await?.json().await?;
    assert_eq!(theirs["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn patch_ignores_null_fields() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, token) = app.new_org().await;

    let created: Value = app
        .post(&token, "/journalists/profiles")
        .json(&json!({"name": "Ada", "outlet": "Wire"}))
        .send()
        .await?
        .json()
        .await?;
    let id = created["data"]["id"].as_str().unwrap_or_default().to_string();

    let updated: Value = app
        .patch(&token, &format!("/journalists/profiles/{}", id))
        .json(&json!({"outlet": null, "notes": "prefers email"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(updated["data"]["outlet"], "Wire");
    assert_eq!(updated["data"]["notes"], "prefers email");
    Ok(())
}
