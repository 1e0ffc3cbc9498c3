#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use uuid::Uuid;

use pravado_api::auth::{generate_jwt, Claims};
use pravado_api::config::AppConfig;
use pravado_api::database::MemoryStore;
use pravado_api::services::PlanCatalogue;
use pravado_api::{build_router, AppState};

/// A router instance served on an ephemeral port, backed by a fresh `MemoryStore`
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(|_| {}).await
}

/// Spawn with a tweaked config. Development defaults apply otherwise.
pub async fn spawn_app_with<F>(configure: F) -> Result<TestApp>
where
    F: FnOnce(&mut AppConfig),
{
    let mut config = AppConfig::from_lookup(|_| None);
    configure(&mut config);

    let store = Arc::new(MemoryStore::new());
    let catalogue = PlanCatalogue::builtin().context("builtin plan catalogue")?;
    let state = AppState::new(config.clone(), store.clone(), store.clone(), catalogue);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server exited: {}", e);
        }
    });

    Ok(TestApp {
        base_url: format!("http://{}", addr),
        client: Client::new(),
        store,
        config,
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        let claims = Claims::new(user_id, 1);
        generate_jwt(&claims, &self.config.security).expect("failed to mint test token")
    }

    /// New user who belongs to `org_id`, with a bearer token
    pub async fn member_of(&self, org_id: Uuid) -> String {
        let user_id = Uuid::new_v4();
        self.store.add_member(org_id, user_id).await;
        self.token_for(user_id)
    }

    /// New org with one member
    pub async fn new_org(&self) -> (Uuid, String) {
        let org_id = Uuid::new_v4();
        let token = self.member_of(org_id).await;
        (org_id, token)
    }

    pub fn get(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.get(self.api(path)).bearer_auth(token)
    }

    pub fn post(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.post(self.api(path)).bearer_auth(token)
    }

    pub fn patch(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.patch(self.api(path)).bearer_auth(token)
    }

    pub fn delete(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.delete(self.api(path)).bearer_auth(token)
    }
}
