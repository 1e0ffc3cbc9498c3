use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pravado_api::auth::{generate_jwt, Claims};
use pravado_api::config::AppConfig;
use pravado_api::database::{MemoryStore, MembershipStore, PgStore, RecordStore};
use pravado_api::services::PlanCatalogue;
use pravado_api::{build_router, AppState};

#[derive(Parser)]
#[command(name = "pravado-api", version, about = "Org-scoped Pravado HTTP API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Mint a bearer token for a user id
    Token {
        #[arg(long)]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET etc. are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Token { user } => {
            let claims = Claims::new(user, config.security.jwt_expiry_hours);
            let token = generate_jwt(&claims, &config.security)?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("Starting Pravado API in {:?} mode", config.environment);

    if config.is_production() && config.database.url.is_none() {
        anyhow::bail!("DATABASE_URL is required in production");
    }
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in {:?}", config.environment);
    }

    let catalogue = PlanCatalogue::load(config.billing.plans_file.as_deref()).context("loading plan catalogue")?;

    let (records, memberships) = if config.database.url.is_some() {
        let store = Arc::new(PgStore::connect(&config.database).await.context("connecting to database")?);
        store_handles(store)
    } else {
        tracing::warn!("DATABASE_URL not set, using in-memory store");
        store_handles(Arc::new(MemoryStore::new()))
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, records, memberships, catalogue);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Pravado API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn store_handles<S>(store: Arc<S>) -> (Arc<dyn RecordStore>, Arc<dyn MembershipStore>)
where
    S: RecordStore + MembershipStore + 'static,
{
    let records: Arc<dyn RecordStore> = store.clone();
    let memberships: Arc<dyn MembershipStore> = store;
    (records, memberships)
}
