use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::{bb8::Pool, AsyncDieselConnectionManager};
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use shared::permissions::{uniform_permissions, ADMIN_ROLE};
use tracing::info;
use tracing_subscriber::EnvFilter;

use erp_service::api::{self, AppState};
use erp_service::auth::hash_password;
use erp_service::config::{AppConfig, Args};
use erp_service::models::{User, UserData};
use erp_service::sefaz::SimulatedSefaz;
use erp_service::store::{MemoryStore, PgStore, Storage};
use erp_service::sweeper::Sweeper;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

async fn open_store(args: &Args) -> Result<Arc<dyn Storage>> {
    let Some(url) = &args.database_url else {
        info!("DATABASE_URL not set, keeping data in memory");
        return Ok(Arc::new(MemoryStore::new()));
    };

    info!("Running database migrations...");
    let mut conn = PgConnection::establish(url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    info!("Migrations completed successfully");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
    let pool = Pool::builder().build(manager).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

/// First start: an empty user table gets one administrator.
async fn seed_admin(store: &dyn Storage, args: &Args, config: &AppConfig) -> Result<()> {
    if !store.all::<User>().await?.is_empty() {
        return Ok(());
    }
    let admin = UserData {
        username: args.admin_username.clone(),
        password: hash_password(&args.admin_password, config.password_iterations),
        full_name: "Administrador".into(),
        email: format!("{}@custosmart.local", args.admin_username),
        role: ADMIN_ROLE.into(),
        active: true,
        status: Some("online".into()),
        status_message: None,
        permissions: uniform_permissions(true),
    };
    store.create::<User>(admin).await?;
    info!("Seeded administrator '{}'", args.admin_username);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("erp_service=info,tower_http=info")),
        )
        .init();
    let args = Args::parse();
    let config = AppConfig::from_args(&args);

    let store = open_store(&args).await?;
    seed_admin(store.as_ref(), &args, &config).await?;
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let sweeper = Sweeper::new(
        Arc::clone(&store),
        Duration::from_secs(args.sweep_interval_secs.max(1)),
        args.certificate_warning_days,
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let state = AppState::new(store, config, Arc::new(SimulatedSefaz::new()));
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("ERP service started on port {}", args.port);
    info!("API ready at http://0.0.0.0:{}/api", args.port);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
