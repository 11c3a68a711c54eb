//! Temp Cover API server binary.
//!
//! Connects to PostgreSQL, applies migrations, optionally bootstraps the
//! first admin account and serves the HTTP API.

use std::path::PathBuf;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "tcv_api_server", about = "Temp Cover API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/tempcover"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Directory holding `pdf/` templates, static documents and `fonts/`.
    #[arg(long, env = "ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Email of the admin created when the admins table is empty.
    #[arg(long, env = "ADMIN_EMAIL", requires = "admin_password")]
    admin_email: Option<String>,

    /// Password of the bootstrap admin.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,tcv_api=debug,tcv_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = tcv_api::config::ApiConfig::from_env();
    config.bind_addr = format!("0.0.0.0:{}", args.port);
    config.database_url = args.database_url;
    if let Some(dir) = args.assets_dir {
        config.documents.assets_dir = dir;
    }

    info!(
        port = args.port,
        max_connections = args.max_connections,
        assets_dir = %config.documents.assets_dir.display(),
        smtp = config.smtp.is_some(),
        uploads = config.cloudinary.is_some(),
        "starting tcv_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    tcv_api::migrate(&pool).await?;

    if let (Some(email), Some(password)) = (args.admin_email, args.admin_password) {
        tcv_api::services::auth::bootstrap_admin(&pool, &email, &password).await?;
    }

    let state = tcv_api::AppState::new(pool, config.clone())?;

    // Placement tables are tied to the shipped templates; report drift early.
    for problem in state.documents.renderer().validate_templates() {
        warn!(%problem, "document template check failed");
    }

    let app = tcv_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
