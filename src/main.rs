use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forkful::config::{Cli, Config};
use forkful::state::AppState;
use forkful::{db, uploads};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directories exist
    std::fs::create_dir_all(config.uploads_path().join(uploads::PROFILE_DIR))?;
    std::fs::create_dir_all(config.uploads_path().join(uploads::RECIPE_DIR))?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // One-shot admin promotion, then exit
    if let Some(ref email) = cli.promote_admin {
        let conn = pool.get()?;
        match db::users::find_by_email(&conn, email)? {
            Some(user) => {
                db::users::set_admin(&conn, user.id, true)?;
                tracing::info!("Granted admin to {} ({})", user.username, email);
            }
            None => anyhow::bail!("no user with email {email}"),
        }
        return Ok(());
    }

    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    let app = forkful::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
