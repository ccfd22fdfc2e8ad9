use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use penwright::{
    api::{start_api_server, ApiState},
    auth::seed_roles,
    config::AppConfig,
    mail::{Mailer, TracingMailer},
    observability::{init_logging, log_config_info},
    storage::{create_pool, SqlxRoleRepository},
    APP_NAME, VERSION,
};
use tracing::info;

const CONFIG_FILE: &str = "penwright.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::load(Some(Path::new(CONFIG_FILE))).context("loading configuration")?;
    init_logging(&config.observability).context("initializing logging")?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Penwright");
    log_config_info(&config);

    let pool = create_pool(&config.database).await.context("creating database pool")?;
    let roles = seed_roles(&SqlxRoleRepository::new(pool.clone()))
        .await
        .context("seeding roles")?;
    info!(role_count = roles.len(), "Roles ready");

    let mailer: Arc<dyn Mailer> = Arc::new(TracingMailer::new(config.mail.clone()));
    let state = ApiState::with_sqlx(pool, &config, mailer).context("building API state")?;

    start_api_server(&config.server, state).await.context("running API server")?;
    Ok(())
}
