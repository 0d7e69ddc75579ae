mod app;
mod config;
mod db;
mod error;
mod logging;
mod middleware;
mod response;
mod state;
mod users;
mod validation;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = logging::init_tracing();

    let app_state = AppState::init(AppConfig::from_env()?).await?;
    let addr = app_state.config.listen_addr();
    let db = app_state.db.clone();

    let result = app::serve(app::build_app(app_state), &addr).await;

    db.close().await;
    tracing::info!("database closed");
    result
}
