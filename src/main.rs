//! HTTP server for the clearing module.
//!
//! Endpoints: health, deals, orders, monetary settlements. Configuration
//! comes entirely from the environment (`PORT`, `STATE_FILE`, `DISABLE_AUTH`,
//! `API_KEYS`); a state file, when configured, is loaded on startup and saved
//! after every mutation.

use clearing_engine::api::{self, AppState};
use clearing_engine::persistence::FilePersistence;
use clearing_engine::{ClearingEngine, Config};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let _ = env_logger::try_init();
    let config = Config::from_env();

    let mut state = AppState::new();
    if let Some(path) = &config.state_file {
        let persistence = FilePersistence::new(path);
        match persistence.load() {
            Ok(Some(snapshot)) => {
                log::info!("restored state from {}", path.display());
                state = AppState::with_engine(ClearingEngine::from_snapshot(snapshot));
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("failed to load state file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        state = state.with_persistence(persistence);
    }

    let app = api::create_router_with_state(state, config.auth.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.expect("bind");
    eprintln!("listening on http://{}", addr);
    axum::serve(listener, app.into_make_service())
        .await
        .expect("serve");
}
