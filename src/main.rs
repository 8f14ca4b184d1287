use std::sync::Arc;

use rail_booking::api::service::{router, AuthTokens, State};
use rail_booking::config::{Config, REQUIRED_VARIABLES};
use rail_booking::core::booking::BookingManager;
use rail_booking::core::planner::Planner;
use rail_booking::core::schedule::ScheduleStore;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{e}");
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::env().inspect_err(|e| {
        log::error!(
            "config: {e}. Check all required environment variables ({}) are set.",
            REQUIRED_VARIABLES.join(", ")
        );
    })?;

    config.log();

    let store = Arc::new(ScheduleStore::load(&config.schedule_path)?);
    log::info!(
        "Loaded schedule ({} trains) from {}",
        store.trains().count(),
        config.schedule_path
    );

    let planner = Arc::new(Planner::new(
        Arc::clone(&store),
        config.transfer_buffer_min,
        config.fare_per_km,
    ));
    let engine = Arc::new(BookingManager::new(Arc::clone(&store), config.fare_per_km));

    let state = State::new(
        store,
        planner,
        engine,
        AuthTokens {
            api_token: config.api_token.into(),
            admin_token: config.admin_token.into(),
        },
    );

    let listen_addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;

    let router = router::router(state);

    log::info!("Listening on {listen_addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
