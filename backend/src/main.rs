#[macro_use]
extern crate rocket;

mod api;
mod config;
mod error;
mod models;
mod services;
mod utils;

use crate::config::{create_app_state, create_cors, init_logger, load_environment, AppConfig};
use crate::services::fetcher::PageFetcher;
use crate::services::store::MemoryStore;
use rocket::{Build, Rocket};
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub fetcher: Arc<dyn PageFetcher>,
    pub store: MemoryStore,
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build().manage(state).mount(
        "/api",
        routes![
            api::search_videos,
            api::recent_searches,
            api::get_video,
            api::get_oembed,
            api::get_invidious,
            api::get_proxy,
            api::get_channel,
        ],
    )
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    load_environment();
    init_logger();

    let state = create_app_state()?;
    let cors = create_cors()?;

    build_rocket(state)
        .attach(cors)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed: {}", e))?;
    Ok(())
}

#[cfg(test)]
pub async fn test_client(
    fetcher: services::fetcher::testing::StubFetcher,
) -> (
    rocket::local::asynchronous::Client,
    Arc<services::fetcher::testing::StubFetcher>,
) {
    let fetcher = Arc::new(fetcher);
    let state = AppState::new(AppConfig::default(), fetcher.clone());
    let client = rocket::local::asynchronous::Client::tracked(build_rocket(state))
        .await
        .expect("valid rocket instance");
    (client, fetcher)
}
