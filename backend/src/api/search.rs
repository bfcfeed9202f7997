use crate::models::{ApiError, SearchQueryLog, SearchResponse};
use crate::services::search_service::{self, parse_page, SearchFilter};
use crate::AppState;
use log::{debug, error};
use rocket::serde::json::Json;
use rocket::{get, State};

#[get("/search?<q>&<method>&<filter>&<page>")]
pub async fn search_videos(
    q: Option<String>,
    method: Option<String>,
    filter: Option<String>,
    page: Option<String>,
    state: &State<AppState>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter is required"))?;

    // only scraping is implemented
    if let Some(method) = &method {
        debug!("Search method '{method}' requested, scraping");
    }

    search_service::search(
        state.fetcher.as_ref(),
        &state.config,
        &state.store,
        query,
        SearchFilter::parse(filter.as_deref()),
        parse_page(page.as_deref()),
    )
    .await
    .map(Json)
    .map_err(|e| {
        error!("Search error: {e}");
        ApiError::internal("Failed to search videos").with_details(e)
    })
}

#[get("/searches/recent")]
pub async fn recent_searches(state: &State<AppState>) -> Json<Vec<SearchQueryLog>> {
    Json(state.store.recent_searches().await)
}
