use crate::models::{ApiError, ChannelPage};
use crate::services::channel_resolver::ChannelResolver;
use crate::AppState;
use log::info;
use rocket::serde::json::Json;
use rocket::{get, FromForm, State};

#[derive(Debug, FromForm)]
pub struct ChannelParams {
    pub q: Option<String>,
    #[field(name = "channelId")]
    pub channel_id: Option<String>,
    pub id: Option<String>,
}

impl ChannelParams {
    /// `channelId` wins over its `id` alias.
    fn requested_id(&self) -> Option<&str> {
        [&self.channel_id, &self.id]
            .into_iter()
            .flatten()
            .map(|id| id.trim())
            .find(|id| !id.is_empty())
    }

    fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[get("/channel?<params..>")]
pub async fn get_channel(
    params: ChannelParams,
    state: &State<AppState>,
) -> Result<Json<ChannelPage>, ApiError> {
    let query = params.query();
    let channel_id = params.requested_id();
    info!("Channel lookup: query={query:?} id={channel_id:?}");

    if query.is_none() && channel_id.is_none() {
        return Err(ApiError::bad_request("Channel query or ID is required"));
    }

    let page = ChannelResolver::new(state.fetcher.as_ref(), &state.config)
        .resolve(query, channel_id)
        .await
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    info!(
        "Returning channel {} with {} videos",
        page.channel.name,
        page.videos.len()
    );
    Ok(Json(page))
}
