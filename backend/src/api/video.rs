use crate::models::{ApiError, ResolvedPlaybackSource, VideoRecord};
use crate::services::video_resolver::VideoSourceResolver;
use crate::utils::is_video_id;
use crate::AppState;
use log::{error, info, warn};
use rocket::serde::json::Json;
use rocket::{get, State};
use serde_json::Value;

fn prefers_bypass(method: Option<&str>) -> bool {
    matches!(method, Some("invidious") | Some("proxy") | Some("bypass"))
}

/// Path ids go into upstream URLs, so anything malformed stops here.
fn require_video_id(id: &str) -> Result<(), ApiError> {
    if is_video_id(id) {
        Ok(())
    } else {
        warn!("Rejected malformed video id {id:?}");
        Err(ApiError::not_found("Video not found"))
    }
}

#[get("/video/<id>?<method>")]
pub async fn get_video(
    id: &str,
    method: Option<String>,
    state: &State<AppState>,
) -> Result<Json<VideoRecord>, ApiError> {
    require_video_id(id)?;
    if let Some(video) = state.store.get_video(id).await {
        info!("Serving {id} from the store");
        return Ok(Json(video));
    }

    let resolver = VideoSourceResolver::new(state.fetcher.as_ref(), &state.config);
    match resolver.resolve(id, prefers_bypass(method.as_deref())).await {
        Ok(source) if source.has_metadata() => {
            state.store.put_video(source.video.clone()).await;
            Ok(Json(source.video))
        }
        Ok(_) => Err(ApiError::not_found("Video not found")),
        Err(e) => {
            warn!("Video {id} could not be resolved: {e}");
            Err(ApiError::not_found("Video not found").with_details(e))
        }
    }
}

/// Raw oEmbed payload plus the uploader avatar scraped from the watch page.
#[get("/oembed/<id>")]
pub async fn get_oembed(id: &str, state: &State<AppState>) -> Result<Json<Value>, ApiError> {
    require_video_id(id)?;
    let resolver = VideoSourceResolver::new(state.fetcher.as_ref(), &state.config);
    let mut data = resolver.fetch_oembed(id).await.map_err(|e| {
        error!("oEmbed fetch error for {id}: {e}");
        ApiError::internal("Failed to fetch video embed data").with_details(e)
    })?;

    let has_content = data.get("title").is_some() || data.get("author_name").is_some();
    let avatar = if has_content {
        resolver.discover_channel_avatar(id).await
    } else {
        None
    };

    match data.as_object_mut() {
        Some(object) => {
            object.insert("channelAvatarUrl".to_string(), avatar.into());
            Ok(Json(data))
        }
        None => Err(ApiError::internal("Failed to fetch video embed data")
            .with_details("oEmbed response is not an object")),
    }
}

#[get("/invidious/<id>")]
pub async fn get_invidious(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<ResolvedPlaybackSource>, ApiError> {
    require_video_id(id)?;
    VideoSourceResolver::new(state.fetcher.as_ref(), &state.config)
        .resolve(id, true)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Invidious fetch error for {id}: {e}");
            ApiError::internal("Failed to fetch video from Invidious").with_details(e)
        })
}

#[get("/proxy/<id>")]
pub async fn get_proxy(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<ResolvedPlaybackSource>, ApiError> {
    require_video_id(id)?;
    let resolver = VideoSourceResolver::new(state.fetcher.as_ref(), &state.config);
    let mut source = resolver.resolve_proxy(id).await;
    if let Some(avatar) = resolver.discover_channel_avatar(id).await {
        source.video.channel_avatar_url = Some(avatar);
    }
    Ok(Json(source))
}
