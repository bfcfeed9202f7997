use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::Responder;
use rocket::serde::{Deserialize, Serialize};
use rocket::{response, Response};
use serde_json::Value;
use std::io::Cursor;

pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";
pub const UNTITLED: &str = "Untitled";
pub const DEFAULT_AVATAR_URL: &str =
    "https://yt3.ggpht.com/a/default-user=s88-c-k-c0x00ffffff-no-rj";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Video,
    Channel,
}

/// A video (or channel entry inside a mixed search list).
///
/// Optional fields always serialize, as `null` when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub channel_title: String,
    pub channel_id: String,
    pub channel_avatar_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<String>,
    pub view_count: Option<String>,
    pub published_at: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<String>,
}

impl VideoRecord {
    /// A record where only the id is known.
    pub fn placeholder(id: &str, title: &str, channel_title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            channel_title: channel_title.to_string(),
            channel_id: String::new(),
            channel_avatar_url: None,
            thumbnail_url: None,
            duration: None,
            view_count: None,
            published_at: None,
            kind: RecordKind::Video,
            subscriber_count: None,
            video_count: None,
        }
    }

    pub fn is_channel(&self) -> bool {
        self.kind == RecordKind::Channel
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub channel_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub description: String,
    pub subscriber_count: String,
    pub video_count: String,
}

impl ChannelRecord {
    pub fn unknown(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            name: UNKNOWN_CHANNEL.to_string(),
            ..Default::default()
        }
    }

    pub fn has_known_name(&self) -> bool {
        !self.name.is_empty() && self.name != UNKNOWN_CHANNEL
    }

    /// Keeps every field `self` already has and backfills the empty ones
    /// from `other`.
    pub fn backfill_from(self, other: &ChannelRecord) -> ChannelRecord {
        fn pick(own: String, other: &str) -> String {
            if own.is_empty() {
                other.to_string()
            } else {
                own
            }
        }

        let name = if self.has_known_name() || (!other.has_known_name() && !self.name.is_empty())
        {
            self.name
        } else {
            other.name.clone()
        };

        ChannelRecord {
            channel_id: pick(self.channel_id, &other.channel_id),
            name,
            avatar_url: self.avatar_url.or_else(|| other.avatar_url.clone()),
            description: pick(self.description, &other.description),
            subscriber_count: pick(self.subscriber_count, &other.subscriber_count),
            video_count: pick(self.video_count, &other.video_count),
        }
    }
}

/// A channel together with the videos scraped from its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPage {
    pub channel: ChannelRecord,
    pub videos: Vec<VideoRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQueryLog {
    pub id: String,
    pub query: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStrategy {
    Invidious,
    Proxy,
    Oembed,
    Direct,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvidiousStreams {
    pub invidious_instance: String,
    pub video_streams: Vec<Value>,
    pub adaptive_formats: Vec<Value>,
}

/// Outcome of the video source fallback chain. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlaybackSource {
    pub strategy: PlaybackStrategy,
    pub endpoint_or_instance: String,
    #[serde(flatten)]
    pub video: VideoRecord,
    #[serde(flatten)]
    pub invidious: Option<InvidiousStreams>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proxy_methods: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub use_invidious: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub use_proxy: bool,
}

impl ResolvedPlaybackSource {
    pub fn new(strategy: PlaybackStrategy, endpoint: String, video: VideoRecord) -> Self {
        Self {
            strategy,
            endpoint_or_instance: endpoint,
            video,
            invidious: None,
            proxy_methods: Vec::new(),
            use_invidious: strategy == PlaybackStrategy::Invidious,
            use_proxy: strategy == PlaybackStrategy::Proxy,
        }
    }

    /// True when the chain found real metadata, not just the bare id.
    pub fn has_metadata(&self) -> bool {
        self.strategy != PlaybackStrategy::Direct
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub videos: Vec<VideoRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<VideoRecord>>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: Status, error: impl Into<String>) -> Self {
        Self {
            status: status.code,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(Status::NotFound, error)
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(Status::InternalServerError, error)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = Status::from_code(self.status).unwrap_or(Status::InternalServerError);
        let json = serde_json::to_string(&self).map_err(|_| Status::InternalServerError)?;
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
