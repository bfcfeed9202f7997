use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::models::{
    InvidiousStreams, PlaybackStrategy, ResolvedPlaybackSource, VideoRecord, DEFAULT_AVATAR_URL,
};
use crate::services::fallback::try_in_order;
use crate::services::fetcher::PageFetcher;
use crate::services::json_path::Node;
use crate::utils::{format_relative_age, format_seconds, format_view_count, is_video_id};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde_json::Value;

const PROXY_TITLE: &str = "Video Player";
const PROXY_CHANNEL: &str = "YouTube";

lazy_static! {
    static ref GGPHT_URL_RE: Regex =
        Regex::new(r#"https://yt3\.ggpht\.com/[^"'\s]+"#).expect("ggpht pattern");
    static ref AVATAR_JSON_RE: Regex =
        Regex::new(r#""avatar":\{"thumbnails":\[\{"url":"([^"]+)""#).expect("avatar pattern");
    static ref OWNER_THUMBNAIL_RE: Regex = Regex::new(
        r#""ownerProfileUrl":"[^"]*","thumbnail":\{"thumbnails":\[\{"url":"([^"]+)""#
    )
    .expect("owner thumbnail pattern");
    static ref CHANNEL_ID_JSON_RE: Regex =
        Regex::new(r#""channelId":"([^"]+)""#).expect("channel id pattern");
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}")
}

pub fn proxy_methods(video_id: &str) -> Vec<String> {
    vec![
        format!("https://www.youtube-nocookie.com/embed/{video_id}"),
        format!("https://noembed.com/embed?url=https://www.youtube.com/watch?v={video_id}"),
        format!(
            "https://www.youtube.com/embed/{video_id}?rel=0&modestbranding=1&fs=1&playsinline=1"
        ),
    ]
}

/// Scans a watch page for the uploader's avatar.
///
/// Tiers, in order: a sized `yt3.ggpht.com` URL that is not the default
/// silhouette, an `"avatar":{"thumbnails":[...]}` fragment, and finally the
/// generic placeholder when the page at least names a channel.
pub fn find_channel_avatar(html: &str) -> Option<String> {
    let explicit = GGPHT_URL_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|url| !url.contains("default-user") && url.contains("s88"));
    if let Some(url) = explicit {
        return Some(url.to_string());
    }

    let structured = [&*AVATAR_JSON_RE, &*OWNER_THUMBNAIL_RE]
        .into_iter()
        .find_map(|re| re.captures(html)?.get(1).map(|m| m.as_str().to_string()));
    if structured.is_some() {
        return structured;
    }

    CHANNEL_ID_JSON_RE
        .is_match(html)
        .then(|| DEFAULT_AVATAR_URL.to_string())
}

fn not_a_video_id(video_id: &str, attempts: usize) -> ScrapeError {
    ScrapeError::Exhausted {
        what: "video source".to_string(),
        attempts,
        last_error: format!("{video_id} is not a video id"),
    }
}

/// Resolves a video id to something playable, trying sources in order.
pub struct VideoSourceResolver<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a AppConfig,
}

impl<'a> VideoSourceResolver<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a AppConfig) -> Self {
        Self { fetcher, config }
    }

    /// With `prefer_bypass` the chain is Invidious rotation, then the proxy
    /// embeds. Otherwise it is oEmbed, then a bare embed of the id. The
    /// watch-page avatar lookup runs on top of any source that found metadata.
    /// Anything but a well-formed id is rejected before the first request.
    pub async fn resolve(
        &self,
        video_id: &str,
        prefer_bypass: bool,
    ) -> Result<ResolvedPlaybackSource, ScrapeError> {
        if !is_video_id(video_id) {
            return Err(not_a_video_id(video_id, 0));
        }

        let bypassed = if prefer_bypass {
            match self.resolve_invidious(video_id).await {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!("Invidious unavailable for {video_id}, using proxy embeds: {e}");
                    Some(self.resolve_proxy(video_id).await)
                }
            }
        } else {
            None
        };

        let mut resolved = match bypassed {
            Some(source) => source,
            None => match self.resolve_oembed(video_id).await {
                Ok(source) => source,
                Err(e) => {
                    warn!("oEmbed failed for {video_id}: {e}");
                    self.resolve_direct(video_id)?
                }
            },
        };

        if resolved.has_metadata() {
            self.enrich_avatar(&mut resolved.video).await;
        }
        info!(
            "Resolved {video_id} via {:?} ({})",
            resolved.strategy, resolved.endpoint_or_instance
        );
        Ok(resolved)
    }

    pub async fn resolve_invidious(
        &self,
        video_id: &str,
    ) -> Result<ResolvedPlaybackSource, ScrapeError> {
        try_in_order(
            "Invidious",
            &self.config.invidious_instances,
            |instance| self.fetch_invidious(instance, video_id),
        )
        .await
    }

    async fn fetch_invidious(
        &self,
        instance: &str,
        video_id: &str,
    ) -> Result<ResolvedPlaybackSource, ScrapeError> {
        let url = format!("{instance}/api/v1/videos/{video_id}");
        let data = self.fetcher.fetch_json(&url).await?;
        let root = Node::new(&data);

        let title = root
            .str_at(&["title"])
            .ok_or_else(|| ScrapeError::no_data(format!("{url} returned no title")))?;

        let video = VideoRecord {
            id: video_id.to_string(),
            title: title.to_string(),
            description: root.str_at(&["description"]).map(str::to_string),
            channel_title: root.str_at(&["author"]).unwrap_or_default().to_string(),
            channel_id: root.str_at(&["authorId"]).unwrap_or_default().to_string(),
            channel_avatar_url: root
                .str_at(&["authorThumbnails", "0", "url"])
                .map(str::to_string),
            thumbnail_url: root
                .str_at(&["videoThumbnails", "0", "url"])
                .map(str::to_string),
            duration: root.u64_at(&["lengthSeconds"]).map(format_seconds),
            view_count: root
                .u64_at(&["viewCount"])
                .filter(|views| *views > 0)
                .map(format_view_count),
            published_at: root
                .i64_at(&["published"])
                .filter(|ts| *ts > 0)
                .map(|ts| format_relative_age(ts, chrono::Utc::now().timestamp())),
            ..VideoRecord::placeholder(video_id, "", "")
        };

        let mut source =
            ResolvedPlaybackSource::new(PlaybackStrategy::Invidious, instance.to_string(), video);
        source.invidious = Some(InvidiousStreams {
            invidious_instance: instance.to_string(),
            video_streams: root.array_at(&["formatStreams"]),
            adaptive_formats: root.array_at(&["adaptiveFormats"]),
        });
        Ok(source)
    }

    /// Never fails: oEmbed only decorates the placeholder when it answers.
    pub async fn resolve_proxy(&self, video_id: &str) -> ResolvedPlaybackSource {
        let fallback_thumbnail = format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg");
        let mut video = VideoRecord::placeholder(video_id, PROXY_TITLE, PROXY_CHANNEL);
        video.thumbnail_url = Some(fallback_thumbnail.clone());

        match self.fetch_oembed(video_id).await {
            Ok(data) => {
                let root = Node::new(&data);
                if let Some(title) = root.str_at(&["title"]) {
                    video.title = title.to_string();
                }
                if let Some(author) = root.str_at(&["author_name"]) {
                    video.channel_title = author.to_string();
                }
                video.thumbnail_url = Some(
                    root.str_at(&["thumbnail_url"])
                        .map(str::to_string)
                        .unwrap_or(fallback_thumbnail),
                );
            }
            Err(e) => debug!("No oEmbed data for proxy of {video_id}, keeping defaults: {e}"),
        }

        let methods = proxy_methods(video_id);
        let mut source =
            ResolvedPlaybackSource::new(PlaybackStrategy::Proxy, methods[0].clone(), video);
        source.proxy_methods = methods;
        source
    }

    pub async fn resolve_oembed(
        &self,
        video_id: &str,
    ) -> Result<ResolvedPlaybackSource, ScrapeError> {
        let data = self.fetch_oembed(video_id).await?;
        let root = Node::new(&data);

        let title = root
            .str_at(&["title"])
            .ok_or_else(|| ScrapeError::no_data(format!("oEmbed for {video_id} has no title")))?;

        let mut video = VideoRecord::placeholder(
            video_id,
            title,
            root.str_at(&["author_name"]).unwrap_or_default(),
        );
        video.thumbnail_url = root.str_at(&["thumbnail_url"]).map(str::to_string);

        Ok(ResolvedPlaybackSource::new(
            PlaybackStrategy::Oembed,
            embed_url(video_id),
            video,
        ))
    }

    pub fn resolve_direct(&self, video_id: &str) -> Result<ResolvedPlaybackSource, ScrapeError> {
        if !is_video_id(video_id) {
            return Err(not_a_video_id(video_id, 2));
        }
        Ok(ResolvedPlaybackSource::new(
            PlaybackStrategy::Direct,
            embed_url(video_id),
            VideoRecord::placeholder(video_id, PROXY_TITLE, PROXY_CHANNEL),
        ))
    }

    /// Raw oEmbed JSON for a video.
    pub async fn fetch_oembed(&self, video_id: &str) -> Result<Value, ScrapeError> {
        let base = &self.config.youtube_base_url;
        let url = format!("{base}/oembed?url={base}/watch?v={video_id}&format=json");
        self.fetcher.fetch_json(&url).await
    }

    pub async fn discover_channel_avatar(&self, video_id: &str) -> Option<String> {
        let url = format!("{}/watch?v={video_id}", self.config.youtube_base_url);
        match self.fetcher.fetch_page(&url).await {
            Ok(html) => find_channel_avatar(&html),
            Err(e) => {
                debug!("Could not load watch page for avatar of {video_id}: {e}");
                None
            }
        }
    }

    /// A discovered avatar replaces what the source gave us, except that the
    /// generic placeholder never hides a real one.
    async fn enrich_avatar(&self, video: &mut VideoRecord) {
        match self.discover_channel_avatar(&video.id).await {
            Some(url) if url == DEFAULT_AVATAR_URL => {
                if video.channel_avatar_url.is_none() {
                    video.channel_avatar_url = Some(url);
                }
            }
            Some(url) => video.channel_avatar_url = Some(url),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::testing::StubFetcher;
    use serde_json::json;

    const ID: &str = "dQw4w9WgXcQ";

    fn config() -> AppConfig {
        AppConfig {
            invidious_instances: vec![
                "https://inv1.test".into(),
                "https://inv2.test".into(),
                "https://inv3.test".into(),
                "https://inv4.test".into(),
            ],
            ..AppConfig::default()
        }
    }

    fn invidious_url(instance: &str) -> String {
        format!("{instance}/api/v1/videos/{ID}")
    }

    fn oembed_url() -> String {
        format!("https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={ID}&format=json")
    }

    fn watch_url() -> String {
        format!("https://www.youtube.com/watch?v={ID}")
    }

    #[rocket::async_test]
    async fn third_instance_wins_after_two_failures() {
        let config = config();
        let fetcher = StubFetcher::new()
            .unreachable(&invidious_url("https://inv1.test"))
            .with_status(&invidious_url("https://inv2.test"), 502)
            .with_json(
                &invidious_url("https://inv3.test"),
                json!({
                    "title": "Never Gonna Give You Up",
                    "author": "Rick Astley",
                    "authorId": "UCuAXFkgsw1L7xaCfnd5JJOw",
                    "authorThumbnails": [{"url": "https://yt3.ggpht.com/rick=s32"}],
                    "videoThumbnails": [{"url": "https://inv3.test/vi/x.jpg"}],
                    "lengthSeconds": 212,
                    "viewCount": 1234567,
                    "formatStreams": [{"itag": "18"}],
                    "adaptiveFormats": [{"itag": "137"}, {"itag": "140"}]
                }),
            );
        let resolver = VideoSourceResolver::new(&fetcher, &config);

        let source = resolver.resolve(ID, true).await.unwrap();

        assert_eq!(source.strategy, PlaybackStrategy::Invidious);
        assert_eq!(source.endpoint_or_instance, "https://inv3.test");
        assert_eq!(fetcher.request_count(&invidious_url("https://inv1.test")), 1);
        assert_eq!(fetcher.request_count(&invidious_url("https://inv2.test")), 1);
        assert_eq!(fetcher.request_count(&invidious_url("https://inv3.test")), 1);
        assert_eq!(fetcher.request_count(&invidious_url("https://inv4.test")), 0);

        assert_eq!(source.video.duration.as_deref(), Some("3:32"));
        assert_eq!(source.video.view_count.as_deref(), Some("1,234,567 views"));
        assert_eq!(source.video.channel_title, "Rick Astley");
        let streams = source.invidious.as_ref().unwrap();
        assert_eq!(streams.adaptive_formats.len(), 2);
        assert_eq!(streams.video_streams.len(), 1);
        // watch page missing: the Invidious avatar survives
        assert_eq!(
            source.video.channel_avatar_url.as_deref(),
            Some("https://yt3.ggpht.com/rick=s32")
        );
    }

    #[rocket::async_test]
    async fn unreachable_instances_fall_through_to_proxy() {
        let config = config();
        let mut fetcher = StubFetcher::new();
        for instance in &config.invidious_instances {
            fetcher = fetcher.unreachable(&invidious_url(instance));
        }
        let resolver = VideoSourceResolver::new(&fetcher, &config);

        let source = resolver.resolve(ID, true).await.unwrap();

        assert_eq!(source.strategy, PlaybackStrategy::Proxy);
        assert_eq!(source.proxy_methods.len(), 3);
        assert_eq!(source.video.title, PROXY_TITLE);
        assert_eq!(
            source.video.thumbnail_url,
            Some(format!("https://img.youtube.com/vi/{ID}/maxresdefault.jpg"))
        );
        for instance in &config.invidious_instances {
            assert_eq!(fetcher.request_count(&invidious_url(instance)), 1);
        }

        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["proxyMethods"].as_array().unwrap().len(), 3);
        assert_eq!(value["useProxy"], true);
    }

    #[rocket::async_test]
    async fn proxy_uses_oembed_when_available() {
        let config = AppConfig {
            invidious_instances: Vec::new(),
            ..AppConfig::default()
        };
        let fetcher = StubFetcher::new().with_json(
            &oembed_url(),
            json!({"title": "Real title", "author_name": "Uploader", "thumbnail_url": "https://i.ytimg.com/x.jpg"}),
        );
        let source = VideoSourceResolver::new(&fetcher, &config)
            .resolve(ID, true)
            .await
            .unwrap();

        assert_eq!(source.strategy, PlaybackStrategy::Proxy);
        assert_eq!(source.video.title, "Real title");
        assert_eq!(source.video.channel_title, "Uploader");
        assert_eq!(
            source.video.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/x.jpg")
        );
    }

    #[rocket::async_test]
    async fn without_bypass_oembed_then_direct() {
        let config = config();
        let fetcher = StubFetcher::new()
            .with_json(&oembed_url(), json!({"title": "T", "author_name": "A"}))
            .with_body(
                &watch_url(),
                r#"<script>{"avatar":{"thumbnails":[{"url":"https://yt3.ggpht.com/owner=s48"}]}}</script>"#,
            );
        let source = VideoSourceResolver::new(&fetcher, &config)
            .resolve(ID, false)
            .await
            .unwrap();
        assert_eq!(source.strategy, PlaybackStrategy::Oembed);
        assert_eq!(source.endpoint_or_instance, embed_url(ID));
        assert_eq!(
            source.video.channel_avatar_url.as_deref(),
            Some("https://yt3.ggpht.com/owner=s48")
        );
        assert!(fetcher
            .requests()
            .iter()
            .all(|url| !url.contains("/api/v1/videos/")));

        let empty = StubFetcher::new();
        let direct = VideoSourceResolver::new(&empty, &config)
            .resolve(ID, false)
            .await
            .unwrap();
        assert_eq!(direct.strategy, PlaybackStrategy::Direct);
        assert!(!direct.has_metadata());
        // no metadata, so no watch-page lookup for the avatar
        assert_eq!(empty.requests(), vec![oembed_url()]);
        assert_eq!(direct.video.channel_avatar_url, None);
    }

    #[rocket::async_test]
    async fn malformed_id_is_rejected_before_any_request() {
        let config = config();
        let fetcher = StubFetcher::new();
        let resolver = VideoSourceResolver::new(&fetcher, &config);

        for (id, bypass) in [("not-an-id", false), ("x&format=xml", true), ("x&format=xml", false)] {
            assert!(resolver.resolve(id, bypass).await.unwrap_err().is_exhausted());
        }
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn avatar_tiers() {
        let explicit = r#"<img src="https://yt3.ggpht.com/a/default-user=s88-c"> "https://yt3.ggpht.com/real=s88-c-k""#;
        assert_eq!(
            find_channel_avatar(explicit).as_deref(),
            Some("https://yt3.ggpht.com/real=s88-c-k")
        );

        let structured = r#"{"avatar":{"thumbnails":[{"url":"https://yt3.ggpht.com/x=s48"}]}}"#;
        assert_eq!(
            find_channel_avatar(structured).as_deref(),
            Some("https://yt3.ggpht.com/x=s48")
        );

        let owner = r#""ownerProfileUrl":"/@me","thumbnail":{"thumbnails":[{"url":"https://o/1"}]}"#;
        assert_eq!(find_channel_avatar(owner).as_deref(), Some("https://o/1"));

        let id_only = r#"{"channelId":"UCabc"}"#;
        assert_eq!(
            find_channel_avatar(id_only).as_deref(),
            Some(DEFAULT_AVATAR_URL)
        );

        assert_eq!(find_channel_avatar("<html></html>"), None);
    }
}
