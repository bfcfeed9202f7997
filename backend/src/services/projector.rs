use crate::models::{
    ChannelPage, ChannelRecord, RecordKind, VideoRecord, DEFAULT_AVATAR_URL, UNKNOWN_CHANNEL,
    UNTITLED,
};
use crate::services::json_path::Node;
use serde_json::Value;

pub const FIRST_PAGE_CHANNEL_LIMIT: usize = 2;
pub const FIRST_PAGE_VIDEO_LIMIT: usize = 48;
pub const LATER_PAGE_VIDEO_LIMIT: usize = 50;
pub const SEARCH_RESULT_LIMIT: usize = 50;
pub const CHANNEL_VIDEO_LIMIT: usize = 200;

const SEARCH_SECTIONS: &[&str] = &[
    "contents",
    "twoColumnSearchResultsRenderer",
    "primaryContents",
    "sectionListRenderer",
    "contents",
];

/// The renderer kinds we understand inside a results list.
enum Renderer<'a> {
    Video(Node<'a>),
    GridVideo(Node<'a>),
    Channel(Node<'a>),
}

impl<'a> Renderer<'a> {
    fn classify(item: Node<'a>) -> Option<Self> {
        if item.get(&["videoRenderer"]).exists() {
            Some(Renderer::Video(item.get(&["videoRenderer"])))
        } else if item.get(&["channelRenderer"]).exists() {
            Some(Renderer::Channel(item.get(&["channelRenderer"])))
        } else if item.get(&["gridVideoRenderer"]).exists() {
            Some(Renderer::GridVideo(item.get(&["gridVideoRenderer"])))
        } else {
            None
        }
    }
}

/// Videos and channel entries of one search page, in page order.
#[derive(Debug, Default, Clone)]
pub struct SearchProjection {
    pub videos: Vec<VideoRecord>,
    pub channels: Vec<VideoRecord>,
}

impl SearchProjection {
    /// Applies the per-page caps: channels (at most two) only on page one
    /// and always ahead of the videos, fifty entries overall.
    pub fn paginate(self, page: usize) -> Vec<VideoRecord> {
        let (channel_limit, video_limit) = if page <= 1 {
            (FIRST_PAGE_CHANNEL_LIMIT, FIRST_PAGE_VIDEO_LIMIT)
        } else {
            (0, LATER_PAGE_VIDEO_LIMIT)
        };

        self.channels
            .into_iter()
            .take(channel_limit)
            .chain(self.videos.into_iter().take(video_limit))
            .take(SEARCH_RESULT_LIMIT)
            .collect()
    }
}

fn search_items(data: &Value) -> impl Iterator<Item = Node<'_>> {
    Node::new(data)
        .get(SEARCH_SECTIONS)
        .items()
        .flat_map(|section| section.get(&["itemSectionRenderer", "contents"]).items())
}

/// Projects a search results page into video and channel records.
pub fn project_search(data: &Value) -> SearchProjection {
    let mut projection = SearchProjection::default();

    for item in search_items(data) {
        match Renderer::classify(item) {
            Some(Renderer::Video(video)) | Some(Renderer::GridVideo(video)) => {
                if let Some(record) = search_video(video) {
                    projection.videos.push(record);
                }
            }
            Some(Renderer::Channel(channel)) => {
                if let Some(record) = search_channel_entry(channel) {
                    projection.channels.push(record);
                }
            }
            None => {}
        }
    }
    projection
}

/// Channel candidates from a channel-filtered search, in page order.
pub fn project_channel_candidates(data: &Value) -> Vec<ChannelRecord> {
    search_items(data)
        .filter_map(|item| match Renderer::classify(item) {
            Some(Renderer::Channel(channel)) => channel_candidate(channel),
            _ => None,
        })
        .collect()
}

fn search_video(video: Node) -> Option<VideoRecord> {
    let id = video.str_at(&["videoId"])?.to_string();
    let byline = video.get(&["longBylineText", "runs", "0"]);

    let channel_id = byline
        .str_at(&["navigationEndpoint", "browseEndpoint", "browseId"])
        .map(str::to_string)
        .or_else(|| {
            byline
                .str_at(&[
                    "navigationEndpoint",
                    "commandMetadata",
                    "webCommandMetadata",
                    "url",
                ])
                .and_then(|url| url.split('/').nth(2))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let channel_avatar_url = video
        .str_at(&[
            "channelThumbnailSupportedRenderers",
            "channelThumbnailWithLinkRenderer",
            "thumbnail",
            "thumbnails",
            "0",
            "url",
        ])
        .map(str::to_string)
        .or_else(|| (!channel_id.is_empty()).then(|| DEFAULT_AVATAR_URL.to_string()));

    Some(VideoRecord {
        id,
        title: title_of(video),
        description: Some(video.runs_text(&["descriptionSnippet"]).unwrap_or_default()),
        channel_title: video
            .first_str(&[
                &["longBylineText", "runs", "0", "text"],
                &["ownerText", "runs", "0", "text"],
            ])
            .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
        channel_id,
        channel_avatar_url,
        thumbnail_url: video
            .str_at(&["thumbnail", "thumbnails", "0", "url"])
            .map(str::to_string),
        duration: Some(video.str_at(&["lengthText", "simpleText"]).unwrap_or("").to_string()),
        view_count: Some(
            video
                .str_at(&["viewCountText", "simpleText"])
                .unwrap_or("")
                .to_string(),
        ),
        published_at: Some(
            video
                .str_at(&["publishedTimeText", "simpleText"])
                .unwrap_or("")
                .to_string(),
        ),
        kind: RecordKind::Video,
        subscriber_count: None,
        video_count: None,
    })
}

fn search_channel_entry(channel: Node) -> Option<VideoRecord> {
    let id = channel.str_at(&["channelId"])?.to_string();
    let title = channel
        .str_at(&["title", "simpleText"])
        .unwrap_or(UNKNOWN_CHANNEL)
        .to_string();
    let thumbnail = channel
        .str_at(&["thumbnail", "thumbnails", "0", "url"])
        .map(str::to_string);

    Some(VideoRecord {
        channel_id: id.clone(),
        id,
        channel_title: title.clone(),
        title,
        description: Some(channel.runs_text(&["descriptionSnippet"]).unwrap_or_default()),
        channel_avatar_url: thumbnail.clone(),
        thumbnail_url: thumbnail,
        duration: None,
        view_count: None,
        published_at: None,
        kind: RecordKind::Channel,
        subscriber_count: Some(subscriber_count_of(channel)),
        video_count: Some(channel.runs_text(&["videoCountText"]).unwrap_or_default()),
    })
}

fn channel_candidate(channel: Node) -> Option<ChannelRecord> {
    let channel_id = channel.str_at(&["channelId"])?.to_string();
    let avatar_url = channel.first_str(&[
        &["thumbnail", "thumbnails", "-1", "url"],
        &["thumbnail", "thumbnails", "0", "url"],
    ]);

    Some(ChannelRecord {
        channel_id,
        name: channel
            .str_at(&["title", "simpleText"])
            .unwrap_or(UNKNOWN_CHANNEL)
            .to_string(),
        avatar_url,
        description: channel.runs_text(&["descriptionSnippet"]).unwrap_or_default(),
        subscriber_count: subscriber_count_of(channel),
        video_count: channel.runs_text(&["videoCountText"]).unwrap_or_default(),
    })
}

fn title_of(video: Node) -> String {
    video
        .first_str(&[&["title", "runs", "0", "text"], &["title", "simpleText"]])
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn subscriber_count_of(node: Node) -> String {
    node.first_str(&[
        &["subscriberCountText", "simpleText"],
        &["subscriberCountText", "runs", "0", "text"],
    ])
    .unwrap_or_default()
}

/// Channel header data plus the first [`CHANNEL_VIDEO_LIMIT`] videos of a
/// `/videos` tab. Missing header fields stay at their defaults.
pub fn project_channel_page(data: &Value, channel_id: &str) -> ChannelPage {
    let root = Node::new(data);
    let channel = project_channel_header(root, channel_id);
    let videos = channel_tab_items(root)
        .filter_map(|item| {
            let video = if item.get(&["richItemRenderer", "content", "videoRenderer"]).exists() {
                item.get(&["richItemRenderer", "content", "videoRenderer"])
            } else {
                item.get(&["gridVideoRenderer"])
            };
            channel_video(video, &channel)
        })
        .take(CHANNEL_VIDEO_LIMIT)
        .collect();

    ChannelPage { channel, videos }
}

fn project_channel_header(root: Node, channel_id: &str) -> ChannelRecord {
    let mut info = ChannelRecord::unknown(channel_id);

    let header = [
        root.get(&["header", "c4TabbedHeaderRenderer"]),
        root.get(&["header", "pageHeaderRenderer"]),
    ]
    .into_iter()
    .find(|h| h.exists());

    if let Some(header) = header {
        if let Some(name) = header.first_str(&[
            &["title", "simpleText"],
            &["title", "runs", "0", "text"],
            &["title"],
            &["pageTitle"],
        ]) {
            info.name = name;
        }
        if let Some(tagline) = header.str_at(&["tagline", "simpleText"]) {
            info.description = tagline.to_string();
        }
        info.subscriber_count = subscriber_count_of(header);
        if let Some(avatar) = header.str_at(&["avatar", "thumbnails", "-1", "url"]) {
            info.avatar_url = Some(avatar.to_string());
        }
    }

    let metadata = root.get(&["metadata", "channelMetadataRenderer"]);
    if metadata.exists() && !info.has_known_name() {
        if let Some(title) = metadata.str_at(&["title"]) {
            info.name = title.to_string();
        }
        if let Some(description) = metadata.str_at(&["description"]) {
            info.description = description.to_string();
        }
        if let Some(avatar) = metadata.str_at(&["avatar", "thumbnails", "-1", "url"]) {
            info.avatar_url = Some(avatar.to_string());
        }
    }

    info
}

fn channel_tab_items<'a>(root: Node<'a>) -> impl Iterator<Item = Node<'a>> {
    let tab = root
        .get(&["contents", "twoColumnBrowseResultsRenderer", "tabs"])
        .items()
        .map(|tab| tab.get(&["tabRenderer"]))
        .find(|tab| {
            tab.str_at(&["title"]) == Some("Videos")
                || tab.get(&["selected"]).value() == Some(&Value::Bool(true))
        });

    let items = tab.map(|tab| {
        let grid = tab.get(&["content", "richGridRenderer", "contents"]);
        if grid.exists() {
            grid
        } else {
            tab.get(&[
                "content",
                "sectionListRenderer",
                "contents",
                "0",
                "itemSectionRenderer",
                "contents",
                "0",
                "gridRenderer",
                "items",
            ])
        }
    });

    items.into_iter().flat_map(Node::items)
}

fn channel_video(video: Node, channel: &ChannelRecord) -> Option<VideoRecord> {
    let id = video.str_at(&["videoId"])?.to_string();

    Some(VideoRecord {
        id,
        title: title_of(video),
        description: Some(video.runs_text(&["descriptionSnippet"]).unwrap_or_default()),
        channel_title: channel.name.clone(),
        channel_id: channel.channel_id.clone(),
        channel_avatar_url: channel.avatar_url.clone(),
        thumbnail_url: video.first_str(&[
            &["thumbnail", "thumbnails", "-1", "url"],
            &["thumbnail", "thumbnails", "0", "url"],
        ]),
        duration: Some(
            video
                .first_str(&[
                    &["lengthText", "simpleText"],
                    &[
                        "thumbnailOverlays",
                        "0",
                        "thumbnailOverlayTimeStatusRenderer",
                        "text",
                        "simpleText",
                    ],
                ])
                .unwrap_or_default(),
        ),
        view_count: Some(
            video
                .first_str(&[
                    &["viewCountText", "simpleText"],
                    &["shortViewCountText", "simpleText"],
                ])
                .unwrap_or_default(),
        ),
        published_at: Some(
            video
                .str_at(&["publishedTimeText", "simpleText"])
                .unwrap_or("")
                .to_string(),
        ),
        kind: RecordKind::Video,
        subscriber_count: None,
        video_count: None,
    })
}
