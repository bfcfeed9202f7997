use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::models::{ChannelPage, ChannelRecord, UNKNOWN_CHANNEL};
use crate::services::extractor::extract_initial_data;
use crate::services::fallback::try_in_order;
use crate::services::fetcher::PageFetcher;
use crate::services::projector::{project_channel_candidates, project_channel_page};
use crate::utils::is_channel_id;
use log::{debug, info, warn};

/// `sp` value that restricts a search to channels.
pub const CHANNEL_SEARCH_FILTER: &str = "EgIQAg%253D%253D";

pub fn channel_video_urls(base: &str, channel: &str) -> Vec<String> {
    vec![
        format!("{base}/channel/{channel}/videos"),
        format!("{base}/@{channel}/videos"),
        format!("{base}/c/{channel}/videos"),
        format!("{base}/user/{channel}/videos"),
    ]
}

/// Chooses among search candidates: an exact (case-insensitive) title match
/// wins outright, then the first title containing or contained in the
/// query, then simply the first candidate.
pub fn pick_channel<'c>(candidates: &'c [ChannelRecord], query: &str) -> Option<&'c ChannelRecord> {
    let wanted = query.trim().to_lowercase();
    let mut partial = None;
    let mut first = None;

    for candidate in candidates {
        let title = candidate.name.to_lowercase();
        if title == wanted {
            return Some(candidate);
        }
        if partial.is_none()
            && !title.is_empty()
            && (title.contains(&wanted) || wanted.contains(&title))
        {
            partial = Some(candidate);
        }
        if first.is_none() {
            first = Some(candidate);
        }
    }

    partial.or(first)
}

pub struct ChannelResolver<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a AppConfig,
}

impl<'a> ChannelResolver<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a AppConfig) -> Self {
        Self { fetcher, config }
    }

    /// Finds a channel by id and/or name. `None` means nothing matched.
    pub async fn resolve(
        &self,
        query: Option<&str>,
        channel_id: Option<&str>,
    ) -> Option<ChannelPage> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let channel_id = channel_id.map(str::trim).filter(|id| !id.is_empty());
        let mut result = None;

        if let Some(id) = channel_id.filter(|id| is_channel_id(id)) {
            info!("Fetching channel by id: {id}");
            result = self.by_id(id).await;
        }

        if result.is_none() {
            if let Some(name) = query {
                info!("Searching for channel by name: {name}");
                result = self.search_for_channel(name).await;
            }
        }

        if result.is_none() {
            if let Some(name) = channel_id.filter(|id| !is_channel_id(id)) {
                info!("Searching for channel using id as a name: {name}");
                result = self.search_for_channel(name).await;
            }
        }

        result.map(|page| normalize(page, channel_id))
    }

    /// Channel page scrape for a well-formed id, topped up from the bare
    /// channel page when the listing lacked avatar or subscriber count.
    pub async fn by_id(&self, channel_id: &str) -> Option<ChannelPage> {
        let ChannelPage {
            mut channel,
            videos,
        } = self.fetch_channel_videos(channel_id).await;

        if channel.avatar_url.is_none() || channel.subscriber_count.is_empty() {
            if let Some(header) = self.fetch_channel_header(channel_id).await {
                channel = channel.backfill_from(&header);
            }
        }

        if !channel.has_known_name() && videos.is_empty() {
            debug!("Nothing found for channel id {channel_id}");
            return None;
        }

        if !videos.is_empty() {
            channel.video_count = videos.len().to_string();
        }
        Some(ChannelPage { channel, videos })
    }

    /// Channel-only search, disambiguation, then the chosen channel's videos.
    pub async fn search_for_channel(&self, name: &str) -> Option<ChannelPage> {
        let url = format!(
            "{}/results?search_query={}&sp={CHANNEL_SEARCH_FILTER}",
            self.config.youtube_base_url,
            urlencoding::encode(name)
        );

        let html = match self.fetcher.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Channel search for {name} failed: {e}");
                return None;
            }
        };

        let Some(data) = extract_initial_data(&html) else {
            debug!("Channel search page for {name} carried no initial data");
            return None;
        };

        let candidates = project_channel_candidates(&data);
        let chosen = pick_channel(&candidates, name)?.clone();
        info!(
            "Channel search for {name} picked {} ({}) out of {}",
            chosen.name,
            chosen.channel_id,
            candidates.len()
        );

        let feed = self.fetch_channel_videos(&chosen.channel_id).await;
        let mut channel = chosen.backfill_from(&feed.channel);
        if !feed.videos.is_empty() {
            channel.video_count = feed.videos.len().to_string();
        }

        Some(ChannelPage {
            channel,
            videos: feed.videos,
        })
    }

    /// Tries each `/videos` URL shape in turn. Falls back to an empty
    /// placeholder page when none of them yields anything.
    pub async fn fetch_channel_videos(&self, channel_id: &str) -> ChannelPage {
        let urls = channel_video_urls(&self.config.youtube_base_url, channel_id);

        match try_in_order("channel videos", &urls, |url| {
            self.fetch_channel_listing(url, channel_id)
        })
        .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!("No channel listing for {channel_id}: {e}");
                ChannelPage {
                    channel: ChannelRecord::unknown(channel_id),
                    videos: Vec::new(),
                }
            }
        }
    }

    async fn fetch_channel_listing(
        &self,
        url: &str,
        channel_id: &str,
    ) -> Result<ChannelPage, ScrapeError> {
        let html = self.fetcher.fetch_page(url).await?;
        let data = extract_initial_data(&html)
            .ok_or_else(|| ScrapeError::no_data(format!("{url} has no initial data")))?;

        let page = project_channel_page(&data, channel_id);
        if page.videos.is_empty() && !page.channel.has_known_name() {
            return Err(ScrapeError::no_data(format!(
                "{url} has neither videos nor a channel name"
            )));
        }
        Ok(page)
    }

    async fn fetch_channel_header(&self, channel_id: &str) -> Option<ChannelRecord> {
        let url = format!("{}/channel/{channel_id}", self.config.youtube_base_url);
        let html = match self.fetcher.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                debug!("Channel header page for {channel_id} unavailable: {e}");
                return None;
            }
        };
        let data = extract_initial_data(&html)?;
        Some(project_channel_page(&data, channel_id).channel)
    }
}

fn normalize(page: ChannelPage, requested_id: Option<&str>) -> ChannelPage {
    let ChannelPage {
        mut channel,
        videos,
    } = page;

    if channel.channel_id.is_empty() {
        channel.channel_id = requested_id.unwrap_or_default().to_string();
    }
    if channel.name.is_empty() {
        channel.name = UNKNOWN_CHANNEL.to_string();
    }
    if channel.video_count.is_empty() {
        channel.video_count = videos.len().to_string();
    }

    ChannelPage { channel, videos }
}
