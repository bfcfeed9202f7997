use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::models::{SearchResponse, VideoRecord};
use crate::services::extractor::extract_initial_data;
use crate::services::fetcher::PageFetcher;
use crate::services::projector::project_search;
use crate::services::store::MemoryStore;
use crate::services::video_resolver::VideoSourceResolver;
use crate::utils::extract_youtube_video_id;
use log::{debug, info, warn};

/// Results per upstream page, used to fake an offset for later pages.
const UPSTREAM_PAGE_SIZE: usize = 20;

/// Sort order of a scraped search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchFilter {
    #[default]
    Relevant,
    Latest,
    Popular,
    Duration,
}

impl SearchFilter {
    /// Unknown names fall back to relevance.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("latest") => SearchFilter::Latest,
            Some("popular") => SearchFilter::Popular,
            Some("duration") => SearchFilter::Duration,
            _ => SearchFilter::Relevant,
        }
    }

    fn sort_param(self) -> &'static str {
        match self {
            SearchFilter::Relevant => "",
            SearchFilter::Latest => "&sp=CAI%253D",
            SearchFilter::Popular => "&sp=CAMSAhAB",
            SearchFilter::Duration => "&sp=EgIYAw%253D%253D",
        }
    }
}

/// Pages are 1-based; anything unparsable or below one is page one.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

pub fn search_url(base: &str, query: &str, filter: SearchFilter, page: usize) -> String {
    let mut url = format!(
        "{base}/results?search_query={}{}",
        urlencoding::encode(query),
        filter.sort_param()
    );
    if page > 1 {
        url.push_str(&format!(
            "&gl=US&hl=en&start={}",
            page.saturating_sub(1).saturating_mul(UPSTREAM_PAGE_SIZE)
        ));
    }
    url
}

/// Fetches one results page and projects it. A page without embedded data
/// yields an empty list; only a failed fetch is an error.
pub async fn search_by_scraping(
    fetcher: &dyn PageFetcher,
    config: &AppConfig,
    query: &str,
    filter: SearchFilter,
    page: usize,
) -> Result<Vec<VideoRecord>, ScrapeError> {
    let url = search_url(&config.youtube_base_url, query, filter, page);
    let html = fetcher.fetch_page(&url).await?;

    let Some(data) = extract_initial_data(&html) else {
        warn!("No initial data on results page for '{query}'");
        return Ok(Vec::new());
    };

    let results = project_search(&data).paginate(page);
    info!(
        "Search '{query}' ({filter:?}, page {page}) returned {} results",
        results.len()
    );
    Ok(results)
}

/// Handles one `/search` call end to end: logs the query, short-circuits
/// URLs and ids to a single resolved video, otherwise scrapes a results page.
/// Everything returned is written to the store.
pub async fn search(
    fetcher: &dyn PageFetcher,
    config: &AppConfig,
    store: &MemoryStore,
    query: &str,
    filter: SearchFilter,
    page: usize,
) -> Result<SearchResponse, ScrapeError> {
    store.log_search(query).await;

    if let Some(video_id) = extract_youtube_video_id(query) {
        debug!("Search query '{query}' looks like video {video_id}");
        match VideoSourceResolver::new(fetcher, config)
            .resolve(&video_id, false)
            .await
        {
            Ok(source) if source.has_metadata() => {
                store.put_video(source.video.clone()).await;
                return Ok(SearchResponse {
                    videos: vec![source.video],
                    channels: None,
                    kind: "direct".to_string(),
                });
            }
            Ok(_) => debug!("No metadata for {video_id}, searching instead"),
            Err(e) => debug!("Direct lookup of {video_id} failed, searching instead: {e}"),
        }
    }

    let results = search_by_scraping(fetcher, config, query, filter, page).await?;
    store.put_videos(&results).await;

    let (channels, videos): (Vec<_>, Vec<_>) =
        results.into_iter().partition(VideoRecord::is_channel);

    Ok(SearchResponse {
        videos,
        channels: Some(channels),
        kind: "search".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::testing::StubFetcher;
    use crate::services::projector::fixtures::*;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "https://www.youtube.com";

    fn store() -> MemoryStore {
        MemoryStore::new(100, Duration::from_secs(60), 100)
    }

    #[test]
    fn builds_filtered_and_paged_urls() {
        assert_eq!(
            search_url(BASE, "rust lang", SearchFilter::Relevant, 1),
            "https://www.youtube.com/results?search_query=rust%20lang"
        );
        assert_eq!(
            search_url(BASE, "rust", SearchFilter::Latest, 3),
            "https://www.youtube.com/results?search_query=rust&sp=CAI%253D&gl=US&hl=en&start=40"
        );
        assert_eq!(SearchFilter::parse(Some("bogus")), SearchFilter::Relevant);
        assert_eq!(SearchFilter::parse(Some("popular")), SearchFilter::Popular);
    }

    #[test]
    fn page_numbers() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-2")), 1);
        assert_eq!(parse_page(Some("4")), 4);
    }

    #[test]
    fn huge_page_offset_saturates() {
        let page = parse_page(Some(&usize::MAX.to_string()));
        assert_eq!(page, usize::MAX);
        assert_eq!(
            search_url(BASE, "x", SearchFilter::Relevant, page),
            format!(
                "https://www.youtube.com/results?search_query=x&gl=US&hl=en&start={}",
                usize::MAX
            )
        );
    }

    #[rocket::async_test]
    async fn scraped_search_splits_channels_and_caches() {
        let config = AppConfig::default();
        let store = store();
        let data = search_data(vec![
            channel_item("UCexample", "Example Channel"),
            video_item("aaaaaaaaaaa", "One", "Example Channel", "UCexample"),
            video_item("bbbbbbbbbbb", "Two", "Other", "UCother"),
        ]);
        let fetcher = StubFetcher::new().with_body(
            &search_url(BASE, "example", SearchFilter::Relevant, 1),
            page(&data),
        );

        let response = search(&fetcher, &config, &store, "example", SearchFilter::Relevant, 1)
            .await
            .unwrap();

        assert_eq!(response.kind, "search");
        assert_eq!(response.videos.len(), 2);
        assert_eq!(response.channels.as_ref().map(Vec::len), Some(1));
        assert_eq!(store.get_video("aaaaaaaaaaa").await.unwrap().title, "One");
        assert_eq!(store.recent_searches().await[0].query, "example");
    }

    #[rocket::async_test]
    async fn later_pages_have_no_channels() {
        let config = AppConfig::default();
        let data = search_data(vec![
            channel_item("UCexample", "Example Channel"),
            video_item("aaaaaaaaaaa", "One", "c", "UCc"),
        ]);
        let fetcher = StubFetcher::new().with_body(
            &search_url(BASE, "example", SearchFilter::Popular, 2),
            page(&data),
        );

        let results =
            search_by_scraping(&fetcher, &config, "example", SearchFilter::Popular, 2)
                .await
                .unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_channel());
    }

    #[rocket::async_test]
    async fn page_without_data_is_empty_but_failed_fetch_is_error() {
        let config = AppConfig::default();
        let fetcher = StubFetcher::new().with_body(
            &search_url(BASE, "nothing", SearchFilter::Relevant, 1),
            "<html><body>consent wall</body></html>",
        );
        let results =
            search_by_scraping(&fetcher, &config, "nothing", SearchFilter::Relevant, 1)
                .await
                .unwrap();
        assert!(results.is_empty());

        let failing = StubFetcher::new();
        assert!(
            search_by_scraping(&failing, &config, "nothing", SearchFilter::Relevant, 1)
                .await
                .is_err()
        );
    }

    #[rocket::async_test]
    async fn video_url_query_is_resolved_directly() {
        let config = AppConfig::default();
        let store = store();
        let id = "dQw4w9WgXcQ";
        let fetcher = StubFetcher::new().with_json(
            &format!("{BASE}/oembed?url={BASE}/watch?v={id}&format=json"),
            json!({"title": "Never Gonna Give You Up", "author_name": "Rick Astley"}),
        );

        let query = format!("https://youtu.be/{id}");
        let response = search(&fetcher, &config, &store, &query, SearchFilter::Relevant, 1)
            .await
            .unwrap();

        assert_eq!(response.kind, "direct");
        assert_eq!(response.videos.len(), 1);
        assert_eq!(response.videos[0].channel_title, "Rick Astley");
        assert!(response.channels.is_none());
        assert!(store.get_video(id).await.is_some());
        assert!(fetcher.requests().iter().all(|u| !u.contains("/results?")));
    }

    #[rocket::async_test]
    async fn unresolvable_id_falls_back_to_search() {
        let config = AppConfig::default();
        let store = store();
        let query = "programming";
        let fetcher = StubFetcher::new().with_body(
            &search_url(BASE, query, SearchFilter::Relevant, 1),
            page(&search_data(vec![video_item("ccccccccccc", "Intro", "c", "UCc")])),
        );

        let response = search(&fetcher, &config, &store, query, SearchFilter::Relevant, 1)
            .await
            .unwrap();

        assert_eq!(response.kind, "search");
        assert_eq!(response.videos[0].id, "ccccccccccc");
    }
}
