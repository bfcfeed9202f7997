pub mod channel_resolver;
pub mod extractor;
pub mod fallback;
pub mod fetcher;
pub mod json_path;
pub mod projector;
pub mod search_service;
pub mod store;
pub mod video_resolver;
