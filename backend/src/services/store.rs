use crate::models::{SearchQueryLog, VideoRecord};
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const RECENT_SEARCHES: usize = 10;

struct CachedVideo {
    record: VideoRecord,
    stored_at: Instant,
}

/// In-process cache of resolved records plus the search log.
///
/// Bounded: a full store drops its oldest entry on insert, and entries older
/// than the TTL read as missing. Last write wins per key.
pub struct MemoryStore {
    videos: RwLock<HashMap<String, CachedVideo>>,
    searches: RwLock<VecDeque<SearchQueryLog>>,
    capacity: usize,
    ttl: Duration,
    search_capacity: usize,
    next_search_id: AtomicU64,
}

impl MemoryStore {
    pub fn new(capacity: usize, ttl: Duration, search_capacity: usize) -> Self {
        Self {
            videos: RwLock::new(HashMap::new()),
            searches: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
            ttl,
            search_capacity: search_capacity.max(1),
            next_search_id: AtomicU64::new(1),
        }
    }

    pub async fn get_video(&self, id: &str) -> Option<VideoRecord> {
        {
            let videos = self.videos.read().await;
            match videos.get(id) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    return Some(entry.record.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut videos = self.videos.write().await;
        self.evict_if_expired(&mut videos, id)
    }

    /// Runs under the write lock. The entry is checked again because a writer
    /// may have refreshed it after the read lock was released.
    fn evict_if_expired(
        &self,
        videos: &mut HashMap<String, CachedVideo>,
        id: &str,
    ) -> Option<VideoRecord> {
        match videos.get(id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.record.clone()),
            Some(_) => {
                debug!("Cache entry for {id} expired");
                videos.remove(id);
                None
            }
            None => None,
        }
    }

    pub async fn put_video(&self, record: VideoRecord) {
        let mut videos = self.videos.write().await;

        if !videos.contains_key(&record.id) && videos.len() >= self.capacity {
            let oldest = videos
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting {oldest}");
                videos.remove(&oldest);
            }
        }

        videos.insert(
            record.id.clone(),
            CachedVideo {
                record,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn put_videos(&self, records: &[VideoRecord]) {
        for record in records {
            self.put_video(record.clone()).await;
        }
    }

    #[cfg(test)]
    pub async fn video_count(&self) -> usize {
        self.videos.read().await.len()
    }

    pub async fn log_search(&self, query: &str) -> SearchQueryLog {
        let now = chrono::Utc::now();
        let entry = SearchQueryLog {
            id: format!(
                "{}_{}",
                now.timestamp_millis(),
                self.next_search_id.fetch_add(1, Ordering::Relaxed)
            ),
            query: query.to_string(),
            timestamp: now.to_rfc3339(),
        };

        let mut searches = self.searches.write().await;
        searches.push_back(entry.clone());
        while searches.len() > self.search_capacity {
            searches.pop_front();
        }
        entry
    }

    /// The newest searches, newest first.
    pub async fn recent_searches(&self) -> Vec<SearchQueryLog> {
        self.searches
            .read()
            .await
            .iter()
            .rev()
            .take(RECENT_SEARCHES)
            .cloned()
            .collect()
    }
}
