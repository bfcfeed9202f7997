use crate::error::ScrapeError;
use log::debug;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::Value;

/// Leaf of every scraping path: one GET, no retries.
#[rocket::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches an HTML page with a browser-like user agent.
    async fn fetch_page(&self, url: &str) -> Result<String, ScrapeError>;

    /// Fetches a JSON API response (Invidious, oEmbed).
    async fn fetch_json(&self, url: &str) -> Result<Value, ScrapeError>;
}

pub struct HttpFetcher {
    client: Client,
    browser_user_agent: String,
    api_user_agent: String,
}

impl HttpFetcher {
    pub fn new(browser_user_agent: &str, api_user_agent: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            browser_user_agent: browser_user_agent.to_string(),
            api_user_agent: api_user_agent.to_string(),
        })
    }

    async fn get(&self, url: &str, user_agent: &str) -> Result<reqwest::Response, ScrapeError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| ScrapeError::from((url.to_string(), e)))?;

        if !response.status().is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

#[rocket::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
        self.get(url, &self.browser_user_agent)
            .await?
            .text()
            .await
            .map_err(|e| ScrapeError::from((url.to_string(), e)))
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, ScrapeError> {
        self.get(url, &self.api_user_agent)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| ScrapeError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Canned {
        Body(String),
        Status(u16),
        Unreachable,
    }

    /// Serves canned bodies keyed by exact URL and remembers every request.
    /// Unknown URLs answer 404.
    #[derive(Default)]
    pub struct StubFetcher {
        responses: Mutex<HashMap<String, Canned>>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_body(self, url: &str, body: impl Into<String>) -> Self {
            self.insert(url, Canned::Body(body.into()))
        }

        pub fn with_json(self, url: &str, body: Value) -> Self {
            self.insert(url, Canned::Body(body.to_string()))
        }

        pub fn with_status(self, url: &str, status: u16) -> Self {
            self.insert(url, Canned::Status(status))
        }

        pub fn unreachable(self, url: &str) -> Self {
            self.insert(url, Canned::Unreachable)
        }

        fn insert(self, url: &str, canned: Canned) -> Self {
            if let Ok(mut responses) = self.responses.lock() {
                responses.insert(url.to_string(), canned);
            }
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }

        pub fn request_count(&self, url: &str) -> usize {
            self.requests().iter().filter(|u| u.as_str() == url).count()
        }

        fn respond(&self, url: &str) -> Result<String, ScrapeError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(url.to_string());
            }
            let responses = self.responses.lock().map_err(|_| ScrapeError::Transport {
                url: url.to_string(),
                message: "stub poisoned".to_string(),
            })?;
            match responses.get(url) {
                Some(Canned::Body(body)) => Ok(body.clone()),
                Some(Canned::Status(status)) => Err(ScrapeError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                Some(Canned::Unreachable) => Err(ScrapeError::Transport {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
                None => Err(ScrapeError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    #[rocket::async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
            self.respond(url)
        }

        async fn fetch_json(&self, url: &str) -> Result<Value, ScrapeError> {
            let body = self.respond(url)?;
            serde_json::from_str(&body).map_err(|e| ScrapeError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            })
        }
    }
}
