use thiserror::Error;

/// Failures raised while talking to YouTube, oEmbed or Invidious.
///
/// Transport and status failures are handled the same way by every fallback
/// chain: the source is skipped and the next one is tried. Only `Exhausted`
/// is meant to reach a route handler.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("{0}")]
    NoData(String),

    #[error("all {attempts} {what} sources failed (last error: {last_error})")]
    Exhausted {
        what: String,
        attempts: usize,
        last_error: String,
    },
}

impl ScrapeError {
    pub fn no_data(message: impl Into<String>) -> Self {
        ScrapeError::NoData(message.into())
    }

    #[cfg(test)]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ScrapeError::Exhausted { .. })
    }
}

impl From<(String, reqwest::Error)> for ScrapeError {
    fn from((url, err): (String, reqwest::Error)) -> Self {
        match err.status() {
            Some(status) => ScrapeError::Status {
                url,
                status: status.as_u16(),
            },
            None => ScrapeError::Transport {
                url,
                message: err.to_string(),
            },
        }
    }
}
