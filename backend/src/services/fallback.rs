use crate::error::ScrapeError;
use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;

/// Runs `attempt` against each source in order, one at a time, and returns
/// the first success. Every source gets exactly one try. When all of them
/// fail the result is [`ScrapeError::Exhausted`] carrying the last error.
pub async fn try_in_order<'a, S, T, F, Fut>(
    what: &str,
    sources: &'a [S],
    mut attempt: F,
) -> Result<T, ScrapeError>
where
    S: Display,
    F: FnMut(&'a S) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut last_error = None;

    for source in sources {
        match attempt(source).await {
            Ok(value) => {
                debug!("{what}: {source} succeeded");
                return Ok(value);
            }
            Err(e) => {
                warn!("{what}: {source} failed: {e}");
                last_error = Some(e.to_string());
            }
        }
    }

    Err(ScrapeError::Exhausted {
        what: what.to_string(),
        attempts: sources.len(),
        last_error: last_error.unwrap_or_else(|| "no sources configured".to_string()),
    })
}
