use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref VIDEO_URL_RE: Regex = Regex::new(
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})"
    )
    .expect("video url pattern");
    static ref BARE_VIDEO_ID_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("video id pattern");
    static ref CHANNEL_ID_RE: Regex =
        Regex::new(r"^UC[a-zA-Z0-9_-]+$").expect("channel id pattern");
}

fn video_id_from_url(input: &str) -> Option<String> {
    let parsed_url = Url::parse(input).ok()?;
    let host = parsed_url.host_str()?;

    let candidate = match host {
        "www.youtube.com" | "youtube.com" | "m.youtube.com" | "www.youtube-nocookie.com" => {
            let mut segments = parsed_url.path_segments()?;
            match segments.next()? {
                "watch" => parsed_url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string()),
                "embed" | "shorts" | "live" => segments.next().map(str::to_string),
                _ => None,
            }
        }
        "youtu.be" => parsed_url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string),
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

/// Pulls a video id out of a watch/short/embed URL, or accepts a bare id.
pub fn extract_youtube_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(id) = video_id_from_url(input) {
        return Some(id);
    }
    // scheme-less links
    if let Some(captures) = VIDEO_URL_RE.captures(input) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }
    if BARE_VIDEO_ID_RE.is_match(input) {
        return Some(input.to_string());
    }
    None
}

pub fn is_video_id(id: &str) -> bool {
    BARE_VIDEO_ID_RE.is_match(id)
}

/// Channel ids are a `UC` prefix followed by an opaque token.
pub fn is_channel_id(id: &str) -> bool {
    CHANNEL_ID_RE.is_match(id)
}

/// Formats a length in seconds as `H:MM:SS` or `M:SS`.
pub fn format_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// `1234567` -> `"1,234,567 views"`
pub fn format_view_count(views: u64) -> String {
    let digits = views.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{grouped} views")
}

/// Human relative age of a unix timestamp, as shown next to search results.
pub fn format_relative_age(published: i64, now: i64) -> String {
    let diff_secs = (now - published).unsigned_abs();
    let days = diff_secs.div_ceil(86_400);

    if days <= 1 {
        "1 day ago".to_string()
    } else if days < 30 {
        format!("{days} days ago")
    } else if days < 365 {
        let months = days / 30;
        format!("{months} month{} ago", if months > 1 { "s" } else { "" })
    } else {
        let years = days / 365;
        format!("{years} year{} ago", if years > 1 { "s" } else { "" })
    }
}
