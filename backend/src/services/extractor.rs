use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde_json::Value;

const MARKER: &str = "ytInitialData";

lazy_static! {
    static ref SCRIPT_RE: Regex =
        Regex::new(r"(?is)<script[^>]*>(.*?)</script>").expect("script pattern");
    static ref ASSIGNMENT_RE: Regex =
        Regex::new(r#"ytInitialData["']?\]?\s*=\s*(\{.*?\});"#).expect("assignment pattern");
}

/// Finds the `ytInitialData = {...};` blob in a YouTube page and parses it.
///
/// Script blocks are scanned in document order and the first one that parses
/// wins. A page without any script tags is scanned as a whole.
pub fn extract_initial_data(html: &str) -> Option<Value> {
    let blocks: Vec<&str> = SCRIPT_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let candidates: Vec<&str> = if blocks.is_empty() {
        vec![html]
    } else {
        blocks
    };

    for (index, block) in candidates.into_iter().enumerate() {
        if !block.contains(MARKER) {
            continue;
        }
        match parse_block(block) {
            Some(data) => return Some(data),
            None => debug!("script block {index} carries {MARKER} but did not parse"),
        }
    }
    None
}

fn parse_block(block: &str) -> Option<Value> {
    let captures = ASSIGNMENT_RE.captures(block)?;
    let whole = captures.get(1)?;

    if let Ok(data) = serde_json::from_str::<Value>(whole.as_str()) {
        return Some(data);
    }

    // The lazy match stops at the first `};`, which may sit inside a string.
    let object = balanced_object(&block[whole.start()..])?;
    serde_json::from_str::<Value>(object).ok()
}

/// Returns the leading `{...}` of `text`, honouring string literals.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
