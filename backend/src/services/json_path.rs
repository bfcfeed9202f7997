//! Best-effort access into YouTube's undocumented JSON.
//!
//! All structural knowledge about `ytInitialData` goes through [`Node`], so a
//! schema change is a change to a path literal, never to control flow.

use serde_json::Value;

/// A borrowed position in a JSON tree that may or may not exist.
///
/// Path segments are object keys, array indices (`"0"`) or `"-1"` for the
/// last element of an array.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(Option<&'a Value>);

impl<'a> Node<'a> {
    pub fn new(value: &'a Value) -> Self {
        Node(Some(value))
    }

    pub fn get(self, path: &[&str]) -> Node<'a> {
        let mut current = self.0;
        for segment in path {
            current = current.and_then(|value| step(value, segment));
        }
        Node(current)
    }

    pub fn value(self) -> Option<&'a Value> {
        self.0
    }

    pub fn exists(self) -> bool {
        self.0.is_some_and(|v| !v.is_null())
    }

    /// Non-empty string at `path`.
    pub fn str_at(self, path: &[&str]) -> Option<&'a str> {
        self.get(path)
            .0
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// First non-empty string among `paths`, in order.
    pub fn first_str(self, paths: &[&[&str]]) -> Option<String> {
        paths
            .iter()
            .find_map(|path| self.str_at(path))
            .map(str::to_string)
    }

    /// Concatenated `runs[].text` of the text object at `path`.
    pub fn runs_text(self, path: &[&str]) -> Option<String> {
        let text: String = self
            .get(path)
            .get(&["runs"])
            .items()
            .filter_map(|run| run.str_at(&["text"]))
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// Children of the array at this node; empty when absent.
    pub fn items(self) -> impl Iterator<Item = Node<'a>> {
        self.0
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(Node::new)
    }

    pub fn u64_at(self, path: &[&str]) -> Option<u64> {
        let value = self.get(path).0?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    pub fn i64_at(self, path: &[&str]) -> Option<i64> {
        let value = self.get(path).0?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    pub fn array_at(self, path: &[&str]) -> Vec<Value> {
        self.get(path)
            .0
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Array(items) => {
            if segment == "-1" {
                items.last()
            } else {
                items.get(segment.parse::<usize>().ok()?)
            }
        }
        Value::Object(map) => map.get(segment),
        _ => None,
    }
}
