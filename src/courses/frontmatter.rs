//! Defensive frontmatter parsing for content bodies.
//!
//! A body may start with a `---` delimited YAML block carrying a title
//! and tags. Bodies come from user edits and imports, so nothing here is
//! allowed to fail: a malformed or absent block yields empty metadata and
//! the whole body is treated as plain content.

use std::collections::HashMap;

use crate::tags::sanitize_tags;

use super::models::FileMeta;

/// Split a body into its parsed metadata and the remaining content.
pub fn parse_body(body: &str) -> (FileMeta, &str) {
    let (block, content) = match split_frontmatter(body) {
        Some(parts) => parts,
        None => return (FileMeta::default(), body),
    };

    let fields: HashMap<String, serde_yaml::Value> = match serde_yaml::from_str(block) {
        Ok(fields) => fields,
        Err(e) => {
            log::debug!("ignoring malformed frontmatter block: {}", e);
            return (FileMeta::default(), body);
        }
    };

    let title = fields
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let tags = fields.get("tags").map(tag_values).unwrap_or_default();

    (FileMeta { title, tags }, content)
}

/// Parse only the metadata of a body.
pub fn parse_meta(body: &str) -> FileMeta {
    parse_body(body).0
}

fn split_frontmatter(body: &str) -> Option<(&str, &str)> {
    let rest = body.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let block = &rest[..end];
    let content = rest[end + 4..].trim_start();
    Some((block, content))
}

/// Tags may be a YAML sequence or a single comma-separated string.
fn tag_values(value: &serde_yaml::Value) -> Vec<String> {
    match value {
        serde_yaml::Value::Sequence(seq) => {
            sanitize_tags(seq.iter().filter_map(|v| v.as_str()))
        }
        serde_yaml::Value::String(s) => sanitize_tags([s.as_str()]),
        _ => Vec::new(),
    }
}
