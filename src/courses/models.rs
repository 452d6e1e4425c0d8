//! Data models for course content and the navigation tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filename of the placeholder row that keeps an otherwise-empty
/// directory visible in the flat content table.
pub const SENTINEL_NAME: &str = ".placeholder";

/// A flat, path-addressed content row as the store produces it.
///
/// `(owner_id, path)` is unique; the store enforces that, the tree
/// compiler assumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub owner_id: Uuid,
    /// Ordered path segments, e.g. `["calculus", "limits.md"]`
    pub path: Vec<String>,
    pub body: String,
    /// Marks a synthetic empty-directory placeholder
    #[serde(default)]
    pub is_sentinel: bool,
    pub updated_at: DateTime<Utc>,
}

/// Metadata parsed from a file's frontmatter block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Whether a tree node is a content file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    File,
    Directory,
}

/// A node in the compiled navigation forest. Derived per request,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Final path segment
    pub name: String,
    /// Full path from the root
    pub path: Vec<String>,
    pub kind: NodeKind,
    /// Present on file leaves only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FileMeta>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

/// A file surfaced by a tag query: its path plus a display title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedFile {
    pub path: Vec<String>,
    pub title: String,
}
