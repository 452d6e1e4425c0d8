//! Shared tag sanitation.
//!
//! Tags arrive from two places: frontmatter metadata blocks on content
//! records, and free-form user input on card generation. Both routes pass
//! through [`sanitize_tags`] so the rest of the system only ever sees
//! lowercase, trimmed, deduplicated tags in a stable order.

use std::collections::BTreeSet;

/// Sanitize a collection of raw tags.
///
/// Each item may itself be a comma-separated list (so a single
/// `"Math, Physics"` string and a `["Math", "Physics"]` sequence come out
/// the same). Entries are lower-cased, trimmed, deduplicated and returned
/// in lexicographic order; empty entries are discarded.
pub fn sanitize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    for tag in tags {
        for part in tag.as_ref().split(',') {
            let tag = part.trim().to_lowercase();
            if !tag.is_empty() {
                seen.insert(tag);
            }
        }
    }
    seen.into_iter().collect()
}
