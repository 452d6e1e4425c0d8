//! Navigation tree compilation
//!
//! Rebuilds an ordered forest from the flat, path-addressed content rows
//! of one owner. This runs on every navigation request and is a pure
//! function of its input: records are sorted internally, so the same
//! record set produces the same forest regardless of input order.

use std::collections::HashMap;

use super::frontmatter;
use super::models::{ContentRecord, FileMeta, NodeKind, TreeNode};

/// Compile one owner's content records into an ordered forest.
///
/// Sentinel records collapse to the directory they mark (their own
/// filename is dropped). Every path prefix becomes a node exactly once,
/// directories synthesized from intermediate segments included. File
/// metadata is parsed from the record body and attached to file leaves
/// only; a malformed metadata block degrades to empty metadata and never
/// aborts compilation.
pub fn compile_tree(records: &[ContentRecord]) -> Vec<TreeNode> {
    let mut sorted: Vec<&ContentRecord> = records.iter().collect();
    // Joined-path byte order, the same ordering the store's path column
    // gives, so child order never depends on where the records came from
    sorted.sort_by_cached_key(|r| r.path.join("/"));

    let mut slots: Vec<Slot> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();

    for record in sorted {
        let mut segments = record.path.clone();
        if record.is_sentinel {
            // The sentinel's own filename is not content; it marks its
            // parent directory.
            segments.pop();
            if segments.is_empty() {
                continue;
            }
        }

        for depth in 0..segments.len() {
            let prefix = &segments[..=depth];
            if index.contains_key(prefix) {
                continue;
            }

            let is_final = depth == segments.len() - 1;
            let kind = if !is_final || record.is_sentinel {
                NodeKind::Directory
            } else {
                NodeKind::File
            };
            let meta: Option<FileMeta> =
                (kind == NodeKind::File).then(|| frontmatter::parse_meta(&record.body));

            let idx = slots.len();
            slots.push(Slot {
                name: segments[depth].clone(),
                path: prefix.to_vec(),
                kind,
                meta,
                children: Vec::new(),
            });
            index.insert(prefix.to_vec(), idx);

            if depth == 0 {
                roots.push(idx);
            } else {
                // Parent exists: prefixes are processed shortest-first
                let parent = index[&segments[..depth]];
                slots[parent].children.push(idx);
            }
        }
    }

    roots.into_iter().map(|idx| materialize(&slots, idx)).collect()
}

struct Slot {
    name: String,
    path: Vec<String>,
    kind: NodeKind,
    meta: Option<FileMeta>,
    children: Vec<usize>,
}

fn materialize(slots: &[Slot], idx: usize) -> TreeNode {
    let slot = &slots[idx];
    TreeNode {
        name: slot.name.clone(),
        path: slot.path.clone(),
        kind: slot.kind,
        meta: slot.meta.clone(),
        children: slot.children.iter().map(|&c| materialize(slots, c)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::models::SENTINEL_NAME;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(path: &[&str], body: &str) -> ContentRecord {
        ContentRecord {
            owner_id: Uuid::nil(),
            path: path.iter().map(|s| s.to_string()).collect(),
            body: body.to_string(),
            is_sentinel: false,
            updated_at: Utc::now(),
        }
    }

    fn sentinel(dir: &[&str]) -> ContentRecord {
        let mut path: Vec<&str> = dir.to_vec();
        path.push(SENTINEL_NAME);
        ContentRecord {
            is_sentinel: true,
            ..record(&path, "placeholder")
        }
    }

    #[test]
    fn test_sentinel_collapses_to_directory() {
        let records = vec![record(&["A", "B", "C"], "body"), sentinel(&["A"])];
        let forest = compile_tree(&records);

        assert_eq!(forest.len(), 1);
        let a = &forest[0];
        assert_eq!(a.name, "A");
        assert_eq!(a.kind, NodeKind::Directory);
        assert_eq!(a.children.len(), 1);

        let b = &a.children[0];
        assert_eq!(b.name, "B");
        assert_eq!(b.kind, NodeKind::Directory);

        let c = &b.children[0];
        assert_eq!(c.name, "C");
        assert_eq!(c.kind, NodeKind::File);
        assert!(c.children.is_empty());

        // The sentinel itself never surfaces as a leaf
        fn names(nodes: &[TreeNode], out: &mut Vec<String>) {
            for n in nodes {
                out.push(n.name.clone());
                names(&n.children, out);
            }
        }
        let mut all = Vec::new();
        names(&forest, &mut all);
        assert!(!all.iter().any(|n| n == SENTINEL_NAME));
    }

    #[test]
    fn test_pure_function_of_input_set() {
        let a = record(&["x", "1.md"], "one");
        let b = record(&["x", "2.md"], "two");
        let c = sentinel(&["y"]);

        let forward = compile_tree(&[a.clone(), b.clone(), c.clone()]);
        let reversed = compile_tree(&[c, b, a]);

        assert_eq!(
            serde_json::to_value(&forward).unwrap(),
            serde_json::to_value(&reversed).unwrap()
        );
    }

    #[test]
    fn test_children_ordered_by_path_bytes() {
        let records = vec![
            record(&["dir", "zeta.md"], ""),
            record(&["dir", "alpha.md"], ""),
            record(&["dir", "Beta.md"], ""),
        ];
        let forest = compile_tree(&records);
        let names: Vec<&str> = forest[0].children.iter().map(|n| n.name.as_str()).collect();
        // Byte order: uppercase before lowercase
        assert_eq!(names, vec!["Beta.md", "alpha.md", "zeta.md"]);
    }

    #[test]
    fn test_roots_follow_joined_path_byte_order() {
        // '!' (0x21) sorts before '/' (0x2f), so in joined-path bytes
        // "A!" precedes "A/B" even though segment-wise "A" precedes "A!"
        let records = vec![record(&["A", "B"], ""), record(&["A!"], "")];
        let forest = compile_tree(&records);

        let roots: Vec<&str> = forest.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(roots, vec!["A!", "A"]);
    }

    #[test]
    fn test_meta_on_file_leaves_only() {
        let body = "---\ntitle: Limits\ntags: calculus\n---\ncontent";
        let records = vec![record(&["math", "limits.md"], body)];
        let forest = compile_tree(&records);

        let dir = &forest[0];
        assert!(dir.meta.is_none());

        let file = &dir.children[0];
        let meta = file.meta.as_ref().unwrap();
        assert_eq!(meta.title.as_deref(), Some("Limits"));
        assert_eq!(meta.tags, vec!["calculus"]);
    }

    #[test]
    fn test_malformed_meta_does_not_abort() {
        let records = vec![
            record(&["a.md"], "---\n: : bad yaml [[\n---\nx"),
            record(&["b.md"], "plain"),
        ];
        let forest = compile_tree(&records);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].meta, Some(FileMeta::default()));
    }

    #[test]
    fn test_root_sentinel_is_skipped() {
        let records = vec![sentinel(&[])];
        assert!(compile_tree(&records).is_empty());
    }

    #[test]
    fn test_sentinel_tolerated_next_to_real_descendants() {
        // The caller should delete the sentinel once a real child exists,
        // but the compiler must accept both states.
        let records = vec![sentinel(&["notes"]), record(&["notes", "day1.md"], "")];
        let forest = compile_tree(&records);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].kind, NodeKind::Directory);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].name, "day1.md");
    }

    #[test]
    fn test_one_node_per_distinct_path() {
        let records = vec![
            record(&["a", "b", "one.md"], ""),
            record(&["a", "b", "two.md"], ""),
            sentinel(&["a", "b"]),
        ];
        let forest = compile_tree(&records);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children.len(), 1);
        let b = &forest[0].children[0];
        assert_eq!(b.children.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(compile_tree(&[]).is_empty());
    }
}
