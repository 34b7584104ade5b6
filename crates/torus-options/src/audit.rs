//! Usage audit: reporting configuration entries that were never read.
//!
//! A leaf is a node whose value is not unset. The audit walks a subtree
//! depth-first and reports the qualified path of every leaf never
//! successfully read, so callers can detect dead or misspelled
//! configuration entries after setup.

use std::fmt::Write as _;

use crate::node::Options;

/// One unread leaf, as reported by [`Options::unused`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnusedEntry {
    /// Qualified path of the leaf
    pub path: String,
    /// Rendering of the stored value
    pub value: String,
    /// Provenance recorded when the value was set
    pub source: String,
}

impl Options {
    /// Depth-first enumeration of unread leaves in this subtree.
    pub fn unused(&self) -> Vec<UnusedEntry> {
        let mut entries = Vec::new();
        self.collect_unused(&mut entries);
        entries
    }

    fn collect_unused(&self, entries: &mut Vec<UnusedEntry>) {
        {
            let inner = self.inner.borrow();
            if !inner.value.is_unset() && !inner.used {
                entries.push(UnusedEntry {
                    path: self.path(),
                    value: inner.value.to_string(),
                    source: inner.value_source.clone(),
                });
            }
        }
        for child in self.children() {
            child.collect_unused(entries);
        }
    }

    /// Render the unused report as text: one line per unread leaf, or a
    /// single all-used summary.
    pub fn render_unused(&self) -> String {
        let unused = self.unused();
        if unused.is_empty() {
            return "All options used\n".to_string();
        }
        let mut report = String::from("Unused options:\n");
        for entry in &unused {
            if entry.source.is_empty() {
                let _ = writeln!(report, "  {} = {}", entry.path, entry.value);
            } else {
                let _ = writeln!(report, "  {} = {} ({})", entry.path, entry.value, entry.source);
            }
        }
        report
    }

    /// Log the unused report: one warning per unread leaf, or a single
    /// info-level all-used summary.
    pub fn log_unused(&self) {
        let unused = self.unused();
        if unused.is_empty() {
            tracing::info!("All options used");
            return;
        }
        for entry in &unused {
            tracing::warn!(
                option = %entry.path,
                value = %entry.value,
                source = %entry.source,
                "Option never used"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tree() -> Options {
        let options = Options::new();
        let section1 = options.at("section1");
        options.set("key1", "a", "code").unwrap();
        section1.set("key2", "b", "code").unwrap();
        options.set("key3", "c", "code").unwrap();
        section1.set("key4", "d", "code").unwrap();
        options
    }

    #[test]
    fn test_all_keys_reported_before_any_read() {
        let options = make_tree();

        // section1 was created before key1, so the walk visits it first
        let paths: Vec<String> = options.unused().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, ["section1:key2", "section1:key4", "key1", "key3"]);
    }

    #[test]
    fn test_reads_remove_keys_from_report() {
        let options = make_tree();

        // Reads with logging disabled still count as usage
        options.get("key1", "--".to_string(), false).unwrap();
        options.at("section1").get("key2", "--".to_string(), false).unwrap();

        let paths: Vec<String> = options.unused().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, ["section1:key4", "key3"]);

        options.get("key3", "--".to_string(), false).unwrap();
        options.at("section1").get("key4", "--".to_string(), false).unwrap();

        assert!(options.unused().is_empty());
        assert_eq!(options.render_unused(), "All options used\n");
    }

    #[test]
    fn test_default_only_keys_are_not_leaves() {
        let options = Options::new();
        options.get("optional", 42, true).unwrap();

        // A defaulted read leaves the node unset, so it is not a leaf
        assert!(options.unused().is_empty());
    }

    #[test]
    fn test_unused_report_rendering() {
        let options = make_tree();
        options.get("key1", "--".to_string(), true).unwrap();

        insta::assert_snapshot!(options.render_unused(), @r"
        Unused options:
          section1:key2 = b (code)
          section1:key4 = d (code)
          key3 = c (code)
        ");
    }
}
