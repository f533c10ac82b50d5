//! Removal of stale clones from the base directory.
//!
//! Anything under the base directory whose name does not belong to a known
//! package is deleted. A failed delete is recorded and logged; the rest of
//! the pass carries on.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::filesystem::FileOperations;
use crate::graph::Graph;

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Entry names that were deleted.
    pub removed: Vec<String>,
    /// Entry names that could not be deleted, with the reason.
    pub failed: Vec<(String, String)>,
}

impl CleanReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// On-disk names of every declared package.
pub fn known_names(graph: &Graph) -> HashSet<String> {
    graph
        .packages()
        .map(|(_, pkg)| pkg.name().to_string())
        .collect()
}

/// Entries in `entries` that no known package claims.
pub fn stale_entries(entries: Vec<String>, known: &HashSet<String>) -> Vec<String> {
    entries.into_iter().filter(|e| !known.contains(e)).collect()
}

/// Delete every entry of `base_dir` not named in `known`.
///
/// Only a failure to list `base_dir` is returned as an error.
pub async fn clean(
    base_dir: &Path,
    known: &HashSet<String>,
    fs: &dyn FileOperations,
) -> Result<CleanReport> {
    let entries = fs.list_entries(base_dir).await?;
    let mut report = CleanReport::default();

    for name in stale_entries(entries, known) {
        let path = base_dir.join(&name);
        match fs.remove_all(&path).await {
            Ok(()) => {
                log::info!("Removed {}", path.display());
                report.removed.push(name);
            }
            Err(e) => {
                log::error!("Failed to remove {}: {}", path.display(), e);
                report.failed.push((name, e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::filesystem::DefaultFileOperations;
    use crate::spec::Spec;
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[test]
    fn test_known_names_use_overrides() {
        let mut graph = Graph::new();
        graph.add(Spec::new("o/a").into()).unwrap();
        graph.add(Spec::new("o/b").name("bee").into()).unwrap();

        let known = known_names(&graph);
        assert!(known.contains("a"));
        assert!(known.contains("bee"));
        assert!(!known.contains("b"));
        assert_eq!(known.len(), 2);
    }

    #[tokio::test]
    async fn test_clean_removes_only_unknown_entries() {
        let temp = TempDir::new().unwrap();
        for name in ["a", "bee", "old"] {
            std::fs::create_dir(temp.path().join(name)).unwrap();
        }
        std::fs::write(temp.path().join("stray.txt"), "x").unwrap();

        let known: HashSet<String> = ["a", "bee"].iter().map(|s| s.to_string()).collect();
        let report = clean(temp.path(), &known, &DefaultFileOperations)
            .await
            .unwrap();

        assert_eq!(report.removed, vec!["old", "stray.txt"]);
        assert!(report.is_clean());
        assert!(temp.path().join("a").exists());
        assert!(temp.path().join("bee").exists());
        assert!(!temp.path().join("old").exists());
    }

    #[tokio::test]
    async fn test_clean_missing_base_dir() {
        let temp = TempDir::new().unwrap();
        let report = clean(
            &temp.path().join("nothing"),
            &HashSet::new(),
            &DefaultFileOperations,
        )
        .await
        .unwrap();
        assert_eq!(report, CleanReport::default());
    }

    struct FailingRemove;

    #[async_trait]
    impl FileOperations for FailingRemove {
        async fn is_dir(&self, _: &Path) -> bool {
            true
        }
        async fn list_entries(&self, _: &Path) -> Result<Vec<String>> {
            Ok(vec!["x".to_string(), "y".to_string(), "z".to_string()])
        }
        async fn remove_all(&self, path: &Path) -> Result<()> {
            if path.ends_with("y") {
                return Err(Error::Filesystem {
                    path: path.display().to_string(),
                    message: "permission denied".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_clean_continues_after_failed_delete() {
        let report = clean(Path::new("/base"), &HashSet::new(), &FailingRemove)
            .await
            .unwrap();

        assert_eq!(report.removed, vec!["x", "z"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "y");
        assert!(!report.is_clean());
    }
}
