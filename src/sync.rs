//! # Sync Engine
//!
//! One state machine per package, all launched together. A job works on a
//! [`SyncJob`] snapshot, so it never touches the graph while awaiting git.
//! Its terminal [`SyncOutcome`] is applied to the graph by [`apply`] on the
//! driving task as soon as the job finishes.
//!
//! ```text
//! disabled ──────────────────────────────────────────────▶ Disabled
//! exists && pin ─────────────────────────────────────────▶ Pinned
//! !exists ── clone ──┬─ ok ──▶ Installed        (invalidate)
//!                    └─ err ─▶ Failed(clone)
//! exists ── rev ── fetch ── rev(FETCH_HEAD) ─┬─ same ────▶ Skipped
//!                                            └─ differs ─ reset ─▶ Updated (invalidate)
//! ```
//!
//! Any failing step short-circuits to `Failed`, leaving the clone at its
//! prior revision.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::git::{remove_partial_clone, GitOperations};
use crate::graph::Graph;
use crate::package::NodeId;

/// Ref whose revision is recorded after a fetch.
pub const FETCH_HEAD: &str = "FETCH_HEAD";

/// What a sync pass is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Install missing packages and update installed ones.
    #[default]
    Update,
    /// Install missing packages only; installed ones are skipped offline.
    Install,
}

/// The step of a sync state machine that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Clone,
    Revision,
    Fetch,
    Reset,
    Timeout,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStage::Clone => "clone",
            SyncStage::Revision => "rev-parse",
            SyncStage::Fetch => "fetch",
            SyncStage::Reset => "reset",
            SyncStage::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Terminal state of one package's sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Disabled,
    Pinned,
    Installed { revision: Option<String> },
    Skipped { revision: Option<String> },
    Updated { from: String, to: String },
    Failed { stage: SyncStage, error: String },
}

impl SyncOutcome {
    /// Whether the local clone changed and the package must be re-propagated.
    pub fn changed(&self) -> bool {
        matches!(self, SyncOutcome::Installed { .. } | SyncOutcome::Updated { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }

    /// Short label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Disabled => "disabled",
            SyncOutcome::Pinned => "pinned",
            SyncOutcome::Installed { .. } => "installed",
            SyncOutcome::Skipped { .. } => "skipped",
            SyncOutcome::Updated { .. } => "updated",
            SyncOutcome::Failed { .. } => "failed",
        }
    }
}

/// Everything a sync state machine needs to know about its package.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub node: NodeId,
    pub id: String,
    pub url: String,
    pub branch: Option<String>,
    pub dir: PathBuf,
    pub exists: bool,
    pub pin: bool,
    pub enabled: bool,
}

impl SyncJob {
    /// Snapshot `node` for syncing into `base_dir`. The root has no job.
    pub fn new(graph: &Graph, node: NodeId, base_dir: &Path) -> Option<Self> {
        let url = graph.source_url(node)?;
        let pkg = graph.node(node);
        Some(Self {
            node,
            id: pkg.id.clone(),
            url,
            branch: pkg.branch.clone(),
            dir: pkg.dir(base_dir),
            exists: pkg.exists,
            pin: pkg.pin,
            enabled: pkg.enabled,
        })
    }

    /// The ref fetched on update: the configured branch, else the remote HEAD.
    pub fn fetch_ref(&self) -> &str {
        self.branch.as_deref().unwrap_or("HEAD")
    }
}

/// A finished job.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub node: NodeId,
    pub id: String,
    pub outcome: SyncOutcome,
    pub elapsed: Duration,
}

fn failed(stage: SyncStage, error: Error) -> SyncOutcome {
    SyncOutcome::Failed {
        stage,
        error: error.to_string(),
    }
}

/// Drive one package's state machine to a terminal state.
pub async fn sync_package(git: &dyn GitOperations, job: &SyncJob, mode: SyncMode) -> SyncOutcome {
    if !job.enabled {
        return SyncOutcome::Disabled;
    }

    if !job.exists {
        if let Err(e) = git.clone_shallow(&job.url, job.branch.as_deref(), &job.dir).await {
            return failed(SyncStage::Clone, e);
        }
        let revision = match git.revision(&job.dir, "HEAD").await {
            Ok(rev) => Some(rev),
            Err(e) => {
                log::warn!("{}: installed but revision is unknown: {}", job.id, e);
                None
            }
        };
        return SyncOutcome::Installed { revision };
    }

    if job.pin {
        return SyncOutcome::Pinned;
    }

    if mode == SyncMode::Install {
        let revision = git.revision(&job.dir, "HEAD").await.ok();
        return SyncOutcome::Skipped { revision };
    }

    let before = match git.revision(&job.dir, "HEAD").await {
        Ok(rev) => rev,
        Err(e) => return failed(SyncStage::Revision, e),
    };
    if let Err(e) = git.fetch(&job.dir, job.fetch_ref()).await {
        return failed(SyncStage::Fetch, e);
    }
    let after = match git.revision(&job.dir, FETCH_HEAD).await {
        Ok(rev) => rev,
        Err(e) => return failed(SyncStage::Revision, e),
    };

    if before == after {
        return SyncOutcome::Skipped {
            revision: Some(before),
        };
    }

    if let Err(e) = git.reset_hard(&job.dir, &after).await {
        return failed(SyncStage::Reset, e);
    }
    SyncOutcome::Updated {
        from: before,
        to: after,
    }
}

/// Run one job to completion, bounded by `timeout` when given.
pub async fn run_job(
    git: Arc<dyn GitOperations>,
    job: SyncJob,
    mode: SyncMode,
    timeout: Option<Duration>,
) -> SyncResult {
    let started = Instant::now();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, sync_package(git.as_ref(), &job, mode)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // An interrupted clone must not pass for an install next run.
                if job.enabled && !job.exists {
                    remove_partial_clone(&job.dir).await;
                }
                failed(
                    SyncStage::Timeout,
                    Error::Timeout {
                        package: job.id.clone(),
                        seconds: limit.as_secs(),
                    },
                )
            }
        },
        None => sync_package(git.as_ref(), &job, mode).await,
    };

    SyncResult {
        node: job.node,
        id: job.id,
        outcome,
        elapsed: started.elapsed(),
    }
}

/// Fold a finished job back into the graph and log it.
pub fn apply(graph: &mut Graph, result: &SyncResult) {
    let node = result.node;
    graph.node_mut(node).timings.sync = Some(result.elapsed);

    match &result.outcome {
        SyncOutcome::Disabled => log::debug!("{}: disabled", result.id),
        SyncOutcome::Pinned => log::debug!("{}: pinned", result.id),
        SyncOutcome::Skipped { revision } => {
            if revision.is_some() {
                graph.node_mut(node).revision = revision.clone();
            }
            log::debug!("{}: up to date", result.id);
        }
        SyncOutcome::Installed { revision } => {
            let pkg = graph.node_mut(node);
            pkg.exists = true;
            pkg.revision = revision.clone();
            graph.invalidate(node);
            log::info!("{}: installed", result.id);
        }
        SyncOutcome::Updated { from, to } => {
            graph.node_mut(node).revision = Some(to.clone());
            graph.invalidate(node);
            log::info!("{}: updated {}..{}", result.id, from, to);
        }
        SyncOutcome::Failed { stage, error } => {
            log::error!("{}: {} failed: {}", result.id, stage, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::spec::Spec;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted git double: revisions per ref, optional failing step.
    #[derive(Default)]
    struct FakeGit {
        head: String,
        fetch_head: String,
        fail: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGit {
        fn new(head: &str, fetch_head: &str) -> Self {
            Self {
                head: head.to_string(),
                fetch_head: fetch_head.to_string(),
                ..Default::default()
            }
        }

        fn failing(mut self, step: &'static str) -> Self {
            self.fail = Some(step);
            self
        }

        fn step(&self, name: &str) -> Result<()> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.fail == Some(name) {
                return Err(Error::GitCommand {
                    command: format!("git {}", name),
                    dir: String::new(),
                    output: "boom".to_string(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitOperations for FakeGit {
        async fn revision(&self, _dir: &Path, r#ref: &str) -> Result<String> {
            self.step("rev-parse")?;
            Ok(if r#ref == FETCH_HEAD {
                self.fetch_head.clone()
            } else {
                self.head.clone()
            })
        }

        async fn clone_shallow(&self, _url: &str, _branch: Option<&str>, _target: &Path) -> Result<()> {
            self.step("clone")
        }

        async fn fetch(&self, _dir: &Path, _ref: &str) -> Result<()> {
            self.step("fetch")
        }

        async fn reset_hard(&self, _dir: &Path, _revision: &str) -> Result<()> {
            self.step("reset")
        }
    }

    fn job(exists: bool) -> SyncJob {
        SyncJob {
            node: NodeId(1),
            id: "a/a".to_string(),
            url: "https://example.com/a/a.git".to_string(),
            branch: None,
            dir: PathBuf::from("/tmp/packsync/a"),
            exists,
            pin: false,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_disabled_is_noop() {
        let git = FakeGit::new("1", "2");
        let mut j = job(true);
        j.enabled = false;
        assert_eq!(sync_package(&git, &j, SyncMode::Update).await, SyncOutcome::Disabled);
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pinned_installed_is_noop() {
        let git = FakeGit::new("1", "2");
        let mut j = job(true);
        j.pin = true;
        assert_eq!(sync_package(&git, &j, SyncMode::Update).await, SyncOutcome::Pinned);
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pinned_missing_is_still_installed() {
        let git = FakeGit::new("abc", "abc");
        let mut j = job(false);
        j.pin = true;
        let outcome = sync_package(&git, &j, SyncMode::Update).await;
        assert!(matches!(outcome, SyncOutcome::Installed { .. }));
    }

    #[tokio::test]
    async fn test_missing_is_cloned() {
        let git = FakeGit::new("abc", "abc");
        let outcome = sync_package(&git, &job(false), SyncMode::Update).await;
        assert_eq!(
            outcome,
            SyncOutcome::Installed {
                revision: Some("abc".to_string())
            }
        );
        assert_eq!(git.calls(), vec!["clone", "rev-parse"]);
    }

    #[tokio::test]
    async fn test_clone_failure() {
        let git = FakeGit::new("abc", "abc").failing("clone");
        let outcome = sync_package(&git, &job(false), SyncMode::Update).await;
        assert!(matches!(
            outcome,
            SyncOutcome::Failed {
                stage: SyncStage::Clone,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unchanged_revision_is_skipped() {
        let git = FakeGit::new("abc", "abc");
        let outcome = sync_package(&git, &job(true), SyncMode::Update).await;
        assert_eq!(
            outcome,
            SyncOutcome::Skipped {
                revision: Some("abc".to_string())
            }
        );
        assert_eq!(git.calls(), vec!["rev-parse", "fetch", "rev-parse"]);
    }

    #[tokio::test]
    async fn test_changed_revision_is_reset() {
        let git = FakeGit::new("abc", "def");
        let outcome = sync_package(&git, &job(true), SyncMode::Update).await;
        assert_eq!(
            outcome,
            SyncOutcome::Updated {
                from: "abc".to_string(),
                to: "def".to_string()
            }
        );
        assert_eq!(git.calls(), vec!["rev-parse", "fetch", "rev-parse", "reset"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_short_circuits() {
        let git = FakeGit::new("abc", "def").failing("fetch");
        let outcome = sync_package(&git, &job(true), SyncMode::Update).await;
        assert!(matches!(
            outcome,
            SyncOutcome::Failed {
                stage: SyncStage::Fetch,
                ..
            }
        ));
        assert_eq!(git.calls(), vec!["rev-parse", "fetch"]);
    }

    #[tokio::test]
    async fn test_install_mode_does_not_fetch() {
        let git = FakeGit::new("abc", "def");
        let outcome = sync_package(&git, &job(true), SyncMode::Install).await;
        assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
        assert!(!git.calls().contains(&"fetch".to_string()));
    }

    #[test]
    fn test_fetch_ref_defaults_to_head() {
        let mut j = job(true);
        assert_eq!(j.fetch_ref(), "HEAD");
        j.branch = Some("dev".to_string());
        assert_eq!(j.fetch_ref(), "dev");
    }

    #[test]
    fn test_job_snapshot_from_graph() {
        let mut graph = Graph::with_url_format("https://git.example.com/{}.git");
        graph.add(Spec::new("o/a").name("alpha").branch("dev").into()).unwrap();
        graph.finalize();
        let node = graph.get("o/a").unwrap();

        let j = SyncJob::new(&graph, node, Path::new("/base")).unwrap();
        assert_eq!(j.url, "https://git.example.com/o/a.git");
        assert_eq!(j.dir, PathBuf::from("/base/alpha"));
        assert_eq!(j.branch.as_deref(), Some("dev"));
        assert!(SyncJob::new(&graph, graph.root(), Path::new("/base")).is_none());
    }

    #[test]
    fn test_apply_update_invalidates_and_records_revision() {
        let mut graph = Graph::new();
        graph
            .add(Spec::new("b/b").requires(Spec::new("a/a")).into())
            .unwrap();
        graph.add(Spec::new("x/x").into()).unwrap();
        graph.finalize();
        for id in ["a/a", "b/b", "x/x"] {
            let n = graph.get(id).unwrap();
            let pkg = graph.node_mut(n);
            pkg.exists = true;
            pkg.configured = true;
            pkg.loaded = true;
        }

        let a = graph.get("a/a").unwrap();
        apply(
            &mut graph,
            &SyncResult {
                node: a,
                id: "a/a".to_string(),
                outcome: SyncOutcome::Updated {
                    from: "1".to_string(),
                    to: "2".to_string(),
                },
                elapsed: Duration::from_millis(5),
            },
        );

        assert_eq!(graph.package("a/a").unwrap().revision.as_deref(), Some("2"));
        assert!(!graph.package("a/a").unwrap().configured);
        assert!(!graph.package("b/b").unwrap().loaded);
        assert!(graph.package("x/x").unwrap().configured);
    }

    #[test]
    fn test_apply_skipped_leaves_flags() {
        let mut graph = Graph::new();
        graph.add(Spec::new("a/a").into()).unwrap();
        let a = graph.get("a/a").unwrap();
        graph.node_mut(a).exists = true;
        graph.node_mut(a).configured = true;

        apply(
            &mut graph,
            &SyncResult {
                node: a,
                id: "a/a".to_string(),
                outcome: SyncOutcome::Skipped {
                    revision: Some("1".to_string()),
                },
                elapsed: Duration::ZERO,
            },
        );

        assert!(graph.package("a/a").unwrap().configured);
    }

    #[test]
    fn test_apply_failure_leaves_state() {
        let mut graph = Graph::new();
        graph.add(Spec::new("a/a").into()).unwrap();
        let a = graph.get("a/a").unwrap();

        apply(
            &mut graph,
            &SyncResult {
                node: a,
                id: "a/a".to_string(),
                outcome: SyncOutcome::Failed {
                    stage: SyncStage::Clone,
                    error: "nope".to_string(),
                },
                elapsed: Duration::ZERO,
            },
        );

        assert!(!graph.package("a/a").unwrap().exists);
        assert!(graph.package("a/a").unwrap().revision.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_job_timeout_removes_partial_clone() {
        struct HangingGit;

        #[async_trait]
        impl GitOperations for HangingGit {
            async fn revision(&self, _: &Path, _: &str) -> Result<String> {
                Ok("x".to_string())
            }
            async fn clone_shallow(&self, _: &str, _: Option<&str>, target: &Path) -> Result<()> {
                std::fs::create_dir_all(target.join(".git"))?;
                std::future::pending::<()>().await;
                Ok(())
            }
            async fn fetch(&self, _: &Path, _: &str) -> Result<()> {
                Ok(())
            }
            async fn reset_hard(&self, _: &Path, _: &str) -> Result<()> {
                Ok(())
            }
        }

        let temp = tempfile::TempDir::new().unwrap();
        let mut j = job(false);
        j.dir = temp.path().join("a");

        let result = run_job(
            Arc::new(HangingGit),
            j,
            SyncMode::Update,
            Some(Duration::from_secs(2)),
        )
        .await;

        assert!(matches!(
            result.outcome,
            SyncOutcome::Failed {
                stage: SyncStage::Timeout,
                ..
            }
        ));
        assert!(!temp.path().join("a").exists());
    }
}
