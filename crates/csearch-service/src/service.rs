//! Index and search pipelines behind the HTTP routes. Both are blocking and
//! are meant to run on the blocking pool.

use csearch_rs::{search_master, CompiledQuery, CsearchError, Deadline, MasterIndex, UpdateOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::clone::RepoCloner;
use crate::config::ServiceConfig;
use crate::workspace::resolve_workspace;

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub master: Arc<MasterIndex>,
    pub cloner: Arc<dyn RepoCloner>,
}

impl AppState {
    pub fn new(config: ServiceConfig, cloner: Arc<dyn RepoCloner>) -> Self {
        let master = Arc::new(config.master());
        Self {
            config: Arc::new(config),
            master,
            cloner,
        }
    }

    /// Deadline for a request that arrived at `arrival`.
    pub fn deadline(&self, arrival: Instant) -> Deadline {
        Deadline::at(arrival + self.config.request_timeout)
    }

    /// Clone the repository named by the JSON body and fold it into the
    /// master index. The writer lock is held from before the clone until the
    /// new master is promoted.
    pub fn index_repo(
        &self,
        body: &[u8],
        deadline: Deadline,
    ) -> Result<UpdateOutcome, CsearchError> {
        let v: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| CsearchError::invalid(format!("invalid request body: {}", e)))?;
        let repo = v.get("repo").and_then(|r| r.as_str());
        let dest = absolute(resolve_workspace(&self.config.workspace_root, repo)?)?;
        // resolve_workspace has already rejected a missing repo
        let url = repo.unwrap_or_default();
        self.guard_dest(&dest)?;

        let lease = self.master.lock(deadline)?;
        prepare_dest(&dest)?;
        tracing::info!(repo = %url, dest = %dest.display(), "cloning repository");
        self.cloner
            .clone_repo(url, &dest)
            .map_err(|e| CsearchError::Clone(format!("{:#}", e)))?;
        deadline.check("clone")?;

        let outcome = self.master.update(&lease, &[dest], deadline)?;
        tracing::info!(
            repo = %url,
            mode = ?outcome.mode,
            submitted = outcome.build.submitted,
            failed = outcome.build.failed,
            "repository indexed"
        );
        Ok(outcome)
    }

    /// Compile `q` with `args` and search the current master.
    pub fn search_repo(
        &self,
        q: Option<&str>,
        args: Option<&str>,
        deadline: Deadline,
    ) -> Result<String, CsearchError> {
        let query = CompiledQuery::compile(q, args)?;
        let outcome = search_master(&self.master, &query, deadline)?;
        tracing::debug!(
            pattern = %outcome.report.pattern,
            candidates = outcome.report.candidates,
            matched = outcome.report.matched,
            elapsed_ms = outcome.report.elapsed_ms,
            "search done"
        );
        Ok(outcome.output)
    }
}

impl AppState {
    /// The working tree is wiped before cloning, so it must never hold the
    /// master or its lock file.
    fn guard_dest(&self, dest: &Path) -> Result<(), CsearchError> {
        let dest = comparable(dest);
        for held in [self.master.path(), self.master.lock_path()] {
            if comparable(&absolute(held.to_path_buf())?).starts_with(&dest) {
                return Err(CsearchError::invalid(format!(
                    "repo workspace {} would contain the index {}",
                    dest.display(),
                    held.display()
                )));
            }
        }
        Ok(())
    }
}

/// Canonical form of `p` when it exists; otherwise `p` with its nearest
/// existing ancestor canonicalized.
fn comparable(p: &Path) -> PathBuf {
    if let Ok(c) = std::fs::canonicalize(p) {
        return c;
    }
    match (p.parent(), p.file_name()) {
        (Some(parent), Some(name)) => comparable(parent).join(name),
        _ => p.to_path_buf(),
    }
}

fn absolute(p: PathBuf) -> Result<PathBuf, CsearchError> {
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| CsearchError::IndexWrite(format!("current directory: {}", e)))?;
    Ok(cwd.join(p))
}

/// Every index request starts from an empty working tree.
fn prepare_dest(dest: &Path) -> Result<(), CsearchError> {
    let prep = |what: &str, e: std::io::Error| {
        CsearchError::Clone(format!("{} {}: {}", what, dest.display(), e))
    };
    if dest.exists() {
        tracing::debug!(dest = %dest.display(), "removing previous working tree");
        std::fs::remove_dir_all(dest).map_err(|e| prep("remove", e))?;
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| prep("create parent of", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, FakeCloner};
    use std::time::Duration;

    fn state(dir: &Path, cloner: FakeCloner) -> AppState {
        let config = ServiceConfig {
            workspace_root: dir.join("work"),
            master_index: dir.join(".csearchindex"),
            ..Default::default()
        };
        AppState::new(config, Arc::new(cloner))
    }

    #[test]
    fn index_then_search() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let cloner = FakeCloner::with_files(&[("src/lib.rs", "pub fn parse_header() {}\n")]);
        let st = state(dir.path(), cloner.clone());

        let body = br#"{"repo":"https://github.com/acme/widgets"}"#;
        st.index_repo(body, Deadline::none()).expect("index");
        assert_eq!(cloner.calls(), 1);
        assert!(dir.path().join("work/acme/widgets/src/lib.rs").is_file());

        let out = st
            .search_repo(Some("parse_header"), Some("-n"), Deadline::none())
            .expect("search");
        assert!(out.contains("src/lib.rs:1:pub fn parse_header() {}"), "{}", out);
    }

    #[test]
    fn reindex_starts_from_clean_tree() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), FakeCloner::with_files(&[("a.txt", "alpha beta\n")]));
        let body = br#"{"repo":"https://h/o/r"}"#;
        st.index_repo(body, Deadline::none()).unwrap();

        let stale = dir.path().join("work/o/r/stale.txt");
        std::fs::write(&stale, "leftover gamma\n").unwrap();
        st.index_repo(body, Deadline::none()).unwrap();
        assert!(!stale.exists());
        match st.search_repo(Some("leftover"), Some("-l"), Deadline::none()) {
            Err(CsearchError::NoMatches) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn bad_bodies_are_invalid_requests() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = FakeCloner::default();
        let st = state(dir.path(), cloner.clone());
        for (body, want) in [
            (&b"{}"[..], "repo not found"),
            (&br#"{"repo": 7}"#[..], "repo not found"),
            (&b"not json"[..], "invalid request body"),
        ] {
            match st.index_repo(body, Deadline::none()) {
                Err(CsearchError::InvalidRequest(m)) => assert!(m.contains(want), "{}", m),
                other => panic!("unexpected: {:?}", other.map(|o| o.mode)),
            }
        }
        assert_eq!(cloner.calls(), 0);
        assert!(!st.master.exists());
    }

    #[test]
    fn clone_failure_leaves_master_alone() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), FakeCloner::failing());
        match st.index_repo(br#"{"repo":"https://h/o/r"}"#, Deadline::none()) {
            Err(CsearchError::Clone(m)) => assert!(m.contains("unreachable"), "{}", m),
            other => panic!("unexpected: {:?}", other.map(|o| o.mode)),
        }
        assert!(!st.master.exists());
    }

    #[test]
    fn slow_clone_hits_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = FakeCloner {
            delay: Some(Duration::from_millis(50)),
            ..FakeCloner::with_files(&[("a.txt", "alpha\n")])
        };
        let st = state(dir.path(), cloner);
        let deadline = Deadline::after(Duration::from_millis(10));
        match st.index_repo(br#"{"repo":"https://h/o/r"}"#, deadline) {
            Err(CsearchError::DeadlineExceeded(_)) => {}
            other => panic!("unexpected: {:?}", other.map(|o| o.mode)),
        }
        assert!(!st.master.exists());
    }

    #[test]
    fn workspace_never_swallows_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            workspace_root: dir.path().to_path_buf(),
            master_index: dir.path().join("state").join(".csearchindex"),
            ..Default::default()
        };
        let cloner = FakeCloner::with_files(&[("a.txt", "alpha\n")]);
        let st = AppState::new(config, Arc::new(cloner.clone()));
        st.index_repo(br#"{"repo":"https://h/acme/widgets"}"#, Deadline::none())
            .expect("index widgets");
        let before = std::fs::read(st.master.path()).unwrap();

        for repo in ["https://h/state", "https://other/state/"] {
            let body = format!(r#"{{"repo":"{}"}}"#, repo);
            match st.index_repo(body.as_bytes(), Deadline::none()) {
                Err(CsearchError::InvalidRequest(m)) => {
                    assert!(m.contains("would contain"), "{}", m)
                }
                other => panic!("unexpected: {:?}", other.map(|o| o.mode)),
            }
        }
        assert_eq!(cloner.calls(), 1);
        assert_eq!(std::fs::read(st.master.path()).unwrap(), before);
        assert!(st.master.lock_path().exists());

        let out = st
            .search_repo(Some("alpha"), Some("-l"), Deadline::none())
            .expect("search");
        assert!(out.contains("acme/widgets/a.txt"), "{}", out);
    }

    #[test]
    fn search_without_index_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), FakeCloner::default());
        match st.search_repo(Some("x"), Some("-n"), Deadline::none()) {
            Err(CsearchError::IndexOpen(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
