use anyhow::{Context, Result};
use std::path::Path;

/// Fetches a repository into a local directory. The service holds one of
/// these behind an `Arc` so tests can swap in a fake.
pub trait RepoCloner: Send + Sync + 'static {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
}

/// libgit2-backed cloner. Tries a depth-1 clone first and falls back to a
/// full clone, with credentials taken from `GIT_USERNAME` / `GIT_PASSWORD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCloner;

fn fetch_options<'a>(depth: Option<i32>) -> git2::FetchOptions<'a> {
    let mut fo = git2::FetchOptions::new();
    if let Some(d) = depth {
        fo.depth(d);
    }
    let mut callbacks = git2::RemoteCallbacks::new();
    if let (Ok(user), Ok(pass)) = (std::env::var("GIT_USERNAME"), std::env::var("GIT_PASSWORD")) {
        callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
            git2::Cred::userpass_plaintext(&user, &pass)
        });
    }
    fo.remote_callbacks(callbacks);
    fo
}

impl RepoCloner for GitCloner {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let mut rb = git2::build::RepoBuilder::new();
        rb.fetch_options(fetch_options(Some(1)));
        match rb.clone(url, dest) {
            Ok(_) => {
                tracing::debug!(url = %url, dest = %dest.display(), "shallow clone done");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "shallow clone failed, retrying full clone");
            }
        }

        // libgit2 leaves a partial tree behind on failure
        if dest.exists() {
            std::fs::remove_dir_all(dest)
                .with_context(|| format!("remove partial clone {}", dest.display()))?;
        }

        let mut rb = git2::build::RepoBuilder::new();
        rb.fetch_options(fetch_options(None));
        rb.clone(url, dest)
            .with_context(|| format!("clone {} into {}", url, dest.display()))?;
        tracing::debug!(url = %url, dest = %dest.display(), "full clone done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn commit_fixture(dir: &Path) {
        let repo = git2::Repository::init(dir).expect("init repo");
        fs::write(dir.join("main.go"), "package main\nfunc main() {}\n").unwrap();
        let mut index = repo.index().expect("index");
        index.add_path(Path::new("main.go")).expect("add");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let sig = git2::Signature::now("Test User", "test@example.com").expect("sig");
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .expect("commit");
    }

    #[test]
    fn clones_local_repository() {
        let src = tempfile::tempdir().unwrap();
        commit_fixture(src.path());
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("acme").join("widgets");

        let url = format!("file://{}", src.path().display());
        GitCloner.clone_repo(&url, &dest).expect("clone");
        let body = fs::read_to_string(dest.join("main.go")).unwrap();
        assert!(body.contains("func main"));
    }

    #[test]
    fn missing_remote_fails_without_leftovers() {
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("nothing");
        let url = format!("file://{}", out.path().join("no-such-repo").display());
        assert!(GitCloner.clone_repo(&url, &dest).is_err());
        assert!(!dest.join("main.go").exists());
    }
}
