//! Maps repository URLs onto directories below the workspace root.

use csearch_rs::CsearchError;
use std::path::{Path, PathBuf};
use url::Url;

/// Resolve the clone destination for `repo`: `root` joined with the URL's
/// non-empty path segments. The host is not part of the path.
pub fn resolve_workspace(root: &Path, repo: Option<&str>) -> Result<PathBuf, CsearchError> {
    let repo = match repo.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Err(CsearchError::invalid("repo not found")),
    };
    let url = Url::parse(repo)
        .map_err(|e| CsearchError::invalid(format!("invalid repo url {:?}: {}", repo, e)))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    if segments.is_empty() {
        return Err(CsearchError::invalid(format!(
            "repo url {:?} has no path",
            repo
        )));
    }
    let mut dest = root.to_path_buf();
    for seg in segments {
        if seg == "." || seg == ".." || seg.contains('\\') || seg.contains('\0') {
            return Err(CsearchError::invalid(format!(
                "repo url {:?} has unusable path segment {:?}",
                repo, seg
            )));
        }
        dest.push(seg);
    }
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(r: Result<PathBuf, CsearchError>) -> String {
        match r {
            Err(CsearchError::InvalidRequest(m)) => m,
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn joins_path_segments() {
        let got =
            resolve_workspace(Path::new("/tmp"), Some("https://github.com/acme/widgets")).unwrap();
        assert_eq!(got, PathBuf::from("/tmp/acme/widgets"));

        let got = resolve_workspace(Path::new("/w"), Some("https://host/a//b/c.git/")).unwrap();
        assert_eq!(got, PathBuf::from("/w/a/b/c.git"));
    }

    #[test]
    fn missing_repo_is_rejected() {
        assert_eq!(message(resolve_workspace(Path::new("/tmp"), None)), "repo not found");
        assert_eq!(message(resolve_workspace(Path::new("/tmp"), Some("  "))), "repo not found");
    }

    #[test]
    fn unusable_urls_are_rejected() {
        let tmp = Path::new("/tmp");
        assert!(message(resolve_workspace(tmp, Some("not a url"))).contains("invalid repo url"));
        assert!(message(resolve_workspace(tmp, Some("https://github.com/"))).contains("no path"));
        assert!(message(resolve_workspace(tmp, Some("https://github.com"))).contains("no path"));
    }

    #[test]
    fn dot_segments_cannot_escape_root() {
        // the url parser normalizes dot segments before we see them
        let got = resolve_workspace(Path::new("/w"), Some("https://h/a/../../b")).unwrap();
        assert_eq!(got, PathBuf::from("/w/b"));
    }
}
