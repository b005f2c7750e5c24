// Copyright 2025 HyperZoekt Project
// Derived from sourcegraph/zoekt (https://github.com/sourcegraph/zoekt)
// Copyright 2016 Google Inc. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::CsearchError;
use crate::shard::{IndexSink, IndexStats};
use crate::types::Deadline;

use super::utils::is_ignored_name;

/// Walks one or more roots and feeds every regular file to an `IndexSink`.
pub struct IndexBuilder {
    roots: Vec<PathBuf>,
    deadline: Deadline,
}

/// Outcome of one build: files accepted by the walk, per-file failures and
/// the statistics of the flushed generation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BuildReport {
    pub submitted: usize,
    pub failed: usize,
    pub stats: IndexStats,
}

impl IndexBuilder {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            deadline: Deadline::none(),
        }
    }

    pub fn deadline(mut self, d: Deadline) -> Self {
        self.deadline = d;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Walk every root and flush `sink`. Roots are walked even when their own
    /// name would be ignored; entries below them are filtered by name and
    /// symlinks are not followed.
    pub fn build_into<S: IndexSink>(&self, mut sink: S) -> Result<BuildReport, CsearchError> {
        let mut report = BuildReport::default();
        sink.add_roots(&self.roots);
        for root in &self.roots {
            let mut builder = ignore::WalkBuilder::new(root);
            builder
                .standard_filters(false)
                .follow_links(false)
                .sort_by_file_name(|a, b| a.cmp(b))
                .filter_entry(|e| {
                    e.depth() == 0 || !is_ignored_name(&e.file_name().to_string_lossy())
                });
            for result in builder.build() {
                self.deadline.check("index build")?;
                let entry = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(root = %root.display(), error = %e, "walk error");
                        report.failed += 1;
                        continue;
                    }
                };
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                match sink.add_file(entry.path()) {
                    Ok(()) => report.submitted += 1,
                    Err(e) => {
                        tracing::warn!(
                            path = %entry.path().display(),
                            error = %format!("{:#}", e),
                            "skipping file"
                        );
                        report.failed += 1;
                    }
                }
            }
        }
        report.stats = sink
            .flush()
            .map_err(|e| CsearchError::IndexWrite(CsearchError::chain(&e)))?;
        tracing::debug!(
            submitted = report.submitted,
            failed = report.failed,
            files = report.stats.files,
            "index build complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingSink {
        files: Arc<Mutex<Vec<PathBuf>>>,
        fail_on: Option<&'static str>,
    }

    impl IndexSink for RecordingSink {
        fn add_roots(&mut self, _roots: &[PathBuf]) {}

        fn add_file(&mut self, path: &Path) -> anyhow::Result<()> {
            if let Some(f) = self.fail_on {
                if path.ends_with(f) {
                    anyhow::bail!("unreadable");
                }
            }
            self.files.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn flush(self) -> anyhow::Result<IndexStats> {
            Ok(IndexStats::default())
        }
    }

    #[test]
    fn skips_ignored_entries_and_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "keep.go",
            "sub/keep.txt",
            ".git/config",
            "#scratch#",
            "~backup~/inner.go",
            "file~",
            "bad.rs",
        ] {
            let p = root.join(rel);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, "x").unwrap();
        }
        let sink = RecordingSink {
            fail_on: Some("bad.rs"),
            ..Default::default()
        };
        let files = sink.files.clone();
        let report = IndexBuilder::new(vec![root.to_path_buf()])
            .build_into(sink)
            .unwrap();
        let got: Vec<PathBuf> = files.lock().unwrap().clone();
        assert_eq!(got, vec![root.join("keep.go"), root.join("sub/keep.txt")]);
        assert_eq!(report.submitted, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn expired_deadline_stops_walk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), "x").unwrap();
        let err = IndexBuilder::new(vec![dir.path().to_path_buf()])
            .deadline(Deadline::at(std::time::Instant::now()))
            .build_into(RecordingSink::default())
            .unwrap_err();
        assert!(matches!(err, CsearchError::DeadlineExceeded(_)));
    }
}
