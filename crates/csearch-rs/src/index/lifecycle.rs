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

//! Master index lifecycle: single-writer lock, reset vs. merge, and atomic
//! promotion of the new generation over the master path.

use fs2::FileExt;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use crate::error::CsearchError;
use crate::shard::{merge, IndexReader, IndexStats, IndexWriter, WriterOptions};
use crate::types::Deadline;

use super::builder::{BuildReport, IndexBuilder};

const LOCK_POLL: Duration = Duration::from_millis(25);

/// The master generation path plus the settings used to update it.
#[derive(Debug, Clone)]
pub struct MasterIndex {
    path: PathBuf,
    lock_path: PathBuf,
    writer_options: WriterOptions,
    check: bool,
}

/// Exclusive right to update one master index. Released on drop.
pub struct WriterLease {
    file: File,
    master: PathBuf,
}

impl Drop for WriterLease {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// No master existed; the new build became the master.
    Reset,
    /// The new build was merged with the existing master.
    Merge,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateOutcome {
    pub mode: UpdateMode,
    pub build: BuildReport,
    pub stats: IndexStats,
}

fn write_err(e: impl std::fmt::Display) -> CsearchError {
    CsearchError::IndexWrite(e.to_string())
}

fn merge_err(e: impl std::fmt::Display) -> CsearchError {
    CsearchError::IndexMerge(e.to_string())
}

/// Open `path` and verify it is a complete generation.
fn verify(path: &Path) -> anyhow::Result<IndexStats> {
    let r = IndexReader::open(path)?;
    r.check()?;
    Ok(r.stats())
}

impl MasterIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock = path.as_os_str().to_owned();
        lock.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock),
            writer_options: WriterOptions::default(),
            check: false,
        }
    }

    pub fn writer_options(mut self, opts: WriterOptions) -> Self {
        self.writer_options = opts;
        self
    }

    /// Verify the existing master before merging into it.
    pub fn check_index(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    /// Acquire the writer lock, waiting at most until `deadline`.
    pub fn lock(&self, deadline: Deadline) -> Result<WriterLease, CsearchError> {
        std::fs::create_dir_all(self.dir())
            .map_err(|e| write_err(format!("create {}: {}", self.dir().display(), e)))?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| write_err(format!("open {}: {}", self.lock_path.display(), e)))?;

        let start = Instant::now();
        if deadline.remaining().is_none() {
            file.lock_exclusive()
                .map_err(|e| write_err(format!("lock {}: {}", self.lock_path.display(), e)))?;
        } else {
            let contended = fs2::lock_contended_error().raw_os_error();
            loop {
                match file.try_lock_exclusive() {
                    Ok(()) => break,
                    Err(e) if e.raw_os_error() == contended => {
                        deadline.check("wait for index writer lock")?;
                        let nap = deadline.remaining().map_or(LOCK_POLL, |r| r.min(LOCK_POLL));
                        std::thread::sleep(nap);
                    }
                    Err(e) => {
                        return Err(write_err(format!(
                            "lock {}: {}",
                            self.lock_path.display(),
                            e
                        )))
                    }
                }
            }
        }
        tracing::debug!(
            lock = %self.lock_path.display(),
            wait_ms = start.elapsed().as_millis() as u64,
            "acquired index writer lock"
        );
        Ok(WriterLease {
            file,
            master: self.path.clone(),
        })
    }

    /// Lock, then update with `roots`.
    pub fn index(
        &self,
        roots: &[PathBuf],
        deadline: Deadline,
    ) -> Result<UpdateOutcome, CsearchError> {
        let lease = self.lock(deadline)?;
        self.update(&lease, roots, deadline)
    }

    fn temp(&self) -> std::io::Result<NamedTempFile> {
        let stem = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        tempfile::Builder::new()
            .prefix(&format!("{}.", stem))
            .suffix(".tmp")
            .tempfile_in(self.dir())
    }

    fn build_temp(
        &self,
        roots: &[PathBuf],
        deadline: Deadline,
    ) -> Result<(NamedTempFile, BuildReport), CsearchError> {
        let tmp = self.temp().map_err(|e| {
            write_err(format!(
                "create temporary index in {}: {}",
                self.dir().display(),
                e
            ))
        })?;
        let writer = IndexWriter::with_options(tmp.path(), self.writer_options.clone())
            .map_err(|e| write_err(CsearchError::chain(&e)))?;
        let report = IndexBuilder::new(roots.to_vec())
            .deadline(deadline)
            .build_into(writer)?;
        Ok((tmp, report))
    }

    /// Build `roots` and make the result part of the master. Without a master
    /// the build becomes it (reset); otherwise old and new are merged. The
    /// master is only ever replaced by rename of a verified generation, and
    /// temporaries are removed on every failure path.
    pub fn update(
        &self,
        lease: &WriterLease,
        roots: &[PathBuf],
        deadline: Deadline,
    ) -> Result<UpdateOutcome, CsearchError> {
        if lease.master != self.path {
            return Err(write_err(format!(
                "writer lease is for {}, not {}",
                lease.master.display(),
                self.path.display()
            )));
        }
        let outcome = if !self.exists() {
            let (fresh, build) = self.build_temp(roots, deadline)?;
            let stats = verify(fresh.path()).map_err(|e| write_err(format!("{:#}", e)))?;
            fresh
                .persist(&self.path)
                .map_err(|e| write_err(format!("promote {}: {}", self.path.display(), e.error)))?;
            UpdateOutcome {
                mode: UpdateMode::Reset,
                build,
                stats,
            }
        } else {
            if self.check {
                verify(&self.path).map_err(|e| {
                    merge_err(format!("existing index {}: {:#}", self.path.display(), e))
                })?;
            }
            let (fresh, build) = self.build_temp(roots, deadline)?;
            deadline.check("index merge")?;
            let merged = self.temp().map_err(merge_err)?;
            merge(merged.path(), &self.path, fresh.path())
                .map_err(|e| merge_err(format!("{:#}", e)))?;
            drop(fresh);
            let stats = verify(merged.path()).map_err(|e| merge_err(format!("{:#}", e)))?;
            merged
                .persist(&self.path)
                .map_err(|e| merge_err(format!("promote {}: {}", self.path.display(), e.error)))?;
            UpdateOutcome {
                mode: UpdateMode::Merge,
                build,
                stats,
            }
        };
        tracing::info!(
            index = %self.path.display(),
            mode = ?outcome.mode,
            files = outcome.stats.files,
            trigrams = outcome.stats.trigrams,
            postings = outcome.stats.postings,
            bytes = outcome.stats.bytes,
            "index updated"
        );
        Ok(outcome)
    }

    /// Open the current master for reading.
    pub fn open(&self) -> Result<IndexReader, CsearchError> {
        IndexReader::open(&self.path).map_err(|e| CsearchError::IndexOpen(format!("{:#}", e)))
    }
}
