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
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::CsearchError;
use crate::index::MasterIndex;
use crate::query::CompiledQuery;
use crate::shard::PostingSource;
use crate::types::Deadline;

use super::grep::Grep;
use super::locator::{ArchiveCache, ContentLocator};

/// Counters for one search; also the body of the `cpuprofile` report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchReport {
    pub pattern: String,
    pub query: String,
    pub candidates: usize,
    pub filtered: usize,
    pub searched: usize,
    pub skipped: usize,
    pub matched: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub output: String,
    pub report: SearchReport,
}

// Verbose searches log their progress at info, others at debug.
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Run `query` against `index`: narrow candidates with the trigram query,
/// apply the filename filter, then grep each surviving file. Unreadable
/// candidates are skipped. Fails with `NoMatches` when nothing matched.
pub fn search<S: PostingSource + ?Sized>(
    index: &S,
    query: &CompiledQuery,
    deadline: Deadline,
) -> Result<SearchOutcome, CsearchError> {
    let start = Instant::now();
    let verbose = query.flags.verbose;
    let profile = match &query.flags.profile {
        Some(p) => Some(create_profile(p)?),
        None => None,
    };

    let tq = query.trigram_query();
    let mut report = SearchReport {
        pattern: query.pattern.clone(),
        query: tq.to_string(),
        ..Default::default()
    };
    progress!(verbose, query = %tq, "trigram query");

    let open_err = |e: anyhow::Error| CsearchError::IndexOpen(format!("{:#}", e));
    let post = index.posting_query(&tq).map_err(open_err)?;
    report.candidates = post.len();
    progress!(verbose, candidates = post.len(), "post query identified possible files");

    let mut names: Vec<&str> = Vec::with_capacity(post.len());
    for id in post {
        let name = index.name(id).map_err(open_err)?;
        if query.accepts_name(name) {
            names.push(name);
        }
    }
    report.filtered = names.len();
    if query.file_filter.is_some() {
        progress!(verbose, files = names.len(), "filename regexp matched files");
    }

    let names_only = query.names_only();
    let mut grep = Grep::new(&query.regex, query.flags.grep);
    let mut archives = ArchiveCache::new();
    for name in names {
        deadline.check("search")?;
        if names_only {
            grep.name_only(name);
            report.matched += 1;
            continue;
        }
        let Some(content) = archives.read(&ContentLocator::resolve(name)) else {
            report.skipped += 1;
            continue;
        };
        report.searched += 1;
        if grep.grep_bytes(&content, name) > 0 {
            report.matched += 1;
        }
    }
    drop(archives);

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    progress!(
        verbose,
        searched = report.searched,
        skipped = report.skipped,
        matched = report.matched,
        elapsed_ms = report.elapsed_ms,
        "search complete"
    );
    if let Some(f) = profile {
        if let Err(e) = serde_json::to_writer_pretty(f, &report) {
            tracing::warn!(error = %e, "failed to write search profile");
        }
    }

    if !grep.matched() {
        return Err(CsearchError::NoMatches);
    }
    Ok(SearchOutcome {
        output: grep.into_output(),
        report,
    })
}

/// Open the current master and search it. The generation opened here is
/// used for the whole request even if a writer replaces the master.
pub fn search_master(
    master: &MasterIndex,
    query: &CompiledQuery,
    deadline: Deadline,
) -> Result<SearchOutcome, CsearchError> {
    if let Some(p) = &query.flags.profile {
        guard_profile(master, p)?;
    }
    let reader = master.open()?;
    search(&reader, query, deadline)
}

/// Reports only ever go to a fresh file; an existing file is never truncated.
fn create_profile(p: &Path) -> Result<File, CsearchError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(p)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                CsearchError::invalid(format!("profile {} already exists", p.display()))
            }
            _ => CsearchError::invalid(format!("create profile {}: {}", p.display(), e)),
        })
}

fn parent_dir(p: &Path) -> Option<PathBuf> {
    let dir = match p.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    std::fs::canonicalize(dir).ok()
}

/// The master, its lock and its temporaries share one directory; no report
/// may be written there.
fn guard_profile(master: &MasterIndex, p: &Path) -> Result<(), CsearchError> {
    let beside_master = match (parent_dir(p), parent_dir(master.path())) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    if p == master.path() || p == master.lock_path() || beside_master {
        return Err(CsearchError::invalid(format!(
            "profile {} must not be written in the index directory",
            p.display()
        )));
    }
    Ok(())
}
