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

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::path::Path;

use crate::trigram::{display, Trigram};
use crate::types::FileId;

use super::writer::write_generation;
use super::{IndexReader, IndexStats};

/// True when `name` is `root` itself or lies below it.
pub(crate) fn under_root(name: &str, root: &str) -> bool {
    if root.is_empty() || !name.starts_with(root) {
        return false;
    }
    if name.len() == root.len() || root.ends_with('/') {
        return true;
    }
    matches!(name.as_bytes()[root.len()], b'/' | b'\x01')
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Source {
    New(FileId),
    Old(FileId),
}

/// Write the union of `old` and `new` into `dst`. Files of `old` that lie
/// under any root of `new` are dropped: the newer build replaces them.
pub fn merge(dst: &Path, old: &Path, new: &Path) -> Result<IndexStats> {
    let old = IndexReader::open(old).with_context(|| format!("open {}", old.display()))?;
    let new = IndexReader::open(new).with_context(|| format!("open {}", new.display()))?;
    let mut f = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(dst)
        .with_context(|| format!("create {}", dst.display()))?;
    let stats = merge_readers(&mut f, &old, &new)
        .with_context(|| format!("merge into {}", dst.display()))?;
    tracing::debug!(
        old = old.names().len(),
        new = new.names().len(),
        merged = stats.files,
        "merged index generations"
    );
    Ok(stats)
}

fn merge_readers(
    f: &mut std::fs::File,
    old: &IndexReader,
    new: &IndexReader,
) -> Result<IndexStats> {
    let new_roots = new.roots();
    let mut entries: Vec<(&str, Source)> =
        Vec::with_capacity(old.names().len() + new.names().len());
    for (i, n) in old.names().iter().enumerate() {
        if !new_roots.iter().any(|r| under_root(n, r)) {
            entries.push((n.as_str(), Source::Old(i as FileId)));
        }
    }
    for (i, n) in new.names().iter().enumerate() {
        entries.push((n.as_str(), Source::New(i as FileId)));
    }
    // Ties on name put the new generation first, then dedup keeps it.
    entries.sort_unstable();
    entries.dedup_by(|a, b| a.0 == b.0);

    let mut old_map: Vec<Option<FileId>> = vec![None; old.names().len()];
    let mut new_map: Vec<Option<FileId>> = vec![None; new.names().len()];
    for (id, (_, src)) in entries.iter().enumerate() {
        match *src {
            Source::Old(i) => old_map[i as usize] = Some(id as FileId),
            Source::New(i) => new_map[i as usize] = Some(id as FileId),
        }
    }
    let names: Vec<String> = entries.iter().map(|(n, _)| n.to_string()).collect();

    let tris: BTreeSet<Trigram> = old.trigrams().into_iter().chain(new.trigrams()).collect();
    let mut postings: BTreeMap<Trigram, Vec<FileId>> = BTreeMap::new();
    for tri in tris {
        let mut ids = remap(&old_map, old.postings(&tri)?, &tri, "old")?;
        ids.extend(remap(&new_map, new.postings(&tri)?, &tri, "new")?);
        if ids.is_empty() {
            continue;
        }
        ids.sort_unstable();
        ids.dedup();
        postings.insert(tri, ids);
    }

    let roots: BTreeSet<String> = old.roots().iter().chain(new_roots).cloned().collect();
    let roots: Vec<String> = roots.into_iter().collect();
    write_generation(f, &roots, &names, &postings)
}

/// Translate posting ids into merged ids, dropping files that did not
/// survive. Ids past the name table mean a corrupt generation.
fn remap(
    map: &[Option<FileId>],
    ids: Vec<FileId>,
    tri: &Trigram,
    which: &str,
) -> Result<Vec<FileId>> {
    let mut out = Vec::with_capacity(ids.len());
    for i in ids {
        match map.get(i as usize) {
            Some(Some(id)) => out.push(*id),
            Some(None) => {}
            None => anyhow::bail!(
                "{} generation: posting id {} for {:?} out of range ({} files)",
                which,
                i,
                display(tri),
                map.len()
            ),
        }
    }
    Ok(out)
}
