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

use anyhow::{bail, Context, Result};
use fnv::FnvHashMap;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::regex_analyze::TrigramQuery;
use crate::trigram::{display, Trigram};
use crate::types::FileId;

use super::utils::{
    intersect_sorted, read_str, read_trigram, read_u32, read_u64, read_var_u32, union_sorted,
};
use super::{IndexStats, PostingSource, HEADER_LEN, MAGIC, VERSION};

/// Read-only view of one generation. The mapping stays valid after the path
/// is replaced by a rename, so an open reader keeps serving the generation it
/// was opened on.
pub struct IndexReader {
    mmap: Mmap,
    path: PathBuf,
    roots: Vec<String>,
    names: Vec<String>,
    terms: FnvHashMap<Trigram, TermEntry>,
    postings: usize,
}

#[derive(Clone, Copy, Debug)]
struct TermEntry {
    off: usize,
    n_docs: u32,
}

impl IndexReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file)? };
        if mmap.len() < HEADER_LEN {
            bail!("file too small ({} bytes)", mmap.len())
        }
        let mut off = 0usize;
        let magic = read_u32(&mmap, &mut off, "magic")?;
        let ver = read_u32(&mmap, &mut off, "version")?;
        if magic != MAGIC || ver != VERSION {
            bail!("bad header (magic={:#x}, version={})", magic, ver)
        }
        let n_roots = read_u32(&mmap, &mut off, "root count")? as usize;
        let n_files = read_u32(&mmap, &mut off, "file count")? as usize;
        let roots_off = read_u64(&mmap, &mut off, "roots_off")? as usize;
        let names_off = read_u64(&mmap, &mut off, "names_off")? as usize;
        let postings_off = read_u64(&mmap, &mut off, "postings_off")? as usize;
        if !(HEADER_LEN <= roots_off && roots_off <= names_off && names_off <= postings_off)
            || postings_off > mmap.len()
        {
            bail!(
                "section offsets out of order (roots={}, names={}, postings={}, len={})",
                roots_off,
                names_off,
                postings_off,
                mmap.len()
            )
        }

        let mut off = roots_off;
        let mut roots = Vec::with_capacity(n_roots.min(1024));
        for _ in 0..n_roots {
            roots.push(read_str(&mmap, &mut off, "root")?);
        }
        let mut off = names_off;
        let mut names = Vec::with_capacity(n_files.min(1 << 20));
        for _ in 0..n_files {
            names.push(read_str(&mmap, &mut off, "file name")?);
        }

        let mut off = postings_off;
        let n_terms = read_u32(&mmap, &mut off, "term count")? as usize;
        let mut terms = FnvHashMap::default();
        let mut postings = 0usize;
        for _ in 0..n_terms {
            let tri = read_trigram(&mmap, &mut off)?;
            let n_docs = read_u32(&mmap, &mut off, "posting count")?;
            terms.insert(tri, TermEntry { off, n_docs });
            // Skip the list; it is decoded on demand.
            for _ in 0..n_docs {
                read_var_u32(&mmap, &mut off).with_context(|| {
                    format!("posting list for {} truncated", display(&tri))
                })?;
            }
            postings += n_docs as usize;
        }
        if off != mmap.len() {
            bail!("{} trailing bytes after postings", mmap.len() - off)
        }

        Ok(Self {
            mmap,
            path,
            roots,
            names,
            terms,
            postings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// All trigrams present, ascending.
    pub fn trigrams(&self) -> Vec<Trigram> {
        let mut v: Vec<Trigram> = self.terms.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Ascending file ids whose content contains `tri`.
    pub fn postings(&self, tri: &Trigram) -> Result<Vec<FileId>> {
        let Some(e) = self.terms.get(tri) else {
            return Ok(Vec::new());
        };
        let mut off = e.off;
        let mut out = Vec::with_capacity(e.n_docs as usize);
        let mut cur = 0u32;
        for i in 0..e.n_docs {
            let d = read_var_u32(&self.mmap, &mut off)?;
            cur = if i == 0 {
                d
            } else {
                cur.checked_add(d).context("posting id overflow")?
            };
            out.push(cur);
        }
        Ok(out)
    }

    fn eval(&self, q: &TrigramQuery) -> Result<Vec<FileId>> {
        Ok(match q {
            TrigramQuery::All => (0..self.names.len() as FileId).collect(),
            TrigramQuery::None => Vec::new(),
            TrigramQuery::Trigram(t) => self.postings(t)?,
            TrigramQuery::And(parts) => {
                let mut acc: Option<Vec<FileId>> = None;
                for p in parts {
                    let ids = self.eval(p)?;
                    let next = match acc {
                        None => ids,
                        Some(prev) => intersect_sorted(&prev, &ids),
                    };
                    if next.is_empty() {
                        return Ok(next);
                    }
                    acc = Some(next);
                }
                acc.unwrap_or_else(|| (0..self.names.len() as FileId).collect())
            }
            TrigramQuery::Or(parts) => {
                let mut acc = Vec::new();
                for p in parts {
                    acc = union_sorted(&acc, &self.eval(p)?);
                }
                acc
            }
        })
    }

    /// Verify the invariants a generation must hold: sorted unique names and
    /// strictly ascending, in-range posting lists.
    pub fn check(&self) -> Result<()> {
        if let Some(w) = self.names.windows(2).find(|w| w[0] >= w[1]) {
            bail!("names out of order: {:?} >= {:?}", w[0], w[1])
        }
        if self.roots.windows(2).any(|w| w[0] >= w[1]) {
            bail!("roots out of order")
        }
        for tri in self.trigrams() {
            let ids = self.postings(&tri)?;
            if ids.windows(2).any(|w| w[0] >= w[1]) {
                bail!("posting list for {} not ascending", display(&tri))
            }
            if let Some(&last) = ids.last() {
                if last as usize >= self.names.len() {
                    bail!(
                        "posting list for {} references file {} of {}",
                        display(&tri),
                        last,
                        self.names.len()
                    )
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            roots: self.roots.len(),
            files: self.names.len(),
            trigrams: self.terms.len(),
            postings: self.postings,
            bytes: self.mmap.len() as u64,
        }
    }
}

impl PostingSource for IndexReader {
    fn posting_query(&self, q: &TrigramQuery) -> Result<Vec<FileId>> {
        self.eval(q)
    }

    fn name(&self, id: FileId) -> Result<&str> {
        self.names
            .get(id as usize)
            .map(String::as_str)
            .with_context(|| format!("file id {} out of range ({})", id, self.names.len()))
    }

    fn file_count(&self) -> usize {
        self.names.len()
    }
}
