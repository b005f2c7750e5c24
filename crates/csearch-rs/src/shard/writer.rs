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
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::index::utils::is_text;
use crate::search::locator::member_buffer;
use crate::trigram::{trigram_set, Trigram};
use crate::types::FileId;

use super::writer_utils::{write_postings, write_str};
use super::{IndexSink, IndexStats, HEADER_LEN, MAGIC, VERSION};

/// Content limits applied to every file (and archive member) before it is
/// added to a generation.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Index each member of `*.zip` files as `<archive>\x01<member>`.
    pub zip_members: bool,
    pub max_file_len: u64,
    pub max_line_len: usize,
    pub max_text_trigrams: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            zip_members: false,
            max_file_len: 1 << 30,
            max_line_len: 2000,
            max_text_trigrams: 20_000,
        }
    }
}

impl WriterOptions {
    pub fn zip_members(mut self, v: bool) -> Self {
        self.zip_members = v;
        self
    }
}

/// Accumulates files in memory and writes one generation on `flush`.
pub struct IndexWriter {
    path: PathBuf,
    file: File,
    opts: WriterOptions,
    roots: BTreeSet<String>,
    names: Vec<String>,
    tris: Vec<Vec<Trigram>>,
}

impl IndexWriter {
    /// Create (truncating) the destination file immediately so an unusable
    /// path fails before any walking happens.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, WriterOptions::default())
    }

    pub fn with_options(path: impl AsRef<Path>, opts: WriterOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("create index file {}", path.display()))?;
        Ok(Self {
            path,
            file,
            opts,
            roots: BTreeSet::new(),
            names: Vec::new(),
            tris: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of files accepted so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Add in-memory content under `name`. Returns whether it was accepted;
    /// rejected content is logged and is not an error.
    pub fn add_content(&mut self, name: &str, data: &[u8]) -> bool {
        if data.len() as u64 > self.opts.max_file_len {
            tracing::debug!(name, len = data.len(), "skipping: too long");
            return false;
        }
        if !is_text(data) || std::str::from_utf8(data).is_err() {
            tracing::debug!(name, "skipping: binary or invalid UTF-8");
            return false;
        }
        if let Some(line) = data
            .split(|&b| b == b'\n')
            .find(|l| l.len() > self.opts.max_line_len)
        {
            tracing::debug!(name, line_len = line.len(), "skipping: line too long");
            return false;
        }
        match trigram_set(data, self.opts.max_text_trigrams) {
            Some(set) => {
                self.names.push(name.to_string());
                self.tris.push(set);
                true
            }
            None => {
                tracing::debug!(name, "skipping: too many trigrams");
                false
            }
        }
    }

    fn add_archive(&mut self, path: &Path, name: &str) -> Result<()> {
        let f = File::open(path).with_context(|| format!("open archive {}", path.display()))?;
        let mut archive =
            zip::ZipArchive::new(f).with_context(|| format!("read archive {}", path.display()))?;
        for i in 0..archive.len() {
            let mut member = archive
                .by_index(i)
                .with_context(|| format!("read member {} of {}", i, path.display()))?;
            if member.is_dir() || member.size() > self.opts.max_file_len {
                continue;
            }
            let member_name = format!("{}\x01{}", name, member.name());
            let mut buf = member_buffer(member.size());
            (&mut member)
                .take(self.opts.max_file_len.saturating_add(1))
                .read_to_end(&mut buf)
                .with_context(|| format!("decompress {}", member_name))?;
            self.add_content(&member_name, &buf);
        }
        Ok(())
    }
}

impl IndexSink for IndexWriter {
    fn add_roots(&mut self, roots: &[PathBuf]) {
        for r in roots {
            self.roots.insert(r.to_string_lossy().into_owned());
        }
    }

    fn add_file(&mut self, path: &Path) -> Result<()> {
        let Some(name) = path.to_str() else {
            bail!("path is not valid UTF-8: {}", path.display())
        };
        let meta =
            std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        if self.opts.zip_members && path.extension().is_some_and(|e| e == "zip") {
            return self.add_archive(path, name);
        }
        if meta.len() > self.opts.max_file_len {
            tracing::debug!(name, len = meta.len(), "skipping: too long");
            return Ok(());
        }
        let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        self.add_content(name, &data);
        Ok(())
    }

    fn flush(mut self) -> Result<IndexStats> {
        let start = Instant::now();

        // Sort names and remap ids; a name added twice keeps its last content.
        let mut order: Vec<usize> = (0..self.names.len()).collect();
        order.sort_by(|&a, &b| self.names[a].cmp(&self.names[b]).then(b.cmp(&a)));
        order.dedup_by(|a, b| self.names[*a] == self.names[*b]);

        let names: Vec<String> = order.iter().map(|&i| self.names[i].clone()).collect();
        let mut pairs: Vec<(Trigram, FileId)> = order
            .par_iter()
            .enumerate()
            .flat_map_iter(|(id, &i)| self.tris[i].iter().map(move |t| (*t, id as FileId)))
            .collect();
        pairs.par_sort_unstable();

        let mut postings: BTreeMap<Trigram, Vec<FileId>> = BTreeMap::new();
        for (t, id) in pairs {
            postings.entry(t).or_default().push(id);
        }

        let roots: Vec<String> = self.roots.iter().cloned().collect();
        let stats = write_generation(&mut self.file, &roots, &names, &postings)
            .with_context(|| format!("write index {}", self.path.display()))?;
        tracing::debug!(
            path = %self.path.display(),
            files = stats.files,
            trigrams = stats.trigrams,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "flushed index"
        );
        Ok(stats)
    }
}

/// Serialize one generation into `f` and sync it to disk.
pub(crate) fn write_generation(
    f: &mut File,
    roots: &[String],
    names: &[String],
    postings: &BTreeMap<Trigram, Vec<FileId>>,
) -> Result<IndexStats> {
    if names.len() > FileId::MAX as usize {
        bail!("too many files: {}", names.len())
    }
    f.set_len(0)?;
    f.seek(SeekFrom::Start(0))?;
    let mut w = BufWriter::new(&mut *f);

    // Header placeholders; offsets are patched once the sections are written.
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend(&MAGIC.to_le_bytes());
    header.extend(&VERSION.to_le_bytes());
    header.extend(&(roots.len() as u32).to_le_bytes());
    header.extend(&(names.len() as u32).to_le_bytes());
    header.extend(&0u64.to_le_bytes()); // roots_off
    header.extend(&0u64.to_le_bytes()); // names_off
    header.extend(&0u64.to_le_bytes()); // postings_off
    w.write_all(&header)?;

    let roots_off = w.stream_position()?;
    for r in roots {
        write_str(&mut w, r, "root")?;
    }

    let names_off = w.stream_position()?;
    for n in names {
        write_str(&mut w, n, "file name")?;
    }

    let postings_off = w.stream_position()?;
    w.write_all(&(postings.len() as u32).to_le_bytes())?;
    let mut total = 0usize;
    for (tri, ids) in postings {
        w.write_all(tri)?;
        w.write_all(&(ids.len() as u32).to_le_bytes())?;
        write_postings(&mut w, ids)?;
        total += ids.len();
    }
    let bytes = w.stream_position()?;

    w.seek(SeekFrom::Start(16))?;
    w.write_all(&roots_off.to_le_bytes())?;
    w.write_all(&names_off.to_le_bytes())?;
    w.write_all(&postings_off.to_le_bytes())?;
    w.flush()?;
    drop(w);
    f.sync_all()?;

    Ok(IndexStats {
        roots: roots.len(),
        files: names.len(),
        trigrams: postings.len(),
        postings: total,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::IndexReader;

    #[test]
    fn rejects_binary_and_long_lines() {
        let dir = tempfile::tempdir().unwrap();
        let opts = WriterOptions {
            max_line_len: 8,
            ..Default::default()
        };
        let mut w = IndexWriter::with_options(dir.path().join("idx"), opts).unwrap();
        assert!(w.add_content("ok", b"short\nlines\n"));
        assert!(!w.add_content("bin", b"ab\0cd"));
        assert!(!w.add_content("long", b"this line is too long\n"));
        assert!(!w.add_content("latin1", b"caf\xe9 au lait"));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn flush_sorts_names_and_keeps_last_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        let mut w = IndexWriter::create(&path).unwrap();
        w.add_roots(&[PathBuf::from("/r")]);
        assert!(w.add_content("/r/b", b"bravo"));
        assert!(w.add_content("/r/a", b"alpha"));
        assert!(w.add_content("/r/b", b"charlie"));
        let stats = w.flush().unwrap();
        assert_eq!(stats.files, 2);

        let r = IndexReader::open(&path).unwrap();
        assert_eq!(r.names(), &["/r/a".to_string(), "/r/b".to_string()]);
        assert_eq!(r.postings(b"cha").unwrap(), vec![1]);
        assert!(r.postings(b"bra").unwrap().is_empty());
        assert_eq!(stats.bytes, std::fs::metadata(&path).unwrap().len());
    }
}
