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

//! Resolve indexed names to content: plain files on disk or members of zip
//! archives, named `<archive>.zip\x01<member>`.

use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Separator between an archive path and a member name in indexed names.
pub const ARCHIVE_BOUNDARY: &str = ".zip\x01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLocator {
    PlainFile(PathBuf),
    ArchiveMember { archive: PathBuf, member: String },
}

impl ContentLocator {
    pub fn resolve(name: &str) -> Self {
        match name.find(ARCHIVE_BOUNDARY) {
            Some(i) => ContentLocator::ArchiveMember {
                archive: PathBuf::from(&name[..i + 4]),
                member: name[i + ARCHIVE_BOUNDARY.len()..].to_string(),
            },
            None => ContentLocator::PlainFile(PathBuf::from(name)),
        }
    }
}

/// File content, mapped when possible.
pub enum Content {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Content {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Content::Mapped(m) => &m[..],
            Content::Owned(v) => v.as_slice(),
        }
    }
}

/// Request-scoped reader that keeps the most recently used archive open.
/// Consecutive members of one archive share a handle; a different archive
/// replaces it. A failed open is remembered so the rest of that archive is
/// skipped without retrying.
#[derive(Default)]
pub struct ArchiveCache {
    current: Option<(PathBuf, Option<ZipArchive<File>>)>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn archive(&mut self, path: &Path) -> Option<&mut ZipArchive<File>> {
        let stale = self.current.as_ref().map_or(true, |(p, _)| p != path);
        if stale {
            let opened = File::open(path)
                .map_err(anyhow::Error::from)
                .and_then(|f| Ok(ZipArchive::new(f)?));
            let handle = match opened {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::debug!(archive = %path.display(), error = %e, "cannot open archive");
                    None
                }
            };
            self.current = Some((path.to_path_buf(), handle));
        }
        self.current.as_mut().and_then(|(_, a)| a.as_mut())
    }

    /// Content behind `loc`, or `None` when it cannot be opened or read.
    pub fn read(&mut self, loc: &ContentLocator) -> Option<Content> {
        match loc {
            ContentLocator::PlainFile(path) => read_plain(path),
            ContentLocator::ArchiveMember { archive, member } => {
                let zip = self.archive(archive)?;
                let mut f = match zip.by_name(member) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::debug!(
                            archive = %archive.display(),
                            member = %member,
                            error = %e,
                            "missing archive member"
                        );
                        return None;
                    }
                };
                let mut buf = member_buffer(f.size());
                if let Err(e) = f.read_to_end(&mut buf) {
                    tracing::debug!(
                        archive = %archive.display(),
                        member = %member,
                        error = %e,
                        "cannot read archive member"
                    );
                    return None;
                }
                Some(Content::Owned(buf))
            }
        }
    }
}

/// Upper bound on the buffer reserved up front for an archive member.
const MEMBER_PREALLOC: u64 = 1 << 20;

/// Buffer for a member whose header claims `size` bytes. The claim is not
/// trusted beyond `MEMBER_PREALLOC`; larger members grow while reading.
pub(crate) fn member_buffer(size: u64) -> Vec<u8> {
    Vec::with_capacity(size.min(MEMBER_PREALLOC) as usize)
}

fn read_plain(path: &Path) -> Option<Content> {
    let mapped = File::open(path).and_then(|file| unsafe { Mmap::map(&file) });
    match mapped {
        Ok(m) => Some(Content::Mapped(m)),
        Err(_) => match std::fs::read(path) {
            Ok(v) => Some(Content::Owned(v)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read file");
                None
            }
        },
    }
}
