//! On-disk index generations: `IndexWriter`, `IndexReader` and `merge`.
//!
//! A generation is a single immutable file holding the indexed roots, the
//! sorted file-name table and one delta-encoded posting list per trigram.
//! Layout (little endian):
//!
//! ```text
//! magic u32 | version u32 | n_roots u32 | n_files u32
//! roots_off u64 | names_off u64 | postings_off u64
//! roots:    n_roots x (u16 len, utf8)
//! names:    n_files x (u16 len, utf8)        sorted, unique
//! postings: n_terms u32, n_terms x (tri [3]u8, n_docs u32, n_docs x varint delta)
//! ```

use serde::Serialize;

use crate::regex_analyze::TrigramQuery;
use crate::types::FileId;

pub const MAGIC: u32 = 0x4353_4958; // 'CSIX'
pub const VERSION: u32 = 1;
pub(crate) const HEADER_LEN: usize = 4 * 4 + 8 * 3;

mod writer;
pub use writer::{IndexWriter, WriterOptions};

pub(crate) mod writer_utils;

mod reader;
pub use reader::IndexReader;

mod merge;
pub use merge::merge;

pub(crate) mod utils;

/// Size summary of a flushed or opened generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub roots: usize,
    pub files: usize,
    pub trigrams: usize,
    pub postings: usize,
    pub bytes: u64,
}

/// Destination of a build: accepts roots and files, then persists them.
pub trait IndexSink {
    fn add_roots(&mut self, roots: &[std::path::PathBuf]);
    fn add_file(&mut self, path: &std::path::Path) -> anyhow::Result<()>;
    fn flush(self) -> anyhow::Result<IndexStats>
    where
        Self: Sized;
}

/// Read side used by the search executor.
pub trait PostingSource {
    /// Ascending file ids satisfying `q`.
    fn posting_query(&self, q: &TrigramQuery) -> anyhow::Result<Vec<FileId>>;
    fn name(&self, id: FileId) -> anyhow::Result<&str>;
    fn file_count(&self) -> usize;
}
