//! Trigram code search: build and merge posting indexes over directory
//! trees, then answer regular-expression searches against them, reading
//! matched content from plain files or zip archive members.

pub mod error;
pub mod index;
pub mod query;
pub mod regex_analyze;
pub mod search;
pub mod shard;
pub mod trigram;
pub mod types;

pub use crate::error::CsearchError;
pub use crate::index::{
    BuildReport, IndexBuilder, MasterIndex, UpdateMode, UpdateOutcome, WriterLease,
};
pub use crate::query::{CompiledQuery, SearchFlags};
pub use crate::regex_analyze::{query_from_regex, TrigramQuery};
pub use crate::search::{search, search_master, GrepOptions, SearchOutcome, SearchReport};
pub use crate::shard::{
    merge, IndexReader, IndexSink, IndexStats, IndexWriter, PostingSource, WriterOptions,
};
pub use crate::trigram::trigrams;
pub use crate::types::{Deadline, FileId};
