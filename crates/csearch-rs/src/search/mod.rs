//! Execute a compiled query: candidates, content resolution and grep.

pub mod executor;
pub mod grep;
pub mod locator;

pub use executor::{search, search_master, SearchOutcome, SearchReport};
pub use grep::{Grep, GrepOptions};
pub use locator::{ArchiveCache, Content, ContentLocator, ARCHIVE_BOUNDARY};
