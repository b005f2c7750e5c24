pub mod builder;
pub mod lifecycle;
pub(crate) mod utils;

pub use builder::{BuildReport, IndexBuilder};
pub use lifecycle::{MasterIndex, UpdateMode, UpdateOutcome, WriterLease};
