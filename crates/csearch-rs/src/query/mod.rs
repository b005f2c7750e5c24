//! Turn a raw search term and flag string into a `CompiledQuery`.

pub mod compile;
pub mod flags;

pub use compile::CompiledQuery;
pub use flags::SearchFlags;
