//! HTTP front end for csearch: clones repositories into a workspace, folds
//! them into the shared master index and serves regex searches over it.

mod config;
pub use config::{load_service_config, MergeOpts, ServiceConfig};

pub mod clone;
pub mod router;
pub mod service;
pub mod test_utils;
pub mod workspace;

pub use clone::{GitCloner, RepoCloner};
pub use router::{router, INDEX_PATH, SEARCH_PATH};
pub use service::AppState;
pub use workspace::resolve_workspace;
