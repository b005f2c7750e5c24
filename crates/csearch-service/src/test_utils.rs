//! Test utilities for csearch-service.
//!
//! Environment variable management, a fake repository cloner and one-time
//! test logging setup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Once;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::clone::RepoCloner;

/// Test helper to manage environment variables and ensure proper cleanup
pub struct EnvGuard {
    original_values: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            original_values: HashMap::new(),
        }
    }

    pub fn save_and_clear(&mut self, vars: &[&str]) {
        for &var in vars {
            let original = std::env::var(var).ok();
            self.original_values.insert(var.to_string(), original);
            std::env::remove_var(var);
        }
    }

    pub fn set(&self, var: &str, value: &str) {
        std::env::set_var(var, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (var, original_value) in &self.original_values {
            match original_value {
                Some(value) => std::env::set_var(var, value),
                None => std::env::remove_var(var),
            }
        }
    }
}

impl Default for EnvGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloner that materializes a fixed set of files instead of talking to a
/// remote. Counts calls and can be told to fail.
#[derive(Clone, Default)]
pub struct FakeCloner {
    pub files: Vec<(String, String)>,
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl FakeCloner {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RepoCloner for FakeCloner {
    fn clone_repo(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        if self.fail {
            anyhow::bail!("remote {} unreachable", url);
        }
        std::fs::create_dir_all(dest)?;
        for (name, body) in &self.files {
            let path = dest.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, body)?;
        }
        Ok(())
    }
}

/// Initialize tracing only once for tests so logs are visible when running
/// `cargo test -- --nocapture`. Respects RUST_LOG when set.
pub fn init_test_logging() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
