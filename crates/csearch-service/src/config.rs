use anyhow::{Context, Result};
use csearch_rs::{MasterIndex, WriterOptions};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Settings of one csearch service process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Directory under which repositories are cloned.
    pub workspace_root: PathBuf,
    /// Path of the master index generation.
    pub master_index: PathBuf,
    /// Deadline applied to each request from its arrival.
    pub request_timeout: Duration,
    /// Index members of `*.zip` files found in cloned trees.
    pub index_zip: bool,
    /// Verify the existing master before merging into it.
    pub check_index: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            workspace_root: PathBuf::from("/tmp"),
            master_index: PathBuf::from("/tmp/.csearchindex"),
            request_timeout: Duration::from_secs(300),
            index_zip: false,
            check_index: false,
        }
    }
}

impl ServiceConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Master index handle carrying this config's writer settings.
    pub fn master(&self) -> MasterIndex {
        MasterIndex::new(&self.master_index)
            .writer_options(WriterOptions::default().zip_members(self.index_zip))
            .check_index(self.check_index)
    }
}

/// CLI-level options that binaries pass to `load_service_config`.
#[derive(Clone, Debug, Default)]
pub struct MergeOpts {
    pub config_path: Option<PathBuf>,
    pub cli_host: Option<String>,
    pub cli_port: Option<u16>,
    pub cli_workspace_root: Option<PathBuf>,
    pub cli_master_index: Option<PathBuf>,
    pub cli_request_timeout_seconds: Option<u64>,
    pub cli_index_zip: Option<bool>,
    pub cli_check_index: Option<bool>,
}

fn env_bool(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.as_str() {
        "1" | "true" | "TRUE" | "True" | "yes" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" => Some(false),
        _ => None,
    }
}

/// Load and merge ServiceConfig from: defaults <- config file <- env vars <- CLI
pub fn load_service_config(mut base: ServiceConfig, opts: MergeOpts) -> Result<ServiceConfig> {
    if let Some(path) = opts.config_path.as_ref() {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            let v: toml::Value = toml::from_str(&s)
                .with_context(|| format!("parse config {}", path.display()))?;
            if let Some(h) = v.get("host").and_then(|x| x.as_str()) {
                base.host = h.to_string();
            }
            if let Some(p) = v.get("port").and_then(|x| x.as_integer()) {
                if let Ok(p) = u16::try_from(p) {
                    base.port = p;
                }
            }
            if let Some(w) = v.get("workspace_root").and_then(|x| x.as_str()) {
                base.workspace_root = PathBuf::from(w);
            }
            if let Some(m) = v.get("master_index").and_then(|x| x.as_str()) {
                base.master_index = PathBuf::from(m);
            }
            if let Some(t) = v.get("request_timeout_seconds").and_then(|x| x.as_integer()) {
                if t > 0 {
                    base.request_timeout = Duration::from_secs(t as u64);
                }
            }
            if let Some(z) = v.get("index_zip").and_then(|x| x.as_bool()) {
                base.index_zip = z;
            }
            if let Some(c) = v.get("check_index").and_then(|x| x.as_bool()) {
                base.check_index = c;
            }
        }
    }

    // env vars override file; unparseable values are ignored
    if let Ok(h) = std::env::var("CSEARCH_HOST") {
        base.host = h;
    }
    if let Ok(p) = std::env::var("CSEARCH_PORT") {
        if let Ok(v) = p.parse::<u16>() {
            base.port = v;
        }
    }
    if let Ok(w) = std::env::var("CSEARCH_WORKSPACE_ROOT") {
        base.workspace_root = PathBuf::from(w);
    }
    if let Ok(m) = std::env::var("CSEARCH_MASTER_INDEX") {
        base.master_index = PathBuf::from(m);
    }
    if let Ok(t) = std::env::var("CSEARCH_REQUEST_TIMEOUT_SECONDS") {
        if let Ok(v) = t.parse::<u64>() {
            base.request_timeout = Duration::from_secs(v);
        }
    }
    if let Some(z) = env_bool("CSEARCH_INDEX_ZIP") {
        base.index_zip = z;
    }
    if let Some(c) = env_bool("CSEARCH_CHECK_INDEX") {
        base.check_index = c;
    }

    // CLI overrides everything
    if let Some(h) = opts.cli_host {
        base.host = h;
    }
    if let Some(p) = opts.cli_port {
        base.port = p;
    }
    if let Some(w) = opts.cli_workspace_root {
        base.workspace_root = w;
    }
    if let Some(m) = opts.cli_master_index {
        base.master_index = m;
    }
    if let Some(t) = opts.cli_request_timeout_seconds {
        base.request_timeout = Duration::from_secs(t);
    }
    if let Some(z) = opts.cli_index_zip {
        base.index_zip = z;
    }
    if let Some(c) = opts.cli_check_index {
        base.check_index = c;
    }

    Ok(base)
}
