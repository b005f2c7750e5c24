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

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use csearch_rs::{Deadline, MasterIndex, WriterOptions};

#[derive(Parser, Debug)]
#[command(name = "cs-index", about = "Add directory trees to a csearch index")]
struct Args {
    /// Directories (or files) to index
    #[arg(required = true)]
    roots: Vec<PathBuf>,
    /// Index file to update (env: CSEARCHINDEX)
    #[arg(long, env = "CSEARCHINDEX", default_value = "/tmp/.csearchindex")]
    index: PathBuf,
    /// Discard the existing index instead of merging into it
    #[arg(long)]
    reset: bool,
    /// Index members of *.zip files
    #[arg(long)]
    zip: bool,
    /// Verify the existing index before merging
    #[arg(long)]
    check: bool,
    /// Print the update outcome as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cwd = std::env::current_dir().context("current directory")?;
    let roots: Vec<PathBuf> = args
        .roots
        .iter()
        .map(|r| if r.is_absolute() { r.clone() } else { cwd.join(r) })
        .collect();

    let master = MasterIndex::new(&args.index)
        .writer_options(WriterOptions::default().zip_members(args.zip))
        .check_index(args.check);
    let lease = master.lock(Deadline::none())?;
    if args.reset && master.exists() {
        std::fs::remove_file(master.path())
            .with_context(|| format!("remove {}", master.path().display()))?;
    }
    let outcome = master.update(&lease, &roots, Deadline::none())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "{:?} {}: {} files, {} trigrams, {} bytes ({} walk failures)",
            outcome.mode,
            master.path().display(),
            outcome.stats.files,
            outcome.stats.trigrams,
            outcome.stats.bytes,
            outcome.build.failed
        );
    }
    Ok(())
}
