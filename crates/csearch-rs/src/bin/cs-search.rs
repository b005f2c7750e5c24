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

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use csearch_rs::{search_master, CompiledQuery, CsearchError, Deadline, MasterIndex, SearchFlags};

#[derive(Parser, Debug)]
#[command(name = "cs-search", about = "Search a csearch index with a regular expression")]
struct Args {
    /// Regular expression to search for
    pattern: String,
    /// Comma-separated search flags, e.g. "-i,-n,-f=\.go$"
    #[arg(long, default_value = "")]
    args: String,
    /// Index file to search (env: CSEARCHINDEX)
    #[arg(long, env = "CSEARCHINDEX", default_value = "/tmp/.csearchindex")]
    index: PathBuf,
    /// Print the search report as JSON on stderr
    #[arg(long)]
    report: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let query = CompiledQuery::with_flags(&args.pattern, SearchFlags::parse(&args.args)?)?;
    match search_master(&MasterIndex::new(&args.index), &query, Deadline::none()) {
        Ok(out) => {
            print!("{}", out.output);
            if args.report {
                eprintln!("{}", serde_json::to_string_pretty(&out.report)?);
            }
            Ok(())
        }
        Err(CsearchError::NoMatches) => std::process::exit(1),
        Err(e) => Err(e.into()),
    }
}
