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

//! Search flag parsing.
//!
//! Flags arrive as one comma-separated string such as `-i,-f,\.go$,-n`.
//! Each token is a flag name with zero, one or two leading dashes and an
//! optional `=value`. String flags take their value from `=value` or from
//! the following token.

use std::path::PathBuf;

use crate::error::CsearchError;
use crate::search::GrepOptions;

/// Parsed search options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFlags {
    pub ignore_case: bool,
    /// Regex applied to indexed file names.
    pub file_filter: Option<String>,
    pub html: bool,
    pub verbose: bool,
    /// Query every indexed file instead of the trigram candidates.
    pub brute: bool,
    /// Where to write the JSON timing report of the search.
    pub profile: Option<PathBuf>,
    pub grep: GrepOptions,
}

enum Kind {
    Bool(fn(&mut SearchFlags, bool)),
    Str(fn(&mut SearchFlags, String)),
}

fn lookup(name: &str) -> Option<Kind> {
    Some(match name {
        "i" => Kind::Bool(|f, v| f.ignore_case = v),
        "html" => Kind::Bool(|f, v| {
            f.html = v;
            f.grep.html = v;
        }),
        "verbose" => Kind::Bool(|f, v| f.verbose = v),
        "brute" => Kind::Bool(|f, v| f.brute = v),
        "l" => Kind::Bool(|f, v| f.grep.list_names = v),
        "c" => Kind::Bool(|f, v| f.grep.count = v),
        "n" => Kind::Bool(|f, v| f.grep.line_numbers = v),
        "h" => Kind::Bool(|f, v| f.grep.omit_names = v),
        "f" => Kind::Str(|f, v| f.file_filter = if v.is_empty() { None } else { Some(v) }),
        "cpuprofile" => {
            Kind::Str(|f, v| f.profile = if v.is_empty() { None } else { Some(PathBuf::from(v)) })
        }
        _ => return None,
    })
}

fn parse_bool(name: &str, v: &str) -> Result<bool, CsearchError> {
    match v {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(CsearchError::invalid(format!(
            "invalid boolean value {:?} for -{}",
            v, name
        ))),
    }
}

impl SearchFlags {
    pub fn parse(args: &str) -> Result<Self, CsearchError> {
        let mut flags = SearchFlags::default();
        let mut tokens = args.split(',').map(str::trim).filter(|t| !t.is_empty());
        while let Some(tok) = tokens.next() {
            if tok == "--" {
                if let Some(extra) = tokens.next() {
                    return Err(CsearchError::invalid(format!(
                        "unexpected argument {:?}",
                        extra
                    )));
                }
                break;
            }
            let dashed = tok.starts_with('-');
            let body = tok
                .strip_prefix("--")
                .or_else(|| tok.strip_prefix('-'))
                .unwrap_or(tok);
            let (name, value) = match body.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (body, None),
            };
            let Some(kind) = lookup(name) else {
                return Err(if dashed {
                    CsearchError::invalid(format!("flag provided but not defined: -{}", name))
                } else {
                    CsearchError::invalid(format!("unexpected argument {:?}", tok))
                });
            };
            match kind {
                Kind::Bool(set) => {
                    let v = match value {
                        Some(v) => parse_bool(name, v)?,
                        None => true,
                    };
                    set(&mut flags, v);
                }
                Kind::Str(set) => {
                    let v = match value {
                        Some(v) => v.to_string(),
                        None => tokens
                            .next()
                            .ok_or_else(|| {
                                CsearchError::invalid(format!("flag needs an argument: -{}", name))
                            })?
                            .to_string(),
                    };
                    set(&mut flags, v);
                }
            }
        }
        Ok(flags)
    }
}
