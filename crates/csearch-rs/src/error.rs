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

use thiserror::Error;

/// Errors surfaced by the index and search pipelines. The `Display` text is
/// what the HTTP layer returns as the response body.
#[derive(Debug, Error)]
pub enum CsearchError {
    /// Missing or malformed request input (repo, q, args, flags).
    #[error("{0}")]
    InvalidRequest(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Content or filename pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(String),
    #[error("index write failed: {0}")]
    IndexWrite(String),
    #[error("index merge failed: {0}")]
    IndexMerge(String),
    #[error("index open failed: {0}")]
    IndexOpen(String),
    #[error("clone failed: {0}")]
    Clone(String),
    #[error("deadline exceeded during {0}")]
    DeadlineExceeded(String),
    #[error("no matches found")]
    NoMatches,
    #[error("Not Found")]
    NotFound,
}

impl CsearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CsearchError::InvalidRequest(msg.into())
    }

    /// Render an engine error with its whole context chain.
    pub(crate) fn chain(e: &anyhow::Error) -> String {
        format!("{:#}", e)
    }
}

impl From<regex::Error> for CsearchError {
    fn from(e: regex::Error) -> Self {
        CsearchError::Pattern(e.to_string())
    }
}
