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

use crate::error::CsearchError;
use crate::regex_analyze::{matches_every_file, query_from_regex, TrigramQuery};

use super::flags::SearchFlags;

/// A fully validated search request: content and filename matchers plus
/// the trigram query used to narrow candidates.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub term: String,
    /// Final pattern handed to the matcher, including inline flags.
    pub pattern: String,
    pub regex: regex::bytes::Regex,
    pub file_filter: Option<regex::Regex>,
    pub flags: SearchFlags,
    trigram_query: TrigramQuery,
}

impl CompiledQuery {
    /// Compile `term` with the comma-separated `args`. Both must be present
    /// and non-empty; pattern errors surface before the index is touched.
    pub fn compile(term: Option<&str>, args: Option<&str>) -> Result<Self, CsearchError> {
        let (term, args) = match (term, args) {
            (Some(t), Some(a)) if !t.is_empty() && !a.is_empty() => (t, a),
            _ => return Err(CsearchError::invalid("args or q not provided")),
        };
        let flags = SearchFlags::parse(args)?;
        Self::with_flags(term, flags)
    }

    pub fn with_flags(term: &str, flags: SearchFlags) -> Result<Self, CsearchError> {
        let mut pattern = format!("(?m){}", term);
        if flags.ignore_case {
            pattern = format!("(?i){}", pattern);
        }
        let regex = regex::bytes::Regex::new(&pattern)?;
        let file_filter = flags
            .file_filter
            .as_deref()
            .map(regex::Regex::new)
            .transpose()?;
        let trigram_query = query_from_regex(&pattern);
        Ok(Self {
            term: term.to_string(),
            pattern,
            regex,
            file_filter,
            flags,
            trigram_query,
        })
    }

    /// Query that selects candidates; brute mode selects every file.
    pub fn trigram_query(&self) -> TrigramQuery {
        if self.flags.brute {
            TrigramQuery::All
        } else {
            self.trigram_query.clone()
        }
    }

    /// With `-l` and a pattern that matches every file, names can be listed
    /// without reading content.
    pub fn names_only(&self) -> bool {
        self.flags.grep.list_names && matches_every_file(&self.pattern)
    }

    pub fn accepts_name(&self, name: &str) -> bool {
        self.file_filter.as_ref().map_or(true, |re| re.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_term_and_args() {
        let cases = [
            (None, Some("-n")),
            (Some("x"), None),
            (Some(""), Some("-n")),
            (Some("x"), Some("")),
        ];
        for (q, a) in cases {
            match CompiledQuery::compile(q, a) {
                Err(CsearchError::InvalidRequest(m)) => assert_eq!(m, "args or q not provided"),
                other => panic!("unexpected: {:?}", other.map(|c| c.pattern)),
            }
        }
    }

    #[test]
    fn builds_pattern_with_inline_flags() {
        let c = CompiledQuery::compile(Some("Foo"), Some("-n")).unwrap();
        assert_eq!(c.pattern, "(?m)Foo");
        assert!(!c.regex.is_match(b"foo"));
        let c = CompiledQuery::compile(Some("Foo"), Some("-i")).unwrap();
        assert_eq!(c.pattern, "(?i)(?m)Foo");
        assert!(c.regex.is_match(b"foo"));
    }

    #[test]
    fn pattern_errors() {
        assert!(matches!(
            CompiledQuery::compile(Some("a("), Some("-n")),
            Err(CsearchError::Pattern(_))
        ));
        assert!(matches!(
            CompiledQuery::compile(Some("a"), Some("-f,[")),
            Err(CsearchError::Pattern(_))
        ));
    }

    #[test]
    fn brute_queries_everything() {
        let c = CompiledQuery::compile(Some("needle"), Some("-brute")).unwrap();
        assert!(c.trigram_query().is_all());
        let c = CompiledQuery::compile(Some("needle"), Some("-n")).unwrap();
        assert!(!c.trigram_query().is_all());
    }

    #[test]
    fn names_only_for_anchor_patterns() {
        assert!(CompiledQuery::compile(Some("^"), Some("-l")).unwrap().names_only());
        assert!(!CompiledQuery::compile(Some("^"), Some("-n")).unwrap().names_only());
        assert!(!CompiledQuery::compile(Some("x"), Some("-l")).unwrap().names_only());
    }

    #[test]
    fn filename_filter() {
        let c = CompiledQuery::compile(Some("x"), Some("-f=\\.go$")).unwrap();
        assert!(c.accepts_name("/r/main.go"));
        assert!(!c.accepts_name("/r/main.rs"));
    }
}
