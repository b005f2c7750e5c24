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

//! Derive a trigram boolean query from a regular expression.
//!
//! The query is a necessary condition: every file containing a match of the
//! pattern satisfies it, so evaluating it against posting lists yields a
//! superset of the files that can match.

use std::fmt;

use regex_syntax::hir::{self, literal::Literals, Hir, HirKind, RepetitionKind, RepetitionRange};
use regex_syntax::Parser as RsParser;

use crate::trigram::{display, trigrams, Trigram};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrigramQuery {
    /// Matches every file.
    All,
    /// Matches no file.
    None,
    Trigram(Trigram),
    And(Vec<TrigramQuery>),
    Or(Vec<TrigramQuery>),
}

impl TrigramQuery {
    pub fn is_all(&self) -> bool {
        matches!(self, TrigramQuery::All)
    }

    pub fn and(self, other: TrigramQuery) -> TrigramQuery {
        match (self, other) {
            (TrigramQuery::None, _) | (_, TrigramQuery::None) => TrigramQuery::None,
            (TrigramQuery::All, q) | (q, TrigramQuery::All) => q,
            (a, b) => {
                let mut parts = Vec::new();
                for q in [a, b] {
                    match q {
                        TrigramQuery::And(inner) => parts.extend(inner),
                        q => parts.push(q),
                    }
                }
                collapse(parts, TrigramQuery::And)
            }
        }
    }

    pub fn or(self, other: TrigramQuery) -> TrigramQuery {
        match (self, other) {
            (TrigramQuery::All, _) | (_, TrigramQuery::All) => TrigramQuery::All,
            (TrigramQuery::None, q) | (q, TrigramQuery::None) => q,
            (a, b) => {
                let mut parts = Vec::new();
                for q in [a, b] {
                    match q {
                        TrigramQuery::Or(inner) => parts.extend(inner),
                        q => parts.push(q),
                    }
                }
                collapse(parts, TrigramQuery::Or)
            }
        }
    }

    pub fn and_all(qs: impl IntoIterator<Item = TrigramQuery>) -> TrigramQuery {
        qs.into_iter().fold(TrigramQuery::All, TrigramQuery::and)
    }

    pub fn or_all(qs: impl IntoIterator<Item = TrigramQuery>) -> TrigramQuery {
        qs.into_iter().fold(TrigramQuery::None, TrigramQuery::or)
    }

    fn write_nested(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            TrigramQuery::All => write!(f, "+"),
            TrigramQuery::None => write!(f, "-"),
            TrigramQuery::Trigram(t) => write!(f, "\"{}\"", display(t)),
            TrigramQuery::And(parts) | TrigramQuery::Or(parts) => {
                let sep = if matches!(self, TrigramQuery::And(_)) {
                    " "
                } else {
                    "|"
                };
                let paren = nested || sep == "|";
                if paren {
                    write!(f, "(")?;
                }
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    p.write_nested(f, true)?;
                }
                if paren {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TrigramQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_nested(f, false)
    }
}

fn collapse(
    mut parts: Vec<TrigramQuery>,
    build: fn(Vec<TrigramQuery>) -> TrigramQuery,
) -> TrigramQuery {
    parts.sort();
    parts.dedup();
    if parts.len() == 1 {
        if let Some(q) = parts.pop() {
            return q;
        }
    }
    build(parts)
}

/// Trigram query for `pattern`. Patterns that fail to parse yield `All`;
/// the caller reports the compile error from the matching engine.
pub fn query_from_regex(pattern: &str) -> TrigramQuery {
    match RsParser::new().parse(pattern) {
        Ok(h) => analyze(&strip_assertions(h)),
        Err(_) => TrigramQuery::All,
    }
}

/// True when `pattern` is empty or a single zero-width anchor, i.e. it
/// matches every file and content need not be read to list names.
pub fn matches_every_file(pattern: &str) -> bool {
    match RsParser::new().parse(pattern) {
        Ok(h) => matches!(h.kind(), HirKind::Empty | HirKind::Anchor(_)),
        Err(_) => false,
    }
}

// Removing zero-width assertions only widens the language, which keeps the
// derived query a necessary condition while letting literal extraction see
// through `^foo$` and `\bfoo\b`.
fn strip_assertions(h: Hir) -> Hir {
    match h.into_kind() {
        HirKind::Anchor(_) | HirKind::WordBoundary(_) | HirKind::Empty => Hir::empty(),
        HirKind::Literal(l) => Hir::literal(l),
        HirKind::Class(c) => Hir::class(c),
        HirKind::Concat(parts) => Hir::concat(
            parts
                .into_iter()
                .map(strip_assertions)
                .filter(|p| !matches!(p.kind(), HirKind::Empty))
                .collect(),
        ),
        HirKind::Alternation(alts) => {
            Hir::alternation(alts.into_iter().map(strip_assertions).collect())
        }
        HirKind::Group(g) => {
            let hir::Group { kind, hir } = g;
            Hir::group(hir::Group {
                kind,
                hir: Box::new(strip_assertions(*hir)),
            })
        }
        HirKind::Repetition(r) => {
            let hir::Repetition { kind, greedy, hir } = r;
            Hir::repetition(hir::Repetition {
                kind,
                greedy,
                hir: Box::new(strip_assertions(*hir)),
            })
        }
    }
}

fn analyze(h: &Hir) -> TrigramQuery {
    let structural = match h.kind() {
        HirKind::Alternation(alts) => return TrigramQuery::or_all(alts.iter().map(analyze)),
        HirKind::Group(g) => return analyze(&g.hir),
        HirKind::Repetition(rep) => {
            if min_repeat(&rep.kind) == 0 {
                return TrigramQuery::All;
            }
            analyze(&rep.hir)
        }
        HirKind::Concat(parts) => {
            TrigramQuery::and_all(parts.iter().map(analyze)).and(literal_runs(parts))
        }
        _ => TrigramQuery::All,
    };
    structural
        .and(literal_set_query(&Literals::prefixes(h)))
        .and(literal_set_query(&Literals::suffixes(h)))
}

fn min_repeat(kind: &RepetitionKind) -> u32 {
    match kind {
        RepetitionKind::ZeroOrOne | RepetitionKind::ZeroOrMore => 0,
        RepetitionKind::OneOrMore => 1,
        RepetitionKind::Range(RepetitionRange::Exactly(n))
        | RepetitionKind::Range(RepetitionRange::AtLeast(n))
        | RepetitionKind::Range(RepetitionRange::Bounded(n, _)) => *n,
    }
}

/// AND of the trigrams of each maximal run of adjacent literals in a
/// concatenation; these are required no matter what surrounds them.
fn literal_runs(parts: &[Hir]) -> TrigramQuery {
    let mut q = TrigramQuery::All;
    let mut run: Vec<u8> = Vec::new();
    for p in parts {
        match p.kind() {
            HirKind::Literal(hir::Literal::Unicode(c)) => {
                let mut buf = [0u8; 4];
                run.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            HirKind::Literal(hir::Literal::Byte(b)) => run.push(*b),
            _ => {
                q = q.and(trigram_conj(&run));
                run.clear();
            }
        }
    }
    q.and(trigram_conj(&run))
}

fn trigram_conj(bytes: &[u8]) -> TrigramQuery {
    TrigramQuery::and_all(trigrams(bytes).map(TrigramQuery::Trigram))
}

fn literal_set_query(lits: &Literals) -> TrigramQuery {
    let lits = lits.literals();
    if lits.is_empty() || lits.iter().any(|l| l.len() < 3) {
        return TrigramQuery::All;
    }
    TrigramQuery::or_all(lits.iter().map(|l| trigram_conj(l)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn satisfied(q: &TrigramQuery, present: &[&[u8; 3]]) -> bool {
        match q {
            TrigramQuery::All => true,
            TrigramQuery::None => false,
            TrigramQuery::Trigram(t) => present.iter().any(|p| *p == t),
            TrigramQuery::And(parts) => parts.iter().all(|p| satisfied(p, present)),
            TrigramQuery::Or(parts) => parts.iter().any(|p| satisfied(p, present)),
        }
    }

    #[test]
    fn plain_literal() {
        assert_eq!(
            query_from_regex("(?m)foo"),
            TrigramQuery::Trigram(*b"foo")
        );
    }

    #[test]
    fn anchors_and_boundaries_are_ignored() {
        let q = query_from_regex(r"(?m)^hello\b");
        assert!(satisfied(&q, &[b"hel", b"ell", b"llo"]));
        assert!(!satisfied(&q, &[b"hel", b"ell"]));
    }

    #[test]
    fn concat_requires_both_ends() {
        let q = query_from_regex("(?m)foo.*bar");
        assert_eq!(
            q,
            TrigramQuery::And(vec![
                TrigramQuery::Trigram(*b"bar"),
                TrigramQuery::Trigram(*b"foo")
            ])
        );
    }

    #[test]
    fn middle_literal_run_is_required() {
        let q = query_from_regex(r"(?m)a.*needle.*b");
        assert!(!satisfied(&q, &[]));
        assert!(satisfied(
            &q,
            &[b"nee", b"eed", b"edl", b"dle"]
        ));
    }

    #[test]
    fn alternation_is_disjunction() {
        let q = query_from_regex("(?m)abc|xyz");
        assert!(satisfied(&q, &[b"abc"]));
        assert!(satisfied(&q, &[b"xyz"]));
        assert!(!satisfied(&q, &[b"abz"]));
    }

    #[test]
    fn optional_prefix_is_not_required() {
        let q = query_from_regex("(?m)(abc)?def");
        assert!(satisfied(&q, &[b"def"]));
        assert!(!satisfied(&q, &[b"abc"]));
    }

    #[test]
    fn short_or_open_patterns_match_everything() {
        assert!(query_from_regex("(?m)a.b").is_all());
        assert!(query_from_regex("(?m)[a-z]+").is_all());
        assert!(query_from_regex("(?m)(foo)*").is_all());
        assert!(query_from_regex("(?m)(").is_all());
    }

    #[test]
    fn case_insensitive_folds_to_one_trigram() {
        assert_eq!(
            query_from_regex("(?i)(?m)FoO"),
            TrigramQuery::Trigram(*b"foo")
        );
    }

    #[test]
    fn simplification_rules() {
        let t = TrigramQuery::Trigram(*b"abc");
        assert_eq!(TrigramQuery::All.and(t.clone()), t);
        assert_eq!(TrigramQuery::None.or(t.clone()), t);
        assert_eq!(TrigramQuery::All.or(t.clone()), TrigramQuery::All);
        assert_eq!(TrigramQuery::None.and(t), TrigramQuery::None);
    }

    #[test]
    fn display_form() {
        let q = query_from_regex("(?m)foo.*(bar|baz)");
        assert_eq!(q.to_string(), "\"foo\" (\"bar\"|\"baz\")");
    }

    #[test]
    fn every_file_patterns() {
        assert!(matches_every_file("(?m)"));
        assert!(matches_every_file("(?i)(?m)"));
        assert!(matches_every_file("(?m)^"));
        assert!(!matches_every_file("(?m)x"));
    }
}
