// Candidate selection checks over a small corpus: the trigram query derived
// from a pattern must never drop a file the pattern matches.
mod common;

use common::{master_in, new_repo, write_file};
use csearch_rs::{CompiledQuery, Deadline, PostingSource};

const CORPUS: &[(&str, &str)] = &[
    ("a.go", "package main\n\nfunc main() {\n\tfmt.Println(\"hello, world\")\n}\n"),
    ("b.rs", "fn parse_header(buf: &[u8]) -> Header {\n    Header::default()\n}\n"),
    ("c.txt", "The quick brown fox jumps over the lazy dog.\n"),
    ("d.py", "def foobar():\n    return foobaz()\n"),
    ("e.md", "# Title\n\nabc[pq] and abcp and ABCQ\n"),
    ("f.c", "int main(void) { return 0; }\n/* TODO: remove */\n"),
    ("g.txt", "xyzzy\nplugh\n"),
];

const PATTERNS: &[&str] = &[
    "hello",
    "Hello",
    "fo+bar",
    "foobar|foobaz",
    "foo(bar|baz)",
    "abc[p-q]",
    r"\bmain\b",
    "^func",
    r"parse_\w+\(",
    "qu?ick",
    "(ab)+c",
    "x*yz",
    "TODO.*remove",
    "nothing-here",
    "[0-9]",
    "(?s)brown.*dog",
    r"Header::\w+",
];

#[test]
fn candidates_cover_every_matching_file() {
    let dir = new_repo();
    let root = dir.path().join("corpus");
    for (name, body) in CORPUS {
        write_file(&root, name, body.as_bytes());
    }
    let master = master_in(dir.path());
    master.index(&[root], Deadline::none()).expect("index");
    let reader = master.open().expect("open");

    for args in ["-n", "-i"] {
        for pat in PATTERNS {
            let q = CompiledQuery::compile(Some(pat), Some(args)).expect("compile");
            let cands = reader.posting_query(&q.trigram_query()).expect("posting query");
            for (id, name) in reader.names().iter().enumerate() {
                let body = std::fs::read(name).expect("read corpus file");
                if q.regex.is_match(&body) {
                    assert!(
                        cands.contains(&(id as u32)),
                        "pattern {:?} args {} matches {} but query {} dropped it",
                        pat,
                        args,
                        name,
                        q.trigram_query()
                    );
                }
            }
        }
    }
}

#[test]
fn literal_patterns_narrow_candidates() {
    let dir = new_repo();
    let root = dir.path().join("corpus");
    for (name, body) in CORPUS {
        write_file(&root, name, body.as_bytes());
    }
    let master = master_in(dir.path());
    master.index(&[root], Deadline::none()).expect("index");
    let reader = master.open().expect("open");

    let names_for = |pat: &str| -> Vec<String> {
        let q = CompiledQuery::compile(Some(pat), Some("-n")).expect("compile");
        reader
            .posting_query(&q.trigram_query())
            .expect("posting query")
            .into_iter()
            .map(|id| reader.name(id).expect("name").to_string())
            .collect()
    };

    let got = names_for("parse_header");
    assert_eq!(got.len(), 1, "{:?}", got);
    assert!(got[0].ends_with("b.rs"));

    let got = names_for("foobar|xyzzy");
    assert_eq!(got.len(), 2, "{:?}", got);

    assert!(names_for("nothing-here").is_empty());
    // too short to derive trigrams, every file is a candidate
    assert_eq!(names_for("[0-9]").len(), CORPUS.len());
}
