#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
pub use tempfile;

use csearch_rs::{CompiledQuery, MasterIndex, WriterOptions};

/// Create a temporary directory and return its guard.
pub fn new_repo() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Write a file relative to the repo root.
pub fn write_file(repo: &Path, rel: &str, contents: &[u8]) -> PathBuf {
    let p = repo.join(rel);
    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(&p, contents).expect("write file");
    p
}

/// Write a zip archive with the given members.
pub fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let f = std::fs::File::create(path).expect("create zip");
    let mut zw = zip::ZipWriter::new(f);
    for (name, body) in members {
        zw.start_file(*name, zip::write::FileOptions::default())
            .expect("start member");
        zw.write_all(body.as_bytes()).expect("write member");
    }
    zw.finish().expect("finish zip");
}

/// Master index living in `dir`.
pub fn master_in(dir: &Path) -> MasterIndex {
    MasterIndex::new(dir.join(".csearchindex"))
}

pub fn zip_master_in(dir: &Path) -> MasterIndex {
    master_in(dir).writer_options(WriterOptions::default().zip_members(true))
}

pub fn compile(term: &str, args: &str) -> CompiledQuery {
    CompiledQuery::compile(Some(term), Some(args)).expect("compile query")
}

/// Names of leftover temporary generations next to the master.
pub fn temporaries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect()
}
