mod common;

use common::{master_in, new_repo, write_file};
use csearch_rs::Deadline;

#[test]
fn ignored_entries_are_not_indexed() {
    let work = new_repo();
    let repo = work.path().join("repo");
    write_file(&repo, "src/main.go", b"package main\n");
    write_file(&repo, ".git/HEAD", b"ref: refs/heads/main\n");
    write_file(&repo, "#scratch#", b"scratch\n");
    write_file(&repo, "~backup~/old.go", b"package old\n");
    write_file(&repo, "notes.txt~", b"editor backup\n");
    write_file(&repo, "bin/tool", b"\x7fELF\x00\x00\x01");
    let master = master_in(work.path());
    let outcome = master.index(&[repo.clone()], Deadline::none()).unwrap();

    let r = master.open().unwrap();
    let expected = vec![repo.join("src/main.go").to_string_lossy().into_owned()];
    assert_eq!(r.names(), expected.as_slice());
    // The binary is walked and submitted but rejected as content.
    assert_eq!(outcome.build.submitted, 2);
    assert_eq!(outcome.build.failed, 0);
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed() {
    let work = new_repo();
    let repo = work.path().join("repo");
    let outside = work.path().join("outside");
    write_file(&outside, "secret.txt", b"outside the tree\n");
    write_file(&repo, "in.txt", b"inside the tree\n");
    std::os::unix::fs::symlink(&outside, repo.join("link")).unwrap();
    let master = master_in(work.path());
    master.index(&[repo.clone()], Deadline::none()).unwrap();

    let r = master.open().unwrap();
    assert_eq!(r.names().len(), 1);
    assert!(r.names()[0].ends_with("in.txt"));
}
