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

/// Names skipped by the tree walk: editor backups, lock files and dot
/// entries such as `.git`. Directories with these names are not descended.
pub(crate) fn is_ignored_name(name: &str) -> bool {
    name.starts_with(['.', '#', '~']) || name.ends_with('~')
}

/// Heuristic: decide whether a byte buffer should be considered text.
pub(crate) fn is_text(buf: &[u8]) -> bool {
    if buf.is_empty() {
        return true;
    }
    // Reject if NUL present
    if buf.contains(&0) {
        return false;
    }
    // a high fraction of non-printable bytes (UTF-8 excluded) means binary
    let sample = &buf[..std::cmp::min(buf.len(), 4096)];
    let non_print = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t'))
        .count();
    let ratio = non_print as f64 / sample.len() as f64;
    ratio < 0.30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_names() {
        for n in [".git", ".hidden", "#scratch#", "~backup~", "file~", "~lock"] {
            assert!(is_ignored_name(n), "{} should be ignored", n);
        }
        for n in ["main.go", "a.b", "x#y", "mid~dle"] {
            assert!(!is_ignored_name(n), "{} should be kept", n);
        }
    }

    #[test]
    fn text_heuristic() {
        assert!(is_text(b""));
        assert!(is_text(b"fn main() {}\n\tlet x = 1;\r\n"));
        assert!(!is_text(b"ab\0cd"));
        assert!(!is_text(&[1u8, 2, 3, 4, b'a']));
    }
}
