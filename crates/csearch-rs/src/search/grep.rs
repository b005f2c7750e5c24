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

//! Line-oriented grep over file content, with the classic output modes.

use std::fmt::Write as _;
use std::io::Read;

/// Output options shared by every file of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrepOptions {
    /// Escape names and lines for HTML.
    pub html: bool,
    /// `-l`: print each matching file name once.
    pub list_names: bool,
    /// `-c`: print the number of matching lines per file.
    pub count: bool,
    /// `-n`: prefix lines with their 1-based number.
    pub line_numbers: bool,
    /// `-h`: omit file names.
    pub omit_names: bool,
}

/// Accumulates matches for one request.
pub struct Grep<'a> {
    regex: &'a regex::bytes::Regex,
    opts: GrepOptions,
    out: String,
    matched: bool,
}

pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

impl<'a> Grep<'a> {
    pub fn new(regex: &'a regex::bytes::Regex, opts: GrepOptions) -> Self {
        Self {
            regex,
            opts,
            out: String::new(),
            matched: false,
        }
    }

    fn text(&self, s: &str) -> String {
        if self.opts.html {
            html_escape(s)
        } else {
            s.to_string()
        }
    }

    /// Report `name` as matching without looking at its content.
    pub fn name_only(&mut self, name: &str) {
        let n = self.text(name);
        let _ = writeln!(self.out, "{}", n);
        self.matched = true;
    }

    /// Emit every line of `content` containing a match. Returns the number
    /// of matching lines (at most one with `-l`).
    pub fn grep_bytes(&mut self, content: &[u8], name: &str) -> usize {
        let mut pos = 0usize;
        let mut lineno = 1usize;
        let mut counted_to = 0usize;
        let mut count = 0usize;
        while pos <= content.len() {
            let Some(m) = self.regex.find_at(content, pos) else {
                break;
            };
            // An empty match after the final newline is not a line.
            if m.start() == content.len() && (content.is_empty() || content.ends_with(b"\n")) {
                break;
            }
            let line_start = content[..m.start()]
                .iter()
                .rposition(|&b| b == b'\n')
                .map_or(0, |i| i + 1);
            let tail = if m.end() > m.start() { m.end() - 1 } else { m.start() };
            let line_end = content[tail..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(content.len(), |i| tail + i);
            lineno += content[counted_to..line_start]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            counted_to = line_start;
            count += 1;
            self.matched = true;

            if self.opts.list_names {
                self.name_only(name);
                return 1;
            }
            if !self.opts.count {
                let line = String::from_utf8_lossy(&content[line_start..line_end]);
                let line = self.text(&line);
                if !self.opts.omit_names {
                    let n = self.text(name);
                    let _ = write!(self.out, "{}:", n);
                }
                if self.opts.line_numbers {
                    let _ = write!(self.out, "{}:", lineno);
                }
                let _ = writeln!(self.out, "{}", line);
            }
            pos = line_end + 1;
        }
        if self.opts.count && count > 0 {
            if self.opts.omit_names {
                let _ = writeln!(self.out, "{}", count);
            } else {
                let n = self.text(name);
                let _ = writeln!(self.out, "{}: {}", n, count);
            }
        }
        count
    }

    pub fn grep_reader<R: Read>(&mut self, mut r: R, name: &str) -> std::io::Result<usize> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        Ok(self.grep_bytes(&buf, name))
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }
}
