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

//! Byte trigram extraction shared by the index writer and the query side.
//!
//! ASCII letters are folded to lower case on both sides so a single posting
//! list serves case-sensitive and case-insensitive searches; exact matching
//! is left to the grep step.

use fnv::FnvHashSet;

pub type Trigram = [u8; 3];

#[inline]
pub fn fold(b: u8) -> u8 {
    b.to_ascii_lowercase()
}

/// Iterate over every folded trigram of `bytes`, duplicates included.
pub fn trigrams(bytes: &[u8]) -> impl Iterator<Item = Trigram> + '_ {
    bytes
        .windows(3)
        .map(|w| [fold(w[0]), fold(w[1]), fold(w[2])])
}

/// Distinct folded trigrams of `bytes` in ascending order. Returns `None`
/// once more than `limit` distinct trigrams are seen.
pub fn trigram_set(bytes: &[u8], limit: usize) -> Option<Vec<Trigram>> {
    let mut seen: FnvHashSet<Trigram> = FnvHashSet::default();
    for t in trigrams(bytes) {
        if seen.insert(t) && seen.len() > limit {
            return None;
        }
    }
    let mut out: Vec<Trigram> = seen.into_iter().collect();
    out.sort_unstable();
    Some(out)
}

/// Printable form used in logs and query dumps.
pub fn display(t: &Trigram) -> String {
    t.iter().flat_map(|b| std::ascii::escape_default(*b)).map(char::from).collect()
}
