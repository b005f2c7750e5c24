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

use anyhow::{bail, Context, Result};

/// Read a u32 varint encoded in LEB128 style from a mapped buffer.
pub(crate) fn read_var_u32(buf: &[u8], off: &mut usize) -> Result<u32> {
    let mut shift = 0u32;
    let mut out: u32 = 0;
    loop {
        if *off >= buf.len() {
            bail!("unexpected EOF while reading varint");
        }
        let b = buf[*off];
        *off += 1;
        out |= ((b & 0x7F) as u32) << shift;
        if (b & 0x80) == 0 {
            return Ok(out);
        }
        shift += 7;
        if shift >= 35 {
            bail!("varint too long");
        }
    }
}

fn slice_at<'a>(buf: &'a [u8], off: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = off
        .checked_add(len)
        .with_context(|| format!("offset overflow while reading {}", what))?;
    buf.get(off..end).with_context(|| {
        format!(
            "index truncated or malformed while reading {} (off={}, len={})",
            what,
            off,
            buf.len()
        )
    })
}

pub(crate) fn read_u16(buf: &[u8], off: &mut usize, what: &str) -> Result<u16> {
    let b = slice_at(buf, *off, 2, what)?;
    *off += 2;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(buf: &[u8], off: &mut usize, what: &str) -> Result<u32> {
    let b = slice_at(buf, *off, 4, what)?;
    *off += 4;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn read_u64(buf: &[u8], off: &mut usize, what: &str) -> Result<u64> {
    let b = slice_at(buf, *off, 8, what)?;
    *off += 8;
    let mut a = [0u8; 8];
    a.copy_from_slice(b);
    Ok(u64::from_le_bytes(a))
}

pub(crate) fn read_trigram(buf: &[u8], off: &mut usize) -> Result<[u8; 3]> {
    let b = slice_at(buf, *off, 3, "trigram")?;
    *off += 3;
    Ok([b[0], b[1], b[2]])
}

/// Read a `u16` length-prefixed UTF-8 string.
pub(crate) fn read_str(buf: &[u8], off: &mut usize, what: &str) -> Result<String> {
    let n = read_u16(buf, off, what)? as usize;
    let b = slice_at(buf, *off, n, what)?;
    let s = std::str::from_utf8(b)
        .with_context(|| format!("index corrupted: {} not valid UTF-8 (off={})", what, off))?
        .to_string();
    *off += n;
    Ok(s)
}

pub(crate) fn intersect_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut i = 0;
    let mut j = 0;
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

pub(crate) fn union_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut i = 0;
    let mut j = 0;
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_set_ops() {
        assert_eq!(intersect_sorted(&[1, 3, 5, 7], &[3, 4, 7]), vec![3, 7]);
        assert_eq!(union_sorted(&[1, 3, 5], &[2, 3, 9]), vec![1, 2, 3, 5, 9]);
        assert!(intersect_sorted(&[], &[1]).is_empty());
    }

    #[test]
    fn truncated_reads_fail() {
        let buf = [1u8, 0, 0];
        let mut off = 0;
        assert!(read_u32(&buf, &mut off, "count").is_err());
        assert_eq!(off, 0);
        let mut off = 0;
        assert_eq!(read_u16(&buf, &mut off, "len").unwrap(), 1);
        assert_eq!(off, 2);
    }

    #[test]
    fn unterminated_varint_fails() {
        let mut off = 0;
        assert!(read_var_u32(&[0x80, 0x80], &mut off).is_err());
        let mut off = 0;
        assert!(read_var_u32(&[0xFF; 6], &mut off).is_err());
    }
}
