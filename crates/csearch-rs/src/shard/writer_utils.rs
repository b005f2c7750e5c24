use std::io::Write;

// Varint helpers: simple LEB128-style unsigned varint for u32, decoded by
// `utils::read_var_u32` on the reader side.
pub(crate) fn write_var_u32<W: Write>(w: &mut W, mut v: u32) -> anyhow::Result<()> {
    let mut buf = [0u8; 5];
    let mut i = 0;
    while v >= 0x80 {
        buf[i] = (v as u8 & 0x7F) | 0x80;
        v >>= 7;
        i += 1;
    }
    buf[i] = v as u8;
    i += 1;
    w.write_all(&buf[..i])?;
    Ok(())
}

/// Write `len` as `u16` followed by the bytes of `s`.
pub(crate) fn write_str<W: Write>(w: &mut W, s: &str, what: &str) -> anyhow::Result<()> {
    let b = s.as_bytes();
    if b.len() > u16::MAX as usize {
        anyhow::bail!("{} too long: {}", what, s)
    }
    w.write_all(&(b.len() as u16).to_le_bytes())?;
    w.write_all(b)?;
    Ok(())
}

/// Delta-encode an ascending posting list.
pub(crate) fn write_postings<W: Write>(w: &mut W, ids: &[u32]) -> anyhow::Result<()> {
    let mut prev = 0u32;
    for (i, &id) in ids.iter().enumerate() {
        if i > 0 && id <= prev {
            anyhow::bail!("posting list not strictly ascending at {}", id)
        }
        write_var_u32(w, id - if i == 0 { 0 } else { prev })?;
        prev = id;
    }
    Ok(())
}
