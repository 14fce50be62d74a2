use std::io::{Read, Write};

use anyhow::{bail, Context};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub fn write_bytes(wtr: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    wtr.write_u32::<LittleEndian>(bytes.len() as u32)?;
    wtr.write_all(bytes)
}

pub fn write_str(wtr: &mut impl Write, s: &str) -> std::io::Result<()> {
    write_bytes(wtr, s.as_bytes())
}

pub fn write_bool(wtr: &mut impl Write, value: bool) -> std::io::Result<()> {
    wtr.write_u8(value as u8)
}

pub fn read_bytes(rdr: &mut impl Read) -> anyhow::Result<Vec<u8>> {
    let len = rdr.read_u32::<LittleEndian>().context("missing length")? as usize;
    // the buffer only grows with bytes actually present, whatever length was claimed
    let mut buffer = Vec::new();
    rdr.by_ref().take(len as u64).read_to_end(&mut buffer).context("failed to read bytes")?;
    if buffer.len() != len {
        bail!("truncated bytes: expected {len}, got {}", buffer.len());
    }
    Ok(buffer)
}

pub fn read_str(rdr: &mut impl Read) -> anyhow::Result<String> {
    let bytes = read_bytes(rdr)?;
    String::from_utf8(bytes).context("string is not utf-8")
}

pub fn read_bool(rdr: &mut impl Read) -> anyhow::Result<bool> {
    Ok(rdr.read_u8().context("missing flag")? != 0)
}

/// Writes `body` prefixed with its length, the framing every message uses.
pub fn write_frame(wtr: &mut impl Write, body: &[u8]) -> std::io::Result<()> {
    wtr.write_u32::<LittleEndian>(body.len() as u32)?;
    wtr.write_all(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_length_is_rejected_without_reading_past_the_input() {
        let mut input = Vec::new();
        input.write_u32::<LittleEndian>(u32::MAX).unwrap();
        input.extend_from_slice(b"abc");

        let error = read_bytes(&mut &input[..]).unwrap_err();
        assert!(error.to_string().starts_with("truncated bytes"), "{error}");
    }

    #[test]
    fn strings_and_flags() {
        let mut out = Vec::new();
        write_str(&mut out, "cell_1,2").unwrap();
        write_bool(&mut out, true).unwrap();

        let mut rdr = &out[..];
        assert_eq!(read_str(&mut rdr).unwrap(), "cell_1,2");
        assert!(read_bool(&mut rdr).unwrap());
        assert!(rdr.is_empty());
    }
}
