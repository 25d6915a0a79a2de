//! LEB128 variable-length integers, zigzag signed encoding and the
//! length-prefixed primitives built on them.

use crate::error::{IndexError, Result};

/// Encode an unsigned 64-bit integer as LEB128 into `buf`.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a LEB128 unsigned 64-bit integer from `buf` starting at `*pos`.
/// Advances `*pos` past the consumed bytes.
///
/// At most ten bytes are read; the tenth may only carry the top bit.
pub fn decode_varint(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    for shift in (0u32..64).step_by(7) {
        let byte = *buf
            .get(*pos)
            .ok_or_else(|| IndexError::corrupt("unexpected end of data in varint"))?;
        *pos += 1;

        let payload = u64::from(byte & 0x7F);
        if shift == 63 && payload > 1 {
            return Err(IndexError::corrupt("varint overflow"));
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(IndexError::corrupt("varint overflow"))
}

/// Zigzag-encode a signed i64 into an unsigned u64.
/// Maps: 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Zigzag-decode an unsigned u64 back to a signed i64.
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

// =============================================================================
// Framed primitives
// =============================================================================

pub fn encode_signed(value: i64, buf: &mut Vec<u8>) {
    encode_varint(zigzag_encode(value), buf);
}

pub fn decode_signed(buf: &[u8], pos: &mut usize) -> Result<i64> {
    Ok(zigzag_decode(decode_varint(buf, pos)?))
}

/// Decode a varint that must fit a `usize` and not exceed `max`.
pub fn decode_len(buf: &[u8], pos: &mut usize, max: usize, what: &str) -> Result<usize> {
    let v = decode_varint(buf, pos)?;
    if v > max as u64 {
        return Err(IndexError::corrupt(format!("{what} {v} exceeds limit {max}")));
    }
    Ok(v as usize)
}

pub fn encode_len_str(s: &str, buf: &mut Vec<u8>) {
    encode_varint(s.len() as u64, buf);
    buf.extend_from_slice(s.as_bytes());
}

pub fn decode_len_str(buf: &[u8], pos: &mut usize) -> Result<String> {
    let remaining = buf.len().saturating_sub(*pos);
    let len = decode_len(buf, pos, remaining, "string length")?;
    let bytes = take(buf, pos, len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| IndexError::corrupt(format!("invalid UTF-8 string: {e}")))
}

pub fn decode_u8(buf: &[u8], pos: &mut usize) -> Result<u8> {
    let byte = *buf
        .get(*pos)
        .ok_or_else(|| IndexError::corrupt("unexpected end of data"))?;
    *pos += 1;
    Ok(byte)
}

pub fn encode_f64(value: f64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn decode_f64(buf: &[u8], pos: &mut usize) -> Result<f64> {
    let bytes = take(buf, pos, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(f64::from_be_bytes(raw))
}

/// Borrow the next `len` bytes and advance.
pub fn take<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            IndexError::corrupt(format!(
                "need {len} bytes at offset {}, have {}",
                *pos,
                buf.len().saturating_sub(*pos)
            ))
        })?;
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}

// =============================================================================
// Tests
// =============================================================================
