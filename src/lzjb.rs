//! LZJB decompression, translated from the teacher crate's implementation
//! (itself derived from `module/zfs/lzjb.c` upstream). Kept even though
//! LZJB never shows up on the path this crate tests end-to-end, since the
//! dispatcher still needs a real implementation rather than a stub for any
//! image that declares it.

use crate::error::{Error, Result};

const MATCH_BITS: u32 = 6;
const MATCH_MIN: usize = 3;
const OFFSET_MASK: usize = (1 << (16 - MATCH_BITS)) - 1;

pub fn decompress(data: &[u8], output_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(output_size);
    let mut pos = 0usize;
    let mut copymap: u8 = 0;
    let mut copymask: u16 = 1 << 7;

    while out.len() < output_size {
        copymask <<= 1;
        if copymask == (1 << 8) {
            copymask = 1;
            copymap = *data.get(pos).ok_or_else(eof)?;
            pos += 1;
        }

        if copymap & (copymask as u8) != 0 {
            let byte0 = *data.get(pos).ok_or_else(eof)?;
            let byte1 = *data.get(pos + 1).ok_or_else(eof)?;
            pos += 2;
            let match_len = (byte0 >> (8 - MATCH_BITS)) as usize + MATCH_MIN;
            let lookback = (((byte0 as u16) << 8) | byte1 as u16) as usize & OFFSET_MASK;
            if lookback == 0 || lookback > out.len() {
                return Err(Error::NvInvalid {
                    offset: pos,
                    reason: "lzjb lookback distance out of range",
                });
            }
            let mut copy_from = out.len() - lookback;
            for _ in 0..match_len {
                if out.len() >= output_size {
                    break;
                }
                let b = out[copy_from];
                out.push(b);
                copy_from += 1;
            }
        } else {
            out.push(*data.get(pos).ok_or_else(eof)?);
            pos += 1;
        }
    }

    Ok(out)
}

fn eof() -> Error {
    Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_literal_only() {
        // copymap byte of 0 means the next 8 symbols are all literals.
        let data = [0x00u8, b'a', b'b', b'c'];
        let out = decompress(&data, 3).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn short_stream_is_error() {
        let data = [0x00u8, b'a'];
        assert!(decompress(&data, 3).is_err());
    }
}
