//! LZ4 block-stream decompression, ZFS framing only (no frame header, no
//! checksums — just a raw sequence of LZ4 blocks).
//!
//! Grounded in the teacher crate's `lz4_decompress_blocks`, changed to
//! take an explicit output capacity instead of relying on end-of-stream
//! detection, since ZFS always knows the logical size up front (it's
//! `props.lsize_bytes`) and the bare LZ4 block format is otherwise
//! ambiguous about where the last block ends.

use crate::error::{Error, Result};

pub fn decompress_blocks(data: &[u8], output_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(output_size);
    let mut pos = 0usize;

    while out.len() < output_size {
        let token = *data.get(pos).ok_or_else(|| short(output_size, out.len()))?;
        pos += 1;
        let mut literal_size: usize = ((token & 0xF0) >> 4) as usize;
        let lookback_token: usize = (token & 0x0F) as usize;

        if literal_size == 0xF {
            loop {
                let extra = *data.get(pos).ok_or_else(|| short(output_size, out.len()))? as usize;
                pos += 1;
                literal_size += extra;
                if extra != 0xFF {
                    break;
                }
            }
        }

        if pos + literal_size > data.len() {
            return Err(short(output_size, out.len()));
        }
        out.extend_from_slice(&data[pos..pos + literal_size]);
        pos += literal_size;

        if out.len() >= output_size {
            break;
        }

        if pos + 2 > data.len() {
            return Err(short(output_size, out.len()));
        }
        let lookback = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
        pos += 2;

        if lookback == 0 || lookback > out.len() {
            return Err(Error::NvInvalid {
                offset: pos,
                reason: "lz4 lookback distance out of range",
            });
        }

        let mut match_len = lookback_token;
        if match_len == 0xF {
            loop {
                let extra = *data.get(pos).ok_or_else(|| short(output_size, out.len()))? as usize;
                pos += 1;
                match_len += extra;
                if extra != 0xFF {
                    break;
                }
            }
        }
        match_len += 4;

        let mut copy_from = out.len() - lookback;
        for _ in 0..match_len {
            if out.len() >= output_size {
                break;
            }
            let b = out[copy_from];
            out.push(b);
            copy_from += 1;
        }
    }

    if out.len() != output_size {
        return Err(Error::DecompressOverflow {
            expected: output_size,
            got: out.len(),
        });
    }

    Ok(out)
}

/// The compressed stream ran out before `out` reached `output_size` — a
/// failure to fully fill the logical buffer, per spec.
fn short(output_size: usize, got: usize) -> Error {
    Error::DecompressShort {
        expected: output_size,
        got,
    }
}
