//! Codec tag -> decompress(src, dst_size) dispatch.
//!
//! Grounded in the teacher crate's `zio::try_decompress_block`, trimmed to
//! the codecs this crate actually supports end to end (LZ4, LZJB, and the
//! pass-through tags) and made to fail loudly — `UnsupportedCodec` instead
//! of a silent pass-through — for anything else.

use crate::blockptr::Compression;
use crate::error::{Error, Result};
use crate::{lz4, lzjb};

pub fn decompress(block_data: &[u8], method: Compression, output_size: usize) -> Result<Vec<u8>> {
    match method {
        Compression::Off | Compression::Inherit | Compression::On | Compression::Empty => {
            if block_data.len() != output_size {
                return Err(Error::DecompressShort {
                    expected: output_size,
                    got: block_data.len(),
                });
            }
            Ok(block_data.to_vec())
        }
        Compression::Lz4 => {
            if block_data.len() < 4 {
                return Err(Error::DecompressShort {
                    expected: 4,
                    got: block_data.len(),
                });
            }
            let comp_size = u32::from_be_bytes(block_data[0..4].try_into().unwrap()) as usize;
            if comp_size + 4 > block_data.len() {
                return Err(Error::DecompressOverflow {
                    expected: comp_size + 4,
                    got: block_data.len(),
                });
            }
            lz4::decompress_blocks(&block_data[4..4 + comp_size], output_size)
        }
        Compression::Lzjb => lzjb::decompress(block_data, output_size),
        Compression::Zle | Compression::Gzip(_) | Compression::Unknown(_) => {
            Err(Error::UnsupportedCodec(method.tag()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_requires_exact_size() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(decompress(&data, Compression::Off, 4).unwrap(), data);
        assert!(decompress(&data, Compression::Off, 3).is_err());
    }

    #[test]
    fn zle_and_gzip_are_unsupported() {
        let data = [0u8; 8];
        assert!(matches!(
            decompress(&data, Compression::Zle, 8),
            Err(Error::UnsupportedCodec(14))
        ));
        assert!(matches!(
            decompress(&data, Compression::Gzip(6), 8),
            Err(Error::UnsupportedCodec(_))
        ));
    }
}
