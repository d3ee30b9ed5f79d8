//! The 256 KiB vdev label: blank space, boot header, nvpair region, and
//! uberblock ring, carved out by fixed offset.
//!
//! Grounded in the teacher crate's `VdevFile::read_raw_label` (which reads
//! the same four label copies at the same offsets) but narrowed to this
//! crate's single-top-level-leaf-vdev scope: only label 0, at vdev offset
//! 0, is read — the trailing two labels and the second leading label exist
//! on a real pool for redundancy, which is out of scope here.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

pub const LABEL_SIZE: usize = 256 * 1024;
const BLANK_SIZE: usize = 8 * 1024;
const BOOT_HEADER_SIZE: usize = 8 * 1024;
const NVPAIRS_OFFSET: usize = BLANK_SIZE + BOOT_HEADER_SIZE;
const NVPAIRS_SIZE: usize = 112 * 1024;
const UBERBLOCK_RING_OFFSET: usize = NVPAIRS_OFFSET + NVPAIRS_SIZE;
pub const UBERBLOCK_RING_SIZE: usize = 128 * 1024;

#[derive(Debug, Clone)]
pub struct VdevLabel {
    bytes: Vec<u8>,
}

impl VdevLabel {
    /// Reads exactly 256 KiB from offset 0 of `reader`.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<VdevLabel> {
        reader.seek(SeekFrom::Start(0))?;
        let mut bytes = vec![0u8; LABEL_SIZE];
        reader.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::LabelTooShort { got: bytes.len() }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(VdevLabel { bytes })
    }

    pub fn nvpairs_bytes(&self) -> &[u8] {
        &self.bytes[NVPAIRS_OFFSET..NVPAIRS_OFFSET + NVPAIRS_SIZE]
    }

    pub fn uberblock_ring_bytes(&self) -> &[u8] {
        &self.bytes[UBERBLOCK_RING_OFFSET..UBERBLOCK_RING_OFFSET + UBERBLOCK_RING_SIZE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn label_size_is_262144() {
        assert_eq!(LABEL_SIZE, 262144);
    }

    #[test]
    fn short_source_is_label_too_short() {
        let data = vec![0u8; 1000];
        let mut cur = Cursor::new(data);
        assert!(matches!(
            VdevLabel::read(&mut cur),
            Err(Error::LabelTooShort { .. })
        ));
    }

    #[test]
    fn regions_carve_to_expected_sizes() {
        let data = vec![0u8; LABEL_SIZE];
        let mut cur = Cursor::new(data);
        let label = VdevLabel::read(&mut cur).unwrap();
        assert_eq!(label.nvpairs_bytes().len(), NVPAIRS_SIZE);
        assert_eq!(label.uberblock_ring_bytes().len(), UBERBLOCK_RING_SIZE);
    }
}
