//! The 512-byte DMU object record (`dnode_phys_t`), decoded generically —
//! this crate never dispatches on `object_type` to a typed variant (no
//! ZAP/DSL/ZPL decoding), it only exposes the record's own fields plus
//! its up-to-three embedded block pointers and bonus buffer.
//!
//! Grounded in the teacher crate's `dmu::DNodeBase`/`dmu::DNode`, stripped
//! of the typed-variant dispatch (that belonged to walking below the MOS,
//! which this crate does not do).

use serde::{Deserialize, Serialize};

use crate::blockptr::BlockPointer;
use crate::byte_iter::Cursor;
use crate::error::{Error, Result};

pub const DNODE_SIZE: usize = 512;
const BONUS_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnodePhys {
    pub object_type: u8,
    pub indirect_block_shift: u8,
    pub n_levels: u8,
    pub n_blkptr: u8,
    pub bonus_type: u8,
    pub checksum_algo: u8,
    pub compress_algo: u8,
    pub flags: u8,
    pub data_block_size_sectors: u16,
    pub bonus_len: u16,
    pub extra_slots: u8,
    pub max_block_id: u64,
    pub used: u64,
    pub block_pointers: [BlockPointer; 3],
    pub bonus: [u8; BONUS_BUFFER_SIZE],
}

impl DnodePhys {
    /// Decode the first 512 bytes of `buf` as a `dnode_phys_t`.
    pub fn decode(buf: &[u8]) -> Result<DnodePhys> {
        if buf.len() < DNODE_SIZE {
            return Err(Error::TruncatedDnode { got: buf.len() });
        }
        let mut cur = Cursor::new(&buf[..DNODE_SIZE]);

        let object_type = cur.read_u8()?;
        let indirect_block_shift = cur.read_u8()?;
        let n_levels = cur.read_u8()?;
        let n_blkptr = cur.read_u8()?;
        let bonus_type = cur.read_u8()?;
        let checksum_algo = cur.read_u8()?;
        let compress_algo = cur.read_u8()?;
        let flags = cur.read_u8()?;
        let data_block_size_sectors = cur.read_u16_le()?;
        let bonus_len = cur.read_u16_le()?;
        let extra_slots = cur.read_u8()?;
        cur.skip(3)?;
        let max_block_id = cur.read_u64_le()?;
        let used = cur.read_u64_le()?;
        cur.skip(32)?;

        let block_pointers = [
            BlockPointer::read(&mut cur)?,
            BlockPointer::read(&mut cur)?,
            BlockPointer::read(&mut cur)?,
        ];

        let bonus_bytes = cur.read_bytes(BONUS_BUFFER_SIZE)?;
        let mut bonus = [0u8; BONUS_BUFFER_SIZE];
        bonus.copy_from_slice(bonus_bytes);

        Ok(DnodePhys {
            object_type,
            indirect_block_shift,
            n_levels,
            n_blkptr,
            bonus_type,
            checksum_algo,
            compress_algo,
            flags,
            data_block_size_sectors,
            bonus_len,
            extra_slots,
            max_block_id,
            used,
            block_pointers,
            bonus,
        })
    }

    pub fn is_none(&self) -> bool {
        self.object_type == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_bp_bytes() -> Vec<u8> {
        vec![0u8; BlockPointer::ONDISK_SIZE]
    }

    fn minimal_dnode_bytes(object_type: u8) -> Vec<u8> {
        let mut buf = vec![0u8; DNODE_SIZE];
        buf[0] = object_type;
        // overwrite the three block-pointer regions with well-formed
        // (all-zero) block pointers, which is what the offsets already are.
        let bp_region_start = 8 + 4 + 4 + 8 + 8 + 32;
        for i in 0..3 {
            let start = bp_region_start + i * BlockPointer::ONDISK_SIZE;
            buf[start..start + BlockPointer::ONDISK_SIZE].copy_from_slice(&zero_bp_bytes());
        }
        buf
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let buf = vec![0u8; 100];
        assert!(matches!(
            DnodePhys::decode(&buf),
            Err(Error::TruncatedDnode { got: 100 })
        ));
    }

    #[test]
    fn decode_reads_object_type_and_is_none() {
        let buf = minimal_dnode_bytes(0);
        let dnode = DnodePhys::decode(&buf).unwrap();
        assert!(dnode.is_none());

        let buf = minimal_dnode_bytes(11);
        let dnode = DnodePhys::decode(&buf).unwrap();
        assert!(!dnode.is_none());
        assert_eq!(dnode.object_type, 11);
    }

    #[test]
    fn decode_ignores_trailing_bytes_beyond_512() {
        let mut buf = minimal_dnode_bytes(11);
        buf.extend_from_slice(&[0xFFu8; 64]);
        let dnode = DnodePhys::decode(&buf).unwrap();
        assert_eq!(dnode.object_type, 11);
    }
}
