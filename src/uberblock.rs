//! The uberblock: a small fixed-size record naming the root of the live
//! object graph, and the ring scanner that picks the active one.
//!
//! Grounded in the teacher crate's uberblock handling in `lib.rs`
//! (`VdevFile` callers locate the ring the same way) but decoded through
//! explicit field reads rather than an unsafe struct cast, and driven by
//! `ashift` rather than a hardcoded 4 KiB stride — see the stride
//! resolution in `original_source/zfs/filesystem.go`'s `UberBlocks()`.

use serde::{Deserialize, Serialize};

use crate::blockptr::BlockPointer;
use crate::byte_iter::Cursor;
use crate::error::{Error, Result};

pub const UBERBLOCK_MAGIC: u64 = 0x00BA_B10C;
pub const UBERBLOCK_SIZE: usize = 208;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UberBlock {
    pub magic: u64,
    pub spa_version: u64,
    pub transaction_group: u64,
    pub guid_sum: u64,
    pub timestamp: u64,
    pub root_bp: BlockPointer,
    pub software_version: u64,
    pub checkpoint_txg: u64,
}

impl UberBlock {
    /// Attempts to decode one ring slot. Returns `None` (not an error) if
    /// the magic doesn't match — an invalid slot is an ordinary, expected
    /// outcome of scanning the ring, not a malformed input.
    fn try_decode(buf: &[u8]) -> Result<Option<UberBlock>> {
        let mut cur = Cursor::new(buf);
        let magic = cur.read_u64_le()?;
        if magic != UBERBLOCK_MAGIC {
            return Ok(None);
        }
        let spa_version = cur.read_u64_le()?;
        let transaction_group = cur.read_u64_le()?;
        let guid_sum = cur.read_u64_le()?;
        let timestamp = cur.read_u64_le()?;
        let root_bp = BlockPointer::read(&mut cur)?;
        let software_version = cur.read_u64_le()?;
        cur.skip(24)?; // 3 x u64 padding
        let checkpoint_txg = cur.read_u64_le()?;

        Ok(Some(UberBlock {
            magic,
            spa_version,
            transaction_group,
            guid_sum,
            timestamp,
            root_bp,
            software_version,
            checkpoint_txg,
        }))
    }
}

/// One ring entry: the decoded record plus the slot it came from, so
/// selection can tie-break by slot index.
#[derive(Debug, Clone)]
pub struct RingSlot {
    pub index: usize,
    pub uberblock: UberBlock,
}

/// Scans the 128 KiB ring in `2^ashift`-byte strides, returning every slot
/// that carries a valid magic.
pub fn scan_ring(ring_bytes: &[u8], ashift: u64) -> Result<Vec<RingSlot>> {
    if ashift == 0 || ashift >= 64 {
        return Err(Error::MissingAshift);
    }
    let stride = 1usize << ashift;
    if stride > ring_bytes.len() || stride < UBERBLOCK_SIZE {
        return Err(Error::MissingAshift);
    }

    let mut slots = Vec::new();
    for (index, chunk) in ring_bytes.chunks(stride).enumerate() {
        if chunk.len() < UBERBLOCK_SIZE {
            continue;
        }
        if let Some(uberblock) = UberBlock::try_decode(&chunk[..UBERBLOCK_SIZE])? {
            slots.push(RingSlot { index, uberblock });
        }
    }
    Ok(slots)
}

/// Picks the maximum-`transaction_group` slot, breaking ties by the
/// higher slot index.
pub fn select_active(slots: &[RingSlot]) -> Result<&RingSlot> {
    slots
        .iter()
        .max_by_key(|slot| (slot.uberblock.transaction_group, slot.index))
        .ok_or(Error::NoValidUberblock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_uberblock(txg: u64) -> Vec<u8> {
        let mut buf = vec![0u8; UBERBLOCK_SIZE];
        buf[0..8].copy_from_slice(&UBERBLOCK_MAGIC.to_le_bytes());
        buf[8..16].copy_from_slice(&5u64.to_le_bytes()); // spa_version
        buf[16..24].copy_from_slice(&txg.to_le_bytes());
        buf
    }

    #[test]
    fn ashift_zero_is_a_defined_error_not_a_panic() {
        let ring = vec![0u8; 128 * 1024];
        assert!(matches!(
            scan_ring(&ring, 0),
            Err(Error::MissingAshift)
        ));
    }

    #[test]
    fn all_zero_ring_yields_no_valid_slots() {
        let ring = vec![0u8; 128 * 1024];
        let slots = scan_ring(&ring, 12).unwrap();
        assert!(slots.is_empty());
        assert!(matches!(select_active(&slots), Err(Error::NoValidUberblock)));
    }

    #[test]
    fn selects_max_txg_with_tie_break_by_higher_slot_index() {
        let stride = 1usize << 12;
        let mut ring = vec![0u8; 128 * 1024];

        let slot0 = encode_uberblock(10);
        ring[0..UBERBLOCK_SIZE].copy_from_slice(&slot0);

        let slot1 = encode_uberblock(10);
        ring[stride..stride + UBERBLOCK_SIZE].copy_from_slice(&slot1);

        let slot2 = encode_uberblock(7);
        ring[2 * stride..2 * stride + UBERBLOCK_SIZE].copy_from_slice(&slot2);

        let slots = scan_ring(&ring, 12).unwrap();
        assert_eq!(slots.len(), 3);
        let active = select_active(&slots).unwrap();
        assert_eq!(active.uberblock.transaction_group, 10);
        assert_eq!(active.index, 1);
    }

    #[test]
    fn stride_is_driven_by_ashift_not_a_fixed_4kib() {
        let ashift = 13; // 8 KiB stride
        let stride = 1usize << ashift;
        let mut ring = vec![0u8; 128 * 1024];
        let ub = encode_uberblock(1);
        ring[stride..stride + UBERBLOCK_SIZE].copy_from_slice(&ub);

        let slots = scan_ring(&ring, ashift as u64).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].index, 1);
    }
}
