//! Data Virtual Addresses and block pointers: the packed geometry/codec
//! word, the three-DVA addressing scheme, and the byte-offset formula.
//!
//! Grounded in the teacher crate's `zio::DataVirtualAddress` and
//! `zio::NormalBlockPointer`, simplified to a single non-recursive
//! `BlockPointer` (no embedded-pointer variant dispatch, no gang-block
//! traversal, no RAID-Z column math — this crate only ever resolves
//! `dva[0]` against one leaf vdev).

use serde::{Deserialize, Serialize};

use crate::byte_iter::Cursor;
use crate::error::{Error, Result};

/// Offset in bytes, from the start of a vdev, where user data begins.
/// Two 256 KiB labels plus boot reservation: `0x400000` (4 MiB).
pub const DATA_AREA_BASE: u64 = 0x0040_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dva {
    pub vdev_id: u32,
    asize_sectors: u32,
    offset_word: u64,
}

impl Dva {
    pub const ONDISK_SIZE: usize = 16;

    pub fn read(cur: &mut Cursor<'_>) -> Result<Dva> {
        let vdev_id = cur.read_u32_le()?;
        let size_word = cur.read_u32_le()?;
        let offset_word = cur.read_u64_le()?;
        Ok(Dva {
            vdev_id,
            asize_sectors: size_word & 0x00FF_FFFF,
            offset_word,
        })
    }

    pub fn asize_bytes(&self) -> u64 {
        (self.asize_sectors as u64) * 512
    }

    pub fn gang(&self) -> bool {
        (self.offset_word >> 63) & 1 != 0
    }

    /// `0x400000 + ((offset & ~(1<<63)) << 9)`.
    pub fn byte_offset(&self) -> u64 {
        let offset_sectors = self.offset_word & !(1u64 << 63);
        DATA_AREA_BASE + (offset_sectors << 9)
    }

    pub fn is_empty(&self) -> bool {
        self.vdev_id == 0 && self.asize_sectors == 0 && self.offset_word == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    Inherit,
    On,
    Off,
    Lzjb,
    Empty,
    Gzip(u8),
    Zle,
    Lz4,
    Unknown(u8),
}

impl Compression {
    fn from_tag(tag: u8) -> Compression {
        match tag {
            0 => Compression::Inherit,
            1 => Compression::On,
            2 => Compression::Off,
            3 => Compression::Lzjb,
            4 => Compression::Empty,
            5..=13 => Compression::Gzip(tag - 4),
            14 => Compression::Zle,
            15 => Compression::Lz4,
            other => Compression::Unknown(other),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            Compression::Inherit => 0,
            Compression::On => 1,
            Compression::Off => 2,
            Compression::Lzjb => 3,
            Compression::Empty => 4,
            Compression::Gzip(n) => n + 4,
            Compression::Zle => 14,
            Compression::Lz4 => 15,
            Compression::Unknown(tag) => *tag,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Compression::Inherit => "inherit".to_string(),
            Compression::On => "on".to_string(),
            Compression::Off => "off".to_string(),
            Compression::Lzjb => "lzjb".to_string(),
            Compression::Empty => "empty".to_string(),
            Compression::Gzip(n) => format!("gzip-{n}"),
            Compression::Zle => "zle".to_string(),
            Compression::Lz4 => "lz4".to_string(),
            Compression::Unknown(tag) => format!("unknown({tag})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumAlgo {
    Inherit,
    On,
    Off,
    Label,
    GangHeader,
    Zilog,
    Fletcher2,
    Fletcher4,
    Sha256,
    Zilog2,
    NoParity,
    Sha512,
    Skein,
    Edonr,
    Blake3,
    Unknown(u8),
}

impl ChecksumAlgo {
    fn from_tag(tag: u8) -> ChecksumAlgo {
        match tag {
            0 => ChecksumAlgo::Inherit,
            1 => ChecksumAlgo::On,
            2 => ChecksumAlgo::Off,
            3 => ChecksumAlgo::Label,
            4 => ChecksumAlgo::GangHeader,
            5 => ChecksumAlgo::Zilog,
            6 => ChecksumAlgo::Fletcher2,
            7 => ChecksumAlgo::Fletcher4,
            8 => ChecksumAlgo::Sha256,
            9 => ChecksumAlgo::Zilog2,
            10 => ChecksumAlgo::NoParity,
            11 => ChecksumAlgo::Sha512,
            12 => ChecksumAlgo::Skein,
            13 => ChecksumAlgo::Edonr,
            14 => ChecksumAlgo::Blake3,
            other => ChecksumAlgo::Unknown(other),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ChecksumAlgo::Inherit => "inherit".to_string(),
            ChecksumAlgo::On => "on".to_string(),
            ChecksumAlgo::Off => "off".to_string(),
            ChecksumAlgo::Label => "label".to_string(),
            ChecksumAlgo::GangHeader => "gang_header".to_string(),
            ChecksumAlgo::Zilog => "zilog".to_string(),
            ChecksumAlgo::Fletcher2 => "fletcher2".to_string(),
            ChecksumAlgo::Fletcher4 => "fletcher4".to_string(),
            ChecksumAlgo::Sha256 => "sha256".to_string(),
            ChecksumAlgo::Zilog2 => "zilog2".to_string(),
            ChecksumAlgo::NoParity => "noparity".to_string(),
            ChecksumAlgo::Sha512 => "sha512".to_string(),
            ChecksumAlgo::Skein => "skein".to_string(),
            ChecksumAlgo::Edonr => "edonr".to_string(),
            ChecksumAlgo::Blake3 => "blake3".to_string(),
            ChecksumAlgo::Unknown(tag) => format!("unknown({tag})"),
        }
    }
}

/// The packed 64-bit properties word, unpacked into named fields. See
/// the bit-range table for `lsize_raw`/`psize_raw`/etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPointerProps {
    raw: u64,
}

impl BlockPointerProps {
    pub fn from_raw(raw: u64) -> BlockPointerProps {
        BlockPointerProps { raw }
    }

    pub fn pack(
        lsize_bytes: u64,
        psize_bytes: u64,
        compression: Compression,
        checksum: ChecksumAlgo,
        object_type: u8,
        level: u8,
        little_endian: bool,
        embedded: bool,
    ) -> BlockPointerProps {
        let lsize_raw = (lsize_bytes / 512 - 1) & 0xFF;
        let psize_raw = (psize_bytes / 512 - 1) & 0xFF;
        let mut raw = lsize_raw;
        raw |= psize_raw << 8;
        raw |= (compression.tag() as u64 & 0x7F) << 32;
        raw |= (embedded as u64) << 39;
        raw |= ((checksum_tag(checksum) as u64) & 0xFF) << 40;
        raw |= (object_type as u64 & 0xFF) << 48;
        raw |= (level as u64 & 0x7F) << 56;
        raw |= (little_endian as u64) << 63;
        BlockPointerProps { raw }
    }

    pub fn lsize_bytes(&self) -> u64 {
        ((self.raw & 0xFF) + 1) * 512
    }

    pub fn psize_bytes(&self) -> u64 {
        (((self.raw >> 8) & 0xFF) + 1) * 512
    }

    pub fn compression(&self) -> Compression {
        Compression::from_tag(((self.raw >> 32) & 0x7F) as u8)
    }

    pub fn embedded(&self) -> bool {
        (self.raw >> 39) & 1 != 0
    }

    pub fn checksum(&self) -> ChecksumAlgo {
        ChecksumAlgo::from_tag(((self.raw >> 40) & 0xFF) as u8)
    }

    pub fn object_type(&self) -> u8 {
        ((self.raw >> 48) & 0xFF) as u8
    }

    pub fn level(&self) -> u8 {
        ((self.raw >> 56) & 0x7F) as u8
    }

    pub fn little_endian(&self) -> bool {
        (self.raw >> 63) & 1 != 0
    }
}

fn checksum_tag(algo: ChecksumAlgo) -> u8 {
    match algo {
        ChecksumAlgo::Inherit => 0,
        ChecksumAlgo::On => 1,
        ChecksumAlgo::Off => 2,
        ChecksumAlgo::Label => 3,
        ChecksumAlgo::GangHeader => 4,
        ChecksumAlgo::Zilog => 5,
        ChecksumAlgo::Fletcher2 => 6,
        ChecksumAlgo::Fletcher4 => 7,
        ChecksumAlgo::Sha256 => 8,
        ChecksumAlgo::Zilog2 => 9,
        ChecksumAlgo::NoParity => 10,
        ChecksumAlgo::Sha512 => 11,
        ChecksumAlgo::Skein => 12,
        ChecksumAlgo::Edonr => 13,
        ChecksumAlgo::Blake3 => 14,
        ChecksumAlgo::Unknown(tag) => tag,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockPointer {
    pub dvas: [Dva; 3],
    pub props: BlockPointerProps,
    pub phys_birth_txg: u64,
    pub birth_txg: u64,
    pub fill_count: u64,
    pub checksum: [u64; 4],
}

impl BlockPointer {
    pub const ONDISK_SIZE: usize = 128;

    pub fn read(cur: &mut Cursor<'_>) -> Result<BlockPointer> {
        let dvas = [Dva::read(cur)?, Dva::read(cur)?, Dva::read(cur)?];
        let props = BlockPointerProps::from_raw(cur.read_u64_le()?);
        cur.skip(16)?; // 2 x u64 padding
        let phys_birth_txg = cur.read_u64_le()?;
        let birth_txg = cur.read_u64_le()?;
        let fill_count = cur.read_u64_le()?;
        let checksum = [
            cur.read_u64_le()?,
            cur.read_u64_le()?,
            cur.read_u64_le()?,
            cur.read_u64_le()?,
        ];
        Ok(BlockPointer {
            dvas,
            props,
            phys_birth_txg,
            birth_txg,
            fill_count,
            checksum,
        })
    }

    /// `dva[0]`, the only copy this decoder ever resolves. Returns
    /// `EmbeddedBlockPointer` if the value is stored inline (no DVA to
    /// resolve at all), or `GangUnsupported` if its gang bit is set.
    pub fn root_dva(&self) -> Result<Dva> {
        if self.props.embedded() {
            return Err(Error::EmbeddedBlockPointer);
        }
        let dva = self.dvas[0];
        if dva.gang() {
            return Err(Error::GangUnsupported);
        }
        Ok(dva)
    }
}
