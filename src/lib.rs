//! Read-only decoder for ZFS vdev labels, uberblocks, and the root MOS
//! dnode — enough to open a single-leaf-vdev pool image and pull back the
//! decoded record that names the Meta Object Set, and nothing past it.

use std::io::{Read, Seek, SeekFrom};

pub mod blockptr;
pub mod byte_iter;
pub mod compress;
pub mod dnode;
pub mod error;
pub mod label;
pub mod lz4;
pub mod lzjb;
pub mod nvlist;
pub mod uberblock;

pub use blockptr::{BlockPointer, BlockPointerProps, ChecksumAlgo, Compression, Dva};
pub use dnode::DnodePhys;
pub use error::{Error, Result};
pub use label::VdevLabel;
pub use nvlist::{NvList, NvValue};
pub use uberblock::UberBlock;

/// Where a `Filesystem` handle currently sits in the open sequence.
/// `open` drives the handle straight through to `Active`; `Rooted` is
/// reached the first time `read_dnode` succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Opened,
    LabelLoaded,
    Configured,
    Active,
    Rooted,
}

/// A single-leaf-vdev pool handle. Owns the backing reader, the label
/// bytes, the parsed NV-list, the memoized ashift, and the selected
/// uberblock ring.
pub struct Filesystem<R> {
    reader: R,
    label: VdevLabel,
    nvlist: NvList,
    ashift: u64,
    ring: Vec<uberblock::RingSlot>,
    active_index: usize,
    state: State,
}

fn ashift_from_nvlist(nvlist: &NvList) -> Result<u64> {
    nvlist::find(nvlist, "ashift")
        .and_then(NvValue::as_u64)
        .ok_or(Error::MissingAshift)
}

impl<R: Read + Seek> Filesystem<R> {
    /// Reads the label, discovers `ashift`, and selects the active
    /// uberblock — the full `Closed -> Active` sequence in one call, per
    /// the documented state machine. Any failure is returned before the
    /// handle is ever constructed, so there is no partially-open state to
    /// observe.
    pub fn open(mut reader: R) -> Result<Filesystem<R>> {
        let label = VdevLabel::read(&mut reader)?;

        let nvlist = nvlist::from_bytes_with_header(label.nvpairs_bytes())?;

        let ashift = ashift_from_nvlist(&nvlist)?;

        let ring = uberblock::scan_ring(label.uberblock_ring_bytes(), ashift)?;
        let active = uberblock::select_active(&ring)?;
        let active_index = ring.iter().position(|s| s.index == active.index).unwrap();

        Ok(Filesystem {
            reader,
            label,
            nvlist,
            ashift,
            ring,
            active_index,
            state: State::Active,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn ashift(&self) -> u64 {
        self.ashift
    }

    pub fn nvlist(&self) -> &NvList {
        &self.nvlist
    }

    pub fn label(&self) -> &VdevLabel {
        &self.label
    }

    /// The uberblock selected at `open` time: maximum `transaction_group`
    /// among valid ring slots, ties broken by higher slot index.
    pub fn active_uberblock(&self) -> &UberBlock {
        &self.ring[self.active_index].uberblock
    }

    /// Every ring slot that carried a valid magic, in ring order.
    pub fn uberblocks(&self) -> Vec<&UberBlock> {
        self.ring.iter().map(|slot| &slot.uberblock).collect()
    }

    /// Follows a block pointer one level: resolves `dva[0]`, reads
    /// `psize_bytes` at its byte offset, decompresses into `lsize_bytes`,
    /// and decodes the first 512 bytes as a `DnodePhys`.
    pub fn read_dnode(&mut self, bp: &BlockPointer) -> Result<DnodePhys> {
        let dva = bp.root_dva()?;

        let psize = bp.props.psize_bytes() as usize;
        let lsize = bp.props.lsize_bytes() as usize;

        self.reader.seek(SeekFrom::Start(dva.byte_offset()))?;
        let mut pbuf = vec![0u8; psize];
        self.reader.read_exact(&mut pbuf)?;

        let lbuf = compress::decompress(&pbuf, bp.props.compression(), lsize)?;
        let dnode = DnodePhys::decode(&lbuf)?;

        self.state = State::Rooted;
        Ok(dnode)
    }

    /// Convenience wrapper: resolves and decodes the root dnode of the
    /// active uberblock's root block pointer.
    pub fn read_root_dnode(&mut self) -> Result<DnodePhys> {
        let bp = self.active_uberblock().root_bp;
        self.read_dnode(&bp)
    }
}

/// Opens a file path as the backing source for a `Filesystem`.
pub fn open_path<P: AsRef<std::path::Path>>(path: P) -> Result<Filesystem<std::fs::File>> {
    let file = std::fs::File::open(path)?;
    Filesystem::open(file)
}
