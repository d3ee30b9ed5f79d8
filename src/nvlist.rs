//! XDR-encoded name/value list decoding.
//!
//! Sources this generalizes from:
//! https://github.com/openzfs/zfs/blob/master/module/nvpair/nvpair.c#L3608 (nvs_xdr_nvpair)
//! https://github.com/openzfs/zfs/blob/master/module/nvpair/nvpair.c#L3200 (nvs_xdr_nvlist)
//!
//! The teacher crate parsed this format against a bare `Iterator<Item =
//! u8>` and returned `Option<HashMap<...>>`, discarding the reason for a
//! parse failure and the exact byte position at which parsing stopped.
//! Here the scanner runs over a `Cursor` so a caller can assert both ("the
//! cursor sits on the sentinel pair after a full scan" is one of the
//! tested properties) and report a typed `Error` instead of `None`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::byte_iter::{ByteOrder, Cursor};
use crate::error::{Error, Result};

pub type Name = String;

const MAX_NEST_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NvType {
    Boolean = 1,
    Byte = 2,
    I16 = 3,
    U16 = 4,
    I32 = 5,
    U32 = 6,
    I64 = 7,
    U64 = 8,
    String = 9,
    ByteArray = 10,
    I16Array = 11,
    U16Array = 12,
    I32Array = 13,
    U32Array = 14,
    I64Array = 15,
    U64Array = 16,
    StringArray = 17,
    HRTime = 18,
    NVList = 19,
    NVListArray = 20,
    BooleanValue = 21,
    I8 = 22,
    U8 = 23,
    BooleanArray = 24,
    I8Array = 25,
    U8Array = 26,
}

impl NvType {
    fn from_tag(tag: u32) -> Option<NvType> {
        Some(match tag {
            1 => NvType::Boolean,
            2 => NvType::Byte,
            3 => NvType::I16,
            4 => NvType::U16,
            5 => NvType::I32,
            6 => NvType::U32,
            7 => NvType::I64,
            8 => NvType::U64,
            9 => NvType::String,
            10 => NvType::ByteArray,
            11 => NvType::I16Array,
            12 => NvType::U16Array,
            13 => NvType::I32Array,
            14 => NvType::U32Array,
            15 => NvType::I64Array,
            16 => NvType::U64Array,
            17 => NvType::StringArray,
            18 => NvType::HRTime,
            19 => NvType::NVList,
            20 => NvType::NVListArray,
            21 => NvType::BooleanValue,
            22 => NvType::I8,
            23 => NvType::U8,
            24 => NvType::BooleanArray,
            25 => NvType::I8Array,
            26 => NvType::U8Array,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NvValue {
    Boolean(bool),
    Byte(u8),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    String(String),
    HRTime(i64),
    NVList(NvList),
    ByteArray(Vec<u8>),
    I32Array(Vec<i32>),
    U32Array(Vec<u32>),
    I64Array(Vec<i64>),
    U64Array(Vec<u64>),
    StringArray(Vec<String>),
    NVListArray(Vec<NvList>),
}

impl NvValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NvValue::U64(v) => Some(*v),
            NvValue::U32(v) => Some(*v as u64),
            NvValue::U16(v) => Some(*v as u64),
            NvValue::U8(v) => Some(*v as u64),
            NvValue::Byte(v) => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NvValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_nvlist(&self) -> Option<&NvList> {
        match self {
            NvValue::NVList(l) => Some(l),
            _ => None,
        }
    }
}

pub type NvList = HashMap<Name, NvValue>;

/// Searches sub-lists before the current level, matching the reference
/// decoder's depth-first lookup. If more than one nested list carries the
/// key, the first one encountered in (unspecified) map iteration order
/// wins — the same tie-break the reference implementation has, since it
/// too iterates a map.
pub fn find<'a>(list: &'a NvList, target: &str) -> Option<&'a NvValue> {
    for value in list.values() {
        if let NvValue::NVList(sub) = value {
            if let Some(found) = find(sub, target) {
                return Some(found);
            }
        }
    }
    list.get(target)
}

fn read_name(cur: &mut Cursor<'_>, order: ByteOrder) -> Result<String> {
    let len = cur.read_u32(order)? as usize;
    let bytes = cur.read_bytes(len)?.to_vec();
    cur.align4_skip(len)?;
    String::from_utf8(bytes).map_err(|_| Error::NvInvalid {
        offset: cur.position(),
        reason: "nvpair name was not valid utf-8",
    })
}

fn read_string_value(cur: &mut Cursor<'_>, order: ByteOrder) -> Result<String> {
    let len = cur.read_u32(order)? as usize;
    let bytes = cur.read_bytes(len)?.to_vec();
    cur.align4_skip(len)?;
    String::from_utf8(bytes).map_err(|_| Error::NvInvalid {
        offset: cur.position(),
        reason: "string value was not valid utf-8",
    })
}

/// Streaming reader over one nvlist's encoded bytes. `NvScanner::scan`
/// drives it to completion; it is split out as its own type so tests can
/// assert the cursor position directly after the sentinel pair.
struct NvScanner<'a, 'c> {
    cur: &'c mut Cursor<'a>,
    order: ByteOrder,
    depth: usize,
}

impl<'a, 'c> NvScanner<'a, 'c> {
    fn scan(&mut self) -> Result<NvList> {
        if self.depth >= MAX_NEST_DEPTH {
            return Err(Error::NvInvalid {
                offset: self.cur.position(),
                reason: "nvlist nesting exceeded the recursion limit",
            });
        }

        let mut list = NvList::new();
        let _version = self.cur.read_i32(self.order)?;
        let _flags = self.cur.read_u32(self.order)?;

        loop {
            let encoded_size = self.cur.read_i32(self.order)?;
            let decoded_size = self.cur.read_i32(self.order)?;
            if encoded_size == 0 && decoded_size == 0 {
                break;
            }
            if encoded_size < 8 {
                return Err(Error::NvInvalid {
                    offset: self.cur.position(),
                    reason: "encoded_size too small to hold the 8-byte size prefix",
                });
            }

            // Bound this pair's parse to exactly `encoded_size - 8` bytes, so a
            // pair whose declared size doesn't match its actual content fails
            // here instead of drifting into the next pair's bytes.
            let record_len = encoded_size as usize - 8;
            let record = self.cur.read_bytes(record_len)?;
            let mut record_cur = Cursor::new(record);

            let name = read_name(&mut record_cur, self.order)?;
            let type_tag = record_cur.read_u32(self.order)?;
            let nelements = record_cur.read_u32(self.order)? as usize;

            let Some(ty) = NvType::from_tag(type_tag) else {
                return Err(Error::NvInvalid {
                    offset: self.cur.position(),
                    reason: "unrecognized nvpair value type",
                });
            };

            let mut value_scanner = NvScanner {
                cur: &mut record_cur,
                order: self.order,
                depth: self.depth + 1,
            };
            let value = value_scanner.read_value(ty, nelements)?;

            if !record_cur.is_empty() {
                return Err(Error::NvInvalid {
                    offset: self.cur.position(),
                    reason: "nvpair record had bytes left over after its declared value",
                });
            }

            list.insert(name, value);
        }

        Ok(list)
    }

    fn read_value(&mut self, ty: NvType, nelements: usize) -> Result<NvValue> {
        let order = self.order;
        Ok(match ty {
            NvType::Boolean => NvValue::Boolean(true),
            NvType::BooleanValue => NvValue::Boolean(self.cur.read_u32(order)? != 0),
            NvType::Byte => NvValue::Byte(self.cur.read_u8()?),
            NvType::I8 => NvValue::I8(self.cur.read_i8()?),
            NvType::U8 => NvValue::U8(self.cur.read_u8()?),
            NvType::I16 => NvValue::I16(self.cur.read_i16(order)?),
            NvType::U16 => NvValue::U16(self.cur.read_u16(order)?),
            NvType::I32 => NvValue::I32(self.cur.read_i32(order)?),
            NvType::U32 => NvValue::U32(self.cur.read_u32(order)?),
            NvType::I64 => NvValue::I64(self.cur.read_i64(order)?),
            NvType::U64 => NvValue::U64(self.cur.read_u64(order)?),
            NvType::HRTime => NvValue::HRTime(self.cur.read_i64(order)?),
            NvType::String => NvValue::String(read_string_value(self.cur, order)?),
            NvType::ByteArray => {
                let bytes = self.cur.read_bytes(nelements)?.to_vec();
                self.cur.align4_skip(nelements)?;
                NvValue::ByteArray(bytes)
            }
            NvType::I32Array => {
                let mut v = Vec::with_capacity(nelements);
                for _ in 0..nelements {
                    v.push(self.cur.read_i32(order)?);
                }
                NvValue::I32Array(v)
            }
            NvType::U32Array => {
                let mut v = Vec::with_capacity(nelements);
                for _ in 0..nelements {
                    v.push(self.cur.read_u32(order)?);
                }
                NvValue::U32Array(v)
            }
            NvType::I64Array => {
                let mut v = Vec::with_capacity(nelements);
                for _ in 0..nelements {
                    v.push(self.cur.read_i64(order)?);
                }
                NvValue::I64Array(v)
            }
            NvType::U64Array => {
                let mut v = Vec::with_capacity(nelements);
                for _ in 0..nelements {
                    v.push(self.cur.read_u64(order)?);
                }
                NvValue::U64Array(v)
            }
            NvType::StringArray => {
                let mut v = Vec::with_capacity(nelements);
                for _ in 0..nelements {
                    v.push(read_string_value(self.cur, order)?);
                }
                NvValue::StringArray(v)
            }
            NvType::NVList => {
                let mut nested = NvScanner {
                    cur: self.cur,
                    order,
                    depth: self.depth + 1,
                };
                NvValue::NVList(nested.scan()?)
            }
            NvType::NVListArray => {
                let mut v = Vec::with_capacity(nelements);
                for _ in 0..nelements {
                    let mut nested = NvScanner {
                        cur: self.cur,
                        order,
                        depth: self.depth + 1,
                    };
                    v.push(nested.scan()?);
                }
                NvValue::NVListArray(v)
            }
            NvType::I16Array | NvType::U16Array | NvType::BooleanArray | NvType::I8Array
            | NvType::U8Array => {
                return Err(Error::NvInvalid {
                    offset: self.cur.position(),
                    reason: "value type recognized but not implemented",
                })
            }
        })
    }
}

/// Parse a 4-byte header (`encoding`, `endian`, 2 reserved bytes) followed
/// by one encoded nvlist. This is the entry point used for the label's
/// `nvpairs` region, which always carries the header.
pub fn from_bytes_with_header(data: &[u8]) -> Result<NvList> {
    let mut cur = Cursor::new(data);
    let encoding = cur.read_u8()?;
    let endian = cur.read_u8()?;
    cur.skip(2)?;
    if encoding != 1 {
        return Err(Error::NvHeaderInvalid { encoding, endian });
    }
    let order = match endian {
        0 => ByteOrder::Little,
        1 => ByteOrder::Big,
        _ => return Err(Error::NvHeaderInvalid { encoding, endian }),
    };
    let mut scanner = NvScanner {
        cur: &mut cur,
        order,
        depth: 0,
    };
    scanner.scan()
}

/// Parse a bare encoded nvlist with no 4-byte header, given an explicit
/// byte order. Used for nested lists embedded inside other structures
/// that don't repeat the header.
pub fn from_bytes(data: &[u8], order: ByteOrder) -> Result<(NvList, usize)> {
    let mut cur = Cursor::new(data);
    let mut scanner = NvScanner {
        cur: &mut cur,
        order,
        depth: 0,
    };
    let list = scanner.scan()?;
    Ok((list, cur.position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be32(v: i32) -> [u8; 4] {
        v.to_be_bytes()
    }

    /// Builds the smallest legal encoded nvlist: version, flags, then the
    /// (0, 0) sentinel pair and nothing else.
    fn empty_list_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&be32(0)); // version
        buf.extend_from_slice(&0u32.to_be_bytes()); // flags
        buf.extend_from_slice(&be32(0)); // encoded_size sentinel
        buf.extend_from_slice(&be32(0)); // decoded_size sentinel
        buf
    }

    #[test]
    fn empty_list_parses_to_empty_map() {
        let bytes = empty_list_bytes();
        let (list, consumed) = from_bytes(&bytes, ByteOrder::Big).unwrap();
        assert!(list.is_empty());
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn cursor_sits_on_sentinel_boundary_after_full_scan() {
        let bytes = empty_list_bytes();
        let mut cur = Cursor::new(&bytes);
        let mut scanner = NvScanner {
            cur: &mut cur,
            order: ByteOrder::Big,
            depth: 0,
        };
        scanner.scan().unwrap();
        assert_eq!(cur.position(), bytes.len());
        assert!(cur.is_empty());
    }

    fn push_str_field(buf: &mut Vec<u8>, name: &str, value: &str) {
        let name_bytes = name.as_bytes();
        let value_bytes = value.as_bytes();
        let name_padded = crate::byte_iter::align_up(name_bytes.len(), 4);
        let value_padded = crate::byte_iter::align_up(value_bytes.len(), 4);
        // decoded_size isn't checked by this decoder; encoded_size must be
        // nonzero so it isn't mistaken for the sentinel.
        let encoded_size = 4 + 4 + name_padded + 4 + 4 + 4 + value_padded;
        buf.extend_from_slice(&be32(encoded_size as i32));
        buf.extend_from_slice(&be32(0));
        buf.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(name_bytes);
        buf.extend(std::iter::repeat(0u8).take(name_padded - name_bytes.len()));
        buf.extend_from_slice(&(NvType::String as u32).to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&(value_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(value_bytes);
        buf.extend(std::iter::repeat(0u8).take(value_padded - value_bytes.len()));
    }

    fn push_u64_field(buf: &mut Vec<u8>, name: &str, value: u64) {
        let name_bytes = name.as_bytes();
        let name_padded = crate::byte_iter::align_up(name_bytes.len(), 4);
        let encoded_size = 4 + 4 + name_padded + 4 + 4 + 8;
        buf.extend_from_slice(&be32(encoded_size as i32));
        buf.extend_from_slice(&be32(0));
        buf.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(name_bytes);
        buf.extend(std::iter::repeat(0u8).take(name_padded - name_bytes.len()));
        buf.extend_from_slice(&(NvType::U64 as u32).to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&value.to_be_bytes());
    }

    fn close_list(buf: &mut Vec<u8>) {
        buf.extend_from_slice(&be32(0));
        buf.extend_from_slice(&be32(0));
    }

    fn list_header(buf: &mut Vec<u8>) {
        buf.extend_from_slice(&be32(0));
        buf.extend_from_slice(&0u32.to_be_bytes());
    }

    #[test]
    fn decodes_scalar_fields_by_name() {
        let mut buf = Vec::new();
        list_header(&mut buf);
        push_u64_field(&mut buf, "ashift", 9);
        push_str_field(&mut buf, "name", "tank");
        close_list(&mut buf);

        let (list, consumed) = from_bytes(&buf, ByteOrder::Big).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(list.get("ashift").unwrap().as_u64(), Some(9));
        assert_eq!(list.get("name").unwrap().as_str(), Some("tank"));
    }

    #[test]
    fn find_descends_into_sub_lists_before_current_level() {
        let mut inner = Vec::new();
        list_header(&mut inner);
        push_u64_field(&mut inner, "pool_guid", 42);
        close_list(&mut inner);

        let mut outer = Vec::new();
        list_header(&mut outer);
        // vdev_tree: NVList
        let name_bytes = b"vdev_tree";
        let name_padded = crate::byte_iter::align_up(name_bytes.len(), 4);
        let encoded_size = 4 + 4 + name_padded + 4 + 4 + inner.len();
        outer.extend_from_slice(&be32(encoded_size as i32));
        outer.extend_from_slice(&be32(0));
        outer.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
        outer.extend_from_slice(name_bytes);
        outer.extend(std::iter::repeat(0u8).take(name_padded - name_bytes.len()));
        outer.extend_from_slice(&(NvType::NVList as u32).to_be_bytes());
        outer.extend_from_slice(&1u32.to_be_bytes());
        outer.extend_from_slice(&inner);
        close_list(&mut outer);

        let (list, _) = from_bytes(&outer, ByteOrder::Big).unwrap();
        let found = find(&list, "pool_guid").expect("pool_guid should be found in a nested list");
        assert_eq!(found.as_u64(), Some(42));
    }

    #[test]
    fn find_returns_none_for_missing_key() {
        let bytes = empty_list_bytes();
        let (list, _) = from_bytes(&bytes, ByteOrder::Big).unwrap();
        assert!(find(&list, "nonexistent").is_none());
    }

    #[test]
    fn header_rejects_unsupported_encoding() {
        let mut buf = vec![0u8, 1, 0, 0];
        buf.extend(empty_list_bytes());
        let err = from_bytes_with_header(&buf).unwrap_err();
        assert!(matches!(err, Error::NvHeaderInvalid { .. }));
    }

    #[test]
    fn header_accepts_xdr_big_endian() {
        let mut buf = vec![1u8, 1, 0, 0];
        buf.extend(empty_list_bytes());
        let list = from_bytes_with_header(&buf).unwrap();
        assert!(list.is_empty());
    }

    /// A pair whose `encoded_size` overstates its actual content (claims 4
    /// bytes more than name+type+nelements+value actually span) must fail
    /// with `NvInvalid` instead of silently swallowing the next pair's
    /// leading bytes as padding.
    #[test]
    fn mismatched_encoded_size_is_rejected_instead_of_drifting() {
        let mut buf = Vec::new();
        list_header(&mut buf);

        let name_bytes = b"ashift";
        let name_padded = crate::byte_iter::align_up(name_bytes.len(), 4);
        let true_encoded_size = 4 + 4 + name_padded + 4 + 4 + 8;
        let overstated_encoded_size = true_encoded_size + 4;
        buf.extend_from_slice(&be32(overstated_encoded_size as i32));
        buf.extend_from_slice(&be32(0));
        buf.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(name_bytes);
        buf.extend(std::iter::repeat(0u8).take(name_padded - name_bytes.len()));
        buf.extend_from_slice(&(NvType::U64 as u32).to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&9u64.to_be_bytes());

        // A well-formed next pair, whose leading bytes the old unbounded
        // scanner would have silently swallowed as the first pair's
        // "extra" 4 bytes.
        push_u64_field(&mut buf, "pool_guid", 42);
        close_list(&mut buf);

        let err = from_bytes(&buf, ByteOrder::Big).unwrap_err();
        assert!(matches!(err, Error::NvInvalid { .. }));
    }

    #[test]
    fn encoded_size_too_small_for_prefix_is_rejected() {
        let mut buf = Vec::new();
        list_header(&mut buf);
        buf.extend_from_slice(&be32(4)); // smaller than the 8-byte prefix itself
        buf.extend_from_slice(&be32(0));

        let err = from_bytes(&buf, ByteOrder::Big).unwrap_err();
        assert!(matches!(err, Error::NvInvalid { .. }));
    }
}
