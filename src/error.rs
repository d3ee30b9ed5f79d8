use thiserror::Error;

/// The closed error taxonomy for the decode path: every failure mode the
/// crate can produce, surfaced to the caller rather than logged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vdev label region was only {got} bytes, expected 262144")]
    LabelTooShort { got: usize },

    #[error("nvlist header invalid: encoding={encoding}, endian={endian}")]
    NvHeaderInvalid { encoding: u8, endian: u8 },

    #[error("malformed nvpair at offset {offset}: {reason}")]
    NvInvalid { offset: usize, reason: &'static str },

    #[error("label nvlist did not expose \"ashift\"")]
    MissingAshift,

    #[error("no uberblock slot carried a valid magic")]
    NoValidUberblock,

    #[error("root path encountered a gang DVA, which this decoder does not traverse")]
    GangUnsupported,

    #[error("block pointer is embedded (value stored inline), which this decoder does not resolve as a DVA")]
    EmbeddedBlockPointer,

    #[error("compression tag {0} is recognized but not implemented")]
    UnsupportedCodec(u8),

    #[error("decompression produced {got} bytes, expected {expected}")]
    DecompressShort { expected: usize, got: usize },

    #[error("decompression would overflow the logical buffer: {got} bytes for a {expected}-byte buffer")]
    DecompressOverflow { expected: usize, got: usize },

    #[error("logical buffer of {got} bytes is too small to hold a 512-byte dnode")]
    TruncatedDnode { got: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
