use std::io;

/// Errors produced by segment and mapping operations.
///
/// Variants split into two families:
/// - misuse caught before any syscall (invalid name, zero-size or
///   out-of-range mapping request, operating on a closed handle), and
/// - operational failures, which carry the originating [`io::Error`] so
///   the system errno stays queryable via [`ShmError::os_error`].
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error("invalid shared memory name '{0}'")]
    InvalidName(String),

    #[error("refusing to create a zero-byte segment")]
    ZeroSizeSegment,

    #[error("segment is closed")]
    SegmentClosed,

    #[error("mapping is closed")]
    MapClosed,

    #[error("mapping is read-only")]
    ReadOnlyMap,

    #[error("refusing to map a zero-byte range")]
    ZeroSizeMap,

    #[error("map range out of bounds (offset {offset} + len {len} > segment {segment})")]
    RangeOutOfBounds {
        offset: usize,
        len: usize,
        segment: usize,
    },

    #[error("map offset {offset} is not a multiple of the page size ({page})")]
    UnalignedOffset { offset: usize, page: usize },

    #[error("mapped region too small ({have} bytes, need {need})")]
    RegionTooSmall { need: usize, have: usize },

    #[error("shm_open('{name}') failed")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to size segment '{name}' to {size} bytes")]
    Resize {
        name: String,
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("shm_unlink('{name}') failed")]
    Unlink {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat segment '{name}'")]
    Stat {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("segment '{0}' vanished between open and stat")]
    Vanished(String),

    #[error("mmap failed")]
    Mmap(#[source] io::Error),
}

impl ShmError {
    /// The raw errno of the failed syscall, when one was involved.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            ShmError::Open { source, .. }
            | ShmError::Resize { source, .. }
            | ShmError::Unlink { source, .. }
            | ShmError::Stat { source, .. }
            | ShmError::Mmap(source) => source.raw_os_error(),
            _ => None,
        }
    }
}
