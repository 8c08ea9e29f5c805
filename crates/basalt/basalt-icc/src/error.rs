use basalt_shm::ShmError;

/// A ring segment whose recorded layout does not match this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("bad magic {found:#018x}, not a basalt ring segment")]
    BadMagic { found: u64 },

    #[error("unsupported ring format version {found} (this build expects {expected})")]
    Version { found: u64, expected: u64 },

    #[error("recorded capacity {0} is not a power of two")]
    Capacity(u64),

    #[error("element size mismatch: segment recorded {found}, this build has {expected}")]
    ElemSize { found: u64, expected: u64 },

    #[error("element alignment mismatch: segment recorded {found}, this build has {expected}")]
    ElemAlign { found: u64, expected: u64 },
}

/// Errors opening or creating a ring endpoint.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error(transparent)]
    Shm(#[from] ShmError),

    #[error("incompatible ring layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("segment too small for the declared ring ({have} bytes, need {need})")]
    Truncated { need: usize, have: usize },
}
