//! Mappings of shared memory segments into the process address space.

use crate::error::ShmError;
use crate::segment::Segment;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::mem::{align_of, size_of};
use tracing::debug;

enum MapInner {
    Ro(Mmap),
    Rw(MmapMut),
}

/// One mapping of one segment, or a sub-range of it.
///
/// The protection of the mapping follows the segment's access flags: a
/// read-write segment maps read-write, a read-only segment maps read-only
/// and is enforced at the page level. The mapping is exclusively owned
/// and unmapped on [`Map::close`] or drop.
pub struct Map {
    inner: Option<MapInner>,
}

impl Map {
    /// Maps the whole segment.
    pub fn of_segment(segment: &Segment) -> Result<Self, ShmError> {
        Self::map_range(segment, 0, segment.len())
    }

    /// Maps `[offset, offset + len)` of the segment.
    ///
    /// Preconditions, checked before any syscall: the segment is open,
    /// `len > 0`, the range lies within the segment and `offset` is a
    /// multiple of the page size.
    pub fn of_range(segment: &Segment, offset: usize, len: usize) -> Result<Self, ShmError> {
        Self::map_range(segment, offset, len)
    }

    fn map_range(segment: &Segment, offset: usize, len: usize) -> Result<Self, ShmError> {
        let file = segment.file()?;
        if len == 0 {
            return Err(ShmError::ZeroSizeMap);
        }
        if offset.checked_add(len).is_none_or(|end| end > segment.len()) {
            return Err(ShmError::RangeOutOfBounds {
                offset,
                len,
                segment: segment.len(),
            });
        }
        let page = page_size();
        if offset % page != 0 {
            return Err(ShmError::UnalignedOffset { offset, page });
        }

        let opts = {
            let mut o = MmapOptions::new();
            o.offset(offset as u64).len(len);
            o
        };
        let inner = if segment.is_writable() {
            // SAFETY: the fd refers to a live shm object at least
            // offset + len bytes long, verified above.
            MapInner::Rw(unsafe { opts.map_mut(file) }.map_err(ShmError::Mmap)?)
        } else {
            // SAFETY: as above; read-only protection matches the fd.
            MapInner::Ro(unsafe { opts.map(file) }.map_err(ShmError::Mmap)?)
        };

        debug!(name = segment.name(), offset, len, "mapped shared memory segment");
        Ok(Self { inner: Some(inner) })
    }

    pub fn len(&self) -> usize {
        match &self.inner {
            Some(MapInner::Ro(m)) => m.len(),
            Some(MapInner::Rw(m)) => m.len(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Base address of the mapping.
    pub fn as_ptr(&self) -> Result<*const u8, ShmError> {
        match &self.inner {
            Some(MapInner::Ro(m)) => Ok(m.as_ptr()),
            Some(MapInner::Rw(m)) => Ok(m.as_ptr()),
            None => Err(ShmError::MapClosed),
        }
    }

    /// Mutable base address; fails on a read-only mapping.
    pub fn as_mut_ptr(&mut self) -> Result<*mut u8, ShmError> {
        match &mut self.inner {
            Some(MapInner::Rw(m)) => Ok(m.as_mut_ptr()),
            Some(MapInner::Ro(_)) => Err(ShmError::ReadOnlyMap),
            None => Err(ShmError::MapClosed),
        }
    }

    /// Reinterprets the base address as `*const T`.
    ///
    /// No validation is performed beyond the mapping being open: the
    /// caller asserts that the mapped bytes hold an initialized `T` of a
    /// layout identical to the producing build's.
    ///
    /// # Safety
    ///
    /// The mapped region must contain a valid `T` at offset 0 and be at
    /// least `size_of::<T>()` bytes long.
    pub unsafe fn cast<T>(&self) -> Result<*const T, ShmError> {
        Ok(self.as_ptr()? as *const T)
    }

    /// Mutable counterpart of [`Map::cast`].
    ///
    /// # Safety
    ///
    /// Same as [`Map::cast`], and the caller must be the single writer of
    /// the region.
    pub unsafe fn cast_mut<T>(&mut self) -> Result<*mut T, ShmError> {
        Ok(self.as_mut_ptr()? as *mut T)
    }

    /// Placement-constructs a `T` at the base of the mapping.
    ///
    /// Fails when the mapping is shorter than `size_of::<T>()`. Calling
    /// this more than once per segment lifetime silently re-initializes
    /// the shared state; ensuring single construction is the caller's
    /// responsibility, not guarded here.
    ///
    /// # Safety
    ///
    /// No other process may be reading or writing the region while it is
    /// being constructed.
    pub unsafe fn construct<T>(&mut self, value: T) -> Result<*mut T, ShmError> {
        if size_of::<T>() > self.len() {
            return Err(ShmError::RegionTooSmall {
                need: size_of::<T>(),
                have: self.len(),
            });
        }
        let ptr = self.as_mut_ptr()? as *mut T;
        debug_assert_eq!(ptr as usize % align_of::<T>(), 0);
        // SAFETY: in bounds per the length check; mmap returns page-aligned
        // memory, which satisfies any repr(C) alignment.
        unsafe { ptr.write(value) };
        Ok(ptr)
    }

    /// Unmaps the region. Idempotent.
    pub fn close(&mut self) {
        self.inner = None;
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf with a valid name has no preconditions.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}
