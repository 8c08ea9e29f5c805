//! Named POSIX shared memory segments.

use crate::error::ShmError;
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd};
use std::path::{Path, PathBuf};
use tracing::debug;

bitflags::bitflags! {
    /// Access-flag vocabulary for opening a segment.
    ///
    /// Flags compose bitwise and map onto the corresponding `shm_open`
    /// flags: `WRITE` selects `O_RDWR` over `O_RDONLY`, `CREATE` adds
    /// `O_CREAT` and `EXCLUSIVE` adds `O_EXCL`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u32 {
        const WRITE     = 0b001;
        const CREATE    = 0b010;
        const EXCLUSIVE = 0b100;
    }
}

impl Access {
    pub const READ_ONLY: Access = Access::empty();
    pub const READ_WRITE: Access = Access::WRITE;

    fn open_flags(self) -> libc::c_int {
        let mut flags = if self.contains(Access::WRITE) {
            libc::O_RDWR
        } else {
            libc::O_RDONLY
        };
        if self.contains(Access::CREATE) {
            flags |= libc::O_CREAT;
        }
        if self.contains(Access::EXCLUSIVE) {
            flags |= libc::O_EXCL;
        }
        flags
    }
}

/// Directory where the kernel exposes POSIX shared memory objects.
pub const IPC_DIR: &str = "/dev/shm";

/// Attempts to size a fresh segment before giving up on transient errnos.
const RESIZE_ATTEMPTS: u32 = 8;

/// Normalizes and validates a segment name.
///
/// Surrounding whitespace is stripped and a missing leading `/` is added.
/// The result must be `/` followed by a non-empty leaf containing no
/// further `/` and no NUL; the leaf is limited to 255 bytes (`NAME_MAX`,
/// which does not count the leading `/`).
pub fn normalize_name(raw: &str) -> Result<String, ShmError> {
    let trimmed = raw.trim();
    let name = if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    };
    let leaf = &name[1..];
    if leaf.is_empty() || leaf.len() > 255 || leaf.contains('/') || leaf.contains('\0') {
        return Err(ShmError::InvalidName(raw.to_owned()));
    }
    Ok(name)
}

/// Filesystem path of the backing object for a (normalized) segment name.
pub fn ipc_path(name: &str) -> PathBuf {
    Path::new(IPC_DIR).join(name.trim_start_matches('/'))
}

/// True when a segment with this name currently exists.
pub fn exists(name: &str) -> bool {
    normalize_name(name).is_ok_and(|n| ipc_path(&n).exists())
}

/// Removes the named segment from the system.
///
/// Returns `Ok(true)` when the object was unlinked, `Ok(false)` when no
/// such object existed. Processes that still have the segment open or
/// mapped keep their view; the name simply becomes available again.
pub fn remove(name: &str) -> Result<bool, ShmError> {
    let name = normalize_name(name)?;
    let c_name = to_c_name(&name)?;
    let rc = unsafe { libc::shm_unlink(c_name.as_ptr()) };
    if rc == 0 {
        debug!(name = %name, "removed shared memory segment");
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ENOENT) {
        Ok(false)
    } else {
        Err(ShmError::Unlink { name, source: err })
    }
}

/// A named OS shared memory object.
///
/// Created once by the producing process with [`Segment::try_create`] and
/// opened by any number of consumers with [`Segment::try_open`]. The
/// kernel object outlives the handle; dropping a `Segment` only closes
/// the descriptor, it never unlinks the name.
pub struct Segment {
    file: Option<File>,
    name: String,
    size: usize,
    access: Access,
}

impl Segment {
    /// Creates a fresh read-write segment of `size` bytes.
    ///
    /// Opens with create + read-write + exclusive semantics and 0666
    /// permissions, so exactly one creator can win a given name; a second
    /// `try_create` fails with `EEXIST` and leaves the existing segment
    /// untouched. Sizing retries a bounded number of times on
    /// `EINTR`/`EAGAIN`; any other errno surfaces immediately, after the
    /// partially created object has been closed and unlinked.
    pub fn try_create(name: &str, size: usize) -> Result<Self, ShmError> {
        let name = normalize_name(name)?;
        if size == 0 {
            return Err(ShmError::ZeroSizeSegment);
        }

        let access = Access::READ_WRITE | Access::CREATE | Access::EXCLUSIVE;
        let file = open_shm(&name, access)?;
        if let Err(err) = reserve(&file, &name, size) {
            drop(file);
            let _ = remove(&name);
            return Err(err);
        }

        debug!(name = %name, size, "created shared memory segment");
        Ok(Self {
            file: Some(file),
            name,
            size,
            access,
        })
    }

    /// Opens an existing segment read-only or read-write. Never creates.
    ///
    /// The name is re-verified with a filesystem probe after the open, so
    /// a concurrent unlink between `shm_open` and first use is reported
    /// here rather than as garbage reads later.
    pub fn try_open(name: &str, access: Access) -> Result<Self, ShmError> {
        let name = normalize_name(name)?;
        // Opening never creates, whatever the caller passed.
        let access = access & Access::WRITE;

        let file = open_shm(&name, access)?;
        if !ipc_path(&name).exists() {
            return Err(ShmError::Vanished(name));
        }
        let size = file
            .metadata()
            .map_err(|source| ShmError::Stat {
                name: name.clone(),
                source,
            })?
            .len() as usize;

        debug!(name = %name, size, ?access, "opened shared memory segment");
        Ok(Self {
            file: Some(file),
            name,
            size,
            access,
        })
    }

    /// Closes the descriptor and resets the handle. Idempotent.
    pub fn close(&mut self) {
        self.file = None;
        self.size = 0;
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn is_readable(&self) -> bool {
        self.is_open()
    }

    pub fn is_writable(&self) -> bool {
        self.is_open() && self.access.contains(Access::WRITE)
    }

    /// Normalized segment name, including the leading `/`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segment size in bytes; zero once closed.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub(crate) fn file(&self) -> Result<&File, ShmError> {
        self.file.as_ref().ok_or(ShmError::SegmentClosed)
    }
}

fn to_c_name(name: &str) -> Result<CString, ShmError> {
    CString::new(name).map_err(|_| ShmError::InvalidName(name.to_owned()))
}

fn open_shm(name: &str, access: Access) -> Result<File, ShmError> {
    let c_name = to_c_name(name)?;
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), access.open_flags(), 0o666) };
    if fd < 0 {
        return Err(ShmError::Open {
            name: name.to_owned(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

fn reserve(file: &File, name: &str, size: usize) -> Result<(), ShmError> {
    let mut attempt = 0;
    loop {
        if unsafe { libc::ftruncate(file.as_raw_fd(), size as libc::off_t) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        let transient = matches!(err.raw_os_error(), Some(libc::EINTR | libc::EAGAIN));
        attempt += 1;
        if !transient || attempt >= RESIZE_ATTEMPTS {
            return Err(ShmError::Resize {
                name: name.to_owned(),
                size,
                source: err,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_leading_slash_and_trims() {
        assert_eq!(normalize_name("bus").unwrap(), "/bus");
        assert_eq!(normalize_name("  /bus  ").unwrap(), "/bus");
    }

    #[test]
    fn normalize_rejects_bad_names() {
        assert!(matches!(normalize_name(""), Err(ShmError::InvalidName(_))));
        assert!(matches!(normalize_name("/"), Err(ShmError::InvalidName(_))));
        assert!(matches!(
            normalize_name("/a/b"),
            Err(ShmError::InvalidName(_))
        ));
        let long = "x".repeat(300);
        assert!(matches!(
            normalize_name(&long),
            Err(ShmError::InvalidName(_))
        ));
    }

    #[test]
    fn leaf_length_limit_excludes_leading_slash() {
        // NAME_MAX counts the leaf only: a 255-byte leaf is legal even
        // though the normalized name is 256 bytes.
        let max_leaf = "x".repeat(255);
        assert_eq!(normalize_name(&max_leaf).unwrap(), format!("/{max_leaf}"));
        assert_eq!(
            normalize_name(&format!("/{max_leaf}")).unwrap(),
            format!("/{max_leaf}")
        );

        let over = "x".repeat(256);
        assert!(matches!(
            normalize_name(&over),
            Err(ShmError::InvalidName(_))
        ));
    }

    #[test]
    fn ipc_path_maps_into_dev_shm() {
        assert_eq!(ipc_path("/bus"), Path::new("/dev/shm/bus"));
    }

    #[test]
    fn access_flags_compose() {
        let a = Access::READ_WRITE | Access::CREATE | Access::EXCLUSIVE;
        assert_eq!(
            a.open_flags(),
            libc::O_RDWR | libc::O_CREAT | libc::O_EXCL
        );
        assert_eq!(Access::READ_ONLY.open_flags(), libc::O_RDONLY);
    }
}
