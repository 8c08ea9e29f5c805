//! Lock-free single-writer, multi-reader broadcast over shared memory.
//!
//! One producer process creates a named shared memory segment holding a
//! fixed-capacity ring of seqlock-protected slots and publishes records
//! into it; any number of consumer processes open the same name read-only
//! and follow the stream, each with a private cursor. The writer never
//! blocks on a reader: the ring is intentionally lossy, and a reader that
//! falls behind is fast-forwarded past the elements it lost.
//!
//! The creator and observer capabilities are distinct types:
//! [`RingWriter`] creates and initializes the segment, [`RingReader`]
//! only ever opens and casts. Both sides must be built with the same
//! element type; the segment header records the layout so a mismatched
//! build fails fast on open instead of reading garbage.

mod error;
mod layout;
mod reader;
mod ring;
mod seqlock;
mod slot;
mod writer;

pub use error::{LayoutError, RingError};
pub use layout::{RING_MAGIC, RING_VERSION, RingHeader, bytes_for_ring};
pub use reader::RingReader;
pub use ring::{ReaderConfig, RingConfig, Start};
pub use seqlock::SequenceLock;
pub use slot::Slot;
pub use writer::RingWriter;
