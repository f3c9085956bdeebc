//! External merge sort.
//!
//! [`ExternalSorter`] buffers records in memory, spills each full buffer to
//! disk as a sorted run, and merges the runs back with a [`Heap`](crate::Heap)
//! of run readers.
//!
//! # Lifecycle
//!
//! ```text
//! PREPARE --get_record--> SORT --close--> CLOSED
//!    ^                     |
//!    +-------reset---------+
//! ```
//!
//! Records are added only in PREPARE. The first `get_record` merges spill
//! files until at most `max_open_file_num` remain, then streams the final
//! merge. `reset` and `close` delete every spill file.
//!
//! A failed spill or merge loses records, so after one the sorter refuses
//! `add_record` and `get_record` with [`SorterError::Poisoned`] until it is
//! reset or closed.
//!
//! # Usage
//!
//! ```
//! use sortkit::{ExternalSorter, IntCodec, NaturalOrder, SorterConfig};
//!
//! let dir = std::env::temp_dir().join("sortkit-doctest");
//! let config = SorterConfig::default()
//!     .with_max_cache_record_num(2)
//!     .with_temp_dir(&dir)
//!     .with_file_prefix("doctest-");
//! let mut sorter = ExternalSorter::new(config, NaturalOrder, IntCodec)?;
//! for v in [5u32, 3, 9, 1] {
//!     sorter.add_record(v)?;
//! }
//!
//! let mut sorted = Vec::new();
//! while let Some(v) = sorter.get_record()? {
//!     sorted.push(v);
//! }
//! assert_eq!(sorted, vec![1, 3, 5, 9]);
//! sorter.close()?;
//! # Ok::<(), sortkit::SorterError>(())
//! ```

mod codec;
mod external;
mod frame;
mod reader;
mod spill;

pub use codec::{BytesCodec, CodecError, IntCodec, RecordCodec, Utf8Codec};
pub use external::ExternalSorter;
pub use frame::{read_frame, write_frame};
pub use reader::{FileRecordReader, MemoryRecordReader, RecordReader, RunReader};
pub use spill::{SPILL_SUFFIX, SpillDir};

use crate::config::ConfigError;

/// Lifecycle state of an [`ExternalSorter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SorterState {
    /// Accepting records.
    Prepare,
    /// Emitting records in sorted order.
    Sort,
    /// Closed for good.
    Closed,
}

impl std::fmt::Display for SorterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prepare => write!(f, "PREPARE"),
            Self::Sort => write!(f, "SORT"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Error returned by sorter operations.
#[derive(Debug)]
pub enum SorterError {
    /// Operation not allowed in the current state.
    IllegalState {
        operation: &'static str,
        state: SorterState,
    },
    /// An earlier spill or merge failed; the sorter must be reset or closed.
    Poisoned { operation: &'static str },
    /// Invalid configuration.
    Config(ConfigError),
    /// I/O error on a spill file.
    Io(std::io::Error),
    /// A spill record could not be decoded.
    Codec(CodecError),
    /// A spill frame ends early.
    CorruptFrame,
    /// A spill frame's checksum does not match its contents.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// An encoded record does not fit in a frame.
    RecordTooLarge(usize),
}

impl std::fmt::Display for SorterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalState { operation, state } => {
                write!(f, "{operation} is not allowed in state {state}")
            }
            Self::Poisoned { operation } => {
                write!(f, "{operation} is not allowed after a failed spill or merge")
            }
            Self::Config(e) => write!(f, "sorter config error: {e}"),
            Self::Io(e) => write!(f, "spill I/O error: {e}"),
            Self::Codec(e) => write!(f, "spill codec error: {e}"),
            Self::CorruptFrame => write!(f, "corrupt spill frame"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "spill checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}"
                )
            }
            Self::RecordTooLarge(size) => {
                write!(f, "spill record too large: {size} bytes")
            }
        }
    }
}

impl std::error::Error for SorterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SorterError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CodecError> for SorterError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<ConfigError> for SorterError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
