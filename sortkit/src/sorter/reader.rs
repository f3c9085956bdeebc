//! Sorted-run readers consumed by the merge heap.

use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::comparator::Comparator;
use crate::sorter::SorterError;
use crate::sorter::codec::RecordCodec;
use crate::sorter::frame;

/// A cursor over one sorted run with one record of lookahead.
pub trait RecordReader<R> {
    /// The record [`advance`](Self::advance) would return, or `None` once the
    /// run is exhausted.
    fn peek(&self) -> Option<&R>;

    /// Return the current record and load the next one.
    fn advance(&mut self) -> Result<Option<R>, SorterError>;
}

/// Reader over a sorted in-memory run.
#[derive(Debug)]
pub struct MemoryRecordReader<R> {
    head: Option<R>,
    rest: std::vec::IntoIter<R>,
}

impl<R> MemoryRecordReader<R> {
    /// Wrap `records`, which must already be sorted.
    #[must_use]
    pub fn new(records: Vec<R>) -> Self {
        let mut rest = records.into_iter();
        let head = rest.next();
        Self { head, rest }
    }
}

impl<R> RecordReader<R> for MemoryRecordReader<R> {
    fn peek(&self) -> Option<&R> {
        self.head.as_ref()
    }

    fn advance(&mut self) -> Result<Option<R>, SorterError> {
        let next = self.rest.next();
        Ok(std::mem::replace(&mut self.head, next))
    }
}

/// Reader over a spill file.
#[derive(Debug)]
pub struct FileRecordReader<R, D> {
    path: PathBuf,
    reader: BufReader<File>,
    codec: D,
    head: Option<R>,
}

impl<R, D: RecordCodec<R>> FileRecordReader<R, D> {
    /// Open `path` and load its first record.
    pub fn open(path: &Path, codec: D) -> Result<Self, SorterError> {
        let mut reader = BufReader::new(File::open(path)?);
        let head = read_record(&mut reader, &codec)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            codec,
            head,
        })
    }

    /// Path of the underlying spill file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R, D: RecordCodec<R>> RecordReader<R> for FileRecordReader<R, D> {
    fn peek(&self) -> Option<&R> {
        self.head.as_ref()
    }

    fn advance(&mut self) -> Result<Option<R>, SorterError> {
        let next = read_record(&mut self.reader, &self.codec)?;
        Ok(std::mem::replace(&mut self.head, next))
    }
}

fn read_record<R, D: RecordCodec<R>>(
    reader: &mut BufReader<File>,
    codec: &D,
) -> Result<Option<R>, SorterError> {
    match frame::read_frame(reader)? {
        Some(payload) => Ok(Some(codec.decode(&payload)?)),
        None => Ok(None),
    }
}

/// Any run the sorter merges.
#[derive(Debug)]
pub enum RunReader<R, D> {
    Memory(MemoryRecordReader<R>),
    File(FileRecordReader<R, D>),
}

impl<R, D> RunReader<R, D> {
    fn head(&self) -> Option<&R> {
        match self {
            Self::Memory(reader) => reader.head.as_ref(),
            Self::File(reader) => reader.head.as_ref(),
        }
    }
}

impl<R, D: RecordCodec<R>> RecordReader<R> for RunReader<R, D> {
    fn peek(&self) -> Option<&R> {
        self.head()
    }

    fn advance(&mut self) -> Result<Option<R>, SorterError> {
        match self {
            Self::Memory(reader) => reader.advance(),
            Self::File(reader) => reader.advance(),
        }
    }
}

/// Orders runs by their current record. Exhausted runs sort last.
#[derive(Debug, Clone)]
pub struct RunOrder<C>(pub C);

impl<R, D, C: Comparator<R>> Comparator<RunReader<R, D>> for RunOrder<C> {
    fn compare(&self, a: &RunReader<R, D>, b: &RunReader<R, D>) -> Ordering {
        match (a.head(), b.head()) {
            (Some(a), Some(b)) => self.0.compare(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
