//! The external sorter state machine.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::comparator::Comparator;
use crate::config::SorterConfig;
use crate::heap::Heap;
use crate::sorter::codec::RecordCodec;
use crate::sorter::frame;
use crate::sorter::reader::{FileRecordReader, MemoryRecordReader, RecordReader, RunOrder, RunReader};
use crate::sorter::spill::SpillDir;
use crate::sorter::{SorterError, SorterState};

type MergeHeap<R, C, D> = Heap<RunReader<R, D>, RunOrder<C>>;

/// Sorts more records than fit in memory by spilling sorted runs to disk.
///
/// Spill files are deleted by [`reset`](Self::reset), [`close`](Self::close),
/// and on drop.
pub struct ExternalSorter<R, C, D> {
    config: SorterConfig,
    comparator: C,
    codec: D,
    state: SorterState,
    buffer: Vec<R>,
    spill: SpillDir,
    merge: Option<MergeHeap<R, C, D>>,
    records_added: u64,
    poisoned: bool,
}

impl<R, C, D> ExternalSorter<R, C, D>
where
    C: Comparator<R> + Clone,
    D: RecordCodec<R> + Clone,
{
    /// Create a sorter in the PREPARE state.
    ///
    /// # Errors
    ///
    /// Returns [`SorterError::Config`] if `config` fails validation.
    pub fn new(config: SorterConfig, comparator: C, codec: D) -> Result<Self, SorterError> {
        config.validate()?;
        let spill = SpillDir::new(&config.temp_dir, config.file_prefix.as_str());
        Ok(Self {
            buffer: Vec::with_capacity(config.max_cache_record_num),
            config,
            comparator,
            codec,
            state: SorterState::Prepare,
            spill,
            merge: None,
            records_added: 0,
            poisoned: false,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SorterState {
        self.state
    }

    /// Spill files currently on disk.
    #[must_use]
    pub fn spill_file_count(&self) -> usize {
        self.spill.len()
    }

    /// Records added since creation or the last reset.
    #[must_use]
    pub const fn records_added(&self) -> u64 {
        self.records_added
    }

    /// Whether an earlier spill or merge failed.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The configuration this sorter was built with.
    #[must_use]
    pub const fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Add a record. Spills the buffer once it holds
    /// `max_cache_record_num` records.
    ///
    /// # Errors
    ///
    /// Returns [`SorterError::IllegalState`] outside PREPARE,
    /// [`SorterError::Poisoned`] after an earlier failure, or an I/O error
    /// if a spill fails.
    pub fn add_record(&mut self, record: R) -> Result<(), SorterError> {
        if self.state != SorterState::Prepare {
            return Err(self.illegal("add_record"));
        }
        if self.poisoned {
            return Err(SorterError::Poisoned {
                operation: "add_record",
            });
        }
        self.buffer.push(record);
        self.records_added += 1;
        if self.buffer.len() >= self.config.max_cache_record_num {
            let result = self.dump();
            self.poison_on_err(result)?;
        }
        Ok(())
    }

    /// Return the next record in sorted order, or `None` when all records
    /// have been returned.
    ///
    /// The first call leaves PREPARE and prepares the final merge.
    ///
    /// # Errors
    ///
    /// Returns [`SorterError::IllegalState`] once closed, or an I/O or codec
    /// error from reading spill files. After such an error every further
    /// call returns [`SorterError::Poisoned`] until the sorter is reset or
    /// closed.
    pub fn get_record(&mut self) -> Result<Option<R>, SorterError> {
        if self.state == SorterState::Closed {
            return Err(self.illegal("get_record"));
        }
        if self.poisoned {
            return Err(SorterError::Poisoned {
                operation: "get_record",
            });
        }
        let result = self.next_record();
        self.poison_on_err(result)
    }

    /// Discard all records and spill files and return to PREPARE.
    ///
    /// # Errors
    ///
    /// Returns [`SorterError::IllegalState`] once closed. If a spill file
    /// cannot be removed the sorter still returns to PREPARE and the first
    /// removal error is returned.
    pub fn reset(&mut self) -> Result<(), SorterError> {
        if self.state == SorterState::Closed {
            return Err(self.illegal("reset"));
        }
        let result = self.cleanup();
        self.state = SorterState::Prepare;
        tracing::debug!("external sorter reset");
        result
    }

    /// Discard everything and close the sorter for good. Closing twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns the first spill file removal error. The sorter is closed
    /// regardless.
    pub fn close(&mut self) -> Result<(), SorterError> {
        if self.state == SorterState::Closed {
            return Ok(());
        }
        let result = self.cleanup();
        self.state = SorterState::Closed;
        tracing::debug!("external sorter closed");
        result
    }

    fn next_record(&mut self) -> Result<Option<R>, SorterError> {
        if self.state == SorterState::Prepare {
            self.start_sort()?;
        }
        match self.merge.as_mut() {
            Some(heap) => next_merged(heap),
            None => Ok(None),
        }
    }

    fn poison_on_err<T>(&mut self, result: Result<T, SorterError>) -> Result<T, SorterError> {
        if let Err(e) = &result {
            tracing::warn!(state = %self.state, "external sorter poisoned: {e}");
            self.poisoned = true;
        }
        result
    }

    fn illegal(&self, operation: &'static str) -> SorterError {
        SorterError::IllegalState {
            operation,
            state: self.state,
        }
    }

    /// Sort the buffer and write it out as a new run.
    fn dump(&mut self) -> Result<(), SorterError> {
        let mut records = std::mem::take(&mut self.buffer);
        records.sort_by(|a, b| self.comparator.compare(a, b));

        let (path, file) = self.spill.create()?;
        let mut writer = BufWriter::new(file);
        let mut payload = Vec::new();
        for record in &records {
            payload.clear();
            self.codec.encode(record, &mut payload);
            frame::write_frame(&mut writer, &payload)?;
        }
        writer.flush()?;

        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            spill_files = self.spill.len(),
            "spilled sorted run"
        );
        records.clear();
        self.buffer = records;
        Ok(())
    }

    /// Leave PREPARE: merge spill files down to the open-file limit, then
    /// build the final merge over the remaining files and the buffer.
    fn start_sort(&mut self) -> Result<(), SorterError> {
        let spilled = self.spill.len();
        let mut rounds = 0;
        while self.spill.len() > self.config.max_open_file_num {
            self.merge_round()?;
            rounds += 1;
        }

        let mut heap = Heap::with_capacity(
            self.spill.len() + 1,
            RunOrder(self.comparator.clone()),
        );
        for path in self.spill.files() {
            let reader: FileRecordReader<R, D> = FileRecordReader::open(path, self.codec.clone())?;
            if reader.peek().is_some() {
                heap.add(RunReader::File(reader));
            }
        }

        let mut memory = std::mem::take(&mut self.buffer);
        memory.sort_by(|a, b| self.comparator.compare(a, b));
        let buffered = memory.len();
        let memory = MemoryRecordReader::new(memory);
        if memory.peek().is_some() {
            heap.add(RunReader::Memory(memory));
        }

        tracing::info!(
            records = self.records_added,
            spilled_runs = spilled,
            merge_rounds = rounds,
            final_runs = heap.len(),
            buffered,
            "external sort started"
        );
        self.merge = Some(heap);
        self.state = SorterState::Sort;
        Ok(())
    }

    /// Merge the oldest `max_open_file_num` spill files into one new file.
    fn merge_round(&mut self) -> Result<(), SorterError> {
        let inputs: Vec<PathBuf> = self
            .spill
            .files()
            .iter()
            .take(self.config.max_open_file_num)
            .cloned()
            .collect();
        let (output, file) = self.spill.create()?;

        let records = match self.merge_into(&inputs, file) {
            Ok(records) => records,
            Err(e) => {
                if let Err(cleanup) = self.spill.remove(&output) {
                    tracing::warn!(path = %output.display(), "failed to remove partial merge output: {cleanup}");
                }
                return Err(e);
            }
        };
        for input in &inputs {
            self.spill.remove(input)?;
        }

        tracing::debug!(
            inputs = inputs.len(),
            output = %output.display(),
            records,
            remaining = self.spill.len(),
            "merged spill files"
        );
        Ok(())
    }

    fn merge_into(&self, inputs: &[PathBuf], file: File) -> Result<u64, SorterError> {
        let mut heap = Heap::with_capacity(inputs.len(), RunOrder(self.comparator.clone()));
        for path in inputs {
            let reader: FileRecordReader<R, D> = FileRecordReader::open(path, self.codec.clone())?;
            if reader.peek().is_some() {
                heap.add(RunReader::File(reader));
            }
        }

        let mut writer = BufWriter::new(file);
        let mut payload = Vec::new();
        let mut records = 0;
        while let Some(record) = next_merged(&mut heap)? {
            payload.clear();
            self.codec.encode(&record, &mut payload);
            frame::write_frame(&mut writer, &payload)?;
            records += 1;
        }
        writer.flush()?;
        Ok(records)
    }

    /// Drop all records and delete all spill files.
    fn cleanup(&mut self) -> Result<(), SorterError> {
        // Close open readers before deleting their files.
        self.merge = None;
        self.buffer.clear();
        self.records_added = 0;
        self.poisoned = false;
        let removed = self.spill.remove_all()?;
        if removed > 0 {
            tracing::debug!(removed, dir = %self.spill.dir().display(), "removed spill files");
        }
        Ok(())
    }
}

/// Pop the smallest record across all runs.
fn next_merged<R, C, D>(heap: &mut MergeHeap<R, C, D>) -> Result<Option<R>, SorterError>
where
    C: Comparator<R>,
    D: RecordCodec<R>,
{
    let Some(mut reader) = heap.poll() else {
        return Ok(None);
    };
    let record = reader.advance()?;
    if reader.peek().is_some() {
        heap.add(reader);
    }
    Ok(record)
}

impl<R, C, D> Drop for ExternalSorter<R, C, D> {
    fn drop(&mut self) {
        self.merge = None;
        if let Err(e) = self.spill.remove_all() {
            tracing::warn!("failed to remove spill files on drop: {e}");
        }
    }
}
