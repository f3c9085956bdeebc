//! Seeded model-based simulation of the ordered collections.
//!
//! A [`Simulator`] applies a reproducible stream of random operations to a
//! [`BTree`], a [`SkipList`] and a [`Heap`] side by side, mirroring every
//! operation on `std` reference models. After each operation the results are
//! compared and the structural validators run.
//!
//! At the end of a run the surviving keys are fed through an
//! [`ExternalSorter`] with a tiny buffer, so the spill and merge path sees
//! the same data.
//!
//! Given the same seed, a run is identical.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Direction;
use crate::btree::BTree;
use crate::comparator::NaturalOrder;
use crate::config::SorterConfig;
use crate::heap::Heap;
use crate::skiplist::SkipList;
use crate::sorter::{ExternalSorter, IntCodec};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Keys are drawn from `0..key_space`.
    pub key_space: u32,
    /// B+-tree order.
    pub order: usize,
    /// Skip list maximum level.
    pub max_level: usize,
    /// Run the structural validators every this many operations.
    pub check_every: usize,
}

impl SimulatorConfig {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            key_space: 256,
            order: 4,
            max_level: 8,
            check_every: 1,
        }
    }

    #[must_use]
    pub const fn with_key_space(mut self, key_space: u32) -> Self {
        self.key_space = key_space;
        self
    }

    #[must_use]
    pub const fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn with_check_every(mut self, every: usize) -> Self {
        self.check_every = every;
        self
    }
}

/// One simulated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert(u32, u64),
    Remove(u32),
    Search(u32),
    Range(u32, u32),
    RemoveFirst,
    RemoveLast,
    CursorSweep(Direction, u32),
    HeapAdd(u32),
    HeapPoll,
    /// Whole-structure comparison after the last operation.
    Finish,
}

/// A mismatch between a structure and its model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub step: usize,
    pub operation: Operation,
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} {:?}: {}", self.step, self.operation, self.message)
    }
}

/// Results from a simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    pub seed: u64,
    pub operations: usize,
    pub final_len: usize,
    pub violations: Vec<InvariantViolation>,
    /// Operations applied, in order.
    pub trace: Vec<Operation>,
}

impl SimulationResult {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// One line per violation, prefixed with the seed.
    #[must_use]
    pub fn report(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("seed {}: {v}", self.seed))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    btree: BTree<u32, u64>,
    skiplist: SkipList<u32, u64>,
    heap: Heap<u32>,
    model: BTreeMap<u32, u64>,
    heap_model: BinaryHeap<Reverse<u32>>,
    violations: Vec<InvariantViolation>,
}

impl Simulator {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            btree: BTree::new(config.order, NaturalOrder),
            skiplist: SkipList::with_seed(config.max_level, NaturalOrder, config.seed),
            heap: Heap::new(NaturalOrder),
            model: BTreeMap::new(),
            heap_model: BinaryHeap::new(),
            violations: Vec::new(),
            config,
        }
    }

    pub fn run(&mut self, operation_count: usize) -> SimulationResult {
        let mut trace = Vec::with_capacity(operation_count);
        for step in 0..operation_count {
            let operation = self.next_operation();
            self.apply(step, operation);
            if self.config.check_every > 0 && step % self.config.check_every == 0 {
                self.btree.check_invariants();
                self.skiplist.check_invariants();
                self.heap.check_invariants();
            }
            trace.push(operation);
        }
        self.apply(operation_count, Operation::Finish);
        SimulationResult {
            seed: self.config.seed,
            operations: operation_count,
            final_len: self.model.len(),
            violations: std::mem::take(&mut self.violations),
            trace,
        }
    }

    fn key(&mut self) -> u32 {
        self.rng.random_range(0..self.config.key_space)
    }

    fn next_operation(&mut self) -> Operation {
        match self.rng.random_range(0..100) {
            0..40 => {
                let key = self.key();
                Operation::Insert(key, self.rng.random())
            }
            40..65 => Operation::Remove(self.key()),
            65..75 => Operation::Search(self.key()),
            75..80 => {
                let (a, b) = (self.key(), self.key());
                Operation::Range(a.min(b), a.max(b))
            }
            80..83 => Operation::RemoveFirst,
            83..86 => Operation::RemoveLast,
            86..88 => {
                let direction = if self.rng.random_bool(0.5) {
                    Direction::Forward
                } else {
                    Direction::Reverse
                };
                Operation::CursorSweep(direction, self.rng.random_range(2..6))
            }
            88..95 => Operation::HeapAdd(self.key()),
            _ => Operation::HeapPoll,
        }
    }

    fn violation(&mut self, step: usize, operation: Operation, message: String) {
        self.violations.push(InvariantViolation {
            step,
            operation,
            message,
        });
    }

    fn expect_eq<T: PartialEq + std::fmt::Debug>(
        &mut self,
        step: usize,
        operation: Operation,
        what: &str,
        actual: &T,
        expected: &T,
    ) {
        if actual != expected {
            self.violation(
                step,
                operation,
                format!("{what}: got {actual:?}, expected {expected:?}"),
            );
        }
    }

    fn apply(&mut self, step: usize, operation: Operation) {
        match operation {
            Operation::Insert(key, value) => {
                let expected = self.model.insert(key, value);
                let tree = self.btree.insert(key, value);
                let list = self.skiplist.insert(key, value);
                self.expect_eq(step, operation, "btree insert", &tree, &expected);
                self.expect_eq(step, operation, "skiplist insert", &list, &expected);
            }
            Operation::Remove(key) => {
                let expected = self.model.remove(&key);
                let tree = self.btree.remove(&key);
                let list = self.skiplist.remove(&key);
                self.expect_eq(step, operation, "btree remove", &tree, &expected);
                self.expect_eq(step, operation, "skiplist remove", &list, &expected);
            }
            Operation::Search(key) => {
                let expected = self.model.get(&key).copied();
                let tree = self.btree.search(&key).copied();
                let list = self.skiplist.get(&key).copied();
                self.expect_eq(step, operation, "btree search", &tree, &expected);
                self.expect_eq(step, operation, "skiplist get", &list, &expected);
            }
            Operation::Range(start, end) => {
                let expected: Vec<(u32, u64)> =
                    self.model.range(start..=end).map(|(k, v)| (*k, *v)).collect();
                match self.btree.search_range(&start, &end) {
                    Ok(found) => {
                        let found: Vec<(u32, u64)> = found.into_iter().map(|(k, v)| (*k, *v)).collect();
                        self.expect_eq(step, operation, "btree range", &found, &expected);
                    }
                    Err(e) => self.violation(step, operation, format!("btree range failed: {e}")),
                }
            }
            Operation::RemoveFirst => {
                let expected = self.model.pop_first();
                let tree = self.btree.remove_first().map(crate::Entry::into_parts);
                let list = self.skiplist.remove_first().map(crate::Entry::into_parts);
                self.expect_eq(step, operation, "btree remove_first", &tree, &expected);
                self.expect_eq(step, operation, "skiplist remove_first", &list, &expected);
            }
            Operation::RemoveLast => {
                let expected = self.model.pop_last();
                let tree = self.btree.remove_last().map(crate::Entry::into_parts);
                let list = self.skiplist.remove_last().map(crate::Entry::into_parts);
                self.expect_eq(step, operation, "btree remove_last", &tree, &expected);
                self.expect_eq(step, operation, "skiplist remove_last", &list, &expected);
            }
            Operation::CursorSweep(direction, modulus) => self.cursor_sweep(step, operation, direction, modulus),
            Operation::HeapAdd(value) => {
                self.heap.add(value);
                self.heap_model.push(Reverse(value));
            }
            Operation::HeapPoll => {
                let expected = self.heap_model.pop().map(|Reverse(v)| v);
                let actual = self.heap.poll();
                self.expect_eq(step, operation, "heap poll", &actual, &expected);
            }
            Operation::Finish => self.check_final(step),
        }
    }

    /// Walk both maps with a cursor, removing keys divisible by `modulus`.
    fn cursor_sweep(&mut self, step: usize, operation: Operation, direction: Direction, modulus: u32) {
        let mut expected: Vec<u32> = self.model.keys().copied().collect();
        if direction == Direction::Reverse {
            expected.reverse();
        }
        self.model.retain(|k, _| k % modulus != 0);

        let mut tree_seen = Vec::new();
        let mut cursor = self.btree.cursor(direction);
        while let Some((key, _)) = cursor.next() {
            let key = *key;
            tree_seen.push(key);
            if key % modulus == 0 {
                cursor.remove();
            }
        }

        let mut list_seen = Vec::new();
        let mut cursor = self.skiplist.cursor(direction);
        while let Some((key, _)) = cursor.next() {
            let key = *key;
            list_seen.push(key);
            if key % modulus == 0 {
                cursor.remove();
            }
        }

        self.expect_eq(step, operation, "btree cursor order", &tree_seen, &expected);
        self.expect_eq(step, operation, "skiplist cursor order", &list_seen, &expected);
        let len = self.model.len();
        self.expect_eq(step, operation, "btree len after sweep", &self.btree.len(), &len);
        self.expect_eq(step, operation, "skiplist len after sweep", &self.skiplist.len(), &len);
    }

    fn check_final(&mut self, step: usize) {
        let operation = Operation::Finish;
        let expected: Vec<(u32, u64)> = self.model.iter().map(|(k, v)| (*k, *v)).collect();
        let tree: Vec<(u32, u64)> = self.btree.iter().map(|(k, v)| (*k, *v)).collect();
        let list: Vec<(u32, u64)> = self.skiplist.iter().map(|(k, v)| (*k, *v)).collect();
        self.expect_eq(step, operation, "btree contents", &tree, &expected);
        self.expect_eq(step, operation, "skiplist contents", &list, &expected);

        let tree_rev: Vec<u32> = self.btree.iter().rev().map(|(k, _)| *k).collect();
        let list_rev: Vec<u32> = self.skiplist.iter().rev().map(|(k, _)| *k).collect();
        let expected_rev: Vec<u32> = self.model.keys().rev().copied().collect();
        self.expect_eq(step, operation, "btree reverse", &tree_rev, &expected_rev);
        self.expect_eq(step, operation, "skiplist reverse", &list_rev, &expected_rev);

        match self.sort_externally() {
            Ok(sorted) => {
                let mut keys: Vec<u32> = self.model.keys().copied().collect();
                keys.extend(self.heap.iter());
                keys.sort_unstable();
                self.expect_eq(step, operation, "external sort", &sorted, &keys);
            }
            Err(e) => self.violation(step, operation, format!("external sort failed: {e}")),
        }
    }

    /// Sort every surviving key plus the heap's contents through a sorter
    /// that spills every few records.
    fn sort_externally(&self) -> Result<Vec<u32>, crate::SorterError> {
        let dir = tempfile::tempdir()?;
        let config = SorterConfig::default()
            .with_max_cache_record_num(5)
            .with_max_open_file_num(3)
            .with_temp_dir(dir.path())
            .with_file_prefix("sim-");
        let mut sorter = ExternalSorter::new(config, NaturalOrder, IntCodec)?;
        // Reverse order so every run is sorted by the sorter, not the source.
        for (key, _) in self.btree.iter().rev() {
            sorter.add_record(*key)?;
        }
        for value in self.heap.iter() {
            sorter.add_record(value)?;
        }
        let mut sorted = Vec::new();
        while let Some(v) = sorter.get_record()? {
            sorted.push(v);
        }
        sorter.close()?;
        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_basic() {
        let mut sim = Simulator::new(SimulatorConfig::new(12345));
        let result = sim.run(500);
        assert!(result.passed(), "{}", result.report());
        assert_eq!(result.operations, 500);
        assert_eq!(result.seed, 12345);
        assert_eq!(result.trace.len(), 500);
    }

    #[test]
    fn test_simulator_deterministic() {
        let config = SimulatorConfig::new(99).with_key_space(64);
        let first = Simulator::new(config.clone()).run(300);
        let second = Simulator::new(config).run(300);
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.final_len, second.final_len);
    }

    #[test]
    fn test_simulator_minimum_order() {
        for seed in 0..8 {
            let config = SimulatorConfig::new(seed).with_order(3).with_key_space(40);
            let result = Simulator::new(config).run(400);
            assert!(result.passed(), "{}", result.report());
        }
    }

    #[test]
    fn test_simulator_wide_nodes() {
        let config = SimulatorConfig::new(7).with_order(31).with_key_space(5_000);
        let result = Simulator::new(config).run(2_000);
        assert!(result.passed(), "{}", result.report());
    }

    #[test]
    #[ignore = "long-running"]
    fn test_simulator_stress() {
        for seed in 0..200 {
            let config = SimulatorConfig::new(seed).with_check_every(10);
            let result = Simulator::new(config).run(5_000);
            assert!(result.passed(), "{}", result.report());
        }
    }
}
