//! Run-length-encoded bit-vector (component A).
//!
//! Set bit positions are stored as a sorted collection of runs, each
//! spanning `nRuns` repetitions of a period-`k` bit pattern. The ordered
//! map backing the run collection is the "balanced AVL tree" external
//! collaborator named by the originating design; a [`std::collections::BTreeMap`]
//! keyed by run offset fills the same ordered-predecessor/successor role.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    n_runs: u64,
    pattern: u64,
}

/// A sparse, run-length-compressible set of non-negative integers with
/// assumed periodic structure.
#[derive(Debug, Clone)]
pub struct RunLengthBitVector {
    run_length: u64,
    runs: BTreeMap<u64, Run>,
    curr_size: usize,
    max_observed_size: usize,
}

impl RunLengthBitVector {
    /// `runLength` is the period `k`. If `k` is zero or wider than the
    /// `u64` pattern word, it falls back to `k = 1`. When `auto_validate`
    /// is set, a small internal self-check runs in debug builds only.
    pub fn new(run_length: u32, auto_validate: bool) -> Self {
        let k = if run_length == 0 || run_length > 64 {
            1
        } else {
            run_length as u64
        };
        let v = Self {
            run_length: k,
            runs: BTreeMap::new(),
            curr_size: 0,
            max_observed_size: 0,
        };
        if auto_validate {
            debug_assert!(self_test(), "RLE self-test failed");
        }
        v
    }

    pub fn run_size(&self) -> u32 {
        self.run_length as u32
    }

    pub fn curr_size(&self) -> usize {
        self.curr_size
    }

    pub fn max_observed_size(&self) -> usize {
        self.max_observed_size
    }

    fn find_containing(&self, rounded: u64) -> Option<(u64, Run)> {
        let (&off, &run) = self.runs.range(..=rounded).next_back()?;
        if rounded < off + run.n_runs * self.run_length {
            Some((off, run))
        } else {
            None
        }
    }

    pub fn get(&self, i: u64) -> bool {
        let k = self.run_length;
        let rounded = i - i % k;
        let bit_idx = i % k;
        match self.find_containing(rounded) {
            Some((_, run)) => (run.pattern >> bit_idx) & 1 == 1,
            None => false,
        }
    }

    fn insert_run(&mut self, offset: u64, run: Run) {
        self.runs.insert(offset, run);
        self.curr_size += 1;
        self.max_observed_size = self.max_observed_size.max(self.curr_size);
    }

    fn remove_run(&mut self, offset: u64) {
        self.runs.remove(&offset);
        self.curr_size -= 1;
    }

    fn predecessor(&self, offset: u64) -> Option<(u64, Run)> {
        self.runs
            .range(..offset)
            .next_back()
            .map(|(&o, &r)| (o, r))
    }

    fn successor(&self, offset: u64) -> Option<(u64, Run)> {
        self.runs
            .range(offset + 1..)
            .next()
            .map(|(&o, &r)| (o, r))
    }

    /// Merges the run at `offset` with its immediate left and right
    /// neighbors, at most once on each side, when they are contiguous and
    /// carry an identical pattern.
    fn merge_around(&mut self, offset: u64) {
        let k = self.run_length;
        let mut offset = offset;
        let mut cur = *self.runs.get(&offset).expect("run just inserted");

        if let Some((poff, prun)) = self.predecessor(offset) {
            let pred_end = poff + prun.n_runs * k;
            if pred_end == offset && prun.pattern == cur.pattern {
                self.remove_run(offset);
                self.remove_run(poff);
                let merged = Run {
                    n_runs: prun.n_runs + cur.n_runs,
                    pattern: cur.pattern,
                };
                self.insert_run(poff, merged);
                offset = poff;
                cur = merged;
            }
        }

        if let Some((soff, srun)) = self.successor(offset) {
            let cur_end = offset + cur.n_runs * k;
            if cur_end == soff && srun.pattern == cur.pattern {
                self.remove_run(offset);
                self.remove_run(soff);
                let merged = Run {
                    n_runs: cur.n_runs + srun.n_runs,
                    pattern: cur.pattern,
                };
                self.insert_run(offset, merged);
            }
        }
    }

    /// Sets bit `i`. Precondition: `get(i) == false`; violating it is a
    /// lost-invariant condition and panics in debug builds.
    pub fn set(&mut self, i: u64) {
        debug_assert!(!self.get(i), "set({i}) called on an already-set bit");
        let k = self.run_length;
        let rounded = i - i % k;
        let bit_idx = i % k;
        let bit = 1u64 << bit_idx;

        let new_pattern = if let Some((off, run)) = self.find_containing(rounded) {
            let run_end = off + run.n_runs * k;
            self.remove_run(off);
            if rounded > off {
                let prefix_n = (rounded - off) / k;
                self.insert_run(off, Run { n_runs: prefix_n, pattern: run.pattern });
            }
            if rounded + k < run_end {
                let suffix_off = rounded + k;
                let suffix_n = (run_end - suffix_off) / k;
                self.insert_run(
                    suffix_off,
                    Run { n_runs: suffix_n, pattern: run.pattern },
                );
            }
            run.pattern | bit
        } else {
            bit
        };

        self.insert_run(rounded, Run { n_runs: 1, pattern: new_pattern });
        self.merge_around(rounded);
    }
}

/// Exercises a handful of set/get pairs on a throwaway vector; grounds the
/// `autoValidate` self-check named as a supplemented feature.
fn self_test() -> bool {
    let mut v = RunLengthBitVector::new(4, false);
    let probes = [0u64, 1, 4, 5, 9, 100, 101];
    for &p in &probes {
        if v.get(p) {
            return false;
        }
        v.set(p);
        if !v.get(p) {
            return false;
        }
    }
    probes.iter().all(|&p| v.get(p))
}
