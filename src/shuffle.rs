use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

/// Random traversal order over catalog indices.
///
/// `remaining` always holds a subset of a single random permutation of
/// `0..len`. Leaving a track consumes its index, as does arriving at one, and
/// the permutation is regenerated once nothing but the current index is left.
#[derive(Debug)]
pub struct ShuffleSequencer {
    len: usize,
    remaining: Vec<usize>,
    rng: SmallRng,
}

impl ShuffleSequencer {
    pub fn from_os_rng(len: usize) -> Self {
        Self::with_rng(len, SmallRng::from_os_rng())
    }

    pub fn seeded(len: usize, seed: u64) -> Self {
        Self::with_rng(len, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(len: usize, rng: SmallRng) -> Self {
        let mut sequencer = Self {
            len,
            remaining: Vec::with_capacity(len),
            rng,
        };
        sequencer.regenerate(len);
        sequencer
    }

    /// Replaces the sequence with a fresh permutation of `0..len`.
    pub fn regenerate(&mut self, len: usize) -> &[usize] {
        self.len = len;
        self.remaining = (0..len).collect();
        self.remaining.shuffle(&mut self.rng);
        &self.remaining
    }

    pub fn remaining(&self) -> &[usize] {
        &self.remaining
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_exhausted(&self, current: usize) -> bool {
        self.remaining.iter().all(|idx| *idx == current)
    }

    /// Picks and consumes the next index other than `current`.
    ///
    /// Only returns `current` when the catalog has a single track.
    pub fn next_after(&mut self, current: usize) -> usize {
        if self.is_exhausted(current) {
            self.regenerate(self.len);
        }

        self.remaining.retain(|idx| *idx != current);
        if self.remaining.is_empty() {
            return current;
        }
        self.remaining.remove(0)
    }

    /// Uniform pick among every index except `current`. Leaves the sequence untouched.
    pub fn random_other(&mut self, current: usize) -> usize {
        let mut candidates: Vec<usize> = (0..self.len).filter(|idx| *idx != current).collect();
        candidates.shuffle(&mut self.rng);
        candidates.first().copied().unwrap_or(current)
    }
}
