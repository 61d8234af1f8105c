//! Deduplicating, priority-ranked trajectory store.

use super::sampler::SamplerKind;
use crate::env::Trajectory;
use crate::{Result, SeqRlError, Token};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A trajectory with its deduplication key and ranking priority.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayEntry {
    key: Vec<Token>,
    priority: f32,
    trajectory: Trajectory,
    /// Insertion order, assigned by the buffer
    seq: u64,
}

impl ReplayEntry {
    pub fn new(trajectory: Trajectory, priority: f32) -> Self {
        Self {
            key: trajectory.canonical_key().to_vec(),
            priority,
            trajectory,
            seq: 0,
        }
    }

    /// Entry ranked by the trajectory's own reward
    pub fn from_reward(trajectory: Trajectory) -> Self {
        let priority = trajectory.reward();
        Self::new(trajectory, priority)
    }

    pub fn key(&self) -> &[Token] {
        &self.key
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Lowest priority first, older first among equals
    fn rank(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// What [`ReplayBuffer::insert`] did with an entry. Never an error.
#[derive(Clone, Debug, PartialEq)]
pub enum InsertOutcome {
    /// New key stored in free space
    Inserted,
    /// Same key was resident with a lower priority and got replaced
    Replaced,
    /// Same key was resident with an equal or higher priority; new entry dropped
    KeptResident,
    /// Buffer was full; this lowest-priority resident made room
    Evicted(ReplayEntry),
    /// Buffer was full and the entry did not beat the lowest priority, or
    /// the priority was not finite
    Rejected,
}

impl InsertOutcome {
    /// Whether the offered entry is now resident
    pub fn stored(&self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced | Self::Evicted(_))
    }
}

/// Trajectories drawn by [`ReplayBuffer::sample`]
#[derive(Clone, Debug)]
pub struct ReplaySample {
    pub trajectories: Vec<Trajectory>,
    /// Normalized importance weight per trajectory (1.0 for uniform)
    pub weights: Vec<f32>,
    pub priorities: Vec<f32>,
}

impl ReplaySample {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

/// Fixed-capacity replay buffer keeping the best unique trajectories.
///
/// Keys are unique and `len() <= capacity()` at all times. Eviction and
/// sampling are deterministic given the operation sequence and the seed.
pub struct ReplayBuffer {
    slots: Vec<ReplayEntry>,
    index: HashMap<Vec<Token>, usize>,
    capacity: usize,
    sampler: SamplerKind,
    rng: StdRng,
    next_seq: u64,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, sampler: SamplerKind, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(SeqRlError::Config(
                "replay capacity must be positive".to_string(),
            ));
        }
        sampler.validate()?;

        Ok(Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            capacity,
            sampler,
            rng: StdRng::seed_from_u64(seed),
            next_seq: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn sampler(&self) -> SamplerKind {
        self.sampler
    }

    pub fn contains(&self, key: &[Token]) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &[Token]) -> Option<&ReplayEntry> {
        self.index.get(key).map(|&slot| &self.slots[slot])
    }

    /// Resident entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = &ReplayEntry> {
        self.slots.iter()
    }

    pub fn min_priority(&self) -> Option<f32> {
        self.lowest().map(|slot| self.slots[slot].priority)
    }

    pub fn max_priority(&self) -> Option<f32> {
        self.slots
            .iter()
            .map(|e| e.priority)
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Slot holding the eviction candidate
    fn lowest(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.rank(b))
            .map(|(slot, _)| slot)
    }

    fn stamp(&mut self, mut entry: ReplayEntry) -> ReplayEntry {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        entry
    }

    /// Offer one entry to the buffer.
    ///
    /// Entries with a NaN or infinite priority are always rejected.
    pub fn insert(&mut self, entry: ReplayEntry) -> InsertOutcome {
        if !entry.priority.is_finite() {
            tracing::debug!(priority = entry.priority, "Rejected non-finite replay priority");
            return InsertOutcome::Rejected;
        }

        if let Some(&slot) = self.index.get(entry.key()) {
            if entry.priority > self.slots[slot].priority {
                self.slots[slot] = self.stamp(entry);
                return InsertOutcome::Replaced;
            }
            return InsertOutcome::KeptResident;
        }

        if !self.is_full() {
            let entry = self.stamp(entry);
            self.index.insert(entry.key.clone(), self.slots.len());
            self.slots.push(entry);
            return InsertOutcome::Inserted;
        }

        let Some(slot) = self.lowest() else {
            return InsertOutcome::Rejected;
        };
        if entry.priority <= self.slots[slot].priority {
            return InsertOutcome::Rejected;
        }

        let entry = self.stamp(entry);
        self.index.insert(entry.key.clone(), slot);
        let evicted = std::mem::replace(&mut self.slots[slot], entry);
        self.index.remove(&evicted.key);
        tracing::trace!(
            evicted = evicted.priority,
            inserted = self.slots[slot].priority,
            "Replay eviction"
        );
        InsertOutcome::Evicted(evicted)
    }

    /// Offer many entries in order; returns how many ended up resident.
    pub fn extend<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = ReplayEntry>,
    {
        entries
            .into_iter()
            .map(|entry| self.insert(entry))
            .filter(InsertOutcome::stored)
            .count()
    }

    /// Keep only candidates whose key is not already resident.
    pub fn filter_known(&self, candidates: Vec<ReplayEntry>) -> Vec<ReplayEntry> {
        candidates
            .into_iter()
            .filter(|c| !self.contains(c.key()))
            .collect()
    }

    /// Draw `n` distinct entries with the buffer's sampler.
    ///
    /// Fails with `Underflow` when fewer than `n` entries are resident.
    pub fn sample(&mut self, n: usize) -> Result<ReplaySample> {
        if self.slots.len() < n {
            return Err(SeqRlError::Underflow {
                requested: n,
                available: self.slots.len(),
            });
        }

        let priorities: Vec<f32> = self.slots.iter().map(|e| e.priority).collect();
        let (indices, weights) = self.sampler.draw(&mut self.rng, &priorities, n)?;

        Ok(ReplaySample {
            trajectories: indices
                .iter()
                .map(|&i| self.slots[i].trajectory.clone())
                .collect(),
            priorities: indices.iter().map(|&i| priorities[i]).collect(),
            weights,
        })
    }
}
