//! Arithmetic progressions and the per-client set of up to three of them.

use crate::{MAX_SLOT, MIN_SLOT};
use std::collections::BTreeMap;
use std::fmt;

/// One arithmetic progression.
///
/// A counter is only ever built from a nonzero start and a nonzero step; a
/// zero in either field means the slot is not configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    start: u32,
    step: u32,
    value: u64,
}

impl Counter {
    /// Returns `None` when `start` or `step` is zero.
    pub fn new(start: u32, step: u32) -> Option<Self> {
        if start == 0 || step == 0 {
            return None;
        }

        Some(Self {
            start,
            step,
            value: u64::from(start),
        })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Moves to the next value of the progression.
    ///
    /// When fewer than `step` values are left before `u64::MAX`, the counter
    /// restarts at `start` instead of wrapping through zero.
    pub fn advance(&mut self) {
        let headroom = u64::MAX - self.value;

        if headroom < u64::from(self.step) {
            self.value = u64::from(self.start);
        } else {
            self.value += u64::from(self.step);
        }
    }
}

/// The counters configured by one client, keyed by slot `1..=3`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressionSet {
    slots: BTreeMap<u8, Counter>,
}

impl ProgressionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh counter in `slot`, replacing any previous one.
    ///
    /// Returns false and leaves the set untouched when the slot is outside
    /// `1..=3` or when `start` or `step` is zero.
    pub fn set_slot(&mut self, slot: u8, start: u32, step: u32) -> bool {
        if !(MIN_SLOT..=MAX_SLOT).contains(&slot) {
            return false;
        }

        match Counter::new(start, step) {
            Some(counter) => {
                self.slots.insert(slot, counter);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot: u8) -> Option<&Counter> {
        self.slots.get(&slot)
    }

    /// Current values in ascending slot order.
    pub fn values(&self) -> Vec<u64> {
        self.slots.values().map(Counter::value).collect()
    }

    /// Space separated current values in ascending slot order, or an empty
    /// string when nothing is configured.
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn advance_all(&mut self) {
        for counter in self.slots.values_mut() {
            counter.advance();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Display for ProgressionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for counter in self.slots.values() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", counter.value)?;
            first = false;
        }
        Ok(())
    }
}
