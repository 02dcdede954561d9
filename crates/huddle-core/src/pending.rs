//! Layer 2: optimistic-overlay primitives.
//!
//! Generation: a fencing token, one strictly increasing lineage per mutation
//! aspect (mute state and volume are independent lineages).
//! Pending<T>: a not-yet-acknowledged local mutation tagged with the
//! generation of the request that produced it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonically increasing fencing token.
///
/// An acknowledgment carrying an older generation than the latest issued
/// request must be discarded by the holder; only a match clears the overlay.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const ZERO: Generation = Generation(0);

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Generation {
        Generation(self.0.checked_add(1).expect("generation overflow"))
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generation({})", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending local mutation: the optimistic value plus its fencing token.
///
/// "No pending mutation" is `Option::<Pending<T>>::None`, so a half-cleared
/// overlay is unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending<T> {
    pub value: T,
    pub generation: Generation,
}

impl<T> Pending<T> {
    pub fn new(value: T, generation: Generation) -> Self {
        Self { value, generation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_are_strictly_increasing() {
        let mut generation = Generation::ZERO;
        for expected in 1..=5u64 {
            let next = generation.next();
            assert!(next > generation);
            assert_eq!(next.get(), expected);
            generation = next;
        }
    }
}
