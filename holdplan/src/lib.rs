//! # holdplan
//!
//! A small utility for choosing which dice to hold in a single Yahtzee turn,
//! scored only against the upper section of the score card.
//!
//! ## Rules
//!
//! A hand is scored by its best single face total, i.e., the maximum over all
//! faces `f` in the hand of `f * count(f)`. Every other die in the hand is
//! ignored. The player holds some subset of the hand and re-rolls the rest
//! exactly once.
//!
//! ## Explanation
//!
//! For every possible hold, this tool enumerates every outcome of re-rolling
//! the free dice, scores each resulting hand, and averages the scores weighted
//! by their probability. The hold with the largest expected score wins.
//!
//! Among holds with exactly equal expected scores, the search reports the
//! lexicographically smallest hold tuple (holds keep the positional order of
//! the hand they were drawn from).

#[macro_use]
mod macros;

pub mod agent;
pub mod cli;
pub mod dice;
pub mod logger;
pub mod parse;
pub mod search;
pub mod stats;

pub use dice::{all_holds, all_sequences, score, Dice, DieSides};
pub use search::{expected_value, strategy};

use std::{collections::HashMap, mem};
use thiserror::Error;

pub(crate) const DEFAULT_DIE_SIDES: u8 = 6;
pub(crate) const DEFAULT_NUM_TRIALS: usize = 10_000;
pub(crate) const DEFAULT_SEED: u64 = 0xd15c0;
/// The default ceiling on the number of `(hold, outcome)` pairs a single
/// search may score.
pub(crate) const DEFAULT_MAX_OUTCOMES: u64 = 50_000_000;

////////////
// Errors //
////////////

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("a die needs at least one side and at most {max} sides: got {0}", max = u8::MAX)]
    InvalidSides(u32),
    #[error("die face {face} is out of range [1, {sides}]")]
    InvalidFace { face: u8, sides: u8 },
    #[error("search would score {outcomes} outcomes, which exceeds the limit of {max}")]
    SearchTooLarge { outcomes: u64, max: u64 },
}

///////////////////
// Combinatorics //
///////////////////

/// count `n choose k` without replacement, as an `f64` so that large hands
/// don't overflow.
pub(crate) fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    // C(n, k) == C(n, n - k); iterate over the smaller side
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * ((n - i) as f64) / ((i + 1) as f64))
}

/// count the distinct orderings of a multiset with the given face counts, i.e.,
/// `n! / (c_1! * c_2! * .. * c_m!)` where `n = c_1 + .. + c_m`.
pub(crate) fn multinomial(counts: &[usize]) -> f64 {
    let mut remaining: usize = counts.iter().sum();
    let mut out = 1.0;
    for &count in counts {
        out *= binomial(remaining, count);
        remaining -= count;
    }
    out
}

/// The number of outcome sequences from rolling `ndice` dice with `sides` sides,
/// i.e., `sides ^ ndice`. Saturates at `u64::MAX`.
pub(crate) fn num_sequences(sides: u8, ndice: usize) -> u64 {
    u32::try_from(ndice)
        .ok()
        .and_then(|ndice| (sides as u64).checked_pow(ndice))
        .unwrap_or(u64::MAX)
}

/////////////////////
// TotalSize trait //
/////////////////////

/// A trait for computing the total size of a data structure in memory. That means
/// not just the size on the stack, but also any heap allocations it owns.
pub trait TotalSize {
    /// Types whose total size is known statically, like a `u32`, can return a
    /// constant here. Types that own variable-size resources return `None`.
    fn static_size() -> Option<usize>
    where
        Self: Sized,
    {
        None
    }
    fn total_size(&self) -> usize;
}

impl_total_size_static!(u32, u64, usize, f64);

impl<A, B> TotalSize for (A, B)
where
    A: TotalSize,
    B: TotalSize,
{
    fn static_size() -> Option<usize> {
        Some(A::static_size()? + B::static_size()?)
    }
    fn total_size(&self) -> usize {
        self.0.total_size() + self.1.total_size()
    }
}

impl<K, V> TotalSize for HashMap<K, V>
where
    K: TotalSize,
    V: TotalSize,
{
    fn total_size(&self) -> usize {
        let entries: usize = match (K::static_size(), V::static_size()) {
            (Some(size_k), Some(size_v)) => self.len() * (size_k + size_v),
            _ => self.iter().map(|(k, v)| k.total_size() + v.total_size()).sum(),
        };
        mem::size_of::<Self>() + entries
    }
}

///////////
// Tests //
///////////
