use crate::{
    dice::{all_holds, score, Dice, DieSides, OutcomeMultisets, OutcomeSequences},
    num_sequences,
    stats::ScorePmf,
    Error, TotalSize,
};
use bytesize::ByteSize;
use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, collections::HashMap, fmt, hash::Hash, str::FromStr};

///////////
// Cache //
///////////

pub struct Cache<K, V> {
    store: HashMap<K, V>,
    hits: u32,
    misses: u32,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn new() -> Self {
        Self {
            store: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    fn peek_cache<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let out = self.store.get(key).cloned();
        if out.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        out
    }

    fn fill_cache(&mut self, key: K, value: V) -> V {
        self.store.insert(key, value.clone());
        value
    }

    pub fn cache_size(&self) -> usize {
        self.store.len()
    }

    pub fn cache_hits(&self) -> u32 {
        self.hits
    }

    pub fn cache_misses(&self) -> u32 {
        self.misses
    }

    pub fn cache_hit_rate(&self) -> f32 {
        let total_queries = self.hits + self.misses;
        if total_queries == 0 {
            0.0
        } else {
            (self.hits as f32) / (total_queries as f32)
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: TotalSize,
    V: TotalSize,
{
    pub fn cache_size_bytes(&self) -> ByteSize {
        ByteSize::b(self.store.total_size() as u64)
    }
}

/////////////////
// Enumeration //
/////////////////

/// How the estimator walks the re-roll outcomes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enumeration {
    /// Every ordered outcome sequence, each with probability `1 / sides^nfree`.
    #[default]
    Sequences,
    /// Every outcome multiset once, weighted by its number of orderings.
    Multisets,
}

impl FromStr for Enumeration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequences" => Ok(Self::Sequences),
            "multisets" => Ok(Self::Multisets),
            _ => Err(format!(
                "unrecognized enumeration '{}': expected 'sequences' or 'multisets'",
                s
            )),
        }
    }
}

/////////////////////
// Expected values //
/////////////////////

/// Compute the expected score of holding `held` and re-rolling `nfree` dice with
/// `sides` sides each. `None` means nothing is held.
///
/// With no free dice there is nothing to average over, so this is just the score
/// of the held dice.
pub fn expected_value(held: Option<&Dice>, sides: DieSides, nfree: usize) -> f64 {
    expected_value_with(Enumeration::Sequences, held, sides, nfree)
}

/// [`expected_value`], but with an explicit choice of outcome enumeration. Both
/// enumerations agree up to floating-point rounding.
pub fn expected_value_with(
    enumeration: Enumeration,
    held: Option<&Dice>,
    sides: DieSides,
    nfree: usize,
) -> f64 {
    let held = held.map(Dice::as_slice).unwrap_or(&[]);

    if nfree == 0 {
        return score(held) as f64;
    }

    match enumeration {
        Enumeration::Sequences => {
            let p_sequence = sides.p_sequence(nfree);
            // reuse one buffer for every combined hand
            let mut hand = Vec::with_capacity(nfree + held.len());
            OutcomeSequences::new(&sides.faces(), nfree).fold(0.0, |ev, sequence| {
                hand.clear();
                hand.extend_from_slice(sequence.as_slice());
                hand.extend_from_slice(held);
                ev + p_sequence * (score(&hand) as f64)
            })
        }
        Enumeration::Multisets => OutcomeMultisets::new(sides, nfree)
            .map(|(outcome, p_outcome)| p_outcome * (outcome.merge(held).score() as f64))
            .sum(),
    }
}

/// The full probability mass function over final scores when holding `held` and
/// re-rolling `nfree` dice. The PMF's mean is [`expected_value`].
pub fn score_distribution(held: Option<&Dice>, sides: DieSides, nfree: usize) -> ScorePmf {
    let held = held.cloned().unwrap_or_default();

    // no face can appear more than once per die, so no score can exceed this
    let max_face = held.max_face().unwrap_or(0).max(sides.get()) as u32;
    let max_score = max_face * ((held.len() + nfree) as u32);

    let mut pmf = ScorePmf::zeros(max_score);
    for (outcome, p_outcome) in OutcomeMultisets::new(sides, nfree) {
        pmf.add_mass(held.merge(outcome.as_slice()).score(), p_outcome);
    }
    pmf
}

/// The number of `(hold, outcome)` pairs a full search over a hand of `ndice`
/// dice scores, ignoring duplicate holds: `sum_k C(n, k) * sides^(n - k)`, which
/// is `(sides + 1)^n`.
pub fn search_cost(ndice: usize, sides: DieSides) -> u64 {
    u32::try_from(ndice)
        .ok()
        .and_then(|ndice| (sides.get() as u64 + 1).checked_pow(ndice))
        .unwrap_or(u64::MAX)
}

/// Reject searches that would score more than `max_outcomes` outcomes.
pub fn check_search_cost(outcomes: u64, max_outcomes: u64) -> Result<u64, Error> {
    if outcomes > max_outcomes {
        Err(Error::SearchTooLarge {
            outcomes,
            max: max_outcomes,
        })
    } else {
        Ok(outcomes)
    }
}

///////////////
// HoldValue //
///////////////

/// A hold paired with the expected score of keeping it and re-rolling the rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldValue {
    pub expected_value: f64,
    pub hold: Dice,
}

impl HoldValue {
    pub fn new(expected_value: f64, hold: Dice) -> Self {
        Self {
            expected_value,
            hold,
        }
    }

    /// Keep whichever of `self` and `other` the sequential search would keep:
    /// the larger expected value, or on an exact tie, the smaller hold.
    fn max_by_search_order(self, other: Self) -> Self {
        let other_wins = other.expected_value > self.expected_value
            || (other.expected_value == self.expected_value && other.hold < self.hold);
        if other_wins {
            other
        } else {
            self
        }
    }

    pub fn to_row_cells(&self, hand_len: usize) -> [String; 3] {
        [
            self.hold.to_string(),
            (hand_len - self.hold.len()).to_string(),
            format!("{:.4}", self.expected_value),
        ]
    }
}

impl fmt::Display for HoldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hold {} (exp v {:.4})", self.hold, self.expected_value)
    }
}

////////////////////////
// Evaluation Context //
////////////////////////

/// The `Context` carries evaluation state across hold evaluations. The search
/// is still correct without it; the `Context` only adds caching and statistics.
pub struct Context {
    sides: DieSides,
    enumeration: Enumeration,
    /// A cache from (sorted held dice, number of free dice) to expected value.
    /// Holds that are permutations of each other share one entry.
    ev_cache: Cache<(Dice, usize), f64>,
    holds_explored: u64,
    outcomes_scored: u64,
}

impl Context {
    pub fn new(sides: DieSides) -> Self {
        Self {
            sides,
            enumeration: Enumeration::default(),
            ev_cache: Cache::new(),
            holds_explored: 0,
            outcomes_scored: 0,
        }
    }

    pub fn with_enumeration(mut self, enumeration: Enumeration) -> Self {
        self.enumeration = enumeration;
        self
    }

    #[inline]
    pub fn sides(&self) -> DieSides {
        self.sides
    }

    #[inline]
    pub fn enumeration(&self) -> Enumeration {
        self.enumeration
    }

    #[inline]
    pub fn holds_explored(&self) -> u64 {
        self.holds_explored
    }

    /// The number of re-roll outcomes actually scored (cache hits score none).
    #[inline]
    pub fn outcomes_scored(&self) -> u64 {
        self.outcomes_scored
    }

    #[inline]
    pub fn ev_cache(&self) -> &Cache<(Dice, usize), f64> {
        &self.ev_cache
    }

    pub fn expected_value(&mut self, held: Option<&Dice>, nfree: usize) -> f64 {
        let key = (held.map(Dice::sorted).unwrap_or_default(), nfree);

        if let Some(ev) = self.ev_cache.peek_cache(&key) {
            return ev;
        }

        let ev = expected_value_with(self.enumeration, held, self.sides, nfree);
        self.outcomes_scored = self
            .outcomes_scored
            .saturating_add(num_sequences(self.sides.get(), nfree));
        trace!("expected_value: held: {:?}, nfree: {nfree}, ev: {ev}", key.0);

        self.ev_cache.fill_cache(key, ev)
    }

    /// Find the hold with the largest expected value. Starts from re-rolling the
    /// whole hand and only replaces the best on a strictly greater value, so on
    /// exact ties the lexicographically smallest hold wins.
    pub fn best_hold(&mut self, hand: &Dice) -> HoldValue {
        let ndice = hand.len();
        let mut best = HoldValue::new(self.expected_value(None, ndice), Dice::new());

        for hold in all_holds(hand) {
            let ev = self.expected_value(Some(&hold), ndice - hold.len());
            self.holds_explored += 1;
            if ev > best.expected_value {
                best = HoldValue::new(ev, hold);
            }
        }

        debug!("best_hold: hand: {hand}, best: {best}");
        best
    }

    /// Evaluate every hold, sorted from best to worst. Holds with equal values
    /// stay in ascending hold order, so the first entry matches [`Self::best_hold`].
    pub fn holds_by_expected_value(&mut self, hand: &Dice) -> Vec<HoldValue> {
        let ndice = hand.len();

        let mut hold_values = all_holds(hand)
            .into_iter()
            .map(|hold| {
                let ev = self.expected_value(Some(&hold), ndice - hold.len());
                self.holds_explored += 1;
                HoldValue::new(ev, hold)
            })
            .collect::<Vec<_>>();

        // stable sort, descending by value
        hold_values.sort_by(|a, b| b.expected_value.total_cmp(&a.expected_value));
        hold_values
    }
}

/// Compute the hold that maximizes the expected score when the other dice are
/// re-rolled once. Returns `(expected score, dice to hold)`.
pub fn strategy(hand: &Dice, sides: DieSides) -> (f64, Dice) {
    let HoldValue {
        expected_value,
        hold,
    } = Context::new(sides).best_hold(hand);
    (expected_value, hold)
}

/// Like [`strategy`], but evaluates holds across the rayon thread pool. Always
/// picks the same hold and value as the sequential search.
pub fn strategy_par(hand: &Dice, sides: DieSides, enumeration: Enumeration) -> HoldValue {
    let ndice = hand.len();
    let reroll_all = HoldValue::new(
        expected_value_with(enumeration, None, sides, ndice),
        Dice::new(),
    );

    all_holds(hand)
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|hold| {
            let ev = expected_value_with(enumeration, Some(&hold), sides, ndice - hold.len());
            HoldValue::new(ev, hold)
        })
        .reduce(|| reroll_all.clone(), HoldValue::max_by_search_order)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use claim::{assert_ge, assert_gt, assert_le};
    use proptest::prelude::*;

    macro_rules! dice {
        ($($x:expr),* $(,)?) => {
            Dice::from_faces(&[ $( $x ),* ])
        };
    }

    fn d(sides: u32) -> DieSides {
        DieSides::new(sides).unwrap()
    }

    #[test]
    fn test_expected_value_no_free_dice() {
        assert_eq!(0.0, expected_value(None, d(6), 0));
        assert_eq!(0.0, expected_value(Some(&dice![]), d(6), 0));
        assert_eq!(8.0, expected_value(Some(&dice![4, 4]), d(6), 0));
        assert_eq!(9.0, expected_value(Some(&dice![3, 3, 3]), d(6), 0));
        assert_eq!(5.0, expected_value(Some(&dice![1, 2, 3, 4, 5]), d(6), 0));
    }

    #[test]
    fn test_expected_value_one_sided() {
        // rolling n one-sided dice always gives n ones
        for n in 0..=6 {
            assert_eq!(n as f64, expected_value(None, d(1), n));
            assert_eq!(
                n as f64,
                expected_value_with(Enumeration::Multisets, None, d(1), n)
            );
        }
    }

    #[test]
    fn test_expected_value_known() {
        // a single d6
        assert_relative_eq!(3.5, expected_value(None, d(6), 1));

        // two d6: pairs score 2f, everything else scores the larger die
        assert_relative_eq!(182.0 / 36.0, expected_value(None, d(6), 2));

        // holding a 4 and rolling one d6: 4, 4, 4, 8, 5, 6
        assert_relative_eq!(31.0 / 6.0, expected_value(Some(&dice![4]), d(6), 1));

        // order of held dice doesn't matter
        assert_eq!(
            expected_value(Some(&dice![2, 5, 5]), d(6), 2),
            expected_value(Some(&dice![5, 2, 5]), d(6), 2),
        );
    }

    #[test]
    fn test_expected_value_enumerations_agree() {
        for sides in [1, 2, 6, 8] {
            for held in [dice![], dice![1], dice![4, 4], dice![6, 2, 6]] {
                for nfree in 0..=4 {
                    assert_relative_eq!(
                        expected_value_with(Enumeration::Sequences, Some(&held), d(sides), nfree),
                        expected_value_with(Enumeration::Multisets, Some(&held), d(sides), nfree),
                        epsilon = 1e-10,
                    );
                }
            }
        }
    }

    #[test]
    fn test_strategy_pair_of_fours() {
        let (ev, hold) = strategy(&dice![4, 4], d(6));
        assert_eq!(8.0, ev);
        assert_eq!(dice![4, 4], hold);
    }

    #[test]
    fn test_strategy_known() {
        // three 6's beat anything a re-roll could give on average
        let (ev, hold) = strategy(&dice![6, 6, 6, 1, 2], d(6));
        assert_eq!(dice![6, 6, 6], hold);
        assert_gt!(ev, 18.0);

        // the empty hand has only one hold
        assert_eq!((0.0, dice![]), strategy(&dice![], d(6)));

        // a single 1 is worth less than a fresh roll
        assert_eq!((3.5, dice![]), strategy(&dice![1], d(6)));

        // a single 6 can't be beaten by a fresh roll
        assert_eq!((6.0, dice![6]), strategy(&dice![6], d(6)));
    }

    #[test]
    fn test_strategy_ties_pick_smallest_hold() {
        // with one-sided dice every hold is worth the same
        let (ev, hold) = strategy(&dice![1, 1, 1], d(1));
        assert_eq!(3.0, ev);
        assert_eq!(dice![], hold);
    }

    #[test]
    fn test_holds_by_expected_value() {
        let hand = dice![5, 2, 5];
        let mut ctxt = Context::new(d(6));
        let hold_values = ctxt.holds_by_expected_value(&hand);

        assert_eq!(all_holds(&hand).len(), hold_values.len());
        for pair in hold_values.windows(2) {
            assert_ge!(pair[0].expected_value, pair[1].expected_value);
        }

        let best = Context::new(d(6)).best_hold(&hand);
        assert_eq!(best, hold_values[0]);

        // [2, 5] and [5, 2] are the same multiset, so one of them is a cache hit
        assert_ge!(ctxt.ev_cache().cache_hits(), 1);
        assert_le!(ctxt.ev_cache().cache_size(), all_holds(&hand).len());
        assert_eq!(all_holds(&hand).len() as u64, ctxt.holds_explored());
    }

    #[test]
    fn test_context_cache() {
        let mut ctxt = Context::new(d(6));
        let ev1 = ctxt.expected_value(Some(&dice![3, 1]), 2);
        let ev2 = ctxt.expected_value(Some(&dice![1, 3]), 2);
        assert_eq!(ev1, ev2);
        assert_eq!(1, ctxt.ev_cache().cache_hits());
        assert_eq!(1, ctxt.ev_cache().cache_misses());
        assert_eq!(1, ctxt.ev_cache().cache_size());
        assert_eq!(36, ctxt.outcomes_scored());
        assert_relative_eq!(0.5, ctxt.ev_cache().cache_hit_rate());
        assert_gt!(ctxt.ev_cache().cache_size_bytes().as_u64(), 0);
    }

    #[test]
    fn test_score_distribution() {
        let pmf = score_distribution(Some(&dice![4]), d(6), 1);
        assert_relative_eq!(1.0, pmf.total_mass(), epsilon = 1e-12);
        assert_relative_eq!(3.0 / 6.0, pmf.p_score(4), epsilon = 1e-12);
        assert_relative_eq!(1.0 / 6.0, pmf.p_score(8), epsilon = 1e-12);
        assert_eq!(0.0, pmf.p_score(7));
        assert_relative_eq!(
            expected_value(Some(&dice![4]), d(6), 1),
            pmf.expected_value(),
            epsilon = 1e-12,
        );

        let pmf = score_distribution(None, d(6), 0);
        assert_eq!(1.0, pmf.p_score(0));
    }

    #[test]
    fn test_search_cost() {
        assert_eq!(1, search_cost(0, d(6)));
        assert_eq!(7, search_cost(1, d(6)));
        assert_eq!(7_u64.pow(5), search_cost(5, d(6)));
        assert_eq!(256, search_cost(1, d(255)));
        assert_eq!(u64::MAX, search_cost(100, d(6)));

        // matches sum_k C(n, k) * sides^(n - k)
        let exact: f64 = (0..=5)
            .map(|k| crate::binomial(5, k) * num_sequences(6, 5 - k) as f64)
            .sum();
        assert_eq!(exact as u64, search_cost(5, d(6)));

        assert!(check_search_cost(100, 100).is_ok());
        assert_eq!(
            Err(Error::SearchTooLarge {
                outcomes: 101,
                max: 100
            }),
            check_search_cost(101, 100),
        );
    }

    proptest! {
        #[test]
        fn test_strategy_props(hand in any::<Dice>(), sides in 1_u32..=6) {
            let sides = d(sides);
            // faces above the side count are still fine to score
            let (ev, hold) = strategy(&hand, sides);

            // holding nothing is always a candidate
            prop_assert!(ev >= expected_value(None, sides, hand.len()));
            // keeping everything is too
            prop_assert!(ev >= hand.score() as f64);
            prop_assert!(hand.is_superset_of(&hold));
            prop_assert_eq!(ev, expected_value(Some(&hold), sides, hand.len() - hold.len()));

            // idempotent
            prop_assert_eq!((ev, hold.clone()), strategy(&hand, sides));

            // the parallel search picks exactly the same hold
            let par = strategy_par(&hand, sides, Enumeration::Sequences);
            prop_assert_eq!(HoldValue::new(ev, hold), par);
        }
    }
}
