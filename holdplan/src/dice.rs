use crate::{multinomial, Error, TotalSize, DEFAULT_DIE_SIDES};
use itertools::Itertools;
#[cfg(test)]
use proptest::{
    arbitrary::Arbitrary,
    strategy::{BoxedStrategy, Strategy},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, iter::FusedIterator, mem};

//////////////
// DieSides //
//////////////

/// The number of sides on each die. Every die in a hand shares the same side
/// count and rolls uniformly over the faces `1..=sides`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DieSides(u8);

impl DieSides {
    /// Returns an error if `sides` is zero or doesn't fit in a face value.
    pub fn new(sides: u32) -> Result<Self, Error> {
        match u8::try_from(sides) {
            Ok(sides) if sides >= 1 => Ok(Self(sides)),
            _ => Err(Error::InvalidSides(sides)),
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// All the faces a die can land on, `[1, 2, .., sides]`.
    pub fn faces(self) -> Vec<u8> {
        (1..=self.0).collect()
    }

    /// The probability of any one specific outcome sequence when rolling
    /// `nfree` independent dice, `1 / sides^nfree`.
    #[inline]
    pub fn p_sequence(self, nfree: usize) -> f64 {
        (0..nfree).fold(1.0, |p, _| p / (self.0 as f64))
    }
}

impl Default for DieSides {
    fn default() -> Self {
        Self(DEFAULT_DIE_SIDES)
    }
}

impl fmt::Display for DieSides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

//////////////////
// Hand scoring //
//////////////////

/// Returns the upper-section score of a hand: the largest `face * count(face)`
/// over the distinct faces in the hand. An empty hand scores 0.
pub fn score(faces: &[u8]) -> u32 {
    faces
        .iter()
        .counts()
        .into_iter()
        .map(|(&face, count)| (face as u32) * (count as u32))
        .max()
        .unwrap_or(0)
}

//////////
// Dice //
//////////

/// An ordered tuple of die faces. Used for whole hands, for holds drawn from a
/// hand (which keep the hand's positional order), and for outcome sequences.
///
/// Equality and ordering are by value, so two holds with the same faces in the
/// same order are the same hold, no matter which dice they were drawn from.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dice(Vec<u8>);

pub type Hand = Dice;
pub type Hold = Dice;

impl Dice {
    /// A new empty list of dice.
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn from_faces(faces: &[u8]) -> Self {
        Self(faces.to_vec())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    #[inline]
    pub fn score(&self) -> u32 {
        score(&self.0)
    }

    #[inline]
    pub fn max_face(&self) -> Option<u8> {
        self.0.iter().copied().max()
    }

    /// Returns a new list with `face` appended to the end.
    pub fn pushed(&self, face: u8) -> Self {
        let mut faces = Vec::with_capacity(self.len() + 1);
        faces.extend_from_slice(&self.0);
        faces.push(face);
        Self(faces)
    }

    /// Returns the concatenation `self ++ other`.
    pub fn merge(&self, other: &[u8]) -> Self {
        let mut faces = Vec::with_capacity(self.len() + other.len());
        faces.extend_from_slice(&self.0);
        faces.extend_from_slice(other);
        Self(faces)
    }

    /// The same dice in ascending face order. Two holds that are the same
    /// multiset have the same sorted form.
    pub fn sorted(&self) -> Self {
        let mut faces = self.0.clone();
        faces.sort_unstable();
        Self(faces)
    }

    /// Returns `true` if every die in `other` can be matched to a distinct die
    /// in `self`.
    pub fn is_superset_of(&self, other: &Self) -> bool {
        let ours = self.0.iter().counts();
        other
            .0
            .iter()
            .counts()
            .into_iter()
            .all(|(face, count)| ours.get(face).copied().unwrap_or(0) >= count)
    }

    /// Every face must land in `1..=sides`.
    pub fn validate_faces(&self, sides: DieSides) -> Result<(), Error> {
        match self.0.iter().find(|&&face| face == 0 || face > sides.get()) {
            Some(&face) => Err(Error::InvalidFace {
                face,
                sides: sides.get(),
            }),
            None => Ok(()),
        }
    }

    /// Every hold that could be drawn from this hand. See [`all_holds`].
    #[inline]
    pub fn holds(&self) -> BTreeSet<Dice> {
        all_holds(self)
    }
}

impl From<Vec<u8>> for Dice {
    fn from(faces: Vec<u8>) -> Self {
        Self(faces)
    }
}

impl FromIterator<u8> for Dice {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = u8>,
    {
        Self(Vec::from_iter(iter))
    }
}

impl TotalSize for Dice {
    fn total_size(&self) -> usize {
        mem::size_of::<Self>() + self.0.capacity() * mem::size_of::<u8>()
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

impl fmt::Debug for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
impl Arbitrary for Dice {
    type Parameters = ();
    type Strategy = BoxedStrategy<Dice>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        proptest::collection::vec(1_u8..=6, 0..=5)
            .prop_map(Dice::from)
            .boxed()
    }
}

//////////////////////
// Hold enumeration //
//////////////////////

/// Generate every possible choice of dice to hold from `hand`, including the
/// empty hold and the full hand.
///
/// Each hold keeps the positional order of `hand`. Holds that pick different
/// (but equal-valued) dice collapse into one set entry, so there are at most
/// `2^n` holds for a hand of `n` dice.
pub fn all_holds(hand: &Dice) -> BTreeSet<Dice> {
    hand.iter().fold(BTreeSet::from([Dice::new()]), |holds, face| {
        // every hold either skips this die or keeps it
        let with_face = holds
            .iter()
            .map(|hold| hold.pushed(face))
            .collect::<Vec<_>>();
        holds.into_iter().chain(with_face).collect()
    })
}

/////////////////////////
// Outcome enumeration //
/////////////////////////

/// Every ordered sequence of exactly `length` picks from `faces` (with
/// repetition), i.e., the `length`-fold Cartesian power of `faces`.
///
/// `length == 0` produces only the empty sequence.
pub fn all_sequences(faces: &[u8], length: usize) -> BTreeSet<Dice> {
    OutcomeSequences::new(faces, length).collect()
}

/// An `Iterator` over the `faces.len() ^ length` outcome sequences, in odometer
/// order (the last position varies fastest).
#[derive(Clone, Debug)]
pub struct OutcomeSequences {
    faces: Vec<u8>,
    /// index into `faces` for each position of the _next_ sequence we'll output
    idxs: Vec<usize>,
    /// set to `true` when we're done generating.
    done: bool,
}

impl OutcomeSequences {
    pub fn new(faces: &[u8], length: usize) -> Self {
        Self {
            faces: faces.to_vec(),
            idxs: vec![0; length],
            // no faces to pick from means no sequences, except the empty one
            done: faces.is_empty() && length > 0,
        }
    }
}

impl Iterator for OutcomeSequences {
    type Item = Dice;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // this is the sequence we're about to output
        let current = self.idxs.iter().map(|&idx| self.faces[idx]).collect();

        // advance the odometer, carrying into earlier positions
        let nfaces = self.faces.len();
        let mut carried = true;
        for idx in self.idxs.iter_mut().rev() {
            *idx += 1;
            if *idx < nfaces {
                carried = false;
                break;
            }
            *idx = 0;
        }
        // carrying out of the first position means we wrapped around
        self.done = carried;

        Some(current)
    }
}

impl FusedIterator for OutcomeSequences {}

/// An `Iterator` over the distinct outcome _multisets_ from rolling `nfree` dice,
/// each paired with its probability `nfree! / (c_1! * .. * c_s!) / sides^nfree`.
///
/// Each multiset is emitted once, sorted ascending, so this visits
/// `(sides + nfree - 1) choose nfree` outcomes instead of `sides ^ nfree`.
#[derive(Clone, Debug)]
pub struct OutcomeMultisets {
    /// `counts[i]` is the number of dice showing face `i + 1` in the _next_
    /// multiset we'll output.
    counts: Vec<usize>,
    nfree: usize,
    p_sequence: f64,
    /// set to `true` when we're done generating.
    done: bool,
}

impl OutcomeMultisets {
    pub fn new(sides: DieSides, nfree: usize) -> Self {
        // initialize with the very first multiset: [1, 1, .., 1]
        let mut counts = vec![0; sides.get() as usize];
        counts[0] = nfree;

        Self {
            counts,
            nfree,
            p_sequence: sides.p_sequence(nfree),
            done: false,
        }
    }

    fn current(&self) -> (Dice, f64) {
        let outcome = self
            .counts
            .iter()
            .enumerate()
            .flat_map(|(idx, &count)| std::iter::repeat((idx + 1) as u8).take(count))
            .collect();
        let p_outcome = multinomial(&self.counts) * self.p_sequence;
        (outcome, p_outcome)
    }
}

impl Iterator for OutcomeMultisets {
    type Item = (Dice, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // this is the multiset we're about to output
        let current = self.current();

        let last = self.counts.len() - 1;

        // we're done when we finally reach [sides, sides, .., sides]
        if self.counts[last] == self.nfree {
            self.done = true;
        } else {
            // patch self.counts to be the _next_ multiset we'll output
            for i in 0..last {
                let count_i = self.counts[i];
                if count_i > 0 {
                    self.counts[i + 1] += 1;
                    for count_j in &mut self.counts[1..=i] {
                        *count_j = 0;
                    }
                    self.counts[0] = count_i - 1;
                    break;
                }
            }
        }

        Some(current)
    }
}

impl FusedIterator for OutcomeMultisets {}

///////////
// Tests //
///////////

#[cfg(test)]
mod test {
    use super::*;
    use crate::{binomial, num_sequences};
    use approx::assert_relative_eq;
    use claim::{assert_err, assert_ok};
    use proptest::prelude::*;
    use std::collections::HashSet;

    macro_rules! dice {
        ($($x:expr),* $(,)?) => {
            Dice::from_faces(&[ $( $x ),* ])
        };
    }

    #[test]
    fn test_die_sides() {
        assert_err!(DieSides::new(0));
        assert_err!(DieSides::new(256));
        assert_ok!(DieSides::new(1));
        assert_ok!(DieSides::new(255));

        assert_eq!(6, DieSides::default().get());
        assert_eq!(vec![1, 2, 3, 4], DieSides::new(4).unwrap().faces());
        assert_eq!(1.0, DieSides::new(6).unwrap().p_sequence(0));
        assert_relative_eq!(1.0 / 36.0, DieSides::new(6).unwrap().p_sequence(2));
    }

    #[test]
    fn test_score() {
        assert_eq!(0, score(&[]));
        assert_eq!(1, score(&[1]));
        assert_eq!(6, score(&[6]));
        assert_eq!(8, score(&[4, 4]));
        assert_eq!(9, score(&[3, 3, 3]));
        assert_eq!(5, score(&[1, 2, 3, 4, 5]));
        // three 2's tie with a single 6
        assert_eq!(6, score(&[2, 2, 2, 6]));
        // four 1's (4) lose to a single 5
        assert_eq!(5, score(&[1, 1, 1, 1, 5]));
        assert_eq!(12, score(&[6, 1, 6, 1, 1]));
        // faces beyond a standard die still score
        assert_eq!(24, score(&[8, 8, 8, 3]));
    }

    #[test]
    fn test_dice_merge() {
        assert_eq!(dice![], dice![].merge(&[]));
        assert_eq!(dice![1], dice![1].merge(&[]));
        assert_eq!(dice![1], dice![].merge(&[1]));
        assert_eq!(dice![4, 4, 2, 6], dice![4, 4].merge(&[2, 6]));
    }

    #[test]
    fn test_dice_is_superset_of() {
        assert!(dice![].is_superset_of(&dice![]));
        assert!(dice![4, 2, 4].is_superset_of(&dice![4, 4]));
        assert!(dice![4, 2, 4].is_superset_of(&dice![2, 4]));
        assert!(!dice![4, 2, 4].is_superset_of(&dice![2, 2]));
        assert!(!dice![].is_superset_of(&dice![1]));
    }

    #[test]
    fn test_validate_faces() {
        let d6 = DieSides::new(6).unwrap();
        assert_ok!(dice![1, 6, 3].validate_faces(d6));
        assert_ok!(dice![].validate_faces(d6));
        assert_eq!(
            Err(Error::InvalidFace { face: 7, sides: 6 }),
            dice![1, 7].validate_faces(d6),
        );
        assert_err!(dice![0].validate_faces(d6));
    }

    #[test]
    fn test_all_sequences() {
        assert_eq!(BTreeSet::from([dice![]]), all_sequences(&[1, 2, 3], 0));
        assert_eq!(BTreeSet::from([dice![]]), all_sequences(&[], 0));
        assert_eq!(BTreeSet::new(), all_sequences(&[], 2));

        for n in 0..=6 {
            let ones = Dice::from(vec![1_u8; n]);
            assert_eq!(BTreeSet::from([ones]), all_sequences(&[1], n));
        }

        assert_eq!(
            BTreeSet::from([dice![1, 1], dice![1, 2], dice![2, 1], dice![2, 2]]),
            all_sequences(&[1, 2], 2),
        );
    }

    #[test]
    fn test_outcome_sequences_order() {
        assert_eq!(
            vec![
                dice![1, 1],
                dice![1, 2],
                dice![1, 3],
                dice![2, 1],
                dice![2, 2],
                dice![2, 3],
                dice![3, 1],
                dice![3, 2],
                dice![3, 3],
            ],
            OutcomeSequences::new(&[1, 2, 3], 2).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn test_outcome_multisets() {
        let d6 = DieSides::new(6).unwrap();

        for nfree in 0..=5 {
            let multisets = OutcomeMultisets::new(d6, nfree).collect::<Vec<_>>();

            // outputs expected number of elements
            assert_eq!(binomial(6 + nfree - 1, nfree) as usize, multisets.len());

            // no duplicates, and every multiset is sorted
            let unique = multisets
                .iter()
                .map(|(dice, _)| dice.clone())
                .collect::<HashSet<_>>();
            assert_eq!(multisets.len(), unique.len());
            for (dice, _) in &multisets {
                assert_eq!(nfree, dice.len());
                assert_eq!(&dice.sorted(), dice);
            }

            // probabilities sum to one
            assert_relative_eq!(
                1.0,
                multisets.iter().map(|(_, p)| p).sum::<f64>(),
                epsilon = 1e-12,
            );

            // matches the sorted sequences
            let from_sequences = OutcomeSequences::new(&d6.faces(), nfree)
                .map(|dice| dice.sorted())
                .collect::<HashSet<_>>();
            assert_eq!(from_sequences, unique);
        }

        // a one-sided die only has one outcome
        let d1 = DieSides::new(1).unwrap();
        assert_eq!(
            vec![(dice![1, 1, 1], 1.0)],
            OutcomeMultisets::new(d1, 3).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn test_all_holds() {
        assert_eq!(BTreeSet::from([dice![]]), all_holds(&dice![]));
        assert_eq!(BTreeSet::from([dice![], dice![3]]), all_holds(&dice![3]));
        assert_eq!(
            BTreeSet::from([dice![], dice![4], dice![4, 4]]),
            all_holds(&dice![4, 4]),
        );
        assert_eq!(
            BTreeSet::from([
                dice![],
                dice![1],
                dice![2],
                dice![3],
                dice![1, 2],
                dice![1, 3],
                dice![2, 3],
                dice![1, 2, 3],
            ]),
            all_holds(&dice![1, 2, 3]),
        );
        // holds keep the hand's positional order
        // and picking either 5 alone collapses into one hold
        assert_eq!(
            BTreeSet::from([
                dice![],
                dice![2],
                dice![2, 5],
                dice![5],
                dice![5, 2],
                dice![5, 2, 5],
                dice![5, 5],
            ]),
            all_holds(&dice![5, 2, 5]),
        );

        // five distinct dice give every subset
        assert_eq!(32, all_holds(&dice![1, 2, 3, 4, 5]).len());
    }

    // simple recursive implementation: drop one die at a time
    fn all_holds_ref(hand: &Dice) -> BTreeSet<Dice> {
        fn rec(hand: Vec<u8>) -> BTreeSet<Dice> {
            let mut out = BTreeSet::from([Dice::from(hand.clone())]);
            for idx in 0..hand.len() {
                let mut smaller = hand.clone();
                smaller.remove(idx);
                out.extend(rec(smaller));
            }
            out
        }
        rec(hand.as_slice().to_vec())
    }

    proptest! {
        #[test]
        fn test_all_holds_props(hand in any::<Dice>()) {
            let holds = all_holds(&hand);

            prop_assert!(holds.len() <= 1 << hand.len());
            prop_assert!(holds.contains(&Dice::new()));
            prop_assert!(holds.contains(&hand));
            for hold in &holds {
                prop_assert!(hand.is_superset_of(hold));
            }

            prop_assert_eq!(all_holds_ref(&hand), holds);
        }

        #[test]
        fn test_all_sequences_len(nfaces in 1_u8..=6, length in 0_usize..=4) {
            let faces = (1..=nfaces).collect::<Vec<_>>();
            let sequences = all_sequences(&faces, length);
            prop_assert_eq!(num_sequences(nfaces, length) as usize, sequences.len());
            for sequence in &sequences {
                prop_assert_eq!(length, sequence.len());
            }
        }

        #[test]
        fn test_score_matches_max_face_total(hand in any::<Dice>()) {
            let expected = (1..=6_u32)
                .map(|face| face * hand.iter().filter(|&f| f as u32 == face).count() as u32)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(expected, hand.score());
            prop_assert_eq!(hand.score(), hand.sorted().score());
        }
    }
}
