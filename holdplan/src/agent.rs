use crate::{
    dice::{Dice, DieSides},
    search::{Context, Enumeration},
    stats::ScorePmf,
};
use log::trace;
use rand::{distributions::Uniform, Rng, SeedableRng};
use rand_xoshiro::Xoroshiro64Star;
use std::{fmt, str::FromStr};

///////////
// Agent //
///////////

/// Something that decides which dice to hold before the re-roll.
pub trait Agent {
    /// Return the dice to hold. Must be a sub-multiset of `hand`.
    fn choose_hold(&mut self, hand: &Dice) -> Dice;
}

/// Holds whatever maximizes the expected score.
pub struct OptimalHoldAgent {
    context: Context,
}

impl OptimalHoldAgent {
    pub fn new(sides: DieSides, enumeration: Enumeration) -> Self {
        Self {
            context: Context::new(sides).with_enumeration(enumeration),
        }
    }
}

impl Agent for OptimalHoldAgent {
    fn choose_hold(&mut self, hand: &Dice) -> Dice {
        self.context.best_hold(hand).hold
    }
}

/// Never re-rolls anything.
pub struct HoldAllAgent;

impl Agent for HoldAllAgent {
    fn choose_hold(&mut self, hand: &Dice) -> Dice {
        hand.clone()
    }
}

/// Always re-rolls the whole hand.
pub struct RerollAllAgent;

impl Agent for RerollAllAgent {
    fn choose_hold(&mut self, _hand: &Dice) -> Dice {
        Dice::new()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AgentKind {
    #[default]
    Optimal,
    HoldAll,
    RerollAll,
}

impl AgentKind {
    pub fn into_agent(self, sides: DieSides, enumeration: Enumeration) -> Box<dyn Agent> {
        match self {
            Self::Optimal => Box::new(OptimalHoldAgent::new(sides, enumeration)),
            Self::HoldAll => Box::new(HoldAllAgent),
            Self::RerollAll => Box::new(RerollAllAgent),
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimal" => Ok(Self::Optimal),
            "hold-all" => Ok(Self::HoldAll),
            "reroll-all" => Ok(Self::RerollAll),
            _ => Err(format!(
                "unrecognized agent '{}': expected one of 'optimal', 'hold-all', 'reroll-all'",
                s
            )),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "optimal",
            Self::HoldAll => "hold-all",
            Self::RerollAll => "reroll-all",
        };
        f.write_str(s)
    }
}

////////////////
// TurnRunner //
////////////////

/// Plays out single turns with real dice rolls: the agent picks a hold, the
/// free dice are re-rolled once, and the final hand is scored.
pub struct TurnRunner<R> {
    rng: R,
    faces: Uniform<u8>,
}

impl<R: Rng> TurnRunner<R> {
    pub fn new(rng: R, sides: DieSides) -> Self {
        Self {
            rng,
            faces: Uniform::new_inclusive(1, sides.get()),
        }
    }

    pub fn roll_dice(&mut self, ndice: usize) -> Dice {
        (&mut self.rng).sample_iter(&self.faces).take(ndice).collect()
    }

    /// Play one turn starting from `hand` and return the final score.
    pub fn run_turn(&mut self, agent: &mut dyn Agent, hand: &Dice) -> u32 {
        let hold = agent.choose_hold(hand);
        debug_assert!(hand.is_superset_of(&hold));

        let rolled = self.roll_dice(hand.len() - hold.len());
        let final_hand = hold.merge(rolled.as_slice());
        trace!("run_turn: hand: {hand}, hold: {hold}, final: {final_hand}");
        final_hand.score()
    }

    /// Play `num_trials` turns from the same starting `hand` and collect the
    /// empirical score distribution.
    pub fn sample_score_distr(
        &mut self,
        agent: &mut dyn Agent,
        hand: &Dice,
        num_trials: usize,
    ) -> ScorePmf {
        let mut counts = Vec::<usize>::new();
        for _ in 0..num_trials {
            let score = self.run_turn(agent, hand) as usize;
            if score >= counts.len() {
                counts.resize(score + 1, 0);
            }
            counts[score] += 1;
        }
        ScorePmf::from_counts(&counts)
    }
}

/// Play `num_trials` seeded turns from `hand` with `agent` and return the
/// empirical score distribution.
pub fn simulate(
    agent: &mut dyn Agent,
    hand: &Dice,
    sides: DieSides,
    num_trials: usize,
    seed: u64,
) -> ScorePmf {
    let rng = Xoroshiro64Star::seed_from_u64(seed);
    time!("simulate", {
        TurnRunner::new(rng, sides).sample_score_distr(agent, hand, num_trials)
    })
}

///////////
// Tests //
///////////
