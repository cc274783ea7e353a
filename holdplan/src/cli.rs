use crate::{
    agent::{self, AgentKind},
    dice::{all_holds, Dice, DieSides},
    num_sequences,
    search::{
        check_search_cost, expected_value_with, score_distribution, search_cost, strategy_par,
        Context, Enumeration, HoldValue,
    },
    stats::mean_confidence_halfwidth,
    DEFAULT_MAX_OUTCOMES, DEFAULT_NUM_TRIALS, DEFAULT_SEED,
};
use log::info;
use serde::Serialize;
use std::{fmt, str::FromStr};
use tabular::{row, Row, Table};
use trice::Instant;

/// Confidence level for the simulated mean's interval.
const CONFIDENCE: f64 = 0.95;

///////////////////////////
// String parser helpers //
///////////////////////////

fn parse_req<T>(label: &'static str, s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    T::from_str(s).map_err(|err| format!("invalid {label}: {err}"))
}

fn parse_opt<T>(label: &'static str, opt_s: Option<&str>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    opt_s
        .map(T::from_str)
        .transpose()
        .map_err(|err| format!("invalid {label}: {err}"))
}

fn enumeration_from_flag(multisets: bool) -> Enumeration {
    if multisets {
        Enumeration::Multisets
    } else {
        Enumeration::Sequences
    }
}

/// Parse the held dice and check them against the die's side count.
fn parse_dice(label: &'static str, s: &str, sides: DieSides) -> Result<Dice, String> {
    let dice: Dice = parse_req(label, s)?;
    dice.validate_faces(sides)
        .map_err(|err| format!("invalid {label}: {err}"))?;
    Ok(dice)
}

//////////////////////
// CLI Args Wrapper //
//////////////////////

pub struct Args(pico_args::Arguments);

impl Args {
    pub fn new(inner: pico_args::Arguments) -> Self {
        Self(inner)
    }

    fn subcommand(&mut self) -> Result<Option<String>, String> {
        self.0.subcommand().map_err(|err| err.to_string())
    }

    fn contains(&mut self, keys: impl Into<pico_args::Keys>) -> bool {
        self.0.contains(keys)
    }

    fn opt_value(&mut self, keys: impl Into<pico_args::Keys>) -> Result<Option<String>, String> {
        self.0
            .opt_value_from_fn(keys, |s| Result::<_, pico_args::Error>::Ok(s.to_owned()))
            .map_err(|err| err.to_string())
    }

    fn free_value(&mut self) -> Result<String, String> {
        self.0
            .free_from_fn(|s| Result::<_, pico_args::Error>::Ok(s.to_owned()))
            .map_err(|err| err.to_string())
    }

    fn expect_finished(self) -> Result<(), String> {
        let remaining = self.0.finish();
        if !remaining.is_empty() {
            Err(format!("unexpected arguments left: '{:?}'", remaining))
        } else {
            Ok(())
        }
    }

    fn maybe_help(&mut self, usage: &str) {
        if self.0.contains(["-h", "--help"]) {
            print!("{}", usage);
            std::process::exit(0);
        }
    }
}

/////////////
// Metrics //
/////////////

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics(pub Vec<(String, String)>);

impl Metrics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((label.into(), value.into()));
        self
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new("{:>}  {:<}");

        for (label, value) in &self.0 {
            table.add_row(row!(label, value));
        }

        table
    }
}

///////////////////
// Command trait //
///////////////////

pub trait Command: Sized {
    const USAGE: &'static str;

    type Output: fmt::Display;

    fn try_from_cli_args(args: Args) -> Result<Self, String>;
    fn run(self) -> Result<Self::Output, String>;
}

//////////////////
// ScoreCommand //
//////////////////

#[derive(Clone, Debug)]
pub struct ScoreCommand {
    dice: Dice,
}

impl Command for ScoreCommand {
    const USAGE: &'static str = "\
holdplan score - score a hand by its best single face total

USAGE:
    holdplan score <dice>

EXAMPLES:
    holdplan score [3,3,3,6,1]
";

    type Output = u32;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let dice = args.free_value()?;
        args.expect_finished()?;

        Ok(Self {
            dice: parse_req("dice", &dice)?,
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        Ok(self.dice.score())
    }
}

//////////////////////////
// ExpectedValueCommand //
//////////////////////////

#[derive(Clone, Debug)]
pub struct ExpectedValueCommand {
    sides: DieSides,
    enumeration: Enumeration,
    held: Dice,
    nfree: usize,
}

impl Command for ExpectedValueCommand {
    const USAGE: &'static str = "\
holdplan expected-value - expected score of holding some dice and re-rolling the rest

USAGE:
    holdplan expected-value [option ...] <held-dice> <num-free-dice>

EXAMPLES:
    holdplan expected-value [4,4] 3
    holdplan expected-value -s 8 --multisets [] 5

OPTIONS:
    · --sides / -s n (default: 6)
      The number of sides on each die.

    · --multisets
      Enumerate each outcome multiset once, weighted by its number of
      orderings, instead of every ordered outcome.
";

    type Output = ExpectedValueCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let sides = args.opt_value(["-s", "--sides"])?;
        let multisets = args.contains("--multisets");
        let held = args.free_value()?;
        let nfree = args.free_value()?;
        args.expect_finished()?;

        let sides = parse_opt("die sides", sides.as_deref())?.unwrap_or_default();
        Ok(Self {
            sides,
            enumeration: enumeration_from_flag(multisets),
            held: parse_dice("held dice", &held, sides)?,
            nfree: parse_req("number of free dice", &nfree)?,
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        let outcomes = num_sequences(self.sides.get(), self.nfree);
        check_search_cost(outcomes, DEFAULT_MAX_OUTCOMES).map_err(|err| err.to_string())?;

        let start_time = Instant::now();
        let expected_value =
            expected_value_with(self.enumeration, Some(&self.held), self.sides, self.nfree);
        let duration = start_time.elapsed();

        let mut metrics = Metrics::new();
        metrics.push("duration", format!("{:.2?}", duration));
        metrics.push("outcomes", outcomes.to_string());

        Ok(ExpectedValueCommandOutput {
            expected_value,
            metrics,
        })
    }
}

pub struct ExpectedValueCommandOutput {
    expected_value: f64,
    metrics: Metrics,
}

impl fmt::Display for ExpectedValueCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\n{}",
            self.expected_value,
            self.metrics.to_table()
        )
    }
}

//////////////////
// HoldsCommand //
//////////////////

#[derive(Clone, Debug)]
pub struct HoldsCommand {
    hand: Dice,
}

impl Command for HoldsCommand {
    const USAGE: &'static str = "\
holdplan holds - list every distinct choice of dice to hold from a hand

USAGE:
    holdplan holds <hand>

EXAMPLES:
    holdplan holds [5,2,5]
";

    type Output = Table;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let hand = args.free_value()?;
        args.expect_finished()?;

        Ok(Self {
            hand: parse_req("hand", &hand)?,
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        let mut table = Table::new("{:>}  {:<}  {:>}").with_row(row!("#", "hold", "score"));

        for (idx, hold) in all_holds(&self.hand).into_iter().enumerate() {
            table.add_row(row!(idx, &hold, hold.score()));
        }

        Ok(table)
    }
}

/////////////////////
// BestHoldCommand //
/////////////////////

#[derive(Clone, Debug)]
pub struct BestHoldCommand {
    sides: DieSides,
    enumeration: Enumeration,
    parallel: bool,
    json: bool,
    max_outcomes: u64,
    hand: Dice,
}

impl BestHoldCommand {
    pub fn try_from_str_args(
        sides: Option<&str>,
        max_outcomes: Option<&str>,
        multisets: bool,
        parallel: bool,
        json: bool,
        hand: &str,
    ) -> Result<Self, String> {
        let sides = parse_opt("die sides", sides)?.unwrap_or_default();
        Ok(Self {
            sides,
            enumeration: enumeration_from_flag(multisets),
            parallel,
            json,
            max_outcomes: parse_opt("max outcomes", max_outcomes)?.unwrap_or(DEFAULT_MAX_OUTCOMES),
            hand: parse_dice("hand", hand, sides)?,
        })
    }
}

impl Command for BestHoldCommand {
    const USAGE: &'static str = "\
holdplan best-hold - find the dice to hold that maximize the expected score

USAGE:
    holdplan best-hold [option ...] <hand>

EXAMPLES:
    holdplan best-hold [4,4]
    holdplan best-hold -s 8 --parallel [1,8,8,3,5,5]

OPTIONS:
    · --sides / -s n (default: 6)
      The number of sides on each die.

    · --parallel
      Evaluate holds across all cores. Only reports the best hold.

    · --multisets
      Enumerate each outcome multiset once instead of every ordered outcome.

    · --json
      Print the result as JSON.

    · --max-outcomes n (default: 50000000)
      Refuse searches that would score more than this many outcomes.
";

    type Output = BestHoldCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let sides = args.opt_value(["-s", "--sides"])?;
        let max_outcomes = args.opt_value("--max-outcomes")?;
        let multisets = args.contains("--multisets");
        let parallel = args.contains("--parallel");
        let json = args.contains("--json");
        let hand = args.free_value()?;
        args.expect_finished()?;

        Self::try_from_str_args(
            sides.as_deref(),
            max_outcomes.as_deref(),
            multisets,
            parallel,
            json,
            &hand,
        )
    }

    fn run(self) -> Result<Self::Output, String> {
        let outcomes = search_cost(self.hand.len(), self.sides);
        check_search_cost(outcomes, self.max_outcomes).map_err(|err| err.to_string())?;
        info!(
            "best-hold: hand: {}, sides: {}, enumeration: {:?}, outcomes: {outcomes}",
            self.hand, self.sides, self.enumeration
        );

        let mut metrics = Metrics::new();

        let hold_values = if self.parallel {
            let start_time = Instant::now();
            let best = strategy_par(&self.hand, self.sides, self.enumeration);
            metrics.push("search duration", format!("{:.2?}", start_time.elapsed()));
            metrics.push("threads", rayon::current_num_threads().to_string());
            vec![best]
        } else {
            let mut ctxt = Context::new(self.sides).with_enumeration(self.enumeration);

            let start_time = Instant::now();
            let hold_values = ctxt.holds_by_expected_value(&self.hand);
            let search_duration = start_time.elapsed();

            metrics.push("search duration", format!("{:.2?}", search_duration));
            metrics.push("holds explored", ctxt.holds_explored().to_string());
            metrics.push("outcomes scored", ctxt.outcomes_scored().to_string());
            metrics.push(
                "ev cache size",
                format!(
                    "{} ({})",
                    ctxt.ev_cache().cache_size(),
                    ctxt.ev_cache().cache_size_bytes(),
                ),
            );
            metrics.push(
                "ev cache hit rate",
                format!(
                    "{:0.3} (h: {}, m: {})",
                    ctxt.ev_cache().cache_hit_rate(),
                    ctxt.ev_cache().cache_hits(),
                    ctxt.ev_cache().cache_misses(),
                ),
            );
            hold_values
        };

        if self.json {
            let json = BestHoldJson {
                hand: &self.hand,
                sides: self.sides.get(),
                best: &hold_values[0],
                holds: &hold_values,
            };
            let json = serde_json::to_string_pretty(&json).map_err(|err| err.to_string())?;
            return Ok(BestHoldCommandOutput::Json(json));
        }

        Ok(BestHoldCommandOutput::Table {
            hand_len: self.hand.len(),
            hold_values: HoldValuesTable(hold_values),
            metrics,
        })
    }
}

#[derive(Serialize)]
struct BestHoldJson<'a> {
    hand: &'a Dice,
    sides: u8,
    best: &'a HoldValue,
    holds: &'a [HoldValue],
}

fn row_from_cells(cells: impl Iterator<Item = String>) -> Row {
    let mut row = Row::new();
    for cell in cells {
        row.add_cell(cell);
    }
    row
}

#[derive(Clone, Default)]
pub struct HoldValuesTable(pub Vec<HoldValue>);

impl HoldValuesTable {
    fn to_table(&self, hand_len: usize) -> Table {
        let mut table = Table::new("{:>}  {:>}  {:>}").with_row(row!(
            format!("{:>12}", "hold"),
            "rerolled",
            "exp v"
        ));

        let len = self.0.len();
        for hold_value in self.0.iter().take(10) {
            let row = row_from_cells(hold_value.to_row_cells(hand_len).into_iter());
            table.add_row(row);
        }

        // we only show the top 10 results, but display '...' to show that
        // there were more.
        if len > 10 {
            table.add_row(row!("...", format!("(+ {})", len - 10), ""));
        }

        table
    }
}

pub enum BestHoldCommandOutput {
    Table {
        hand_len: usize,
        hold_values: HoldValuesTable,
        metrics: Metrics,
    },
    Json(String),
}

impl fmt::Display for BestHoldCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table {
                hand_len,
                hold_values,
                metrics,
            } => write!(
                f,
                "\n{}\n{}",
                hold_values.to_table(*hand_len),
                metrics.to_table()
            ),
            Self::Json(json) => f.write_str(json),
        }
    }
}

///////////////////////
// ScoreDistrCommand //
///////////////////////

#[derive(Clone, Debug)]
pub struct ScoreDistrCommand {
    sides: DieSides,
    held: Dice,
    nfree: usize,
}

impl Command for ScoreDistrCommand {
    const USAGE: &'static str = "\
holdplan score-distr - compute the full score PMF after holding some dice and re-rolling the rest

USAGE:
    holdplan score-distr [option ...] <held-dice> <num-free-dice>

EXAMPLES:
    holdplan score-distr [4,4] 3

OPTIONS:
    · --sides / -s n (default: 6)
      The number of sides on each die.
";

    type Output = ScoreDistrCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let sides = args.opt_value(["-s", "--sides"])?;
        let held = args.free_value()?;
        let nfree = args.free_value()?;
        args.expect_finished()?;

        let sides = parse_opt("die sides", sides.as_deref())?.unwrap_or_default();
        Ok(Self {
            sides,
            held: parse_dice("held dice", &held, sides)?,
            nfree: parse_req("number of free dice", &nfree)?,
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        let outcomes = num_sequences(self.sides.get(), self.nfree);
        check_search_cost(outcomes, DEFAULT_MAX_OUTCOMES).map_err(|err| err.to_string())?;

        let start_time = Instant::now();
        let score_pmf = score_distribution(Some(&self.held), self.sides, self.nfree);
        let search_duration = start_time.elapsed();

        let mut table = Table::new("{:>}  {:<}").with_row(row!("score", "pmf"));
        for (score, p) in score_pmf.iter_nonzero() {
            table.add_row(row!(score, format!("{:0.6}", p)));
        }

        let mut metrics = Metrics::new();
        metrics.push("search duration", format!("{:.2?}", search_duration));
        metrics.push("pmf total mass", format!("{}", score_pmf.total_mass()));
        metrics.push("pmf expected value", format!("{:0.4}", score_pmf.expected_value()));
        metrics.push("pmf stddev", format!("{:0.4}", score_pmf.stddev()));

        Ok(ScoreDistrCommandOutput { table, metrics })
    }
}

pub struct ScoreDistrCommandOutput {
    table: Table,
    metrics: Metrics,
}

impl fmt::Display for ScoreDistrCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{}\n{}", self.table, self.metrics.to_table())
    }
}

/////////////////////
// SimulateCommand //
/////////////////////

#[derive(Clone, Debug)]
pub struct SimulateCommand {
    sides: DieSides,
    num_trials: usize,
    seed: u64,
    agent: AgentKind,
    hand: Dice,
}

impl Command for SimulateCommand {
    const USAGE: &'static str = "\
holdplan simulate - play many seeded turns from a hand and compare against the exact distribution

USAGE:
    holdplan simulate [option ...] <hand>

EXAMPLES:
    holdplan simulate [4,4,1,2,3]
    holdplan simulate -n 100000 --agent reroll-all [6,6,1]

OPTIONS:
    · --sides / -s n (default: 6)
      The number of sides on each die.

    · --trials / -n n (default: 10000)
      The number of turns to play.

    · --seed n
      Seed for the dice RNG.

    · --agent optimal|hold-all|reroll-all (default: optimal)
      How to choose which dice to hold.
";

    type Output = SimulateCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let sides = args.opt_value(["-s", "--sides"])?;
        let num_trials = args.opt_value(["-n", "--trials"])?;
        let seed = args.opt_value("--seed")?;
        let agent = args.opt_value("--agent")?;
        let hand = args.free_value()?;
        args.expect_finished()?;

        let sides = parse_opt("die sides", sides.as_deref())?.unwrap_or_default();
        Ok(Self {
            sides,
            num_trials: parse_opt("number of trials", num_trials.as_deref())?
                .unwrap_or(DEFAULT_NUM_TRIALS),
            seed: parse_opt("seed", seed.as_deref())?.unwrap_or(DEFAULT_SEED),
            agent: parse_opt("agent", agent.as_deref())?.unwrap_or_default(),
            hand: parse_dice("hand", &hand, sides)?,
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        if self.agent == AgentKind::Optimal {
            let outcomes = search_cost(self.hand.len(), self.sides);
            check_search_cost(outcomes, DEFAULT_MAX_OUTCOMES).map_err(|err| err.to_string())?;
        }

        let mut hold_agent = self.agent.into_agent(self.sides, Enumeration::Multisets);
        let hold = hold_agent.choose_hold(&self.hand);
        let nfree = self.hand.len() - hold.len();
        check_search_cost(num_sequences(self.sides.get(), nfree), DEFAULT_MAX_OUTCOMES)
            .map_err(|err| err.to_string())?;
        let exact_pmf = score_distribution(Some(&hold), self.sides, nfree);

        let start_time = Instant::now();
        let sample_pmf = agent::simulate(
            hold_agent.as_mut(),
            &self.hand,
            self.sides,
            self.num_trials,
            self.seed,
        );
        let sim_duration = start_time.elapsed();

        let exact_mean = exact_pmf.expected_value();
        let sample_mean = sample_pmf.expected_value();
        let halfwidth = mean_confidence_halfwidth(exact_pmf.stddev(), self.num_trials, CONFIDENCE);

        let mut table = Table::new("{:>}  {:<}  {:<}").with_row(row!("score", "exact", "sampled"));
        let max_score = exact_pmf.max_score().max(sample_pmf.max_score());
        for score in 0..=max_score {
            let (p, p_hat) = (exact_pmf.p_score(score), sample_pmf.p_score(score));
            if p > 0.0 || p_hat > 0.0 {
                table.add_row(row!(score, format!("{:0.6}", p), format!("{:0.6}", p_hat)));
            }
        }

        let mut metrics = Metrics::new();
        metrics.push("agent", self.agent.to_string());
        metrics.push("hold", hold.to_string());
        metrics.push("trials", self.num_trials.to_string());
        metrics.push("simulation duration", format!("{:.2?}", sim_duration));
        metrics.push("exact mean", format!("{:0.4}", exact_mean));
        metrics.push(
            "sample mean",
            format!(
                "{:0.4} ± {:0.4} ({}% confidence)",
                sample_mean,
                halfwidth,
                CONFIDENCE * 100.0
            ),
        );
        metrics.push(
            "goodness of fit p-value",
            format!("{:0.4}", sample_pmf.goodness_of_fit(self.num_trials, &exact_pmf)),
        );

        Ok(SimulateCommandOutput { table, metrics })
    }
}

pub struct SimulateCommandOutput {
    table: Table,
    metrics: Metrics,
}

impl fmt::Display for SimulateCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{}\n{}", self.table, self.metrics.to_table())
    }
}

/////////////////
// BaseCommand //
/////////////////

#[derive(Debug)]
pub enum BaseCommand {
    Score(ScoreCommand),
    ExpectedValue(ExpectedValueCommand),
    Holds(HoldsCommand),
    BestHold(BestHoldCommand),
    ScoreDistr(ScoreDistrCommand),
    Simulate(SimulateCommand),
}

impl Command for BaseCommand {
    const USAGE: &'static str = "\
holdplan - choose which dice to hold for the Yahtzee upper section

USAGE:
    holdplan [option ...] <subcommand>

OPTIONS:
    · --verbose / -v
      Log debug output to stderr. The HOLDPLAN_LOG environment variable
      (error, warn, info, debug, trace) sets the level otherwise.

SUBCOMMANDS:
    · holdplan score - score a hand by its best single face total
    · holdplan expected-value - expected score of holding some dice and re-rolling the rest
    · holdplan holds - list every distinct choice of dice to hold from a hand
    · holdplan best-hold - find the dice to hold that maximize the expected score
    · holdplan score-distr - compute the full score PMF for a hold
    · holdplan simulate - play many seeded turns and compare against the exact distribution
";

    type Output = String;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        let maybe_subcommand = args.subcommand()?;

        match maybe_subcommand.as_deref() {
            Some("score") => Ok(Self::Score(ScoreCommand::try_from_cli_args(args)?)),
            Some("expected-value") => Ok(Self::ExpectedValue(
                ExpectedValueCommand::try_from_cli_args(args)?,
            )),
            Some("holds") => Ok(Self::Holds(HoldsCommand::try_from_cli_args(args)?)),
            Some("best-hold") => Ok(Self::BestHold(BestHoldCommand::try_from_cli_args(args)?)),
            Some("score-distr") => Ok(Self::ScoreDistr(ScoreDistrCommand::try_from_cli_args(
                args,
            )?)),
            Some("simulate") => Ok(Self::Simulate(SimulateCommand::try_from_cli_args(args)?)),
            Some(command) => Err(format!("'{}' is not a recognized command", command)),
            None => {
                args.maybe_help(Self::USAGE);
                Err("no subcommand specified".to_string())
            }
        }
    }

    fn run(self) -> Result<String, String> {
        match self {
            Self::Score(cmd) => cmd.run().map(|out| out.to_string()),
            Self::ExpectedValue(cmd) => cmd.run().map(|out| out.to_string()),
            Self::Holds(cmd) => cmd.run().map(|out| out.to_string()),
            Self::BestHold(cmd) => cmd.run().map(|out| out.to_string()),
            Self::ScoreDistr(cmd) => cmd.run().map(|out| out.to_string()),
            Self::Simulate(cmd) => cmd.run().map(|out| out.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use claim::{assert_err, assert_ok};
    use std::ffi::OsString;

    fn run_cli(args: &[&str]) -> Result<String, String> {
        let args = args.iter().map(OsString::from).collect::<Vec<_>>();
        BaseCommand::try_from_cli_args(Args::new(pico_args::Arguments::from_vec(args)))
            .and_then(BaseCommand::run)
    }

    #[test]
    fn test_score_command() {
        assert_eq!(Ok("9".to_string()), run_cli(&["score", "[3,3,3,6,1]"]));
        assert_eq!(Ok("0".to_string()), run_cli(&["score", "[]"]));
        assert_err!(run_cli(&["score", "[0]"]));
        assert_err!(run_cli(&["score"]));
        assert_err!(run_cli(&["score", "[1]", "[2]"]));
    }

    #[test]
    fn test_expected_value_command() {
        let out = run_cli(&["expected-value", "[]", "1"]).unwrap();
        assert!(out.starts_with("3.5\n"), "{out}");

        let out = run_cli(&["expected-value", "--multisets", "-s", "1", "[1]", "3"]).unwrap();
        assert!(out.starts_with("4\n"), "{out}");

        // face 7 doesn't exist on a d6
        assert_err!(run_cli(&["expected-value", "[7]", "1"]));
        assert_err!(run_cli(&["expected-value", "-s", "0", "[]", "1"]));
        assert_err!(run_cli(&["expected-value", "[]", "-1"]));
        // 6^20 outcomes is too many
        assert_err!(run_cli(&["expected-value", "[]", "20"]));
    }

    #[test]
    fn test_holds_command() {
        let out = run_cli(&["holds", "[5,2,5]"]).unwrap();
        // header + 7 distinct holds
        assert_eq!(8, out.lines().count());
    }

    #[test]
    fn test_best_hold_command() {
        let out = run_cli(&["best-hold", "--json", "[4,4]"]).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(8.0, json["best"]["expected_value"]);
        assert_eq!(serde_json::json!([4, 4]), json["best"]["hold"]);
        // [], [4], [4, 4]
        assert_eq!(3, json["holds"].as_array().unwrap().len());

        let out = run_cli(&["best-hold", "--parallel", "--json", "[4,4]"]).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(8.0, json["best"]["expected_value"]);

        assert_ok!(run_cli(&["best-hold", "-s", "8", "--multisets", "[1,8,8,3]"]));
        assert_err!(run_cli(&["best-hold", "--max-outcomes", "10", "[1,2,3]"]));
        assert_err!(run_cli(&["best-hold", "--sides", "4", "[5]"]));
    }

    #[test]
    fn test_score_distr_command() {
        assert_ok!(run_cli(&["score-distr", "[4]", "2"]));
        assert_err!(run_cli(&["score-distr", "[4]"]));
    }

    #[test]
    fn test_simulate_command() {
        assert_ok!(run_cli(&["simulate", "-n", "200", "[4,4,1]"]));
        assert_ok!(run_cli(&[
            "simulate", "--agent", "reroll-all", "--seed", "7", "-n", "50", "[6,6,1]"
        ]));
        assert_err!(run_cli(&["simulate", "--agent", "greedy", "[1]"]));

        // re-rolling a huge hand has too many outcomes to score exactly
        let huge_hand = format!("[{}]", vec!["1"; 40].join(","));
        assert_err!(run_cli(&["simulate", "--agent", "reroll-all", &huge_hand]));
        // holding everything leaves nothing to re-roll
        assert_ok!(run_cli(&["simulate", "--agent", "hold-all", "-n", "1", &huge_hand]));
    }

    #[test]
    fn test_unknown_command() {
        assert_err!(run_cli(&["best-action", "[1]"]));
        assert_err!(run_cli(&[]));
    }
}
