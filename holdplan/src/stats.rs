use claim::{debug_assert_ge, debug_assert_le};
use log::debug;
use ndarray::{Array1, ArrayView1, Zip};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

const EPS: f64 = 1e-10;

//////////////
// ScorePmf //
//////////////

/// A dense probability mass function over hand scores. Index `i` holds
/// `Pr[score = i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScorePmf(Array1<f64>);

impl ScorePmf {
    /// An all-zero PMF with support for every score in `[0, max_score]`.
    pub fn zeros(max_score: u32) -> Self {
        Self(Array1::zeros(max_score as usize + 1))
    }

    /// Build an empirical PMF from per-score sample counts.
    pub fn from_counts(counts: &[usize]) -> Self {
        let n: usize = counts.iter().sum();
        if n == 0 {
            return Self(Array1::zeros(counts.len().max(1)));
        }
        Self(
            counts
                .iter()
                .map(|&count| (count as f64) / (n as f64))
                .collect(),
        )
    }

    #[inline]
    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    #[inline]
    pub fn max_score(&self) -> u32 {
        (self.0.len() - 1) as u32
    }

    pub fn add_mass(&mut self, score: u32, p: f64) {
        let idx = score as usize;
        if idx >= self.0.len() {
            *self = self.resized(score);
        }
        self.0[idx] += p;
    }

    /// `Pr[score = score]`, zero outside the support.
    pub fn p_score(&self, score: u32) -> f64 {
        self.0.get(score as usize).copied().unwrap_or(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.0.sum()
    }

    pub fn expected_value(&self) -> f64 {
        self.iter_nonzero()
            .map(|(score, p)| (score as f64) * p)
            .sum()
    }

    pub fn variance(&self) -> f64 {
        let mean = self.expected_value();
        self.iter_nonzero()
            .map(|(score, p)| {
                let diff = (score as f64) - mean;
                p * diff * diff
            })
            .sum()
    }

    #[inline]
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Iterate over `(score, probability)` for every score with non-zero mass,
    /// in ascending score order.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p > 0.0)
            .map(|(score, &p)| (score as u32, p))
    }

    /// A copy with support extended (or truncated) to `[0, max_score]`.
    pub fn resized(&self, max_score: u32) -> Self {
        let mut out = Self::zeros(max_score);
        let len = self.0.len().min(out.0.len());
        out.0
            .slice_mut(ndarray::s![..len])
            .assign(&self.0.slice(ndarray::s![..len]));
        out
    }

    /// Run a goodness-of-fit test of the observed PMF `self`, built from `n`
    /// samples, against the exact PMF `expected`. Returns the p-value.
    pub fn goodness_of_fit(&self, n: usize, expected: &ScorePmf) -> f64 {
        let max_score = self.max_score().max(expected.max_score());
        let p_hat = self.resized(max_score);
        let p = expected.resized(max_score);
        multinomial_test(n, p.view(), p_hat.view())
    }
}

/////////////////////
// Hypothesis test //
/////////////////////

/// Return true iff `supp(p) ⊆ supp(q)` for dense PMFs `p` and `q`.
pub(crate) fn is_pmf_subset(p: ArrayView1<f64>, q: ArrayView1<f64>) -> bool {
    // (q_i == 0) ==> (p_i == 0)
    Zip::from(p)
        .and(q)
        .all(|&p_i, &q_i| (q_i > 0.0) || (p_i <= 0.0))
}

/// Compute the [KL-divergence](https://www.wikiwand.com/en/Kullback%E2%80%93Leibler_divergence)
/// between dense PMFs `p` and `q`.
///
/// `D_{KL}(p || q) = \sum_i p_i * \ln(p_i / q_i)`
///
/// Note: p's support must be a subset of q's support, i.e., `q_i = 0` implies
///       `p_i = 0`.
pub(crate) fn kl_divergence(p: ArrayView1<f64>, q: ArrayView1<f64>) -> f64 {
    debug_assert!(is_pmf_subset(p, q));

    Zip::from(p)
        .and(q)
        .fold(0.0, |sum, &p_i, &q_i| sum + kl_div_term(p_i, q_i))
}

#[inline]
fn kl_div_term(p_i: f64, q_i: f64) -> f64 {
    if p_i <= EPS {
        0.0
    } else if q_i > EPS {
        p_i * (p_i / q_i).ln()
    } else {
        f64::INFINITY
    }
}

/// The [G-test](https://www.wikiwand.com/en/G-test) statistic, comparing an
/// observed PMF `p_hat` built from `n` samples against an expected PMF `p`.
pub(crate) fn g_test(n: usize, p: ArrayView1<f64>, p_hat: ArrayView1<f64>) -> f64 {
    (n as f64) * (2.0 * kl_divergence(p_hat, p))
}

/// A goodness-of-fit test between a hypothesized multinomial distribution, `p`,
/// and an experimentally observed distribution, `p_hat`, both represented as
/// dense PMFs. `n` is the number of samples taken to construct `p_hat`.
///
/// Returns a p-value, `Pr[G(x) >= g | H_0: x ~ p]`.
pub(crate) fn multinomial_test(n: usize, p: ArrayView1<f64>, p_hat: ArrayView1<f64>) -> f64 {
    // impossible to draw p_hat from p
    if !is_pmf_subset(p_hat, p) {
        return 0.0;
    }

    let nnz = p.iter().filter(|&&x| x > 0.0).count();
    debug_assert_le!(nnz, p.dim());

    // a point mass can only ever produce itself
    if nnz <= 1 {
        return 1.0;
    }
    let dof = (nnz - 1) as f64;
    debug_assert_ge!(dof, 1.0);

    let g = g_test(n, p, p_hat);
    let pvalue = match ChiSquared::new(dof) {
        Ok(chisq) => 1.0 - chisq.cdf(g),
        Err(_) => 0.0,
    };

    debug!(
        "multinomial_test: n: {n}, |p|: {}, dof: {dof}, g: {g}, p-value: {pvalue}",
        p.dim()
    );

    pvalue
}

/// The half-width of a two-sided normal-approximation confidence interval for
/// a sample mean, given the population `stddev`, the number of samples `n`, and
/// the `confidence` level in `(0, 1)`.
pub fn mean_confidence_halfwidth(stddev: f64, n: usize, confidence: f64) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    let z = match Normal::new(0.0, 1.0) {
        Ok(std_normal) => std_normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0),
        Err(_) => f64::NAN,
    };
    z * stddev / (n as f64).sqrt()
}

///////////
// Tests //
///////////
