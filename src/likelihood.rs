/*!
Likelihood of the field observations

A sampled cell was inspected by taking `n` individuals (traps, hosts, …) out of
the cell's population of `N`. If the cell is colonized, a fixed proportion of
its population carries the organism (the introduction prevalence), so the
number of carriers in the sample is hypergeometric and the organism is detected
whenever at least one carrier is sampled. A susceptible cell is never detected.

The probability of the observation at one cell is therefore `q·d` for a
presence and `1 − q·d` for an absence, with `q` the simulated colonization of
the cell and `d` the detection probability. Log-probabilities of impossible
observations are clamped to `LOG_PROBABILITY_FLOOR` instead of −∞, so that one
inconsistent cell does not swamp every other difference between simulations.
 */

use serde_derive::{Deserialize, Serialize};

use crate::parameters::OptimizationFunction;

/// The log-probability given to impossible observations. The natural log of
/// the smallest positive normal double is about −708.
pub const LOG_PROBABILITY_FLOOR: f64 = -700.0;

/// The share of the normalized log-likelihood in the `LIKELIHOOD_LSS` score.
pub const LIKELIHOOD_SHARE: f64 = 0.5;

/// What the field data says about a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Observation {
    Absent,
    Present,
    Unobserved,
}

impl Default for Observation {
    fn default() -> Self {
        Observation::Unobserved
    }
}

pub fn clamped_ln(p: f64) -> f64 {
    if p > 0.0 {
        p.ln().max(LOG_PROBABILITY_FLOOR)
    } else {
        LOG_PROBABILITY_FLOOR
    }
}

/**
ln C(n, k), summed term by term, which is exact enough for the small sample
sizes of field data.

```rust
# use model::likelihood::ln_choose;
assert!((ln_choose(5, 2) - 10f64.ln()).abs() < 1e-12);
assert_eq!(ln_choose(7, 0), 0.);
```
 */
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    let k = k.min(n - k);
    (1..=k)
        .map(|i| ((n - k + i) as f64).ln() - (i as f64).ln())
        .sum()
}

/**
The probability that a sample of `sample_size` individuals taken from a
colonized cell with `population` individuals contains at least one carrier.
A sampled cell holds at least one individual, whatever its recorded
population.

```rust
# use model::likelihood::detection_probability;
assert!((detection_probability(10., 1, 0.5) - 0.5).abs() < 1e-12);
assert_eq!(detection_probability(0., 1, 0.5), 1.);
assert_eq!(detection_probability(10., 0, 0.5), 0.);
assert_eq!(detection_probability(1., 3, 0.1), 1.);
```
 */
pub fn detection_probability(population: f64, sample_size: u64, prevalence: f64) -> f64 {
    let n_population = population.max(1.0).round() as u64;
    let n_sample = sample_size.min(n_population);
    if n_sample == 0 {
        return 0.0;
    }
    let carriers = ((prevalence * n_population as f64).ceil() as u64).max(1).min(n_population);
    let non_carriers = n_population - carriers;
    if non_carriers < n_sample {
        return 1.0;
    }
    let p_missed = (ln_choose(non_carriers, n_sample) - ln_choose(n_population, n_sample)).exp();
    (1.0 - p_missed).max(0.0).min(1.0)
}

/// The probability of the observation at a cell, given whether it is
/// colonized. Unobserved cells do not contribute.
pub fn observation_probability(observed: Observation, colonized: bool, detection: f64) -> Option<f64> {
    let q = if colonized { 1.0 } else { 0.0 };
    match observed {
        Observation::Present => Some(q * detection),
        Observation::Absent => Some(1.0 - q * detection),
        Observation::Unobserved => None,
    }
}

/// The best probability any simulated state can give the observation.
pub fn best_observation_probability(observed: Observation, detection: f64) -> Option<f64> {
    match observed {
        Observation::Present => Some(detection),
        Observation::Absent => Some(1.0),
        Observation::Unobserved => None,
    }
}

/// Accumulates per-cell observation probabilities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub log_likelihood: f64,
    squared_deviation: f64,
    pub sampled_cells: usize,
}

impl Tally {
    /// Add one sampled cell, given the probability of its observation and
    /// the best probability achievable there.
    pub fn add(&mut self, probability: f64, best: f64) {
        self.log_likelihood += clamped_ln(probability);
        self.squared_deviation += (probability - best).powi(2);
        self.sampled_cells += 1;
    }

    /// Mean squared deviation between the observation probabilities and the
    /// best achievable ones.
    pub fn least_square_sum(&self) -> f64 {
        if self.sampled_cells == 0 {
            0.0
        } else {
            self.squared_deviation / self.sampled_cells as f64
        }
    }
}

/**
The log-likelihood rescaled so that the empty map scores 0 and a perfect
reproduction of the data scores 1.

```rust
# use model::likelihood::normalized_log_likelihood;
assert_eq!(normalized_log_likelihood(-10., -10., -2.), 0.);
assert_eq!(normalized_log_likelihood(-2., -10., -2.), 1.);
assert_eq!(normalized_log_likelihood(-6., -10., -2.), 0.5);
```
 */
pub fn normalized_log_likelihood(likelihood: f64, empty: f64, maximum: f64) -> f64 {
    if maximum > empty {
        ((likelihood - empty) / (maximum - empty)).max(0.0).min(1.0)
    } else {
        0.0
    }
}

/// Condense a likelihood triple, and the least square deviation of the same
/// state, into one score.
pub fn optimization_score(
    function: OptimizationFunction,
    likelihood: f64,
    empty: f64,
    maximum: f64,
    least_square_sum: f64,
) -> f64 {
    match function {
        OptimizationFunction::Lss => least_square_sum,
        OptimizationFunction::LogLikelihood => normalized_log_likelihood(likelihood, empty, maximum),
        OptimizationFunction::LikelihoodLss => {
            LIKELIHOOD_SHARE * normalized_log_likelihood(likelihood, empty, maximum)
                + (1.0 - LIKELIHOOD_SHARE) * (1.0 - least_square_sum)
        }
    }
}
