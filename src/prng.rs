/*!
Random variates

All stochasticity of the model is drawn from one seeded generator per run. The
generator is a ChaCha stream, so the same seed and the same sequence of calls
give the same sequence of draws, independent of the machine the model runs on.

Draws whose distribution parameters can be out of domain return an error
instead of panicking. Callers that validated their parameters beforehand
(like the propagation engine, which gets validated `Parameters`) simply
propagate it.
 */

use rand::distributions::Bernoulli;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Binomial, Cauchy, Distribution, Exp, LogNormal, Normal, Poisson};

use crate::error::{ModelError, Result};

#[derive(Clone, Debug)]
pub struct Prng {
    rng: ChaCha8Rng,
}

fn invalid(what: String) -> ModelError {
    ModelError::Distribution(what)
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        Prng {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A uniform draw from [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// A uniform integer draw from `min..=max`.
    pub fn uniform_int(&mut self, min: i64, max: i64) -> Result<i64> {
        if min > max {
            return Err(invalid(format!("uniform range [{}, {}] is empty", min, max)));
        }
        Ok(self.rng.gen_range(min..=max))
    }

    pub fn bernoulli(&mut self, p: f64) -> Result<bool> {
        let d = Bernoulli::new(p).map_err(|_| invalid(format!("bernoulli p = {}", p)))?;
        Ok(d.sample(&mut self.rng))
    }

    pub fn binomial(&mut self, n: u64, p: f64) -> Result<u64> {
        let d = Binomial::new(n, p)
            .map_err(|_| invalid(format!("binomial n = {}, p = {}", n, p)))?;
        Ok(d.sample(&mut self.rng))
    }

    /**
    Distribute `n` trials over the categories, proportionally to
    `probabilities`, which need not be normalized: `sum` is their total.

    The draw is done category by category, each one a binomial draw
    conditional on the trials and the probability mass left over.

    ```rust
    let mut prng = model::prng::Prng::new(5);
    let draws = prng.multinomial(&[1., 0., 3.], 4., 1000).unwrap();
    assert_eq!(draws.iter().sum::<u64>(), 1000);
    assert_eq!(draws[1], 0);
    ```
     */
    pub fn multinomial(&mut self, probabilities: &[f64], sum: f64, n: u64) -> Result<Vec<u64>> {
        if probabilities.iter().any(|p| !(*p >= 0.0)) || !(sum > 0.0) {
            return Err(invalid(format!(
                "multinomial probabilities {:?} with sum {}",
                probabilities, sum
            )));
        }
        let mut draws = vec![0; probabilities.len()];
        let mut remaining = n;
        let mut mass_left = sum;
        for (k, p) in probabilities.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if *p > 0.0 {
                let conditional = if mass_left > *p { p / mass_left } else { 1.0 };
                draws[k] = self.binomial(remaining, conditional)?;
                remaining -= draws[k];
            }
            mass_left -= p;
        }
        // Rounding in `mass_left` can leave trials over; they go to the last
        // category with mass.
        if remaining > 0 {
            if let Some(k) = probabilities.iter().rposition(|p| *p > 0.0) {
                draws[k] += remaining;
            }
        }
        Ok(draws)
    }

    pub fn gaussian(&mut self, mu: f64, sigma: f64) -> Result<f64> {
        let d = Normal::new(mu, sigma)
            .map_err(|_| invalid(format!("gaussian mu = {}, sigma = {}", mu, sigma)))?;
        Ok(d.sample(&mut self.rng))
    }

    pub fn lognormal(&mut self, mu: f64, sigma: f64) -> Result<f64> {
        let d = LogNormal::new(mu, sigma)
            .map_err(|_| invalid(format!("lognormal mu = {}, sigma = {}", mu, sigma)))?;
        Ok(d.sample(&mut self.rng))
    }

    pub fn cauchy(&mut self, mu: f64, gamma: f64) -> Result<f64> {
        let d = Cauchy::new(mu, gamma)
            .map_err(|_| invalid(format!("cauchy mu = {}, gamma = {}", mu, gamma)))?;
        Ok(d.sample(&mut self.rng))
    }

    /// An exponential draw with the given mean (not rate).
    pub fn exponential(&mut self, mean: f64) -> Result<f64> {
        if !(mean > 0.0) {
            return Err(invalid(format!("exponential mean = {}", mean)));
        }
        let d = Exp::new(1.0 / mean)
            .map_err(|_| invalid(format!("exponential mean = {}", mean)))?;
        Ok(d.sample(&mut self.rng))
    }

    /// A Poisson draw. A mean of zero or less always gives zero events.
    pub fn poisson(&mut self, lambda: f64) -> Result<u64> {
        if lambda <= 0.0 {
            return Ok(0);
        }
        let d = Poisson::new(lambda).map_err(|_| invalid(format!("poisson lambda = {}", lambda)))?;
        Ok(d.sample(&mut self.rng) as u64)
    }

    /**
    Select an index with probability proportional to its weight. `sum` is the
    total of the weights. If there is nothing to select (no positive weight),
    the result is `None`.

    ```rust
    let mut prng = model::prng::Prng::new(1);
    assert_eq!(prng.roulette_wheel(&[0., 0., 0.], 0.), None);
    assert_eq!(prng.roulette_wheel(&[0., 2., 0.], 2.), Some(1));
    ```
     */
    pub fn roulette_wheel(&mut self, weights: &[f64], sum: f64) -> Option<usize> {
        if !(sum > 0.0) {
            return None;
        }
        let last_candidate = weights.iter().rposition(|w| *w > 0.0)?;
        let target = self.uniform() * sum;
        let mut cumulated = 0.0;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            cumulated += w;
            if target < cumulated {
                return Some(i);
            }
        }
        Some(last_candidate)
    }
}
