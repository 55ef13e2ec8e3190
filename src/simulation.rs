/*!
# 3. Process overview and scheduling

The model progresses in discrete iterations. In each iteration, every cell
colonized at the start of the iteration is the source of a random number of
jump events. Each jump covers a random distance, and lands in a cell chosen
among all other cells, preferring cells that are well connected to the source
by road and whose distance from the source is close to the jump distance.
Cells reached during an iteration are colonized at its end, so they only start
emitting jumps in the next iteration.

```text
untag all cells
for each source colonized at the start of the iteration, in map order:
    n ~ Poisson(λ · human activity index of the source)
    repeat n times:
        D ~ jump law, negative distances become 0
        destination ~ roulette wheel over all other cells,
                      weight = road weight to source / (1 + |distance − D|)
        tag destination unless it is already colonized
colonize the tagged cells
```
 */

use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::graph::Graph;
use crate::movementgraph::{self, NodeId};
use crate::parameters::{JumpLaw, Parameters};
use crate::prng::Prng;

/// Where a simulation is in its life. States are only ever left forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Initialized,
    Running,
    Scored,
    Finalized,
}

/// The five numbers a calibration driver reads from a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub likelihood: f64,
    pub empty_likelihood: f64,
    pub max_likelihood: f64,
    pub empty_score: f64,
    pub score: f64,
}

impl Scores {
    /// Component-wise mean over several runs.
    pub fn mean(runs: &[Scores]) -> Scores {
        if runs.is_empty() {
            return Scores::default();
        }
        let n = runs.len() as f64;
        let sum = |f: fn(&Scores) -> f64| runs.iter().map(f).sum::<f64>() / n;
        Scores {
            likelihood: sum(|s| s.likelihood),
            empty_likelihood: sum(|s| s.empty_likelihood),
            max_likelihood: sum(|s| s.max_likelihood),
            empty_score: sum(|s| s.empty_score),
            score: sum(|s| s.score),
        }
    }
}

impl std::fmt::Display for Scores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.likelihood, self.empty_likelihood, self.max_likelihood, self.empty_score, self.score
        )
    }
}

pub struct Simulation<'p> {
    parameters: &'p Parameters,
    prng: Prng,
    graph: Graph,
    iteration: u32,
    state: RunState,
}

impl<'p> Simulation<'p> {
    /// Start a run on `graph`, which is brought back to its initial state
    /// first, with the random stream seeded from the parameters.
    pub fn new(mut graph: Graph, parameters: &'p Parameters) -> Result<Simulation<'p>> {
        parameters.validate()?;
        graph.reset_states(parameters);
        Ok(Simulation {
            parameters,
            prng: Prng::new(parameters.prng_seed),
            graph,
            iteration: 0,
            state: RunState::Initialized,
        })
    }

    pub fn get_iteration(&self) -> u32 {
        self.iteration
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// The expected number of jumps leaving a cell.
    fn jump_intensity(&self, human_activity_index: f64) -> f64 {
        let lambda = if self.parameters.human_activity_index {
            self.parameters.lambda * human_activity_index
        } else {
            self.parameters.lambda
        };
        lambda.max(0.0)
    }

    fn draw_number_of_jumps(&mut self, human_activity_index: f64) -> Result<u64> {
        let lambda = self.jump_intensity(human_activity_index);
        self.prng.poisson(lambda)
    }

    /// A jump distance from the jump law. Negative draws mean no displacement.
    pub(crate) fn draw_jump_size(&mut self) -> Result<f64> {
        let p = self.parameters;
        let size = match p.jump_law {
            JumpLaw::Dirac => p.mu,
            JumpLaw::Normal => self.prng.gaussian(p.mu, p.sigma)?,
            JumpLaw::LogNormal => self.prng.lognormal(p.mu, p.sigma)?,
            JumpLaw::Cauchy => self.prng.cauchy(p.mu, p.gamma)?,
        };
        Ok(size.max(0.0))
    }

    /**
    Weight of every cell as the destination of a jump of `jump_size` from
    `source`. The source itself has weight 0. `road_weights` are the weights
    of the direct roads around the source, `distances` the distances from the
    source to every cell.
     */
    fn destination_weights(
        &self,
        source: NodeId,
        road_weights: &rustc_hash::FxHashMap<NodeId, f64>,
        distances: &[f64],
        jump_size: f64,
        weights: &mut Vec<f64>,
    ) -> f64 {
        weights.clear();
        let mut sum = 0.0;
        for (i, distance) in distances.iter().enumerate() {
            let node = NodeId::new(i);
            let w = if node == source {
                0.0
            } else {
                let road = road_weights.get(&node).copied().unwrap_or(self.parameters.wmin);
                road / (1.0 + (distance - jump_size).abs())
            };
            weights.push(w);
            sum += w;
        }
        sum
    }

    /**
    Run one iteration. Iterating a scored simulation is refused; keeping the
    number of iterations within the budget is up to the caller.
     */
    pub fn compute_next_iteration(&mut self) -> Result<()> {
        match self.state {
            RunState::Initialized => self.state = RunState::Running,
            RunState::Running => {}
            RunState::Scored | RunState::Finalized => {
                return Err(ModelError::Lifecycle {
                    action: "iterate",
                    state: self.state,
                })
            }
        }

        self.graph.untag();
        let sources: Vec<(NodeId, f64)> = self
            .graph
            .cells()
            .filter(|(_, cell)| cell.colonized)
            .map(|(node, cell)| (node, cell.human_activity_index))
            .collect();

        let mut jumps = 0;
        let mut dropped = 0;
        let mut weights = Vec::with_capacity(self.graph.number_of_cells());
        for (source, human_activity_index) in sources {
            let n_jumps = self.draw_number_of_jumps(human_activity_index)?;
            if n_jumps == 0 {
                continue;
            }
            let road_weights = movementgraph::road_weights_around(self.graph.network(), source, self.parameters);
            let distances: Vec<f64> = self
                .graph
                .cells()
                .map(|(node, _)| self.graph.compute_euclidean_distance(source, node))
                .collect();
            for _ in 0..n_jumps {
                jumps += 1;
                let jump_size = self.draw_jump_size()?;
                let sum = self.destination_weights(source, &road_weights, &distances, jump_size, &mut weights);
                match self.prng.roulette_wheel(&weights, sum) {
                    // Nowhere to go, the jump is lost.
                    None => dropped += 1,
                    Some(i) => {
                        self.graph.tag(NodeId::new(i));
                    }
                }
            }
        }
        let newly_colonized = self.graph.update_state();
        self.iteration += 1;
        debug!(
            iteration = self.iteration,
            jumps,
            dropped,
            newly_colonized,
            colonized = self.graph.number_of_colonized_cells(),
            "iteration done"
        );
        Ok(())
    }

    /// Score the current state, and the empty map for comparison.
    pub fn compute_score(&mut self) -> Result<Scores> {
        if self.state == RunState::Finalized {
            return Err(ModelError::Lifecycle {
                action: "score",
                state: self.state,
            });
        }
        self.graph.compute_score(false, self.parameters);
        self.graph.compute_score(true, self.parameters);
        self.state = RunState::Scored;
        Ok(self.scores())
    }

    pub fn scores(&self) -> Scores {
        Scores {
            likelihood: self.get_total_log_likelihood(),
            empty_likelihood: self.get_total_log_empty_likelihood(),
            max_likelihood: self.get_total_log_maximum_likelihood(),
            empty_score: self.get_empty_score(),
            score: self.get_score(),
        }
    }

    /// Mark a scored simulation as done, once its results have been written.
    pub fn finalize(&mut self) -> Result<Scores> {
        match self.state {
            RunState::Scored | RunState::Finalized => {
                self.state = RunState::Finalized;
                Ok(self.scores())
            }
            _ => Err(ModelError::Lifecycle {
                action: "finalize",
                state: self.state,
            }),
        }
    }

    pub fn get_total_log_likelihood(&self) -> f64 {
        self.graph.get_total_log_likelihood()
    }

    pub fn get_total_log_empty_likelihood(&self) -> f64 {
        self.graph.get_total_log_empty_likelihood()
    }

    pub fn get_total_log_maximum_likelihood(&self) -> f64 {
        self.graph.get_total_log_maximum_likelihood()
    }

    pub fn get_empty_score(&self) -> f64 {
        self.graph.get_empty_score()
    }

    pub fn get_score(&self) -> f64 {
        self.graph.get_score()
    }
}
