/*!
Model Description
=================

This model description loosely follows the ODD (Overview, Design concept,
Details) protocol (Grimm et al., 2006; Grimm et al., 2010). The overview is
given here, the details live with the modules that implement them.

# 1. Purpose

The model describes how an invasive organism (or a pathogen, or anything else
that hitch-hikes with human traffic) spreads over a landscape by long-distance
jumps along a road network, starting from a single introduction point. Its
purpose is calibration: for a parameter set, it simulates the spread and
scores how well the simulated distribution reproduces a field sample of
presences and absences, so that an optimizer can search for the parameters
that best explain the data.

 */

// Load useful modules

use rayon::prelude::*;
use tracing::info;

pub mod argparse;
pub mod error;
pub mod input;
pub mod likelihood;
pub mod observation;
pub mod parameters;
pub mod prng;

/**
# 2. Entities, state variables, and scales

The landscape is divided into cells, each with an arbitrary unique numerical
identifier, planar coordinates, and a human population. Cells are connected by
roads of six categories. Time is discrete; one iteration stands for one
season of traffic (typically a year).

 */
pub type CellId = i64;

/**
## 2.1 Cells and roads

The geography is an undirected graph, with cells as nodes and roads as edges.
It is constructed before the initialization from the input data.

 */
pub mod movementgraph;

/**
## 2.2 State

Every cell is either susceptible or colonized. Colonization is permanent. The
field sample labels some cells as present or absent; these labels never
change. The graph holds all cells and their state.

 */
pub mod graph;

/**
# 3. Process overview and scheduling

See the `simulation` module for the schedule of an iteration.

 */
pub mod simulation;

pub use error::{ModelError, Result};
pub use graph::Graph;
pub use parameters::Parameters;
pub use simulation::{Scores, Simulation};

/**
# 4. Running the model

A run starts from the loaded graph, iterates until the iteration budget is
used up, and scores the final state. Only this driver loop writes files; the
simulation itself never touches the file system.

 */
pub fn run(graph: Graph, p: &Parameters, o: &observation::Settings) -> Result<Scores> {
    let mut s = Simulation::new(graph, p)?;
    if o.writes_anything() {
        observation::create_output_folder(o)?;
    }
    while s.get_iteration() < p.iterations {
        if o.save_all_states {
            let t = s.get_iteration();
            observation::write_state(s.graph(), t, o.path(&format!("state_{}.json", t)))?;
        }
        s.compute_next_iteration()?;
    }
    let scores = s.compute_score()?;
    if o.save_outputs {
        observation::write_state(s.graph(), s.get_iteration(), o.path("final_state.json"))?;
        observation::write_invasion_euclidean_distributions(
            s.graph(),
            o.path("observed_euclidean_distribution.txt"),
            o.path("simulated_euclidean_distribution.txt"),
        )?;
        s.finalize()?;
    }
    info!(
        colonized = s.graph().number_of_colonized_cells(),
        cells = s.graph().number_of_cells(),
        score = scores.score,
        "run ended"
    );
    Ok(scores)
}

/**
Run every repetition of a parameter set and average their scores.

Repetition `r` is an independent run seeded with `seed + r`, on its own copy
of the graph, so the repetitions can run in parallel. Only the first
repetition writes outputs.
 */
pub fn run_repetitions(graph: &Graph, p: &Parameters, o: &observation::Settings) -> Result<Scores> {
    p.validate()?;
    let runs: Vec<Scores> = (0..p.repetitions)
        .into_par_iter()
        .map(|r| {
            let mut pr = p.clone();
            pr.prng_seed = p.prng_seed.wrapping_add(r as u64);
            if r == 0 {
                run(graph.clone(), &pr, o)
            } else {
                run(graph.clone(), &pr, &observation::Settings::quiet())
            }
        })
        .collect::<Result<Vec<Scores>>>()?;
    Ok(Scores::mean(&runs))
}

#[cfg(test)]
mod tests;
