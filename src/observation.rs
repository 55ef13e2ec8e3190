/*!
# Observation

A run can leave a trace in an output folder: the parameters it was run with,
the colonization state before every iteration, the final state, and the
distributions of euclidean distances from the introduction cell to the
observed and to the simulated presences. None of this happens inside the
iteration loop proper; the driver decides when to write.
 */

use serde_derive::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graph::Graph;
use crate::likelihood::Observation;
use crate::parameters::Parameters;
use crate::CellId;

#[derive(Debug, Clone)]
pub struct Settings {
    pub save_outputs: bool,
    pub save_all_states: bool,
    pub output_folder: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            save_outputs: false,
            save_all_states: false,
            output_folder: PathBuf::from("output"),
        }
    }
}

impl Settings {
    /// Settings that write nothing at all.
    pub fn quiet() -> Self {
        Settings::default()
    }

    pub fn writes_anything(&self) -> bool {
        self.save_outputs || self.save_all_states
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.output_folder.join(file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub id: CellId,
    pub x: f64,
    pub y: f64,
    pub colonized: bool,
    pub observed: Observation,
}

/// The colonization state of every cell at one point of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub iteration: u32,
    pub cells: Vec<CellState>,
}

pub fn snapshot(graph: &Graph, iteration: u32) -> StateSnapshot {
    StateSnapshot {
        iteration,
        cells: graph
            .cells()
            .map(|(_, c)| CellState {
                id: c.id,
                x: c.x,
                y: c.y,
                colonized: c.colonized,
                observed: c.observed,
            })
            .collect(),
    }
}

pub fn create_output_folder(settings: &Settings) -> Result<()> {
    fs::create_dir_all(&settings.output_folder)?;
    Ok(())
}

pub fn write_parameters<P: AsRef<Path>>(p: &Parameters, path: P) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), p)?;
    Ok(())
}

pub fn write_state<P: AsRef<Path>>(graph: &Graph, iteration: u32, path: P) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &snapshot(graph, iteration))?;
    Ok(())
}

/**
The euclidean distances from the introduction cell to every cell observed
present, and to every simulated colonized cell.
 */
pub fn invasion_euclidean_distances(graph: &Graph) -> (Vec<f64>, Vec<f64>) {
    let introduction = graph.introduction_node();
    let mut observed = vec![];
    let mut simulated = vec![];
    for (node, cell) in graph.cells() {
        let d = graph.compute_euclidean_distance(introduction, node);
        if cell.observed == Observation::Present {
            observed.push(d);
        }
        if cell.colonized {
            simulated.push(d);
        }
    }
    (observed, simulated)
}

fn write_column<P: AsRef<Path>>(values: &[f64], path: P) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in values {
        writeln!(out, "{}", v)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_invasion_euclidean_distributions<P: AsRef<Path>, Q: AsRef<Path>>(
    graph: &Graph,
    observed_path: P,
    simulated_path: Q,
) -> Result<()> {
    let (observed, simulated) = invasion_euclidean_distances(graph);
    write_column(&observed, observed_path)?;
    write_column(&simulated, simulated_path)
}
