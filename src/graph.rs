/*!
The spatial graph

The graph owns every cell of the map, the roads between them, the aggregate
statistics of the map, and the results of the last scoring.
 */

use itertools::{Itertools, MinMaxResult};
use rustc_hash::FxHashMap;
use serde_derive::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ModelError, Result};
use crate::input::{CellRecord, RoadRecord, SampleRecord};
use crate::likelihood::{self, Observation, Tally};
use crate::movementgraph::{self, NodeId, RoadNetwork};
use crate::parameters::{Parameters, TypeOfData};
use crate::CellId;

/**
A cell is the atomic unit of space. Its geography is fixed at load time, the
observation comes from field data and never changes, and the colonization
state evolves with the simulation.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub x: f64,
    pub y: f64,
    pub population: f64,
    pub population_density: f64,
    pub road_density: f64,
    /// Relative intensity of human activity in [0, 1], derived from the
    /// population and road densities.
    pub human_activity_index: f64,
    pub observed: Observation,
    /// Number of individuals inspected, for sampled cells.
    pub sample_size: u64,
    pub colonized: bool,
    /// Set on cells colonized during the current iteration, until the
    /// iteration is committed.
    pub tagged: bool,
}

impl From<&CellRecord> for Cell {
    fn from(r: &CellRecord) -> Self {
        Cell {
            id: r.id,
            x: r.x,
            y: r.y,
            population: r.population,
            population_density: r.population_density,
            road_density: r.road_density,
            human_activity_index: 0.0,
            observed: Observation::Unobserved,
            sample_size: 0,
            colonized: false,
            tagged: false,
        }
    }
}

/// Minimum, mean and maximum of one attribute over all cells.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Summary {
        let (min, max) = match values
            .iter()
            .copied()
            .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            MinMaxResult::NoElements => return Summary::default(),
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::MinMax(a, b) => (a, b),
        };
        Summary {
            min,
            mean: values.iter().sum::<f64>() / values.len() as f64,
            max,
        }
    }

    /// Min–max normalization of a value of this attribute. An attribute that
    /// is the same everywhere normalizes to 1.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max > self.min {
            ((value - self.min) / (self.max - self.min)).max(0.0).min(1.0)
        } else {
            1.0
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub x: Summary,
    pub y: Summary,
    pub weights_sum: Summary,
    pub population: Summary,
    pub population_density: Summary,
    pub road_density: Summary,
}

/// The likelihoods that do not depend on the simulated state, and the
/// parameters they were computed for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Baseline {
    type_of_data: TypeOfData,
    p_introduction: f64,
    empty: Tally,
    maximum: Tally,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    network: RoadNetwork,
    index: FxHashMap<CellId, NodeId>,
    statistics: Statistics,
    introduction: NodeId,
    baseline: Option<Baseline>,

    total_log_likelihood: f64,
    total_log_empty_likelihood: f64,
    total_log_maximum_likelihood: f64,
    empty_score: f64,
    score: f64,
}

pub fn euclidean_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

impl Graph {
    /**
    Build the graph from the map, the road network and the field sample, and
    prepare it for a run with the given parameters.

    Roads and samples must only refer to cells of the map. Under
    presence-only data, absences in the sample are kept on the cells but are
    not evidence, so scoring ignores them.
     */
    pub fn new(
        cells: &[CellRecord],
        roads: &[RoadRecord],
        sample: &[SampleRecord],
        p: &Parameters,
    ) -> Result<Graph> {
        if cells.is_empty() {
            return Err(ModelError::EmptyMap);
        }
        let mut network = RoadNetwork::default();
        let mut index: FxHashMap<CellId, NodeId> = FxHashMap::default();
        for record in cells {
            if index.contains_key(&record.id) {
                return Err(ModelError::DuplicateCell(record.id));
            }
            if !(record.population >= 0.) {
                return Err(ModelError::InvalidPopulation {
                    id: record.id,
                    population: record.population,
                });
            }
            index.insert(record.id, network.add_node(Cell::from(record)));
        }
        for road in roads {
            let a = *index.get(&road.from).ok_or(ModelError::UnknownCell {
                context: "the network",
                id: road.from,
            })?;
            let b = *index.get(&road.to).ok_or(ModelError::UnknownCell {
                context: "the network",
                id: road.to,
            })?;
            network.add_edge(a, b, road.category);
        }
        let mut ignored_absences = 0;
        let mut unpopulated = 0;
        for s in sample {
            let node = *index.get(&s.id).ok_or(ModelError::UnknownCell {
                context: "the sample",
                id: s.id,
            })?;
            let cell = &mut network[node];
            if cell.observed != Observation::Unobserved {
                warn!(cell = s.id, "cell sampled twice, keeping the first observation");
                continue;
            }
            if s.label == Observation::Absent && p.type_of_data == TypeOfData::PresenceOnly {
                ignored_absences += 1;
            }
            if cell.population < 1. {
                unpopulated += 1;
            }
            cell.observed = s.label;
            cell.sample_size = s.sample_size;
        }
        if unpopulated > 0 {
            warn!(unpopulated, "sampled cells without population are taken to hold one individual");
        }
        if ignored_absences > 0 {
            warn!(ignored_absences, "absences are not evidence in presence-only data and will not be scored");
        }
        info!(
            cells = network.node_count(),
            roads = network.edge_count(),
            sampled = network.node_weights().filter(|c| c.observed != Observation::Unobserved).count(),
            "graph loaded"
        );

        let mut graph = Graph {
            network,
            index,
            statistics: Statistics::default(),
            introduction: NodeId::new(0),
            baseline: None,
            total_log_likelihood: 0.0,
            total_log_empty_likelihood: 0.0,
            total_log_maximum_likelihood: 0.0,
            empty_score: 0.0,
            score: 0.0,
        };
        graph.reset_states(p);
        Ok(graph)
    }

    /**
    Bring the graph back to the state at the start of a run: statistics
    recomputed for these parameters, nothing colonized but the introduction
    cell, no scores.
     */
    pub fn reset_states(&mut self, p: &Parameters) {
        self.compute_statistics(p);
        self.compute_human_activity_index();
        for cell in self.network.node_weights_mut() {
            cell.colonized = false;
            cell.tagged = false;
        }
        self.baseline = None;
        self.total_log_likelihood = 0.0;
        self.total_log_empty_likelihood = 0.0;
        self.total_log_maximum_likelihood = 0.0;
        self.empty_score = 0.0;
        self.score = 0.0;
        self.set_introduction_node(p);
    }

    fn compute_statistics(&mut self, p: &Parameters) {
        let network = &self.network;
        let attribute = |f: fn(&Cell) -> f64| -> Vec<f64> { network.node_weights().map(f).collect() };
        let weights_sums: Vec<f64> = network
            .node_indices()
            .map(|n| movementgraph::weights_sum(network, n, p))
            .collect();
        self.statistics = Statistics {
            x: Summary::of(&attribute(|c| c.x)),
            y: Summary::of(&attribute(|c| c.y)),
            weights_sum: Summary::of(&weights_sums),
            population: Summary::of(&attribute(|c| c.population)),
            population_density: Summary::of(&attribute(|c| c.population_density)),
            road_density: Summary::of(&attribute(|c| c.road_density)),
        };
    }

    /**
    The human activity index is the mean of the normalized population
    density and the normalized road density, so it grows with both and stays
    within [0, 1].
     */
    fn compute_human_activity_index(&mut self) {
        let population_density = self.statistics.population_density;
        let road_density = self.statistics.road_density;
        for cell in self.network.node_weights_mut() {
            cell.human_activity_index = 0.5 * population_density.normalize(cell.population_density)
                + 0.5 * road_density.normalize(cell.road_density);
        }
    }

    fn get_introduction_node_from_coordinates(&self, p: &Parameters) -> NodeId {
        let mut best = NodeId::new(0);
        let mut best_distance = f64::INFINITY;
        for (node, cell) in self.cells() {
            let d = euclidean_distance(cell.x, cell.y, p.x_introduction, p.y_introduction);
            if d < best_distance {
                best = node;
                best_distance = d;
            }
        }
        best
    }

    fn set_introduction_node(&mut self, p: &Parameters) {
        self.introduction = self.get_introduction_node_from_coordinates(p);
        self.network[self.introduction].colonized = true;
    }

    /*--------------------------------------- GRAPH STRUCTURE */

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn number_of_cells(&self) -> usize {
        self.network.node_count()
    }

    pub fn node(&self, id: CellId) -> Option<NodeId> {
        self.index.get(&id).copied()
    }

    pub fn cell(&self, node: NodeId) -> &Cell {
        &self.network[node]
    }

    pub fn cell_by_id(&self, id: CellId) -> Option<&Cell> {
        self.node(id).map(|n| &self.network[n])
    }

    /// All cells, always in the same order for the same loaded data.
    pub fn cells(&self) -> impl Iterator<Item = (NodeId, &Cell)> + '_ {
        self.network
            .node_indices()
            .map(move |n| (n, &self.network[n]))
    }

    pub fn introduction_node(&self) -> NodeId {
        self.introduction
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn compute_euclidean_distance(&self, a: NodeId, b: NodeId) -> f64 {
        let (a, b) = (&self.network[a], &self.network[b]);
        euclidean_distance(a.x, a.y, b.x, b.y)
    }

    /*--------------------------------------- STATE */

    pub fn untag(&mut self) {
        for cell in self.network.node_weights_mut() {
            cell.tagged = false;
        }
    }

    /// Mark a susceptible cell for colonization at the end of this
    /// iteration. Returns whether the cell was newly tagged.
    pub fn tag(&mut self, node: NodeId) -> bool {
        let cell = &mut self.network[node];
        if cell.colonized || cell.tagged {
            false
        } else {
            cell.tagged = true;
            true
        }
    }

    /// Colonize every tagged cell. Colonization is permanent, and committing
    /// twice changes nothing. Returns the number of newly colonized cells.
    pub fn update_state(&mut self) -> usize {
        let mut newly_colonized = 0;
        for cell in self.network.node_weights_mut() {
            if cell.tagged && !cell.colonized {
                cell.colonized = true;
                newly_colonized += 1;
            }
        }
        newly_colonized
    }

    pub fn number_of_colonized_cells(&self) -> usize {
        self.network.node_weights().filter(|c| c.colonized).count()
    }

    /*--------------------------------------- SCORING */

    /// The sampled cells that count as evidence under the type of data.
    fn evidence<'a>(&'a self, p: &'a Parameters) -> impl Iterator<Item = (NodeId, &'a Cell)> + 'a {
        self.cells().filter(move |(_, cell)| match cell.observed {
            Observation::Present => true,
            Observation::Absent => p.type_of_data == TypeOfData::PresenceAbsence,
            Observation::Unobserved => false,
        })
    }

    fn tally<F>(&self, p: &Parameters, colonized: F) -> Tally
    where
        F: Fn(NodeId, &Cell) -> bool,
    {
        let mut tally = Tally::default();
        for (node, cell) in self.evidence(p) {
            let detection =
                likelihood::detection_probability(cell.population, cell.sample_size, p.p_introduction);
            let probability = likelihood::observation_probability(cell.observed, colonized(node, cell), detection);
            let best = likelihood::best_observation_probability(cell.observed, detection);
            if let (Some(probability), Some(best)) = (probability, best) {
                tally.add(probability, best);
            }
        }
        tally
    }

    fn baseline(&mut self, p: &Parameters) -> Baseline {
        if let Some(b) = self.baseline {
            if b.type_of_data == p.type_of_data && b.p_introduction == p.p_introduction {
                return b;
            }
        }
        let introduction = self.introduction;
        let mut maximum = Tally::default();
        for (_, cell) in self.evidence(p) {
            let detection =
                likelihood::detection_probability(cell.population, cell.sample_size, p.p_introduction);
            if let Some(best) = likelihood::best_observation_probability(cell.observed, detection) {
                maximum.add(best, best);
            }
        }
        let b = Baseline {
            type_of_data: p.type_of_data,
            p_introduction: p.p_introduction,
            empty: self.tally(p, |node, _| node == introduction),
            maximum,
        };
        self.baseline = Some(b);
        b
    }

    /**
    Score the observations against the current colonization state, or, with
    `empty`, against the map where only the introduction cell is colonized.
    The empty evaluation leaves the actual state alone.
     */
    pub fn compute_score(&mut self, empty: bool, p: &Parameters) {
        let baseline = self.baseline(p);
        let maximum = baseline.maximum.log_likelihood;
        let empty_likelihood = baseline.empty.log_likelihood;
        self.total_log_maximum_likelihood = maximum;
        self.total_log_empty_likelihood = empty_likelihood;
        if empty {
            self.empty_score = likelihood::optimization_score(
                p.optimization_function,
                empty_likelihood,
                empty_likelihood,
                maximum,
                baseline.empty.least_square_sum(),
            );
        } else {
            let tally = self.tally(p, |_, cell| cell.colonized);
            self.total_log_likelihood = tally.log_likelihood;
            self.score = likelihood::optimization_score(
                p.optimization_function,
                tally.log_likelihood,
                empty_likelihood,
                maximum,
                tally.least_square_sum(),
            );
        }
    }

    pub fn get_total_log_likelihood(&self) -> f64 {
        self.total_log_likelihood
    }

    pub fn get_total_log_empty_likelihood(&self) -> f64 {
        self.total_log_empty_likelihood
    }

    pub fn get_total_log_maximum_likelihood(&self) -> f64 {
        self.total_log_maximum_likelihood
    }

    pub fn get_empty_score(&self) -> f64 {
        self.empty_score
    }

    pub fn get_score(&self) -> f64 {
        self.score
    }
}
