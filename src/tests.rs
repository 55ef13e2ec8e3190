use crate::*;

use approx::assert_abs_diff_eq;

use crate::input::{CellRecord, RoadRecord, SampleRecord};
use crate::likelihood::Observation;
use crate::observation::Settings;
use crate::parameters::{JumpLaw, OptimizationFunction, RoadCategory, TypeOfData};
use crate::simulation::RunState;

fn cell(id: CellId, x: f64, y: f64) -> CellRecord {
    CellRecord {
        id,
        x,
        y,
        population: 100.,
        population_density: 10.,
        road_density: 1.,
    }
}

fn road(from: CellId, to: CellId, category: RoadCategory) -> RoadRecord {
    RoadRecord { from, to, category }
}

fn sampled(id: CellId, label: Observation) -> SampleRecord {
    SampleRecord {
        id,
        label,
        sample_size: 5,
    }
}

/// A 5×5 grid, cell `10 r + c` at (c, r), with category I roads along the
/// rows and category III roads along the columns. Two presences close to the
/// origin, two absences in the far corner.
fn grid() -> (Vec<CellRecord>, Vec<RoadRecord>, Vec<SampleRecord>) {
    let mut cells = vec![];
    let mut roads = vec![];
    for r in 0..5 {
        for c in 0..5 {
            let mut record = cell(10 * r + c, c as f64, r as f64);
            record.population_density = (r * c) as f64;
            record.road_density = (r + c) as f64;
            cells.push(record);
            if c < 4 {
                roads.push(road(10 * r + c, 10 * r + c + 1, RoadCategory::I));
            }
            if r < 4 {
                roads.push(road(10 * r + c, 10 * (r + 1) + c, RoadCategory::III));
            }
        }
    }
    let sample = vec![
        sampled(1, Observation::Present),
        sampled(2, Observation::Present),
        sampled(44, Observation::Absent),
        sampled(34, Observation::Absent),
    ];
    (cells, roads, sample)
}

fn grid_parameters() -> Parameters {
    Parameters {
        prng_seed: 42,
        iterations: 5,
        jump_law: JumpLaw::Normal,
        mu: 1.5,
        sigma: 1.,
        lambda: 2.,
        p_introduction: 0.2,
        road_weights: [5., 4., 3., 2., 1., 0.5],
        wmin: 0.1,
        ..Parameters::default()
    }
}

fn grid_graph(p: &Parameters) -> Graph {
    let (cells, roads, sample) = grid();
    Graph::new(&cells, &roads, &sample, p).unwrap()
}

fn colonized(graph: &Graph) -> Vec<bool> {
    graph.cells().map(|(_, c)| c.colonized).collect()
}

#[test]
pub fn test_same_seed_same_run() {
    let p = grid_parameters();
    let mut snapshots = vec![];
    for _ in 0..2 {
        let mut s = Simulation::new(grid_graph(&p), &p).unwrap();
        for _ in 0..p.iterations {
            s.compute_next_iteration().unwrap();
        }
        snapshots.push(observation::snapshot(s.graph(), s.get_iteration()));
    }
    assert_eq!(snapshots[0], snapshots[1]);
}

#[test]
pub fn test_colonization_only_grows() {
    let p = grid_parameters();
    let mut s = Simulation::new(grid_graph(&p), &p).unwrap();
    let introduction = s.graph().introduction_node();
    assert_eq!(s.graph().cell(introduction).id, 0);
    assert_eq!(s.graph().number_of_colonized_cells(), 1);
    let mut before = colonized(s.graph());
    for _ in 0..10 {
        s.compute_next_iteration().unwrap();
        let after = colonized(s.graph());
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(!b || *a);
        }
        assert!(s.graph().cell(introduction).colonized);
        assert!(s.graph().cells().all(|(_, c)| !c.tagged || c.colonized));
        before = after;
    }
    assert_eq!(s.get_iteration(), 10);
}

#[test]
pub fn test_empty_score_does_not_depend_on_the_run() {
    let p = grid_parameters();
    let mut short = Simulation::new(grid_graph(&p), &p).unwrap();
    short.compute_next_iteration().unwrap();
    let short = short.compute_score().unwrap();

    let mut long = Simulation::new(grid_graph(&p), &p).unwrap();
    for _ in 0..8 {
        long.compute_next_iteration().unwrap();
    }
    let long = long.compute_score().unwrap();

    assert_eq!(short.empty_likelihood, long.empty_likelihood);
    assert_eq!(short.max_likelihood, long.max_likelihood);
    assert_eq!(short.empty_score, long.empty_score);
    assert!(long.max_likelihood >= long.likelihood);
}

#[test]
pub fn test_log_likelihood_score_bounds() {
    let p = grid_parameters();
    let mut graph = grid_graph(&p);

    graph.compute_score(false, &p);
    graph.compute_score(true, &p);
    assert_abs_diff_eq!(graph.get_total_log_likelihood(), graph.get_total_log_empty_likelihood());
    assert_eq!(graph.get_score(), 0.);
    assert_eq!(graph.get_empty_score(), 0.);
    assert!(graph.get_total_log_maximum_likelihood() > graph.get_total_log_empty_likelihood());

    for id in &[1, 2] {
        let node = graph.node(*id).unwrap();
        assert!(graph.tag(node));
    }
    assert_eq!(graph.update_state(), 2);
    assert_eq!(graph.update_state(), 0);
    graph.compute_score(false, &p);
    assert_abs_diff_eq!(graph.get_total_log_likelihood(), graph.get_total_log_maximum_likelihood());
    assert_abs_diff_eq!(graph.get_score(), 1.);

    let mut s = Simulation::new(graph, &p).unwrap();
    for _ in 0..p.iterations {
        s.compute_next_iteration().unwrap();
    }
    let scores = s.compute_score().unwrap();
    assert!(scores.score >= 0. && scores.score <= 1.);
}

#[test]
pub fn test_least_square_score() {
    let p = Parameters {
        optimization_function: OptimizationFunction::Lss,
        ..grid_parameters()
    };
    assert!(p.optimization_function.is_minimized());
    let mut graph = grid_graph(&p);
    graph.compute_score(true, &p);
    let empty = graph.get_empty_score();
    assert!(empty > 0.);

    for id in &[1, 2] {
        let node = graph.node(*id).unwrap();
        graph.tag(node);
    }
    graph.update_state();
    graph.compute_score(false, &p);
    assert_abs_diff_eq!(graph.get_score(), 0.);

    let q = Parameters {
        optimization_function: OptimizationFunction::LikelihoodLss,
        ..p
    };
    assert!(!q.optimization_function.is_minimized());
    graph.compute_score(false, &q);
    assert_abs_diff_eq!(graph.get_score(), 1.);
}

#[test]
pub fn test_presence_only_ignores_absences() {
    let p = Parameters {
        type_of_data: TypeOfData::PresenceOnly,
        ..grid_parameters()
    };
    let mut graph = grid_graph(&p);
    assert_eq!(graph.cell_by_id(44).unwrap().observed, Observation::Absent);

    graph.compute_score(false, &p);
    let nothing = graph.get_total_log_likelihood();
    let nothing_score = graph.get_score();

    // Colonizing the absences costs nothing when absences are not evidence.
    for id in &[1, 2, 34, 44] {
        let node = graph.node(*id).unwrap();
        graph.tag(node);
    }
    graph.update_state();
    graph.compute_score(false, &p);
    assert!(graph.get_total_log_likelihood() > nothing);
    assert!(graph.get_score() > nothing_score);
    assert_abs_diff_eq!(graph.get_score(), 1.);

    let q = Parameters {
        type_of_data: TypeOfData::PresenceAbsence,
        ..p
    };
    graph.reset_states(&q);
    for id in &[1, 2, 34, 44] {
        let node = graph.node(*id).unwrap();
        graph.tag(node);
    }
    graph.update_state();
    graph.compute_score(false, &q);
    assert!(graph.get_score() < 1.);
}

/// A–B joined by a category I road, B–C by a category VI road, no road
/// between A and C.
fn three_cells() -> (Vec<CellRecord>, Vec<RoadRecord>) {
    (
        vec![cell(1, 0., 0.), cell(2, 1., 0.), cell(3, 2., 0.)],
        vec![road(1, 2, RoadCategory::I), road(2, 3, RoadCategory::VI)],
    )
}

fn three_cells_parameters() -> Parameters {
    Parameters {
        lambda: 200.,
        mu: 0.,
        jump_law: JumpLaw::Dirac,
        road_weights: [5., 1., 1., 1., 1., 1.],
        wmin: 0.,
        ..Parameters::default()
    }
}

#[test]
pub fn test_jumps_follow_roads() {
    let (cells, roads) = three_cells();
    let p = three_cells_parameters();
    let graph = Graph::new(&cells, &roads, &[], &p).unwrap();
    let mut s = Simulation::new(graph, &p).unwrap();

    // B was reached in the first iteration, but only jumps on to C in the next.
    s.compute_next_iteration().unwrap();
    assert_eq!(colonized(s.graph()), vec![true, true, false]);

    s.compute_next_iteration().unwrap();
    assert_eq!(colonized(s.graph()), vec![true, true, true]);

    let graph = s.into_graph();
    assert_eq!(graph.number_of_colonized_cells(), 3);
}

#[test]
pub fn test_jumps_without_destination_are_dropped() {
    let cells = vec![cell(1, 0., 0.), cell(2, 5., 0.)];
    let p = Parameters {
        lambda: 10.,
        wmin: 0.,
        ..Parameters::default()
    };
    let graph = Graph::new(&cells, &[], &[], &p).unwrap();
    let mut s = Simulation::new(graph, &p).unwrap();
    for _ in 0..5 {
        s.compute_next_iteration().unwrap();
    }
    assert_eq!(s.graph().number_of_colonized_cells(), 1);
}

#[test]
pub fn test_introduction_cell() {
    let cells = vec![cell(7, -1., 0.), cell(3, 1., 0.), cell(5, 4., 4.)];
    let mut p = Parameters::default();
    let graph = Graph::new(&cells, &[], &[], &p).unwrap();
    assert_eq!(graph.cell(graph.introduction_node()).id, 7);

    p.x_introduction = 3.5;
    p.y_introduction = 5.;
    let mut graph = graph;
    graph.reset_states(&p);
    assert_eq!(graph.cell(graph.introduction_node()).id, 5);
    assert_eq!(graph.number_of_colonized_cells(), 1);
    assert!(!graph.cell_by_id(7).unwrap().colonized);
}

#[test]
pub fn test_human_activity_index() {
    let p = Parameters {
        human_activity_index: true,
        ..grid_parameters()
    };
    let graph = grid_graph(&p);
    for (_, c) in graph.cells() {
        assert!(c.human_activity_index >= 0. && c.human_activity_index <= 1.);
    }
    assert_abs_diff_eq!(graph.cell_by_id(0).unwrap().human_activity_index, 0.);
    assert_abs_diff_eq!(graph.cell_by_id(44).unwrap().human_activity_index, 1.);
    assert!(
        graph.cell_by_id(22).unwrap().human_activity_index
            > graph.cell_by_id(11).unwrap().human_activity_index
    );

    let flat = vec![cell(1, 0., 0.), cell(2, 1., 0.)];
    let graph = Graph::new(&flat, &[], &[], &p).unwrap();
    for (_, c) in graph.cells() {
        assert_abs_diff_eq!(c.human_activity_index, 1.);
    }
}

#[test]
pub fn test_statistics() {
    let p = grid_parameters();
    let graph = grid_graph(&p);
    let statistics = graph.statistics();
    assert_eq!(statistics.x.min, 0.);
    assert_eq!(statistics.x.max, 4.);
    assert_abs_diff_eq!(statistics.x.mean, 2.);
    // A corner cell has one road of each kind, an inner cell two of each.
    assert_abs_diff_eq!(statistics.weights_sum.min, 5. + 3.);
    assert_abs_diff_eq!(statistics.weights_sum.max, 2. * (5. + 3.));
}

#[test]
pub fn test_scoring_ends_the_run() {
    let p = grid_parameters();
    let mut s = Simulation::new(grid_graph(&p), &p).unwrap();
    assert_eq!(s.state(), RunState::Initialized);
    assert!(matches!(
        s.finalize(),
        Err(ModelError::Lifecycle { action: "finalize", .. })
    ));
    s.compute_next_iteration().unwrap();
    assert_eq!(s.state(), RunState::Running);
    let scores = s.compute_score().unwrap();
    assert_eq!(s.state(), RunState::Scored);
    assert!(matches!(
        s.compute_next_iteration(),
        Err(ModelError::Lifecycle { action: "iterate", .. })
    ));
    assert_eq!(s.get_iteration(), 1);
    assert_eq!(s.finalize().unwrap(), scores);
    assert_eq!(s.state(), RunState::Finalized);
    assert!(s.compute_score().is_err());
}

#[test]
pub fn test_negative_jumps_stay_put() {
    for law in &[JumpLaw::Cauchy, JumpLaw::Normal, JumpLaw::LogNormal] {
        let p = Parameters {
            jump_law: *law,
            mu: -5.,
            ..grid_parameters()
        };
        let mut s = Simulation::new(grid_graph(&p), &p).unwrap();
        let mut before = colonized(s.graph());
        for _ in 0..p.iterations {
            s.compute_next_iteration().unwrap();
            let after = colonized(s.graph());
            for (b, a) in before.iter().zip(after.iter()) {
                assert!(!b || *a);
            }
            before = after;
        }
        let scores = s.compute_score().unwrap();
        assert!(scores.score >= 0. && scores.score <= 1.);
    }

    let p = Parameters {
        jump_law: JumpLaw::Dirac,
        mu: -3.,
        ..grid_parameters()
    };
    let mut s = Simulation::new(grid_graph(&p), &p).unwrap();
    assert_eq!(s.draw_jump_size().unwrap(), 0.);
    let p = Parameters {
        jump_law: JumpLaw::Normal,
        mu: -1000.,
        sigma: 1.,
        ..grid_parameters()
    };
    let mut s = Simulation::new(grid_graph(&p), &p).unwrap();
    for _ in 0..20 {
        assert_eq!(s.draw_jump_size().unwrap(), 0.);
    }
}

#[test]
pub fn test_baseline_follows_parameters() {
    let p = grid_parameters();
    let mut graph = grid_graph(&p);
    graph.compute_score(false, &p);
    graph.compute_score(true, &p);

    let q = Parameters {
        p_introduction: 0.5,
        ..p
    };
    graph.compute_score(false, &q);
    graph.compute_score(true, &q);

    let mut fresh = grid_graph(&q);
    fresh.compute_score(false, &q);
    fresh.compute_score(true, &q);
    assert_eq!(
        graph.get_total_log_maximum_likelihood(),
        fresh.get_total_log_maximum_likelihood()
    );
    assert_eq!(
        graph.get_total_log_empty_likelihood(),
        fresh.get_total_log_empty_likelihood()
    );
    assert_eq!(graph.get_score(), fresh.get_score());
}

#[test]
pub fn test_unpopulated_sampled_cell() {
    let mut cells = vec![cell(1, 0., 0.), cell(2, 1., 0.)];
    cells[1].population = 0.;
    let sample = vec![sampled(2, Observation::Present)];
    let p = Parameters {
        type_of_data: TypeOfData::PresenceOnly,
        ..Parameters::default()
    };
    let mut graph = Graph::new(&cells, &[], &sample, &p).unwrap();
    graph.compute_score(false, &p);
    let nothing = graph.get_total_log_likelihood();

    let node = graph.node(2).unwrap();
    graph.tag(node);
    graph.update_state();
    graph.compute_score(false, &p);
    assert!(graph.get_total_log_likelihood() > nothing);
    assert_abs_diff_eq!(graph.get_score(), 1.);
}

#[test]
pub fn test_invalid_population() {
    let p = Parameters::default();
    for population in &[-1., std::f64::NAN] {
        let mut cells = vec![cell(1, 0., 0.), cell(2, 1., 0.)];
        cells[1].population = *population;
        assert!(matches!(
            Graph::new(&cells, &[], &[], &p),
            Err(ModelError::InvalidPopulation { id: 2, .. })
        ));
    }
}

#[test]
pub fn test_invalid_parameters() {
    assert!(Parameters::default().validate().is_ok());
    let p = Parameters {
        p_introduction: 0.,
        ..Parameters::default()
    };
    assert!(matches!(
        p.validate(),
        Err(ModelError::InvalidParameter { name: "pintro", .. })
    ));
    let p = Parameters {
        jump_law: JumpLaw::Cauchy,
        gamma: 0.,
        ..Parameters::default()
    };
    assert!(p.validate().is_err());
    let p = Parameters {
        repetitions: 0,
        ..Parameters::default()
    };
    assert!(Simulation::new(grid_graph(&grid_parameters()), &p).is_err());
}

#[test]
pub fn test_parameter_names() {
    assert_eq!("LOG_NORMAL".parse::<JumpLaw>().unwrap(), JumpLaw::LogNormal);
    assert!("lognormal".parse::<JumpLaw>().is_err());
    assert_eq!(
        "PRESENCE_ONLY".parse::<TypeOfData>().unwrap(),
        TypeOfData::PresenceOnly
    );
    assert_eq!(OptimizationFunction::LikelihoodLss.to_string(), "LIKELIHOOD_LSS");
    assert_eq!("4".parse::<RoadCategory>().unwrap(), RoadCategory::IV);
    assert_eq!("VI".parse::<RoadCategory>().unwrap(), RoadCategory::VI);
    assert!(matches!(
        "VII".parse::<RoadCategory>(),
        Err(ModelError::UnknownVariant { .. })
    ));
}

#[test]
pub fn test_bad_input_data() {
    let (cells, roads, sample) = grid();
    let p = Parameters::default();

    assert!(matches!(Graph::new(&[], &roads, &sample, &p), Err(ModelError::EmptyMap)));

    let mut duplicated = cells.clone();
    duplicated.push(cell(12, 9., 9.));
    assert!(matches!(
        Graph::new(&duplicated, &roads, &sample, &p),
        Err(ModelError::DuplicateCell(12))
    ));

    let mut bad_roads = roads.clone();
    bad_roads.push(road(4, 99, RoadCategory::II));
    assert!(matches!(
        Graph::new(&cells, &bad_roads, &sample, &p),
        Err(ModelError::UnknownCell { id: 99, .. })
    ));

    let mut bad_sample = sample.clone();
    bad_sample.push(sampled(-3, Observation::Present));
    assert!(matches!(
        Graph::new(&cells, &roads, &bad_sample, &p),
        Err(ModelError::UnknownCell { id: -3, .. })
    ));

    let mut twice = sample;
    twice.push(sampled(1, Observation::Absent));
    let graph = Graph::new(&cells, &roads, &twice, &p).unwrap();
    assert_eq!(graph.cell_by_id(1).unwrap().observed, Observation::Present);
}

#[test]
pub fn test_read_text_files() {
    let network = "id1 id2 category\n1 2 I\n\n# service road\n2 3 6\n";
    let roads = input::read_network(network.as_bytes(), "network").unwrap();
    assert_eq!(roads, vec![road(1, 2, RoadCategory::I), road(2, 3, RoadCategory::VI)]);

    let sample = "id label size\n1 1 12\n2 ABSENCE\n";
    let sample = input::read_sample(sample.as_bytes(), "sample").unwrap();
    assert_eq!(sample[0].label, Observation::Present);
    assert_eq!(sample[0].sample_size, 12);
    assert_eq!(sample[1].label, Observation::Absent);
    assert_eq!(sample[1].sample_size, 1);

    let bad = "id1 id2 category\n1 2 VII\n";
    assert!(matches!(
        input::read_network(bad.as_bytes(), "network"),
        Err(ModelError::Parse { line: 2, .. })
    ));
    let short = "id x y pop dens roads\n1 0 0 10 1\n";
    assert!(input::read_map(short.as_bytes(), "map").is_err());
    let negative = "id x y pop dens roads\n1 0 0 -10 1 1\n";
    assert!(input::read_map(negative.as_bytes(), "map").is_err());
    let unknown = "id label\n1 maybe\n";
    assert!(input::read_sample(unknown.as_bytes(), "sample").is_err());
}

#[test]
pub fn test_multinomial_keeps_all_trials() {
    let mut prng = prng::Prng::new(3);
    let counts = prng.multinomial(&[0.2, 0., 0.5, 0.3], 1., 1000).unwrap();
    assert_eq!(counts.iter().sum::<u64>(), 1000);
    assert_eq!(counts[1], 0);
    assert_eq!(prng.poisson(0.).unwrap(), 0);
    assert!(prng.exponential(0.).is_err());
    assert!(prng.bernoulli(1.5).is_err());
    assert!(prng.uniform_int(3, 1).is_err());
    assert_eq!(prng.uniform_int(2, 2).unwrap(), 2);
}

#[test]
pub fn test_detection_probability() {
    // One carrier among four, two of them sampled: missed with C(3,2)/C(4,2).
    assert_abs_diff_eq!(likelihood::detection_probability(4., 2, 0.25), 0.5, epsilon = 1e-12);
    assert_eq!(likelihood::detection_probability(100., 0, 0.5), 0.);
    assert_eq!(likelihood::clamped_ln(0.), likelihood::LOG_PROBABILITY_FLOOR);
}

#[test]
pub fn test_repetitions() {
    let p = Parameters {
        repetitions: 3,
        ..grid_parameters()
    };
    let quiet = Settings::quiet();
    let graph = grid_graph(&p);
    let first = run_repetitions(&graph, &p, &quiet).unwrap();
    let second = run_repetitions(&graph, &p, &quiet).unwrap();
    assert_eq!(first, second);

    let single = Parameters {
        repetitions: 1,
        ..p.clone()
    };
    assert_eq!(
        run_repetitions(&graph, &single, &quiet).unwrap(),
        run(graph.clone(), &single, &quiet).unwrap()
    );
}

#[test]
pub fn test_outputs() {
    let p = Parameters {
        iterations: 2,
        ..grid_parameters()
    };
    let folder = std::env::temp_dir().join(format!("invasion-model-test-{}", std::process::id()));
    let o = Settings {
        save_outputs: true,
        save_all_states: true,
        output_folder: folder.clone(),
    };
    let scores = run(grid_graph(&p), &p, &o).unwrap();

    let file = std::fs::File::open(folder.join("final_state.json")).unwrap();
    let last: observation::StateSnapshot = serde_json::from_reader(file).unwrap();
    assert_eq!(last.iteration, 2);
    assert_eq!(last.cells.len(), 25);
    assert!(folder.join("state_0.json").exists());
    assert!(folder.join("state_1.json").exists());

    let observed = std::fs::read_to_string(folder.join("observed_euclidean_distribution.txt")).unwrap();
    assert_eq!(observed.lines().collect::<Vec<_>>(), vec!["1", "2"]);
    let simulated = std::fs::read_to_string(folder.join("simulated_euclidean_distribution.txt")).unwrap();
    assert_eq!(
        simulated.lines().count(),
        last.cells.iter().filter(|c| c.colonized).count()
    );
    assert!(scores.score >= 0. && scores.score <= 1.);
    std::fs::remove_dir_all(&folder).unwrap();
}

#[test]
pub fn test_prepared_graph() {
    let p = grid_parameters();
    let graph = grid_graph(&p);
    let bytes = bincode::serialize(&graph).unwrap();
    let prepared: Graph = bincode::deserialize(&bytes).unwrap();
    assert_eq!(
        observation::snapshot(&prepared, 0),
        observation::snapshot(&graph, 0)
    );
    let o = Settings::quiet();
    assert_eq!(run(prepared, &p, &o).unwrap(), run(graph, &p, &o).unwrap());
}
