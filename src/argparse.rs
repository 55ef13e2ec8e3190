use std::path::PathBuf;
use std::str::FromStr;

use ::argparse::{ArgumentParser, Print, Store, StoreOption, StoreTrue};

use crate::observation::Settings;
use crate::Parameters;

/// A `YES`/`NO` switch on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toggle(pub bool);

impl FromStr for Toggle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "YES" => Ok(Toggle(true)),
            "NO" => Ok(Toggle(false)),
            _ => Err(format!("expected YES or NO, found {:?}", s)),
        }
    }
}

/// Where the input data comes from: either the three text files, or a graph
/// prepared by `make-graph`.
#[derive(Debug, Default, Clone)]
pub struct InputFiles {
    pub map: Option<PathBuf>,
    pub network: Option<PathBuf>,
    pub sample: Option<PathBuf>,
    pub graph: Option<PathBuf>,
}

impl InputFiles {
    /// The map, network and sample files, if no prepared graph is given.
    pub fn text_files(&self) -> Result<(&PathBuf, &PathBuf, &PathBuf), String> {
        let missing = |name: &str| format!("option --{} is mandatory unless --graph is given", name);
        Ok((
            self.map.as_ref().ok_or_else(|| missing("map"))?,
            self.network.as_ref().ok_or_else(|| missing("network"))?,
            self.sample.as_ref().ok_or_else(|| missing("sample"))?,
        ))
    }
}

/// Options naming the input files, shared by the binaries.
pub fn add_input_options<'a>(
    parser: &mut ArgumentParser<'a>,
    map: &'a mut Option<PathBuf>,
    network: &'a mut Option<PathBuf>,
    sample: &'a mut Option<PathBuf>,
) {
    parser.refer(map).add_option(
        &["--map"],
        StoreOption,
        "map file: cell coordinates, population and road densities",
    );
    parser.refer(network).add_option(
        &["--network"],
        StoreOption,
        "network file: roads between cells and their categories",
    );
    parser.refer(sample).add_option(
        &["--sample"],
        StoreOption,
        "sample file: observed presences and absences",
    );
}

pub fn parse_args<'a>(
    p: &'a mut Parameters,
    human_activity: &'a mut Toggle,
    files: &'a mut InputFiles,
    observation: &'a mut Settings,
) -> ArgumentParser<'a> {
    let mut parser = ArgumentParser::new();
    parser.set_description("Simulate the spread of an invasive organism along a road network and score it against field data");
    parser.add_option(
        &["-V", "--version"],
        Print(env!("CARGO_PKG_VERSION").to_string()),
        "print the current version, then exit",
    );
    add_input_options(&mut parser, &mut files.map, &mut files.network, &mut files.sample);
    parser.refer(&mut files.graph).add_option(
        &["--graph"],
        StoreOption,
        "graph prepared by make-graph, replaces --map, --network and --sample",
    );
    parser
        .refer(&mut p.prng_seed)
        .add_option(&["--seed"], Store, "prng seed")
        .required();
    parser
        .refer(&mut p.type_of_data)
        .add_option(
            &["--type-of-data", "--typeofdata"],
            Store,
            "type of experimental data (PRESENCE_ONLY or PRESENCE_ABSENCE)",
        )
        .required();
    parser
        .refer(&mut p.repetitions)
        .add_option(&["--reps"], Store, "number of repetitions of the simulation")
        .required();
    parser
        .refer(&mut p.iterations)
        .add_option(&["--iters"], Store, "number of iterations of each simulation")
        .required();
    parser
        .refer(&mut p.jump_law)
        .add_option(
            &["--law"],
            Store,
            "jump distribution law (DIRAC, NORMAL, LOG_NORMAL, CAUCHY)",
        )
        .required();
    parser
        .refer(&mut p.optimization_function)
        .add_option(
            &["--optimfunc"],
            Store,
            "optimization function (LSS, LOG_LIKELIHOOD, LIKELIHOOD_LSS)",
        )
        .required();
    parser
        .refer(human_activity)
        .add_option(
            &["--humanactivity"],
            Store,
            "weight the number of jumps by the human activity index (NO, YES)",
        )
        .required();
    parser
        .refer(&mut p.x_introduction)
        .add_option(&["--xintro"], Store, "x coordinate of the introduction cell")
        .required();
    parser
        .refer(&mut p.y_introduction)
        .add_option(&["--yintro"], Store, "y coordinate of the introduction cell")
        .required();
    parser
        .refer(&mut p.p_introduction)
        .add_option(&["--pintro"], Store, "prevalence in colonized cells")
        .required();
    parser
        .refer(&mut p.lambda)
        .add_option(&["--lambda"], Store, "mean number of jumps per cell per iteration")
        .required();
    parser
        .refer(&mut p.mu)
        .add_option(&["--mu"], Store, "mean of the jump distribution (DIRAC, NORMAL, LOG_NORMAL)")
        .required();
    parser
        .refer(&mut p.sigma)
        .add_option(&["--sigma"], Store, "spread of the jump distribution (NORMAL, LOG_NORMAL)")
        .required();
    parser
        .refer(&mut p.gamma)
        .add_option(&["--gamma"], Store, "scale of the jump distribution (CAUCHY)")
        .required();

    let [w1, w2, w3, w4, w5, w6] = &mut p.road_weights;
    parser
        .refer(w1)
        .add_option(&["--w1"], Store, "weight of category I roads")
        .required();
    parser
        .refer(w2)
        .add_option(&["--w2"], Store, "weight of category II roads")
        .required();
    parser
        .refer(w3)
        .add_option(&["--w3"], Store, "weight of category III roads")
        .required();
    parser
        .refer(w4)
        .add_option(&["--w4"], Store, "weight of category IV roads")
        .required();
    parser
        .refer(w5)
        .add_option(&["--w5"], Store, "weight of category V roads")
        .required();
    parser
        .refer(w6)
        .add_option(&["--w6"], Store, "weight of category VI roads")
        .required();
    parser
        .refer(&mut p.wmin)
        .add_option(&["--wmin"], Store, "minimal weight between cells")
        .required();

    parser.refer(&mut observation.save_outputs).add_option(
        &["--save-outputs"],
        StoreTrue,
        "save simulation outputs (parameters, final state, distance distributions)",
    );
    parser.refer(&mut observation.save_all_states).add_option(
        &["--save-all-states"],
        StoreTrue,
        "save the simulation state before every iteration",
    );
    parser.refer(&mut observation.output_folder).add_option(
        &["--output"],
        Store,
        "output folder",
    );
    parser
}
