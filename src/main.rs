use std::fs;

use model::argparse::{parse_args, InputFiles, Toggle};
use model::observation::{self, Settings};
use model::{input, Graph, Parameters};
use tracing_subscriber::EnvFilter;

fn load_graph(files: &InputFiles, p: &Parameters) -> Result<Graph, String> {
    match &files.graph {
        Some(path) => {
            let contents = fs::read(path).map_err(|e| e.to_string())?;
            bincode::deserialize(&contents).map_err(|e| e.to_string())
        }
        None => {
            let (map, network, sample) = files.text_files()?;
            let cells = input::load_map(map).map_err(|e| e.to_string())?;
            let roads = input::load_network(network).map_err(|e| e.to_string())?;
            let sample = input::load_sample(sample).map_err(|e| e.to_string())?;
            Graph::new(&cells, &roads, &sample, p).map_err(|e| e.to_string())
        }
    }
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut p = Parameters::default();
    let mut human_activity = Toggle::default();
    let mut files = InputFiles::default();
    let mut o = Settings::default();
    {
        let parser = parse_args(&mut p, &mut human_activity, &mut files, &mut o);
        parser.parse_args_or_exit();
    }
    p.human_activity_index = human_activity.0;
    p.validate().map_err(|e| e.to_string())?;

    let graph = load_graph(&files, &p)?;

    if o.save_outputs {
        observation::create_output_folder(&o).map_err(|e| e.to_string())?;
        observation::write_parameters(&p, o.path("parameters.json")).map_err(|e| e.to_string())?;
    }

    let scores = model::run_repetitions(&graph, &p, &o).map_err(|e| e.to_string())?;
    println!("{}", scores);
    Ok(())
}
