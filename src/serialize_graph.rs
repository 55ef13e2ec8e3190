use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

use model::argparse::{add_input_options, InputFiles};
use model::parameters::TypeOfData;
use model::{input, Graph, Parameters};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn read_graph(files: &InputFiles, p: &Parameters) -> Result<Graph, String> {
    let (map, network, sample) = files.text_files()?;
    let cells = input::load_map(map).map_err(|e| e.to_string())?;
    let roads = input::load_network(network).map_err(|e| e.to_string())?;
    let sample = input::load_sample(sample).map_err(|e| e.to_string())?;
    Graph::new(&cells, &roads, &sample, p).map_err(|e| e.to_string())
}

fn parse_args(files: &mut InputFiles, type_of_data: &mut TypeOfData, output: &mut PathBuf) {
    let mut parser = argparse::ArgumentParser::new();
    parser.set_description("Assemble map, network and sample into a graph file for the simulation");
    add_input_options(&mut parser, &mut files.map, &mut files.network, &mut files.sample);
    parser.refer(type_of_data).add_option(
        &["--type-of-data", "--typeofdata"],
        argparse::Store,
        "type of experimental data (PRESENCE_ONLY or PRESENCE_ABSENCE)",
    );
    parser.refer(output).add_option(
        &["--output"],
        argparse::Store,
        "graph file to write",
    );
    parser.parse_args_or_exit();
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut files = InputFiles::default();
    let mut p = Parameters::default();
    let mut output = PathBuf::from("graph.bincode");
    parse_args(&mut files, &mut p.type_of_data, &mut output);

    let graph = read_graph(&files, &p)?;

    let mut file = match File::create(&output) {
        Ok(f) => f,
        Err(e) => return Err(e.to_string()),
    };
    let bytes = bincode::serialize(&graph).map_err(|e| e.to_string())?;
    match file.write_all(&bytes) {
        Ok(_) => {
            info!(path = %output.display(), cells = graph.number_of_cells(), "graph written");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}
