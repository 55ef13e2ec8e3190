use thiserror::Error;

use crate::CellId;

/// Everything that can go wrong while setting up or running the model.
///
/// Degenerate situations that the model handles by policy (a jump with no
/// possible destination, a sampled cell without population) are not errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid value {value} for parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("unknown {kind} value {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
    #[error("cell {0} is defined twice in the map")]
    DuplicateCell(CellId),
    #[error("{context} refers to cell {id}, which is not in the map")]
    UnknownCell { context: &'static str, id: CellId },
    #[error("cell {id} has an invalid population {population}")]
    InvalidPopulation { id: CellId, population: f64 },
    #[error("the map does not contain any cell")]
    EmptyMap,
    #[error("{file}, line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },
    #[error("cannot {action} once the simulation is {state:?}")]
    Lifecycle {
        action: &'static str,
        state: crate::simulation::RunState,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
