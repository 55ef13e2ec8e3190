use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};

/// The kind of field data the sample file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeOfData {
    PresenceOnly,
    PresenceAbsence,
}

/// The law jump distances are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpLaw {
    Dirac,
    Normal,
    LogNormal,
    Cauchy,
}

/// How the likelihoods are condensed into the score an optimizer works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationFunction {
    Lss,
    LogLikelihood,
    LikelihoodLss,
}

impl OptimizationFunction {
    /// Whether a calibration driver should minimize (rather than maximize)
    /// the score produced by this function.
    pub fn is_minimized(self) -> bool {
        match self {
            OptimizationFunction::Lss => true,
            OptimizationFunction::LogLikelihood | OptimizationFunction::LikelihoodLss => false,
        }
    }
}

/// The six ordinal road categories, I being the most important roads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoadCategory {
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl RoadCategory {
    pub fn index(self) -> usize {
        self as usize
    }
}

macro_rules! named_variants {
    ($t:ty, $kind:literal, $($variant:path => $name:literal),+ $(,)?) => {
        impl FromStr for $t {
            type Err = ModelError;
            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok($variant),)+
                    _ => Err(ModelError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($variant => $name,)+
                })
            }
        }
    };
}

named_variants!(TypeOfData, "type of data",
    TypeOfData::PresenceOnly => "PRESENCE_ONLY",
    TypeOfData::PresenceAbsence => "PRESENCE_ABSENCE",
);
named_variants!(JumpLaw, "jump law",
    JumpLaw::Dirac => "DIRAC",
    JumpLaw::Normal => "NORMAL",
    JumpLaw::LogNormal => "LOG_NORMAL",
    JumpLaw::Cauchy => "CAUCHY",
);
named_variants!(OptimizationFunction, "optimization function",
    OptimizationFunction::Lss => "LSS",
    OptimizationFunction::LogLikelihood => "LOG_LIKELIHOOD",
    OptimizationFunction::LikelihoodLss => "LIKELIHOOD_LSS",
);

impl FromStr for RoadCategory {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "I" | "1" => Ok(RoadCategory::I),
            "II" | "2" => Ok(RoadCategory::II),
            "III" | "3" => Ok(RoadCategory::III),
            "IV" | "4" => Ok(RoadCategory::IV),
            "V" | "5" => Ok(RoadCategory::V),
            "VI" | "6" => Ok(RoadCategory::VI),
            _ => Err(ModelError::UnknownVariant {
                kind: "road category",
                value: s.to_string(),
            }),
        }
    }
}

/**
The parameters of one model run. They are owned by whoever drives the
calibration, and only ever read by the model.
 */
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Parameters {
    pub prng_seed: u64,
    pub type_of_data: TypeOfData,

    pub repetitions: usize,
    pub iterations: u32,

    pub jump_law: JumpLaw,
    pub optimization_function: OptimizationFunction,
    pub human_activity_index: bool,

    pub x_introduction: f64,
    pub y_introduction: f64,
    /// Prevalence of the organism in the population of a colonized cell.
    pub p_introduction: f64,

    /// Mean number of jumps per colonized cell and iteration.
    pub lambda: f64,
    pub mu: f64,
    pub sigma: f64,
    pub gamma: f64,

    /// Weights of road categories I to VI.
    pub road_weights: [f64; 6],
    /// The minimal weight between two cells, with or without a road.
    pub wmin: f64,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            prng_seed: 1,
            type_of_data: TypeOfData::PresenceAbsence,
            repetitions: 1,
            iterations: 30,
            jump_law: JumpLaw::Dirac,
            optimization_function: OptimizationFunction::LogLikelihood,
            human_activity_index: false,
            x_introduction: 0.0,
            y_introduction: 0.0,
            p_introduction: 1.0,
            lambda: 1.0,
            mu: 1.0,
            sigma: 1.0,
            gamma: 1.0,
            road_weights: [1.0; 6],
            wmin: 0.0,
        }
    }
}

fn check(ok: bool, name: &'static str, value: f64, reason: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        })
    }
}

impl Parameters {
    /**
    The weight of a road of the given category, never below `wmin`.

    ```rust
    # use model::parameters::{Parameters, RoadCategory};
    let mut p = Parameters::default();
    p.road_weights = [5., 4., 3., 2., 1., 0.];
    p.wmin = 0.5;
    assert_eq!(p.road_weight(RoadCategory::I), 5.);
    assert_eq!(p.road_weight(RoadCategory::VI), 0.5);
    ```
     */
    pub fn road_weight(&self, category: RoadCategory) -> f64 {
        self.road_weights[category.index()].max(self.wmin)
    }

    /// Reject out-of-domain values before any run is attempted.
    pub fn validate(&self) -> Result<()> {
        check(self.repetitions >= 1, "reps", self.repetitions as f64, "at least one repetition is needed")?;
        check(self.lambda.is_finite() && self.lambda >= 0., "lambda", self.lambda, "must be a non-negative number")?;
        check(self.mu.is_finite(), "mu", self.mu, "must be a finite number")?;
        check(
            self.p_introduction > 0. && self.p_introduction <= 1.,
            "pintro",
            self.p_introduction,
            "must be a prevalence in (0, 1]",
        )?;
        check(self.x_introduction.is_finite(), "xintro", self.x_introduction, "must be a finite number")?;
        check(self.y_introduction.is_finite(), "yintro", self.y_introduction, "must be a finite number")?;
        match self.jump_law {
            JumpLaw::Dirac => {}
            JumpLaw::Normal | JumpLaw::LogNormal => check(
                self.sigma.is_finite() && self.sigma >= 0.,
                "sigma",
                self.sigma,
                "must be a non-negative number",
            )?,
            JumpLaw::Cauchy => check(
                self.gamma.is_finite() && self.gamma > 0.,
                "gamma",
                self.gamma,
                "must be a positive number",
            )?,
        }
        const NAMES: [&str; 6] = ["w1", "w2", "w3", "w4", "w5", "w6"];
        for (name, w) in NAMES.iter().zip(self.road_weights.iter()) {
            check(w.is_finite() && *w >= 0., *name, *w, "must be a non-negative weight")?;
        }
        check(self.wmin.is_finite() && self.wmin >= 0., "wmin", self.wmin, "must be a non-negative weight")?;
        Ok(())
    }
}
