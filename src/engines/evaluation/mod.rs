pub mod fitness;

pub use fitness::{
    evaluate_individual, evaluate_population, get_objectives, score_population, FitnessCache,
};
