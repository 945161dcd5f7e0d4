pub mod random_tree;
pub mod simplify;
pub mod population;
pub mod crossover;
pub mod mutation;
pub mod pareto;
pub mod hall_of_fame;
pub mod evolution_engine;
pub mod progress;

pub use random_tree::{generate_random_tree, initialize_population};
pub use simplify::simplify;
pub use population::{canonical_string, deduplicate};
pub use crossover::crossover;
pub use mutation::{mutate, MutationKind};
pub use pareto::{
    crowding_distance_selection, dominates, multi_objective_selection, pareto_front,
};
pub use hall_of_fame::{EliteExpression, HallOfFame};
pub use evolution_engine::{EvolutionEngine, EvolutionResult, ProgressCallback};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage};
