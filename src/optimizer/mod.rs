pub mod crossover;
pub mod mutation;
pub mod reproduction;
pub mod runner;
pub mod selection;
pub mod summary;

pub use self::reproduction::{pair_parents, reproduce, ReproductionParams};
pub use self::runner::{EvolutionResult, EvolutionRunner, ProgressCallback};
pub use self::selection::SelectionStrategy;
pub use self::summary::GenerationSummary;
