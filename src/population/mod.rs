pub mod buffer;
pub mod init;
pub mod manager;

pub use buffer::GenomeBuffer;
pub use init::{fill_initial_population, BernoulliBatches};
pub use manager::{CommitStrategy, ManagerParams, ManagerState, PopulationManager};
