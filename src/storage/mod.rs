pub mod array_store;
pub mod experiment;
pub mod layout;
pub mod naming;

pub use array_store::{
    commit_atomic, ArrayDescriptor, ArrayStore, ElementType, MappedArray, OpenMode, RetryPolicy,
};
pub use experiment::ExperimentStorage;
pub use layout::StorageLayout;
pub use naming::{experiment_name, NamingScheme};
