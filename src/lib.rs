pub mod config;
pub mod error;
pub mod items;
pub mod memory;
pub mod optimizer;
pub mod output;
pub mod population;
pub mod scorer;
pub mod storage;
// cmd and reports are modules of the binary crate (main).
