pub mod context;
pub mod finding;
pub mod registry;
pub mod runner;
