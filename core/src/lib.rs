pub mod adsize;
pub mod archive;
pub mod checks;
pub mod eval;
pub mod metrics;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod validator;

pub mod error;
