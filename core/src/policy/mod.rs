pub mod allowlist;
pub mod settings;
pub mod types;
