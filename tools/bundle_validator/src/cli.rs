use clap::{Parser, ValueEnum};
use creative_audit_core::eval::runner::{ExecutionMode, RunOptions};
use creative_audit_core::policy::types::{Priority, Profile};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProfileArg {
    Cm360,
    Iab,
}

impl From<ProfileArg> for Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Cm360 => Profile::CM360,
            ProfileArg::Iab => Profile::IAB,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PriorityArg {
    Required,
    Recommended,
    Advisory,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::Required => Priority::Required,
            PriorityArg::Recommended => Priority::Recommended,
            PriorityArg::Advisory => Priority::Advisory,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty JSON report envelope
    #[default]
    Json,
    /// One row per finding
    Csv,
}

/// Audit HTML5 creative bundles (zip files or unpacked folders).
#[derive(Debug, Parser)]
#[command(name = "bundle_validator", version)]
pub struct Cli {
    /// Only run checks that apply to this publisher profile
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Only run checks of these priority tiers
    #[arg(long, value_enum, value_delimiter = ',')]
    pub priority: Vec<PriorityArg>,

    /// JSON file overriding the default thresholds
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Run checks one at a time instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Check ids to run (all when omitted)
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Check ids to skip
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    #[arg(required = true, value_name = "BUNDLE")]
    pub inputs: Vec<PathBuf>,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            profile: self.profile.map(Profile::from),
            priorities: if self.priority.is_empty() {
                None
            } else {
                Some(self.priority.iter().copied().map(Priority::from).collect())
            },
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            mode: if self.sequential {
                ExecutionMode::Sequential
            } else {
                ExecutionMode::Parallel
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn flags_map_onto_run_options() {
        let cli = Cli::try_parse_from([
            "bundle_validator",
            "--profile",
            "iab",
            "--priority",
            "required,advisory",
            "--include",
            "weight-initial,pkg-primary",
            "--sequential",
            "--format",
            "csv",
            "a.zip",
            "b",
        ])
        .unwrap();
        let opts = cli.run_options();
        assert_eq!(opts.profile, Some(Profile::IAB));
        assert_eq!(
            opts.priorities,
            Some(vec![Priority::Required, Priority::Advisory])
        );
        assert_eq!(opts.include, vec!["weight-initial", "pkg-primary"]);
        assert_eq!(opts.mode, ExecutionMode::Sequential);
        assert_eq!(cli.format, OutputFormat::Csv);
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn defaults_run_everything_in_parallel() {
        let cli = Cli::try_parse_from(["bundle_validator", "a.zip"]).unwrap();
        let opts = cli.run_options();
        assert_eq!(opts.profile, None);
        assert_eq!(opts.priorities, None);
        assert_eq!(opts.mode, ExecutionMode::Parallel);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn usage_errors_exit_with_two() {
        let err = Cli::try_parse_from(["bundle_validator"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);

        let err = Cli::try_parse_from(["bundle_validator", "--profile", "dv360", "a.zip"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
    }
}
