use clap::{Args, Parser, Subcommand, ValueEnum};
use pom_core::{FetchFailurePolicy, ResolverConfig, Scope};
use std::path::PathBuf;

/// Inspect Maven POM files: effective model, dependency tree, plugins.
#[derive(Parser, Debug)]
#[command(name = "pom-reader", version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    #[command(flatten)]
    pub(crate) global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Summarize a project: coordinates, Java version, dependencies, plugins, conflicts
    Analyze {
        pom: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List resolved dependencies
    Deps {
        pom: PathBuf,
        /// Print the dependency tree instead of the flattened list
        #[arg(long)]
        tree: bool,
        /// Only show dependencies with this scope
        #[arg(long, value_parser = parse_scope)]
        scope: Option<Scope>,
        /// Only show dependencies whose groupId starts with this prefix
        #[arg(long)]
        group: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List effective build plugins
    Plugins {
        pom: PathBuf,
        /// Only show plugins whose groupId starts with this prefix
        #[arg(long)]
        group: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the interpolated property table
    Properties {
        pom: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write the full analysis report as JSON
    Export {
        pom: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Command {
    pub(crate) fn pom(&self) -> &PathBuf {
        match self {
            Self::Analyze { pom, .. }
            | Self::Deps { pom, .. }
            | Self::Plugins { pom, .. }
            | Self::Properties { pom, .. }
            | Self::Export { pom, .. } => pom,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct GlobalArgs {
    /// Local repository root (defaults to ~/.m2/repository)
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) repository: Option<PathBuf>,

    /// JSON resolver options file
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Activate a profile; may be repeated
    #[arg(short = 'P', long = "profile", global = true, value_name = "ID")]
    pub(crate) profiles: Vec<String>,

    /// Define a property override; may be repeated
    #[arg(short = 'D', long = "define", global = true, value_name = "KEY=VALUE", value_parser = parse_define)]
    pub(crate) defines: Vec<(String, String)>,

    /// Deepest dependency level to resolve, direct dependencies being 0
    #[arg(long, global = true, value_name = "N")]
    pub(crate) max_depth: Option<usize>,

    /// Record missing dependency POMs instead of failing
    #[arg(long, global = true)]
    pub(crate) lenient: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub(crate) log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) log_file: Option<PathBuf>,
}

impl GlobalArgs {
    /// Layers command-line options over `base`, usually the `--config` file.
    pub(crate) fn apply_to(&self, mut base: ResolverConfig) -> ResolverConfig {
        for profile in &self.profiles {
            if !base.active_profiles.contains(profile) {
                base.active_profiles.push(profile.clone());
            }
        }
        base.system_properties.extend(self.defines.iter().cloned());
        if let Some(depth) = self.max_depth {
            base.max_depth = Some(depth);
        }
        if self.lenient {
            base.fetch_failure = FetchFailurePolicy::MarkUnresolved;
        }
        base
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn parse_scope(s: &str) -> Result<Scope, String> {
    Scope::from_name(s).ok_or_else(|| {
        format!("unknown scope '{s}' (expected compile, runtime, test, provided, system or import)")
    })
}
