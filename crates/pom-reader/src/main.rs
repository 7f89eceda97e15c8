mod cli;
mod discovery;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, GlobalArgs, OutputFormat};
use output::DependencyFilter;
use pom_core::{
    Analysis, Analyzer, InMemorySupplier, LocalRepositorySupplier, ResolverConfig, SupplierChain,
    default_local_repository,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Argument errors exit with status 2 from here.
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.global) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &GlobalArgs) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("invalid log level '{}'", args.log_level))?;

    if let Some(path) = &args.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.global).await?;
    let pom = cli.command.pom();
    let xml = tokio::fs::read_to_string(pom)
        .await
        .with_context(|| format!("failed to read {}", pom.display()))?;

    let supplier = build_supplier(&cli.global, pom, &xml).await?;
    let analysis = Analyzer::new(supplier, config)
        .analyze_str(&xml)
        .await
        .with_context(|| format!("failed to analyze {}", pom.display()))?;

    if let Command::Export {
        output: Some(path), ..
    } = &cli.command
    {
        let json = serde_json::to_vec_pretty(&analysis.report())?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("wrote report to {}", path.display());
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render(&mut out, &cli.command, &analysis)?;
    out.flush()?;
    Ok(())
}

fn render(out: &mut impl Write, command: &Command, analysis: &Analysis) -> Result<()> {
    match command {
        Command::Analyze { format, .. } => match format {
            OutputFormat::Table => output::print_summary(out, analysis),
            OutputFormat::Json => output::write_json(out, &analysis.report()),
        },
        Command::Deps {
            tree,
            scope,
            group,
            format,
            ..
        } => {
            let filter = DependencyFilter {
                scope: *scope,
                group: group.clone(),
            };
            match (format, tree) {
                (OutputFormat::Table, true) => output::print_dependency_tree(
                    out,
                    &analysis.model().gav().to_string(),
                    &filter.tree(analysis.dependency_tree()),
                ),
                (OutputFormat::Table, false) => {
                    output::print_dependency_list(out, &filter.flattened(analysis))
                }
                (OutputFormat::Json, true) => {
                    output::write_json(out, &filter.tree(analysis.dependency_tree()))
                }
                (OutputFormat::Json, false) => output::write_json(out, &filter.flattened(analysis)),
            }
        }
        Command::Plugins { group, format, .. } => {
            let plugins: Vec<_> = analysis
                .plugins()
                .iter()
                .filter(|p| {
                    group
                        .as_deref()
                        .is_none_or(|prefix| p.group_id.starts_with(prefix))
                })
                .collect();
            match format {
                OutputFormat::Table => output::print_plugins(out, &plugins),
                OutputFormat::Json => output::write_json(out, &plugins),
            }
        }
        Command::Properties { format, .. } => match format {
            OutputFormat::Table => output::print_properties(out, analysis),
            OutputFormat::Json => output::write_json(out, analysis.properties()),
        },
        Command::Export { .. } => output::write_json(out, &analysis.report()),
    }
}

async fn load_config(args: &GlobalArgs) -> Result<ResolverConfig> {
    let base = match &args.config {
        Some(path) => ResolverConfig::from_json_file(path)
            .await
            .with_context(|| format!("failed to load resolver options from {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    Ok(args.apply_to(base))
}

/// Parents found next to the POM come first, then the local repository.
async fn build_supplier(args: &GlobalArgs, pom: &Path, xml: &str) -> Result<Arc<SupplierChain>> {
    let on_disk = InMemorySupplier::new();
    let found = discovery::register_local_parents(pom, xml, &on_disk).await?;
    tracing::debug!("{} parent POMs found next to {}", found, pom.display());

    let mut chain = SupplierChain::new().with(on_disk);
    match args.repository.clone().or_else(default_local_repository) {
        Some(root) => {
            tracing::debug!("using local repository {}", root.display());
            chain.push(LocalRepositorySupplier::new(root));
        }
        None => tracing::warn!("no local repository configured, only parents on disk can be used"),
    }
    Ok(Arc::new(chain))
}
