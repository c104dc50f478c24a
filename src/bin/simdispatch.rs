//! simdispatch - resolve a simulation configuration and run it
//!
//! Loads a JSON configuration, applies `--set` overrides, and dispatches it
//! to a solver executable registered with `--backend`. The updated
//! configuration, trajectory included, is written to `--out` or stdout.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use simdispatch::{config, DispatchResult, Overrides, Pipeline, ProcessBackend, SolverRegistry};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "simdispatch")]
#[command(about = "Resolve a simulation configuration and dispatch it to a solver")]
struct Cli {
    /// Path to the JSON configuration
    config: PathBuf,

    /// Override one option, e.g. `--set report=2` or `--set solver=\"ssa\"`
    #[arg(long = "set", value_name = "KEY=JSON")]
    overrides: Vec<String>,

    /// Register a solver executable, e.g. `--backend nsm=./nsm-solver`
    #[arg(long = "backend", value_name = "NAME=EXE", value_parser = parse_named)]
    backends: Vec<Named>,

    /// Build command for a registered solver, e.g. `--build nsm=./build-nsm.sh`
    #[arg(long = "build", value_name = "NAME=PROGRAM", value_parser = parse_named)]
    builds: Vec<Named>,

    /// Write the updated configuration here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

/// A `NAME=VALUE` command-line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Named {
    name: String,
    value: String,
}

fn parse_named(arg: &str) -> Result<Named, String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => Ok(Named {
            name: name.to_string(),
            value: value.to_string(),
        }),
        _ => Err(format!("expected NAME=VALUE, got '{arg}'")),
    }
}

impl Cli {
    /// First `--build` name with no matching `--backend`.
    fn unmatched_build(&self) -> Option<&str> {
        self.builds
            .iter()
            .map(|b| b.name.as_str())
            .find(|name| !self.backends.iter().any(|b| b.name == *name))
    }

    fn registry(&self) -> SolverRegistry {
        let mut backends: BTreeMap<&str, ProcessBackend> = self
            .backends
            .iter()
            .map(|b| (b.name.as_str(), ProcessBackend::new(&b.value)))
            .collect();
        for build in &self.builds {
            if let Some(backend) = backends.remove(build.name.as_str()) {
                backends.insert(
                    build.name.as_str(),
                    backend.with_build_command(&build.value, Vec::<String>::new()),
                );
            }
        }

        let mut registry = SolverRegistry::new();
        for (name, backend) in backends {
            registry.register(name, backend);
        }
        registry
    }
}

fn run(cli: &Cli) -> DispatchResult<()> {
    let prior = config::load(&cli.config)?;
    let overrides = Overrides::from_assignments(&cli.overrides)?;
    let pipeline = Pipeline::new(cli.registry());

    let summary = pipeline.execute(prior, &overrides)?;
    info!(
        run_id = %summary.run_id,
        resolved = summary.resolved_by.is_some(),
        built = summary.artifact.is_some(),
        "simulation finished"
    );

    match &cli.out {
        Some(path) => config::save(path, &summary.config)?,
        None => println!("{}", config::to_json_pretty(&summary.config)?),
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("simdispatch=info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Some(name) = cli.unmatched_build() {
        Cli::command()
            .error(
                ErrorKind::InvalidValue,
                format!("--build {name}: no --backend registered under that name"),
            )
            .exit();
    }
    if let Err(e) = run(&cli) {
        error!(stage = ?e.stage(), "{e}");
        std::process::exit(1);
    }
}
