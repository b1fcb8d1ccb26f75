//! Uniformly refines a triangular mesh once.
//!
//! ```text
//! refine_mesh coarse.mdpa fine.mdpa
//! refine_mesh coarse fine          # `.mdpa` appended
//! ```

use clap::{Parser, ValueEnum};
use mesh_refine::algs::refine::{RefineOptions, refine_hierarchy};
use mesh_refine::io::{read_mesh, with_default_extension, write_mesh};
use mesh_refine::topology::validation::NonManifoldHandling;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NonManifold {
    Ignore,
    Warn,
    Error,
}

impl From<NonManifold> for NonManifoldHandling {
    fn from(value: NonManifold) -> Self {
        match value {
            NonManifold::Ignore => NonManifoldHandling::Ignore,
            NonManifold::Warn => NonManifoldHandling::Warn,
            NonManifold::Error => NonManifoldHandling::Error,
        }
    }
}

/// Split every triangle 1→4 and every boundary condition 1→2.
#[derive(Parser, Debug)]
#[command(name = "refine_mesh", version, about, long_about = None)]
struct Cli {
    /// Input mesh; `.mdpa` is appended when there is no extension
    input: PathBuf,
    /// Output mesh; `.mdpa` is appended when there is no extension
    output: PathBuf,
    /// Worker threads (defaults to all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Policy for edges shared by more than two elements
    #[arg(long, value_enum, default_value_t = NonManifold::Warn)]
    non_manifold: NonManifold,
    /// Skip validation of the input hierarchy
    #[arg(long)]
    no_validate: bool,
    /// Log pipeline stages
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<(), mesh_refine::mesh_error::MeshRefineError> {
    let input = with_default_extension(&cli.input);
    let output = with_default_extension(&cli.output);

    let coarse = read_mesh(&input)?;
    println!("input {}:\n{}", input.display(), coarse.summary());

    let options = RefineOptions {
        threads: cli.threads,
        non_manifold: cli.non_manifold.into(),
        validate_input: !cli.no_validate,
    };
    let refined = refine_hierarchy(&coarse, &options)?;

    write_mesh(&refined.mesh, &output)?;
    println!("output {}:\n{}", output.display(), refined.mesh.summary());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("refine_mesh: {e}");
            ExitCode::FAILURE
        }
    }
}
