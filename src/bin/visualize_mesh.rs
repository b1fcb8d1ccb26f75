//! Exports every scope of a mesh as a legacy VTK file.
//!
//! Files land in `<out-dir>/<mesh name>/<scope full name>.vtk`.

use clap::Parser;
use mesh_refine::io::{read_mesh, with_default_extension};
use mesh_refine::io::vtk::write_scope_files;
use mesh_refine::mesh_error::MeshRefineError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "visualize_mesh", version, about, long_about = None)]
struct Cli {
    /// Input mesh; `.mdpa` is appended when there is no extension
    input: PathBuf,
    /// Directory that receives the per-mesh folder
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<(), MeshRefineError> {
    let mesh = read_mesh(with_default_extension(&cli.input))?;
    for path in write_scope_files(&mesh, &cli.out_dir)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("visualize_mesh: {e}");
            ExitCode::FAILURE
        }
    }
}
