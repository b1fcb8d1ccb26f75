//! Multiplies every node coordinate of a mesh by a constant factor.
//!
//! ```text
//! scale_mesh plate_mm plate 0.001   # reads plate_mm.mdpa, writes plate.mdpa
//! ```

use clap::Parser;
use mesh_refine::algs::transform::scale_coordinates;
use mesh_refine::io::{read_mesh, with_default_extension, write_mesh};
use mesh_refine::mesh_error::MeshRefineError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "scale_mesh", version, about, long_about = None)]
struct Cli {
    /// Input mesh; `.mdpa` is appended when there is no extension
    input: PathBuf,
    /// Output mesh; `.mdpa` is appended when there is no extension
    output: PathBuf,
    /// Scale factor, e.g. 0.001 to convert millimetres to metres
    factor: f64,
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<(), MeshRefineError> {
    let input = with_default_extension(&cli.input);
    let output = with_default_extension(&cli.output);

    let mut mesh = read_mesh(&input)?;
    scale_coordinates(&mut mesh, cli.factor);
    write_mesh(&mesh, &output)?;
    println!("{}", mesh.summary());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scale_mesh: {e}");
            ExitCode::FAILURE
        }
    }
}
