use clap::Parser;
use solidquant::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
