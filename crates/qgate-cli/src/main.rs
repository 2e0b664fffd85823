use clap::Parser;
use qgate_cli::{run_cli, Cli};

fn main() {
    qgate_core::tracing::init_tracing();

    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(qgate_core::constants::EXIT_FAILURE);
        }
    }
}
