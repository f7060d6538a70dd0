//! gemini-bridge binary entry point.

use clap::Parser;
use gemini_bridge::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout is reserved for command output and the MCP
/// stdio protocol.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gemini_bridge=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                #[allow(clippy::print_stdout)]
                {
                    println!("{output}");
                }
            }
        }
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}
