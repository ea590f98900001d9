use clap::Parser;
use flow_aligner::cli::commands::{cmd_align, cmd_inspect};
use flow_aligner::cli::config::{Cli, Commands, apply_cli_overrides, load_config};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise each `-v` raises the level one step from `warn`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Align {
            data,
            cases,
            case,
            embedder,
            arbiter,
            graph,
            trace,
        } => {
            // CLI > config > defaults
            apply_cli_overrides(&mut config, embedder, arbiter, graph, trace.as_deref());
            let summary = cmd_align(&data, cases.as_deref(), case.as_deref(), &config)?;
            if !summary.failed.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::Inspect { data } => {
            cmd_inspect(&data)?;
        }
    }

    Ok(())
}
