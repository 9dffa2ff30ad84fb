//! o4n - host reachability scanner and device config renderer
//!
//! This is the main entry point for the o4n CLI.

mod cli;

use anyhow::Result;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use o4n::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = Config::load(cli.config_file.as_ref());
    let log_level = config
        .as_ref()
        .map(|c| c.logging.log_level.clone())
        .unwrap_or_else(|_| "warn".to_string());
    init_logging(cli.verbosity(), &log_level);

    let config = config.unwrap_or_else(|e| {
        if cli.verbosity() >= 1 {
            eprintln!("Warning: Failed to load config: {:#}", e);
        }
        Config::default()
    });

    let mut ctx = CommandContext::new(&cli, config);

    let exit_code = match dispatch(&cli, &mut ctx).await {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            exit_code_for(&e)
        }
    };

    ctx.output.flush();
    std::process::exit(exit_code);
}

async fn dispatch(cli: &Cli, ctx: &mut CommandContext) -> Result<i32> {
    match &cli.command {
        Commands::Unreachable(args) => args.run(ctx).await,
        Commands::Render(args) => args.run(ctx).await,
        Commands::ListHosts(args) => args.run(ctx).await,
        Commands::Completions(args) => {
            if args.instructions {
                cli::completions::print_installation_instructions(args.shell);
            } else {
                cli::completions::generate_completions(args.shell);
            }
            Ok(0)
        }
    }
}

/// Map an error chain to a process exit code
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<o4n::Error>() {
                Some(e.exit_code())
            } else if cause.is::<o4n::inventory::InventoryError>() {
                Some(5)
            } else {
                None
            }
        })
        .unwrap_or(1)
}

/// Initialize logging based on verbosity level; `-v` flags win over the
/// configured level and `RUST_LOG` wins over both
fn init_logging(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}
