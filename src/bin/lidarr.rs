mod commands;

use clap::Parser;
use commands::config::{handle_save_connection, handle_show};
use commands::utils::{build_context, GlobalArgs};
use commands::{execute_command, Commands, ConfigCommands};
use lidarr_api::LidarrError;

/// Exit code used when the user interrupts a command.
const EXIT_INTERRUPTED: i32 = 130;

/// Lidarr music server command-line tools
#[derive(Parser)]
#[command(
    name = "lidarr",
    about = "Search, monitor and maintain a Lidarr music server",
    long_about = None,
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Show detailed debug information
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Config(ConfigCommands::SaveConnection) => {
            handle_save_connection(&cli.global)?;
            Ok(0)
        }
        Commands::Config(ConfigCommands::Show) => {
            handle_show(&cli.global)?;
            Ok(0)
        }
        command => {
            let mut ctx = build_context(&cli.global)?;
            execute_command(command, &mut ctx).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.verbose {
        println!("🔍 Verbose mode enabled");
    }

    let outcome = tokio::select! {
        outcome = run(cli) => outcome,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nOperation cancelled by user");
            std::process::exit(EXIT_INTERRUPTED);
        }
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if matches!(e.downcast_ref::<LidarrError>(), Some(LidarrError::Cancelled)) {
                eprintln!("\n{e}");
                std::process::exit(EXIT_INTERRUPTED);
            }
            eprintln!("❌ Error: {e}");
            std::process::exit(1);
        }
    }
}
