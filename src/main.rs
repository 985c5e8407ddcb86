//! `revk` command-line entry point.

use clap::{Parser, Subcommand};
use log::error;
use revk::config::{load_global_args, load_with_reference_fallback};
use revk::{ApproveArgs, CollectArgs, GlobalArgs, ReviewArgs, RevkError, SubmitArgs};

mod commands;

#[derive(Parser)]
#[command(
    name = "revk",
    version,
    about = "Review pull requests incrementally with a language model"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review new commits, submit the verdict and record progress
    Review(ReviewArgs),
    /// Review new commits and save the result without submitting it
    Collect(CollectArgs),
    /// Submit a previously collected review
    Submit(SubmitArgs),
    /// Approve the current head without reviewing it
    Approve(ApproveArgs),
}

async fn run(cli: Cli) -> Result<(), RevkError> {
    let global = load_global_args(cli.global)?;
    match cli.command {
        Commands::Review(args) => {
            let args = load_with_reference_fallback(args)?;
            commands::run_review(args, &global).await
        }
        Commands::Collect(args) => {
            let args = load_with_reference_fallback(args)?;
            commands::run_collect(args, &global).await
        }
        Commands::Submit(args) => {
            let args = load_with_reference_fallback(args)?;
            commands::run_submit(args, &global).await
        }
        Commands::Approve(args) => {
            let args = load_with_reference_fallback(args)?;
            commands::run_approve(args, &global).await
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
    if let Err(e) = run(Cli::parse()).await {
        error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
