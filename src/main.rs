use clap::Parser;
use listo::cli::commands::Cli;
use listo::cli::handlers;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Quiet by default; set LISTO_LOG=debug (etc.) to see store internals.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("LISTO_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
