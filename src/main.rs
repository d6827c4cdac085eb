//! Daily Spark MCP Server - Main Entry Point
//!
//! This is the main entry point for the daily reminder server.
//! The actual implementation is in the `daily_spark` library.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use daily_spark::{Args, Settings, SparkServerHandler};
use log::info;
use mcp_attr::server::serve_stdio;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Check if no arguments were provided (except the program name)
    if std::env::args().len() == 1 {
        // No arguments provided, show help and exit with error code
        let mut cmd = Args::command();
        cmd.print_help().ok();
        println!(); // Add a newline after help
        std::process::exit(2);
    }

    let args = Args::parse();

    // stdout carries the MCP protocol; env_logger writes to stderr
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.as_str()),
    )
    .init();

    let settings = Settings::from_args(&args)?;
    info!(
        "Starting Daily Spark with {} ({} quotes)",
        settings.state_file.display(),
        settings.catalog.len()
    );

    let handler = SparkServerHandler::new(&settings).await?;
    serve_stdio(handler).await?;
    info!("Client disconnected, stopping reminder clock");
    Ok(())
}
