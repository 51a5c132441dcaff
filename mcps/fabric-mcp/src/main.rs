//! Fabric MCP Server
//!
//! Runs on stdio by default. See `fabric-mcp --help` for the setup commands.

use std::process::ExitCode;

use clap::Parser;
use fabric_mcp::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    cli::run(Cli::parse()).await
}
