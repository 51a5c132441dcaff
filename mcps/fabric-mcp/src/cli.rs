//! Command-line interface
//!
//! With no subcommand the binary runs the stdio MCP server, which is what
//! editors launch. The other subcommands are for setup and troubleshooting.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use rmcp::{model::RawContent, transport::stdio, ServiceExt};

use fabric_common::auth::default_chain;
use fabric_common::{init_tracing, EmbeddableMcp, TracingOptions};

use crate::config::Config;
use crate::doctor;
use crate::lakehouse::{self, LakehouseBackend, LakehouseError, TdsLakehouse};
use crate::server::FabricMcpServer;
use crate::snippet::{self, Flavor, DEFAULT_SERVER_NAME};

#[derive(Parser, Debug)]
#[command(name = "fabric-mcp", version)]
#[command(about = "MCP server for Microsoft Fabric Lakehouse SQL, semantic models and Eventhouse KQL")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: ~/.fabric-mcp/config.toml)
    #[arg(long, short = 'c', env = "FABRIC_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Check configuration and Azure sign-in
    Doctor {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an editor configuration block for this server
    Snippet {
        /// Server id in the generated block
        #[arg(long, default_value = DEFAULT_SERVER_NAME)]
        name: String,
        /// Settings layout: vscode (.vscode/mcp.json) or claude (mcpServers)
        #[arg(long, default_value = "vscode")]
        flavor: Flavor,
        /// Launch command (default: path of this binary)
        #[arg(long)]
        command: Option<String>,
    },
    /// List external data sources and tables in the Lakehouse SQL endpoint
    Inventory,
    /// List the server's tools
    Tools,
    /// Call a tool directly
    Call {
        /// Tool name
        tool: String,
        /// Arguments as JSON
        #[arg(long, short)]
        args: Option<String>,
    },
}

/// Parse-independent entry point used by `main`
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let command = cli.command.clone().unwrap_or(Commands::Serve);

    // Setup commands print to stdout; keep their stderr quiet unless asked
    let mut log_options = TracingOptions::for_crate("fabric_mcp").with_verbosity(cli.verbose);
    if command != Commands::Serve && cli.verbose == 0 {
        log_options.level = tracing::Level::WARN;
    }
    init_tracing(&log_options)?;

    let config_path = cli.config.clone().or_else(Config::config_path);
    let config = Config::load_at(config_path)?;

    match command {
        Commands::Serve => serve(config).await,
        Commands::Doctor { json } => run_doctor(&config, json).await,
        Commands::Snippet { name, flavor, command } => {
            let command = command.unwrap_or_else(snippet::current_command);
            let block = snippet::render(&config, &name, flavor, &command);
            println!("{}", serde_json::to_string_pretty(&block)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Inventory => inventory(&config).await,
        Commands::Tools => {
            let server = FabricMcpServer::new(config)?;
            for tool in server.list_tools() {
                println!("{:<40} {}", tool.name, tool.description.as_deref().unwrap_or(""));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call { tool, args } => call(config, &tool, args.as_deref()).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<ExitCode> {
    tracing::info!("Starting Fabric MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let server = FabricMcpServer::new(config)?;
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");
    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(ExitCode::SUCCESS)
}

async fn run_doctor(config: &Config, json: bool) -> anyhow::Result<ExitCode> {
    let credential = default_chain(&config.auth_options());
    let report = doctor::run(config, credential.as_ref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Exit 1 if the endpoint is not configured, 2 if a query fails
async fn inventory(config: &Config) -> anyhow::Result<ExitCode> {
    let target = match config.sql_target() {
        Ok(target) => target,
        Err(missing) => {
            eprintln!("{}", missing);
            return Ok(ExitCode::from(1));
        }
    };

    println!("Using endpoint: {}  database: {}", target.host, target.database);

    let credential = default_chain(&config.auth_options());
    let backend = TdsLakehouse::new(target, credential, &config.lakehouse);

    match inventory_report(&backend).await {
        Ok(report) => {
            print!("{}", report);
            println!("Done.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error while querying the lakehouse: {}", e);
            Ok(ExitCode::from(2))
        }
    }
}

/// External data sources then tables, one per line
pub async fn inventory_report(backend: &dyn LakehouseBackend) -> Result<String, LakehouseError> {
    let mut out = String::new();

    let sources = lakehouse::list_external_data_sources(backend).await?;
    if sources.is_empty() {
        out.push_str("No external data sources found.\n");
    } else {
        out.push_str("External data sources:\n");
        for s in &sources {
            let _ = writeln!(out, " - {} ({}) {}", s.name, s.data_source_type, s.location);
        }
    }

    out.push('\n');

    let tables = lakehouse::list_tables(backend, None).await?;
    if tables.is_empty() {
        out.push_str("No tables found.\n");
    } else {
        out.push_str("Tables:\n");
        for t in &tables {
            let _ = writeln!(out, " - {}.{}", t.schema, t.name);
        }
    }

    Ok(out)
}

async fn call(config: Config, tool: &str, args: Option<&str>) -> anyhow::Result<ExitCode> {
    let params = match args {
        Some(raw) => serde_json::from_str(raw).context("--args must be a JSON object")?,
        None => serde_json::json!({}),
    };

    let server = FabricMcpServer::new(config)?;
    match server.call_tool(tool, params).await {
        Ok(result) => {
            for content in &result.content {
                if let RawContent::Text(text) = &content.raw {
                    println!("{}", text.text);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lakehouse::tests::FakeLakehouse;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::try_parse_from(["fabric-mcp"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_snippet_args() {
        let cli = Cli::try_parse_from(["fabric-mcp", "snippet", "--flavor", "claude", "--name", "fabric"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Snippet {
                name: "fabric".into(),
                flavor: Flavor::Claude,
                command: None,
            })
        );
    }

    #[test]
    fn test_bad_flavor_rejected() {
        assert!(Cli::try_parse_from(["fabric-mcp", "snippet", "--flavor", "emacs"]).is_err());
    }

    #[test]
    fn test_call_args_and_verbosity() {
        let cli = Cli::try_parse_from([
            "fabric-mcp",
            "-vv",
            "call",
            "kusto_query",
            "--args",
            r#"{"query": "T | take 1"}"#,
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Call { tool, args }) => {
                assert_eq!(tool, "kusto_query");
                assert!(args.unwrap().contains("take 1"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inventory_report() {
        let fake = FakeLakehouse::returning(
            &["a", "b", "c"],
            vec![vec![json!("dbo"), json!("orders"), json!("x")]],
        );

        let report = inventory_report(&fake).await.unwrap();
        assert!(report.contains("External data sources:\n - dbo (orders) x"));
        assert!(report.contains("Tables:\n - dbo.orders"));
        assert_eq!(fake.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_inventory_report_empty() {
        let fake = FakeLakehouse::returning(&["a"], vec![]);
        let report = inventory_report(&fake).await.unwrap();
        assert!(report.contains("No external data sources found."));
        assert!(report.contains("No tables found."));
    }
}
