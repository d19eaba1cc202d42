use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use std::{io::IsTerminal, net::SocketAddr, sync::Arc};
use tracing_subscriber::{self, EnvFilter};

mod config;
mod lookup;
mod osm_links;
mod resolver;
mod server;
mod service;
mod upstream;

use config::Config;
use server::BusServer;
use service::BusService;

const AFTER_HELP: &str = "\
MCP Server Information:
    This is an MCP (Model Context Protocol) server that automatically detects
    when started by an MCP client (via piped stdin) and enters server mode.
    Use `serve --http` to expose it over streamable HTTP on /mcp instead.

    For MCP Inspector:
      npx @modelcontextprotocol/inspector <path-to-busram-mcp>

Reference data:
    BUS_STOPS_CSV and BUS_ROUTES_CSV point at the stop and route tables.
    Without them searches report that no data is loaded.";

#[derive(Parser)]
#[command(name = "busram-mcp")]
#[command(about = "Bus arrival MCP server - stop search, arrivals and vehicle positions", long_about = None)]
#[command(version)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (listens on stdin/stdout unless --http is given)
    Serve {
        /// Serve streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Address for the HTTP transport
        #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },

    /// List server capabilities
    #[command(subcommand)]
    List(ListCommands),

    /// Search stops by name, like the search_stop tool
    Search { keyword: String },

    /// Show arrivals at a stop, like the get_arrivals tool
    Arrivals { stop_identifier: String },

    /// Show vehicle positions of a route, like the get_route_position tool
    Position { route_name: String },

    #[command(hide = true)]
    Version,
}

#[derive(Subcommand)]
enum ListCommands {
    /// List all available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List(ListCommands::Tools)) => {
            let service = Arc::new(BusService::from_config(&cli.config)?);
            BusServer::new(service).list_tools();
            Ok(())
        }
        Some(Commands::Serve { http, bind }) => {
            let server = BusServer::new(Arc::new(BusService::from_config(&cli.config)?));
            if http {
                server::http::serve(server, bind).await
            } else {
                start_mcp_server(server).await
            }
        }
        Some(Commands::Search { keyword }) => {
            let service = BusService::from_config(&cli.config)?;
            println!("{}", service.search_stop(&keyword));
            Ok(())
        }
        Some(Commands::Arrivals { stop_identifier }) => {
            let service = BusService::from_config(&cli.config)?;
            println!("{}", service.get_arrivals(&stop_identifier).await);
            Ok(())
        }
        Some(Commands::Position { route_name }) => {
            let service = BusService::from_config(&cli.config)?;
            println!("{}", service.get_route_position(&route_name).await);
            Ok(())
        }
        Some(Commands::Version) => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            // Check if stdin is a TTY (terminal) or piped from an MCP client
            if std::io::stdin().is_terminal() {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                Ok(())
            } else {
                let server = BusServer::new(Arc::new(BusService::from_config(&cli.config)?));
                start_mcp_server(server).await
            }
        }
    }
}

async fn start_mcp_server(server: BusServer) -> Result<()> {
    tracing::info!("Bus MCP Server starting");

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}
