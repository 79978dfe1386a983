use appstore_connect_mcp::config::AppConfig;
use appstore_connect_mcp::services::logger::init_tracing;
use clap::Parser;

/// MCP server exposing App Store Connect over stdio.
#[derive(Debug, Parser)]
#[command(name = "appstore-connect-mcp", version)]
struct Args {
    /// Log at debug level regardless of RUST_LOG / LOG_LEVEL.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dotenvy::dotenv().ok();
    init_tracing(args.verbose);

    let config = AppConfig::from_env();
    if let Err(err) = appstore_connect_mcp::mcp::server::run_stdio(config).await {
        eprintln!("appstore-connect-mcp: {}", err);
        std::process::exit(1);
    }
}
