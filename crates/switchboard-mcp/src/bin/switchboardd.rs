use std::io;

use switchboard_mcp::config::ENV_LOG;
use switchboard_mcp::{ServerConfig, SwitchboardServer};
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    // stdout carries the protocol; logs go to stderr
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let config = ServerConfig::from_env()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    SwitchboardServer::new(config).serve_stdio()
}
