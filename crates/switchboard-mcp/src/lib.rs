pub mod config;
pub mod protocol;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use server::SwitchboardServer;
