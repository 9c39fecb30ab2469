use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the muster binary.
#[derive(Debug, Parser)]
#[command(name = "muster", version, about = "Muster record service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MUSTER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Print the integrity digest of a payload using the configured secret.
    Digest(DigestArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct DigestArgs {
    /// Payload to digest, e.g. an id, a filter value or "Default Payload".
    #[arg(value_name = "PAYLOAD", allow_negative_numbers = true)]
    pub payload: String,

    /// Override the shared secret instead of reading it from configuration.
    #[arg(long = "integrity-secret", value_name = "SECRET")]
    pub secret: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the query cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-expiration-minutes", value_name = "MINUTES")]
    pub cache_expiration_minutes: Option<u64>,

    /// Override the cache key format (delimited|concatenated).
    #[arg(long = "cache-key-format", value_name = "FORMAT")]
    pub cache_key_format: Option<String>,

    /// Toggle request digest enforcement.
    #[arg(
        long = "integrity-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub integrity_enabled: Option<bool>,
}
