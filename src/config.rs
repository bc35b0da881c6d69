use clap::Parser;

/// Server settings, read from command-line flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "proof_ledger", version, about = "A minimal proof-of-work ledger with a JSON HTTP API")]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LEDGER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "LEDGER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LEDGER_LOG", default_value = "info")]
    pub log_level: String,
}
