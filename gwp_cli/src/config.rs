use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Gateway protocol server and test gateway.
///
/// Serve sensor gateways over UDP and DTLS, or play the part of a gateway sending readings to a server.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// Path to a YAML settings file with transport and DTLS options. Built-in defaults are used if omitted.
    #[arg(long = "config", short = 'c', env = "GWP_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the server until interrupted.
    #[command(name = "serve", alias = "start")]
    Serve(ServeCommand),
    /// Send sample readings to a server, the way a gateway would.
    #[command(name = "send")]
    Send(SendCommand),
}

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// UDP address to listen on, e.g. `:7000`. May be repeated.
    #[arg(long = "udp")]
    pub udp: Vec<String>,
    /// DTLS address to listen on, e.g. `:7001`. May be repeated.
    #[arg(long = "dtls")]
    pub dtls: Vec<String>,
}

#[derive(Debug, Args)]
#[group(id = "target", required = true, multiple = false, args = ["udp", "dtls"])]
pub struct SendCommand {
    /// The server's UDP address.
    #[arg(long = "udp")]
    pub udp: Option<String>,
    /// The server's DTLS address.
    #[arg(long = "dtls")]
    pub dtls: Option<String>,
    /// Number of packets to send.
    #[arg(long = "count", short = 'n', default_value_t = 10)]
    pub count: u32,
    /// Pause between packets, in milliseconds.
    #[arg(long = "interval-ms", default_value_t = 2000)]
    pub interval_ms: u64,
}

pub struct GlobalOptions {
    pub config_file: Option<PathBuf>,
}

impl Config {
    pub fn to_parts(self) -> (GlobalOptions, CliCommand) {
        let global = GlobalOptions { config_file: self.config_file };
        (global, self.command)
    }
}
