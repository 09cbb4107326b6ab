//! Command-line argument definitions for berth.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Command-line interface for berth.
#[derive(Debug, Parser)]
#[command(name = "berth")]
#[command(
    author,
    version,
    about = "Start containers and find the address they are reachable at"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Log at debug level unless `BERTH_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the host at which a container is reachable.
    Host(HostArgs),

    /// Print the host port published for a container port.
    Port(PortArgs),

    /// Create and start a container.
    Run(RunArgs),
}

/// Arguments for the `host` subcommand.
#[derive(Debug, Args)]
pub struct HostArgs {
    /// Container ID or name.
    pub container: String,
}

/// Arguments for the `port` subcommand.
#[derive(Debug, Args)]
pub struct PortArgs {
    /// Container ID or name.
    pub container: String,

    /// Container port, optionally with protocol (`6379` or `53/udp`).
    pub port: String,
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Image to run.
    pub image: String,

    /// Return once the container has started.
    #[arg(long, short)]
    pub detach: bool,

    /// Remove the container once it stops.
    #[arg(long)]
    pub rm: bool,

    /// Environment variable in `KEY=VALUE` form.
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Published port in `[host:]container[/protocol]` form.
    #[arg(long = "publish", short = 'p', value_name = "SPEC")]
    pub publish: Vec<String>,

    /// Container name.
    #[arg(long)]
    pub name: Option<String>,

    /// Command and arguments.
    #[arg(last = true)]
    pub command: Vec<String>,
}
