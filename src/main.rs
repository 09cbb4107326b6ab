//! `berth` command-line entry point.
//!
//! A small diagnostic front end over the library: resolve the host a
//! container is reachable at, look up a published port, or launch a
//! container. Domain errors are converted to `eyre` reports at this
//! boundary only.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/berth/config.toml` or path from `BERTH_CONFIG_PATH`)
//! 3. Environment variables (`BERTH_*`)
//! 4. Command-line arguments

use std::io::Write;

use berth::config::{AppConfig, Cli, Commands, HostArgs, PortArgs, RunArgs, load_config};
use berth::engine::{ContainerRef, EngineHandle, RunSpec, SocketResolver, parse_port_mapping};
use berth::error::{ConfigError, Result as BerthResult};
use berth::probe::SystemProbe;
use clap::Parser;
use eyre::{Report, Result as EyreResult, eyre};
use mockable::DefaultEnv;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "BERTH_LOG";

fn main() -> EyreResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli).map_err(Report::from)?;

    run(&cli, &config)
}

/// Install the stderr log subscriber.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: &AppConfig) -> EyreResult<()> {
    let env = DefaultEnv::new();
    let resolver = SocketResolver::new(&env);
    let handle = EngineHandle::connect(config.engine_socket.as_deref(), &resolver)
        .map_err(Report::from)?;
    let probe = SystemProbe::new(&env)
        .with_host_alias(config.resolve.internal_host_alias.as_str())
        .resolve_host_alias();

    match &cli.command {
        Commands::Host(args) => print_host(&handle, &probe, config, args),
        Commands::Port(args) => print_port(&handle, args).map_err(Report::from),
        Commands::Run(args) => run_container(&handle, args),
    }
}

/// Print the host at which a container is reachable.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_host(
    handle: &EngineHandle,
    probe: &SystemProbe<'_, DefaultEnv>,
    config: &AppConfig,
    args: &HostArgs,
) -> EyreResult<()> {
    let container = ContainerRef::from(args.container.as_str());
    let host = handle
        .resolve_host(
            probe,
            &config.resolve.network,
            &container,
            &config.resolve.fallback_host,
        )
        .ok_or_else(|| {
            eyre!(
                "cannot tell where container '{container}' is reachable from engine endpoint '{}'",
                handle.base_url()
            )
        })?;
    println!("{host}");
    Ok(())
}

/// Print the host port published for a container port.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_port(handle: &EngineHandle, args: &PortArgs) -> BerthResult<()> {
    let container = ContainerRef::from(args.container.as_str());
    let host_port = handle.host_port(&container, &args.port)?;
    println!("{host_port}");
    Ok(())
}

/// Launch a container and relay its output.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn run_container(handle: &EngineHandle, args: &RunArgs) -> EyreResult<()> {
    let spec = build_run_spec(args).map_err(Report::from)?;
    let outcome = handle.run_container(&spec).map_err(Report::from)?;

    let Some(exit_code) = outcome.exit_code() else {
        println!("{}", outcome.container());
        return Ok(());
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(outcome.output())?;
    stdout.flush()?;

    if exit_code == 0 {
        Ok(())
    } else {
        Err(eyre!(
            "container '{}' exited with status {exit_code}",
            outcome.container()
        ))
    }
}

fn build_run_spec(args: &RunArgs) -> BerthResult<RunSpec> {
    let mut spec = RunSpec::new(args.image.as_str())?
        .with_argv(args.command.clone())
        .with_name(args.name.clone())
        .detached(args.detach)
        .auto_remove(args.rm)
        .capture_stderr(true);

    for pair in &args.env {
        let (key, value) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
            field: String::from("env"),
            reason: format!("'{pair}' is not in KEY=VALUE form"),
        })?;
        spec = spec.with_env(key, value);
    }

    for mapping in &args.publish {
        let (container_port, host_port) = parse_port_mapping(mapping)?;
        spec = spec.with_port(&container_port, host_port);
    }

    Ok(spec)
}
