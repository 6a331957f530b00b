// # setip - address reporting agent
//
// Thin integration layer: parses the command line, installs logging, wires
// the DNS, HTTP and NIC crates into a `DeliveryLoop` and runs it until
// SIGINT or SIGTERM.
//
// ## Configuration
//
// Every flag has an environment fallback:
// - `--cid` / `SETIP_CID`: client id (required)
// - `--loglevel` / `SETIP_LOGLEVEL`: debug, info, warn or error (default error)
// - `--api-url` / `SETIP_API_URL`: collector URL
// - `--dns`: DNS server to query, repeatable (`localhost` is the system resolver)
//
// ## Example
//
// ```bash
// setip --cid 3f2a9c --loglevel info
// ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use setip_core::{AgentConfig, AgentEvent, DeliveryLoop};
use setip_dns::MultiServerResolver;
use setip_http::DirectIpDelivery;
use setip_nic::InterfaceAddressSource;
use std::future::Future;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Project page, shown in the banner and on exit
const WEB: &str = "https://setip.eu.org";

const BANNER: &str = r"
    ┌─┐┌─┐┌┬┐┬┌─┐
    └─┐├┤  │ │├─┘
    └─┘└─┘ ┴ ┴┴";

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SetipExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<SetipExitCode> for ExitCode {
    fn from(code: SetipExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "setip", version, about)]
struct Cli {
    /// Client ID
    #[arg(long, env = "SETIP_CID")]
    cid: String,

    /// Log level
    #[arg(long, env = "SETIP_LOGLEVEL", value_enum, ignore_case = true, default_value_t = LogLevel::Error)]
    loglevel: LogLevel,

    /// Collector URL
    #[arg(long, env = "SETIP_API_URL", default_value = setip_core::config::DEFAULT_API_URL)]
    api_url: String,

    /// DNS server to query, in order; repeat to override the built-in list
    #[arg(long = "dns", value_name = "SERVER")]
    dns: Vec<String>,
}

impl Cli {
    fn into_config(self) -> AgentConfig {
        let mut config = AgentConfig::new(self.cid);
        config.api_url = self.api_url;
        if !self.dns.is_empty() {
            config.dns_servers = self.dns;
        }
        config
    }
}

fn banner() -> String {
    let rule = "_".repeat(35);
    format!(
        "{}      {}\n{}\nAuthor: {}\nDocument: {}\n{}",
        BANNER,
        env!("CARGO_PKG_VERSION"),
        rule,
        env!("CARGO_PKG_AUTHORS"),
        WEB,
        rule
    )
}

fn main() -> ExitCode {
    println!("{}", banner());

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                SetipExitCode::ConfigError
            } else {
                SetipExitCode::CleanShutdown
            };
            let _ = e.print();
            return code.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.loglevel))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SetipExitCode::ConfigError.into();
    }

    let config = cli.into_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return SetipExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SetipExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_agent(config).await {
            Ok(()) => {
                println!("\nGoodbye! Thank you for using [{}]!", WEB);
                SetipExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Agent error: {}", e);
                SetipExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the collaborators and run the loop until a shutdown signal
async fn run_agent(config: AgentConfig) -> Result<()> {
    let timeout = config.loop_config.connect_timeout();

    let (agent, events) = DeliveryLoop::new(
        Box::new(MultiServerResolver::with_timeout(timeout)),
        Box::new(DirectIpDelivery::with_connect_timeout(timeout)),
        Box::new(InterfaceAddressSource::new()),
        config,
    )?;

    let reporter = tokio::spawn(report_pushes(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(forward_shutdown(wait_for_shutdown(), shutdown_tx));

    agent.run_with_shutdown(Some(shutdown_rx)).await?;

    drop(agent);
    let _ = reporter.await;

    Ok(())
}

/// Print a timestamped line for every delivered report
async fn report_pushes(mut events: mpsc::Receiver<AgentEvent>) {
    while let Some(event) = events.recv().await {
        if let AgentEvent::Pushed { .. } = event {
            println!(
                "{} Information has been pushed",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
}

/// Fire `shutdown_tx` once `signal` resolves
///
/// When the handlers cannot be installed the sender is held forever, so the
/// loop keeps running instead of reading the dropped sender as a shutdown.
async fn forward_shutdown(
    signal: impl Future<Output = Result<&'static str>>,
    shutdown_tx: oneshot::Sender<()>,
) {
    match signal.await {
        Ok(signal) => {
            info!("Received shutdown signal: {}", signal);
            let _ = shutdown_tx.send(());
        }
        Err(e) => {
            error!("Signal handling failed, running without graceful shutdown: {}", e);
            std::future::pending::<()>().await;
            drop(shutdown_tx);
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(received)
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["setip", "--cid", "abc123"]).unwrap();
        assert_eq!(cli.loglevel, LogLevel::Error);

        let config = cli.into_config();
        assert_eq!(config.client_id, "abc123");
        assert_eq!(config.api_url, setip_core::config::DEFAULT_API_URL);
        assert_eq!(config.dns_servers.len(), 5);
        assert_eq!(config.dns_servers[0], "localhost");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_dns_override_keeps_order() {
        let cli = Cli::try_parse_from([
            "setip", "--cid", "abc123", "--dns", "8.8.8.8", "--dns", "localhost",
        ])
        .unwrap();

        let config = cli.into_config();
        assert_eq!(config.dns_servers, vec!["8.8.8.8", "localhost"]);
    }

    #[test]
    fn test_cli_loglevel_case_insensitive() {
        let cli = Cli::try_parse_from(["setip", "--cid", "x", "--loglevel", "WARN"]).unwrap();
        assert_eq!(Level::from(cli.loglevel), Level::WARN);
    }

    #[test]
    fn test_banner_names_author_and_document() {
        let banner = banner();
        assert!(banner.contains("Author: dco\n"));
        assert!(banner.contains("Document: https://setip.eu.org\n"));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn test_signal_fires_shutdown() {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(forward_shutdown(async { Ok("SIGTERM") }, tx));

        let fired = tokio::time::timeout(std::time::Duration::from_secs(1), rx).await;
        assert!(matches!(fired, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_failed_signal_setup_keeps_loop_running() {
        let (tx, rx) = oneshot::channel();
        let forwarder = tokio::spawn(forward_shutdown(
            async { Err(anyhow::anyhow!("Failed to setup SIGTERM handler")) },
            tx,
        ));

        // Neither a signal nor a dropped sender reaches the loop
        let fired = tokio::time::timeout(std::time::Duration::from_millis(200), rx).await;
        assert!(fired.is_err());

        forwarder.abort();
    }

    #[test]
    fn test_cli_rejects_unknown_loglevel() {
        assert!(Cli::try_parse_from(["setip", "--cid", "x", "--loglevel", "trace"]).is_err());
    }
}
