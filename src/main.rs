//! Netly - Modern Netcat Alternative
//!
//! Listen for or dial a single TCP peer and relay standard input/output over
//! the connection, either directly from the command line or through the
//! interactive navigator.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netly::{
    config::ConfigManager, navigator, Config, Console, Establisher, RelayEngine, Session,
    ShutdownCoordinator, Target, Theme,
};

/// CLI arguments for netly
#[derive(Parser, Debug)]
#[command(name = "netly")]
#[command(about = "Netly - Modern Netcat Alternative")]
#[command(version)]
#[command(author = "penguinshero")]
#[command(long_about = "
Netly - Modern Netcat Alternative

Opens one TCP connection and relays standard input to the peer and the
peer's data to standard output, until either side finishes.

Run without a command to start the interactive navigator.

Environment variables:
  RUST_LOG - Log filter, overrides --log-level (e.g. netly=debug)
")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait on a port for one incoming connection
    Listen {
        /// Port to listen on
        port: u16,
    },
    /// Connect to a remote host
    Connect {
        /// Host name or IP address
        host: String,
        /// Port to connect to
        port: u16,
    },
    /// Start the interactive navigator
    Interactive,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if let Err(e) = init_tracing(&args) {
        eprintln!("Failed to initialise logging: {:#}", e);
        std::process::exit(1);
    }

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            Console::new(Theme::default()).error(format!("{:#}", e));
            1
        }
    };

    // The blocking stdin reader behind the relay cannot be cancelled, so
    // leave without waiting for the runtime to wind down.
    debug!("Exiting with code {}", code);
    std::process::exit(code);
}

async fn run(args: CliArgs) -> Result<i32> {
    let config = ConfigManager::from_cli(Some(args.log_level.as_str()), args.verbose)?;
    let theme = Theme::default();
    let console = Console::new(theme);

    info!("Starting netly v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Interactive) {
        Command::Listen { port } => listen(&config, &console, port).await,
        Command::Connect { host, port } => connect(&config, &console, host, port).await,
        Command::Interactive => interactive(&config, &console, &theme).await,
    }
}

async fn listen(config: &Config, console: &Console, port: u16) -> Result<i32> {
    let establisher = Establisher::from_config(config);

    let pending = match establisher.bind(port).await {
        Ok(pending) => pending,
        Err(e) => {
            console.error(&e);
            return Ok(1);
        }
    };
    console.info(format!("Listening on {}", pending.local_addr()));

    let session = match pending.accept().await {
        Ok(session) => session,
        Err(e) => {
            console.error(&e);
            return Ok(1);
        }
    };
    if let Some(peer) = session.remote_addr() {
        console.success(format!("Connection from {}", peer));
    }

    relay(config, console, session).await
}

async fn connect(config: &Config, console: &Console, host: String, port: u16) -> Result<i32> {
    let establisher = Establisher::from_config(config);
    let target = Target::Dial {
        host,
        port: port.to_string(),
    };

    console.info(format!("Connecting to {}...", target));
    let session = match establisher.establish(&target).await {
        Ok(session) => session,
        Err(e) => {
            console.error(&e);
            return Ok(1);
        }
    };
    console.success(format!("Connected to {}", target));

    relay(config, console, session).await
}

async fn interactive(config: &Config, console: &Console, theme: &Theme) -> Result<i32> {
    let session = match navigator::run(config, theme).await {
        Ok(Some(session)) => session,
        Ok(None) => return Ok(0),
        Err(e) => {
            console.error(format!("{:#}", e));
            return Ok(1);
        }
    };

    match session.remote_addr() {
        Some(peer) => console.success(format!("Connected with {}", peer)),
        None => console.success("Connected"),
    }

    relay(config, console, session).await
}

/// Relay stdin/stdout over the session until either side finishes
async fn relay(config: &Config, console: &Console, session: Session) -> Result<i32> {
    let mut engine = RelayEngine::from_config(config);

    // Signals only become a graceful close once there is a session to close.
    // The engine keeps a receiver, so a signal caught before `run` still counts.
    let coordinator = ShutdownCoordinator::new(engine.shutdown_handle());
    let signals = tokio::spawn(async move {
        if let Err(e) = coordinator.listen_for_signals().await {
            warn!("Error setting up signal handlers: {}", e);
        }
    });

    let outcome = engine
        .run(session, tokio::io::stdin(), tokio::io::stdout())
        .await;
    signals.abort();

    let outcome = outcome?;
    console.outcome(&outcome);
    Ok(0)
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // Stdout carries the relayed bytes
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .try_init()?;

    Ok(())
}
