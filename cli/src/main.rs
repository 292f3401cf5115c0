//! StreakDuel CLI: drive the challenge view model against a live server.

mod config;
mod logging;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;

use streakduel_engine::{ChallengeViewModel, EngineConfig};
use streakduel_transport::{HttpTransport, IncomingSort};
use streakduel_types::{ChallengeId, InstallId, SystemClock};

use crate::config::CliConfig;
use crate::logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "streakduel", about = "StreakDuel challenge client")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "STREAKDUEL_CONFIG")]
    config: Option<PathBuf>,

    /// This device's install id.
    #[arg(long, env = "STREAKDUEL_INSTALL_ID")]
    install_id: Option<String>,

    /// Challenge server base URL, e.g. "https://host/api".
    #[arg(long, env = "STREAKDUEL_BASE_URL")]
    base_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "STREAKDUEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, env = "STREAKDUEL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SortArg {
    Recent,
    Streak,
}

impl From<SortArg> for IncomingSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Recent => IncomingSort::Recent,
            SortArg::Streak => IncomingSort::Streak,
        }
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Find players to challenge.
    Search { query: String },
    /// List challenges others sent you.
    Incoming {
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },
    /// Show your open challenge.
    Outgoing,
    /// Challenge another install.
    Challenge { target: String },
    /// Cancel or dismiss your challenge.
    Cancel { challenge_id: String },
    /// Accept a challenge and fight.
    Accept { challenge_id: String },
    /// Decline a challenge.
    Decline { challenge_id: String },
    /// Poll once for a battle result, print it and acknowledge it.
    Reveal,
    /// Open the screen: refresh everything and print the view state as JSON.
    Status,
    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(install_id) = &self.install_id {
            config.install_id = Some(install_id.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.transport.base_url = base_url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }
}

type ViewModel = ChallengeViewModel<HttpTransport>;

fn build_view_model(config: &CliConfig) -> anyhow::Result<ViewModel> {
    let install_id = config
        .install_id
        .as_deref()
        .ok_or_else(|| {
            anyhow!("no install id; pass --install-id or set install_id in the config file")
        })?;
    let install_id = InstallId::parse(install_id)?;
    let transport = HttpTransport::new(&config.transport)?;
    let engine: EngineConfig = config.engine.clone();
    Ok(ChallengeViewModel::new(
        install_id,
        Arc::new(transport),
        engine,
        Arc::new(SystemClock),
    ))
}

fn fail_with_banner(vm: &ViewModel, what: &str) -> anyhow::Error {
    match vm.active_banner() {
        Some(banner) => anyhow!("{what}: {}", render::banner_line(banner)),
        None => anyhow!("{what}: the server could not be reached or refused the request"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CliConfig::default(),
    };
    cli.apply_overrides(&mut config);
    init_logging(config.log_format, &config.log_level);

    let mut vm = match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            return Ok(());
        }
        _ => build_view_model(&config)?,
    };
    tracing::debug!(
        install_id = %vm.install_id(),
        base_url = %config.transport.base_url,
        "view model ready"
    );

    match cli.command {
        Command::Search { query } => {
            vm.search(&query).await;
            println!(
                "{}",
                render::lines(vm.search_results(), "(no players found)", render::user_line)
            );
        }
        Command::Incoming { sort } => {
            match sort {
                Some(sort) => vm.set_incoming_sort(sort.into()).await,
                None => vm.refresh().await,
            }
            println!(
                "{}",
                render::lines(vm.incoming(), "(no incoming challenges)", render::challenge_line)
            );
        }
        Command::Outgoing => {
            vm.refresh().await;
            println!(
                "{}",
                render::lines(vm.outgoing(), "(no outgoing challenge)", render::challenge_line)
            );
        }
        Command::Challenge { target } => {
            let target = InstallId::parse(&target)?;
            if !vm.create(&target).await {
                return Err(fail_with_banner(&vm, "challenge not created"));
            }
            println!(
                "{}",
                render::lines(vm.outgoing(), "(no outgoing challenge)", render::challenge_line)
            );
        }
        Command::Cancel { challenge_id } => {
            let challenge_id = ChallengeId::parse(&challenge_id)?;
            vm.refresh().await;
            if vm.cancel(&challenge_id).await {
                println!("removed {challenge_id}");
            } else {
                bail!("could not cancel {challenge_id}");
            }
        }
        Command::Accept { challenge_id } => {
            let challenge_id = ChallengeId::parse(&challenge_id)?;
            vm.refresh().await;
            if !vm.accept(&challenge_id).await {
                return Err(fail_with_banner(&vm, "accept failed"));
            }
            // Retire the poll-channel copy of this battle before showing it.
            vm.refresh_reveal().await;
            if let Some(reveal) = vm.reveal_presented().await {
                println!("{}", render::reveal_line(&reveal, vm.install_id()));
            }
        }
        Command::Decline { challenge_id } => {
            let challenge_id = ChallengeId::parse(&challenge_id)?;
            if !vm.decline(&challenge_id).await {
                return Err(fail_with_banner(&vm, "decline failed"));
            }
            println!("declined {challenge_id}");
        }
        Command::Reveal => {
            vm.refresh().await;
            vm.refresh_reveal().await;
            match vm.reveal_presented().await {
                Some(reveal) => println!("{}", render::reveal_line(&reveal, vm.install_id())),
                None => println!("(no battle results)"),
            }
        }
        Command::Status => {
            vm.open().await;
            println!("{}", serde_json::to_string_pretty(&vm.snapshot())?);
        }
        Command::Config => {}
    }

    Ok(())
}
