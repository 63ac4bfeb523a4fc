use crate::infra::{build_monitor, dry_run_channels, live_channels};
use crate::server;
use clap::{Args, Parser, Subcommand};
use legis_alerts::config::AppConfig;
use legis_alerts::error::AppError;
use legis_alerts::telemetry;
use legis_alerts::workflows::monitoring::{InterestProfile, JsonFileStore, MemoryStore, RunMode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Legislative Interest Monitor",
    about = "Match new legislative proposals against a client profile and notify",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute one greeting, scan, or summary cycle (default command)
    Run(RunArgs),
    /// Start the HTTP service exposing run triggers
    Serve(ServeArgs),
    /// Inspect the interest profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Parse and validate a profile file, then print the normalized result
    Check(ProfileCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Cycle to execute; defaults to RUN_MODE
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<RunMode>,
    /// Log notifications instead of sending them and keep state in memory
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct ProfileCheckArgs {
    /// Profile to validate; defaults to PROFILE_PATH
    #[arg(long)]
    path: Option<PathBuf>,
}

fn parse_mode(raw: &str) -> Result<RunMode, String> {
    raw.parse::<RunMode>().map_err(|err| err.to_string())
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => run_once(args).await,
        Command::Serve(args) => server::run(args).await,
        Command::Profile {
            command: ProfileCommand::Check(args),
        } => check_profile(args),
    }
}

async fn run_once(args: RunArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let mode = args.mode.unwrap_or(config.monitor.run_mode);
    info!(%mode, dry_run = args.dry_run, "starting run");

    let report = if args.dry_run {
        let service = build_monitor(&config, Arc::new(MemoryStore::new()), dry_run_channels())?;
        service.run(mode).await
    } else {
        let store = Arc::new(JsonFileStore::open(&config.monitor.state_dir)?);
        let service = build_monitor(&config, store, live_channels(&config))?;
        service.run(mode).await
    };

    println!("{}", render_json(&report)?);
    Ok(())
}

fn check_profile(args: ProfileCheckArgs) -> Result<(), AppError> {
    let path = match args.path {
        Some(path) => path,
        None => AppConfig::load()?.monitor.profile_path,
    };

    let profile = InterestProfile::load(&path)?;
    println!("{}", render_json(&profile)?);
    eprintln!(
        "{}: client '{}', {} theme(s), {} keyword(s), {} exclusion(s)",
        path.display(),
        profile.client_id,
        profile.themes.len(),
        profile.keyword_count(),
        profile.exclusions.len()
    );
    Ok(())
}

fn render_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["notifier"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_accepts_legacy_mode_names() {
        let cli = Cli::try_parse_from(["notifier", "run", "--mode", "resumo", "--dry-run"])
            .expect("parses");
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.mode, Some(RunMode::Summary));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert!(Cli::try_parse_from(["notifier", "run", "--mode", "weekly"]).is_err());
    }

    #[test]
    fn profile_check_takes_a_path() {
        let cli = Cli::try_parse_from(["notifier", "profile", "check", "--path", "cliente.toml"])
            .expect("parses");
        match cli.command {
            Some(Command::Profile {
                command: ProfileCommand::Check(args),
            }) => assert_eq!(args.path, Some(PathBuf::from("cliente.toml"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
