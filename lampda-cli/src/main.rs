//! lampda-flash - Command-line tool for updating Lamp-da lamps.
//!
//! ## Features
//!
//! - Discover lamps on serial ports and in update mode
//! - Install the latest official firmware or a local UF2 file
//! - List published releases
//! - Show lamp versions and serial number
//! - Serial terminal on the lamp's command line
//! - Shell completion generation
//! - English and French messages

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use lampda::{
    DriveLocator, FixedDriveLocator, LampType, ReleaseCatalog, ReqwestTransport, SystemDriveLocator,
};
use log::debug;
use thiserror::Error;

mod commands;
mod config;
mod messages;
mod select;

use config::Config;
use messages::{Lang, Messages};

// Texts for every supported language; lookups always pass the locale.
rust_i18n::i18n!("locales", fallback = "en");

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Set by the Ctrl-C handler of long-running interactive commands.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Check if spinners and colors should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

pub(crate) fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Failures with a dedicated exit code.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Bad or missing input (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// The user backed out (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

/// Exit code for an error returned by a command.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CliError>() {
        Some(CliError::Usage(_)) => 2,
        Some(CliError::Cancelled(_)) => 130,
        None => 1,
    }
}

/// lampda-flash - Find Lamp-da lamps and update their firmware.
///
/// Environment variables:
///   LAMPDA_LANG              - Message language (en, fr)
///   LAMPDA_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
///   RUST_LOG                 - Log filter
#[derive(Parser)]
#[command(name = "lampda-flash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Message language.
    #[arg(long, global = true, value_enum, env = "LAMPDA_LANG")]
    pub lang: Option<Lang>,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "LAMPDA_NON_INTERACTIVE")]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Lamp types a firmware file exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TypeArg {
    /// Single-color lamp.
    Simple,
    /// Addressable LED lamp.
    Indexable,
    /// Color-temperature lamp.
    Cct,
}

impl From<TypeArg> for LampType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Simple => Self::Simple,
            TypeArg::Indexable => Self::Indexable,
            TypeArg::Cct => Self::Cct,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List connected lamps and whether they are up to date.
    List {
        /// Only probe these serial ports (can be repeated).
        #[arg(short, long = "port", value_name = "PORT")]
        ports: Vec<String>,

        /// Only look for a lamp in update mode.
        #[arg(long, conflicts_with = "ports")]
        drive_only: bool,

        /// Do not query the release catalog.
        #[arg(long)]
        offline: bool,

        /// Output the lamp list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// List published firmware releases.
    Releases {
        /// Output releases as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Update a lamp.
    Flash {
        /// Serial port or drive path of the lamp (asked if several are found).
        #[arg(short, long, value_name = "ADDR")]
        port: Option<String>,

        /// Install this UF2 file instead of an official release.
        #[arg(short, long, value_name = "UF2")]
        file: Option<PathBuf>,

        /// Install this release tag instead of the latest one.
        #[arg(long, value_name = "TAG", conflicts_with = "file")]
        release: Option<String>,

        /// Lamp type to install; the lamp is then put in update mode by hand.
        #[arg(short = 't', long = "type", value_enum, value_name = "TYPE")]
        lamp_type: Option<TypeArg>,

        /// Do not reboot the lamp into update mode.
        #[arg(long)]
        skip_reset: bool,

        /// Update even when the lamp is already up to date.
        #[arg(long)]
        force: bool,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show versions and serial number of a lamp.
    Info {
        /// Serial port of the lamp.
        #[arg(short, long)]
        port: String,

        /// Output information as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Open a terminal on the lamp's command line.
    Monitor {
        /// Serial port (a connected lamp is searched if not given).
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate.
        #[arg(short, long, default_value_t = lampda::port::LAMP_BAUD_RATE)]
        baud: u32,

        /// Prefix received lines with the time.
        #[arg(long)]
        timestamps: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// State shared by all commands.
pub(crate) struct Runtime {
    pub config: Config,
    pub messages: Messages,
    pub quiet: bool,
    pub non_interactive: bool,
}

impl Runtime {
    /// Release catalog client from the configured endpoints.
    pub fn catalog(&self) -> Result<ReleaseCatalog<ReqwestTransport>> {
        let user_agent = format!("lampda-flash/{}", env!("CARGO_PKG_VERSION"));
        let transport = ReqwestTransport::new(&user_agent).context("Failed to set up HTTP client")?;
        Ok(ReleaseCatalog::new(transport, self.config.catalog_config()))
    }

    /// Drive locator: the configured mount path, or a system lookup.
    pub fn locator(&self) -> Box<dyn DriveLocator> {
        match &self.config.flash.mount_path {
            Some(path) => Box::new(FixedDriveLocator::new(path.clone())),
            None => Box::new(SystemDriveLocator),
        }
    }

    /// Print a status line to stderr unless quiet.
    pub fn status(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    /// Whether prompts may be shown.
    pub fn can_prompt(&self) -> bool {
        !self.non_interactive && std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }

    /// Spinner on stderr, hidden when quiet or not on a terminal.
    pub fn spinner(&self, message: impl Into<std::borrow::Cow<'static, str>>) -> ProgressBar {
        if self.quiet || !use_fancy_output() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Run `job` on a worker thread while a spinner turns.
    pub fn with_spinner<T: Send>(
        &self,
        message: impl Into<std::borrow::Cow<'static, str>>,
        job: impl FnOnce() -> T + Send,
    ) -> T {
        let pb = self.spinner(message);
        let result = thread::scope(|s| s.spawn(job).join());
        pb.finish_and_clear();
        match result {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    let lang = Lang::resolve(cli.lang, config.ui.lang.as_deref());
    debug!("Using language: {lang:?}");

    let runtime = Runtime {
        messages: Messages::new(lang),
        config,
        quiet: cli.quiet,
        non_interactive: cli.non_interactive,
    };

    match &cli.command {
        Commands::List {
            ports,
            drive_only,
            offline,
            json,
        } => commands::list::cmd_list(&runtime, ports, *drive_only, *offline, *json),
        Commands::Releases { json } => commands::releases::cmd_releases(&runtime, *json),
        Commands::Flash {
            port,
            file,
            release,
            lamp_type,
            skip_reset,
            force,
            yes,
        } => commands::flash::cmd_flash(
            &runtime,
            &commands::flash::FlashArgs {
                port: port.clone(),
                file: file.clone(),
                release: release.clone(),
                lamp_type: lamp_type.map(LampType::from),
                skip_reset: *skip_reset,
                force: *force,
                yes: *yes,
            },
        ),
        Commands::Info { port, json } => commands::info::cmd_info(&runtime, port, *json),
        Commands::Monitor {
            port,
            baud,
            timestamps,
        } => commands::monitor::cmd_monitor(&runtime, port.as_deref(), *baud, *timestamps),
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        },
    }
}

fn main() -> ExitCode {
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);
    if std::env::var_os("NO_COLOR").is_some() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();
    init_logging(&cli);
    debug!(
        "lampda-flash v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::from(exit_code(&err))
        },
    }
}
