use std::{error::Error, path::PathBuf, process, sync::Arc};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};

use yadl::{
    config::Config,
    downloads::Downloads,
    error::ErrorKind,
    gateway::Gateway,
    source::Source,
    token::Token,
    track::Status,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Track or playlist links
    ///
    /// `https://music.yandex.ru/album/{album}/track/{track}` or
    /// `https://music.yandex.ru/users/{username}/playlists/{kind}`.
    #[arg(value_name = "URL", required = true, value_hint = ValueHint::Url)]
    urls: Vec<Source>,

    /// Secrets file
    ///
    /// Ensure that the this file is kept secure and not shared publicly, as it
    /// contains the token that grants access to your account.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// OAuth token
    ///
    /// Takes precedence over the token in the secrets file.
    #[arg(short, long, env = "YADL_TOKEN", hide_env_values = true)]
    token: Option<Token>,

    /// Save the token to the secrets file
    #[arg(long, default_value_t = false, requires = "token")]
    save_token: bool,

    /// Directory to save tracks to
    ///
    /// Created when it does not exist.
    #[arg(short, long, value_name = "DIR", value_hint = ValueHint::DirPath, default_value = Config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Do not list duplicate tracks
    #[arg(long, default_value_t = false)]
    hide_duplicates: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Determines the token to use.
///
/// A token given on the command line wins over the secrets file, and is
/// saved to it when requested.
///
/// # Errors
///
/// Returns an error if the token cannot be read or saved.
fn load_token(args: &Args) -> yadl::error::Result<Token> {
    if let Some(ref token) = args.token {
        if args.save_token {
            token.save(&args.secrets_file)?;
            info!("saved token to {}", args.secrets_file);
        }
        return Ok(token.clone());
    }

    let token = Token::from_file(&args.secrets_file);
    if let Err(ref e) = token {
        if e.kind == ErrorKind::NotFound {
            info!(
                "pass a token with --token or set it in {}",
                args.secrets_file
            );
        }
    }

    token
}

/// Downloads every track that the arguments link to.
///
/// # Errors
///
/// Returns an error when the token is rejected or a link cannot be
/// resolved into tracks. Failing tracks do not make the run fail.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let token = load_token(&args)?;

    let mut config = Config::with_token(Some(token));
    config.output_dir.clone_from(&args.output_dir);

    let gateway = Arc::new(Gateway::new(&config)?);

    let status = gateway.account_status().await?;
    if status.is_anonymous() {
        return Err(yadl::error::Error::unauthenticated("token is not valid").into());
    }
    info!(
        "logged in as {}{}",
        status.account.login.as_deref().unwrap_or("unknown user"),
        if status.has_plus() { " (plus)" } else { "" }
    );

    let mut downloads = Downloads::new(&config.output_dir);
    for source in &args.urls {
        let tracks = gateway.tracks(source).await?;
        info!("{source}: {} tracks", tracks.len());
        downloads.ingest(tracks);
    }

    for record in downloads.visible(args.hide_duplicates) {
        debug!("{record}");
    }

    let mut bridge = downloads.run(gateway).await?;
    loop {
        let event = bridge.next().await;
        let changed = downloads
            .apply(&event)
            .map(|record| (record.uid, record.status));
        if let Some((uid, status)) = changed {
            let info = downloads.info(uid).unwrap_or_default();
            match status {
                Status::Downloading => debug!("{status}: {info}"),
                Status::Error => warn!("{status}: {info}"),
                _ => info!("{status}: {info}"),
            }
        }

        let counters = downloads.counters();
        debug!(
            "{:.0}% done; completed {}/{}",
            downloads.progress() * 100.0,
            counters.completed,
            counters.downloadable
        );

        if event.is_complete() {
            break;
        }
    }

    let counters = downloads.counters();
    info!(
        "Total tracks: {}; To download: {}; Completed: {}; Errors: {}",
        counters.total, counters.downloadable, counters.completed, counters.errors
    );

    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the download run.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
