use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};

use subito_searcher::{
    commands::{self, AddRequest, Session, TelegramUpdate},
    config::{DEFAULT_REFRESH_DELAY_SECS, RuntimeConfig},
    error::AppError,
    logging,
    notifier::TelegramNotifier,
    refresh::RefreshOptions,
    runner::{QueryRunner, SubitoRunner},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Track subito.it searches and get notified about new listings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a new search and start tracking it.
    Add {
        /// Unique name for the search.
        name: String,
        /// Search page url; defaults to a site-wide search for the name.
        #[arg(long, default_value = "")]
        url: String,
        /// Minimum price for the query.
        #[arg(long = "minPrice", visible_alias = "min")]
        min_price: Option<u64>,
        /// Maximum price for the query.
        #[arg(long = "maxPrice", visible_alias = "max")]
        max_price: Option<u64>,
    },
    /// Stop tracking a search.
    Delete {
        /// Name of the search to remove.
        name: String,
    },
    /// Refresh every tracked search and report new listings.
    Refresh {
        /// Keep refreshing until interrupted.
        #[arg(long, short)]
        daemon: bool,
        /// Delay between daemon passes, in seconds.
        #[arg(long, default_value_t = DEFAULT_REFRESH_DELAY_SECS)]
        delay: u64,
    },
    /// List tracked searches.
    List {
        /// Show bounds and known listings for each search.
        #[arg(long, short)]
        long: bool,
    },
    /// Configure the Telegram bot used for notifications.
    Telegram {
        /// Bot API token.
        #[arg(long, short)]
        token: Option<String>,
        /// Chat id that receives notifications.
        #[arg(long, short)]
        chat_id: Option<String>,
        /// Turn notifications on.
        #[arg(long = "on")]
        set_on: bool,
        /// Turn notifications off.
        #[arg(long = "off")]
        set_off: bool,
    },
    /// Print the stored Telegram settings.
    ShowTelegramApi,
    /// Print the current working directory.
    Pwd,
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(error) => {
            eprintln!("error: {}", error.message);
            std::process::exit(error.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<String, AppError> {
    let config = RuntimeConfig::from_env()?;
    let runner = SubitoRunner::new(config.timeout_secs, config.max_products)?;
    let mut session = Session::load(&config)?;

    run_with(
        cli,
        &config,
        &mut session,
        &runner,
        install_interrupt_handler,
        std::thread::sleep,
    )
}

fn run_with<R, I, S>(
    cli: Cli,
    config: &RuntimeConfig,
    session: &mut Session,
    runner: &R,
    install_interrupt: I,
    sleep: S,
) -> Result<String, AppError>
where
    R: QueryRunner,
    I: FnOnce() -> Arc<AtomicBool>,
    S: FnMut(Duration),
{
    commands::run_in_session(session, |session| match cli.command {
        Commands::Add {
            name,
            url,
            min_price,
            max_price,
        } => commands::add(
            session,
            runner,
            AddRequest {
                name,
                url,
                min_price,
                max_price,
            },
        ),
        Commands::Delete { name } => Ok(commands::delete(session, &name)),
        Commands::Refresh { daemon, delay } => {
            let notifier = TelegramNotifier::from_credential(
                &session.credential,
                &config.telegram_api,
                config.timeout_secs,
            )
            .map_err(|error| {
                AppError::runtime(format!("failed to build telegram client: {error}"))
            })?;
            let cancel = if daemon {
                install_interrupt()
            } else {
                Arc::new(AtomicBool::new(false))
            };

            commands::refresh(
                session,
                runner,
                notifier.as_ref(),
                RefreshOptions {
                    daemon,
                    delay: Duration::from_secs(delay),
                },
                &cancel,
                sleep,
            )
        }
        Commands::List { long } => Ok(commands::list(session, long)),
        Commands::Telegram {
            token,
            chat_id,
            set_on,
            set_off,
        } => commands::telegram(
            session,
            TelegramUpdate {
                token,
                chat_id,
                set_on,
                set_off,
            },
        ),
        Commands::ShowTelegramApi => Ok(commands::show_telegram_api(session)),
        Commands::Pwd => commands::pwd(),
    })
}

fn install_interrupt_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    if let Err(error) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(%error, "failed to install Ctrl+C handler");
    }

    cancel
}
