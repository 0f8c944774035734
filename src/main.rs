use clap::Parser;
use codemaster::cli::{AppContext, Cli, dispatch};
use codemaster::{ApiKeys, CodeMasterError, ConfigStore, DataDir};
use colored::Colorize;
use mimalloc::MiMalloc;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// stderr stays quiet unless `RUST_LOG` asks for more; the daily file
/// follows the configured `loglevel`.
fn init_tracing(data_dir: &DataDir, loglevel: &str) {
    let from_env = EnvFilter::try_from_default_env().ok();
    let stderr_filter = from_env.clone().unwrap_or_else(|| EnvFilter::new("warn"));
    let file_filter = from_env.unwrap_or_else(|| EnvFilter::new(loglevel));

    let log_path = data_dir.logs_dir().join(format!(
        "codemaster_{}.log",
        chrono::Local::now().format("%Y%m%d")
    ));
    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .with_filter(file_filter)
        });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(stderr_filter),
        )
        .with(file_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), CodeMasterError> {
    let data_dir = DataDir::resolve(cli.data_dir);
    data_dir.ensure()?;
    let store = ConfigStore::open(data_dir.config_file())?;
    init_tracing(&data_dir, &store.config().loglevel);
    if let Some(reason) = store.load_warning() {
        warn!(
            path = %store.path().display(),
            error = %reason,
            "config file unreadable; falling back to defaults"
        );
    }

    let keys = ApiKeys::from_env();
    debug!(
        data_dir = %data_dir.root().display(),
        proxy = %store.config().proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %store.config().loglevel,
        keys = keys.entries().iter().filter(|(_, _, v)| v.is_some()).count(),
        "starting"
    );
    if let Err(e) = codemaster::config::ensure_project_directory(store.config()) {
        warn!(error = %e, "could not create the default project directory");
    }

    let mut ctx = AppContext::new(data_dir, store, keys, cli.json);
    dispatch(&mut ctx, cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env only means fewer features.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            if let Some(hint) = e.hint() {
                eprintln!("{} {hint}", "hint:".yellow());
            }
            ExitCode::FAILURE
        }
    }
}
