use anyhow::Context;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use trackdeck::app::{self, AppOptions};
use trackdeck::config;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Default)]
struct CliArgs {
    catalog: Option<PathBuf>,
    assets: Option<PathBuf>,
    null_audio: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if let Err(err) = init_logging() {
        eprintln!("logging disabled: {err:#}");
    }

    let mut settings = config::load_settings()?;
    if args.catalog.is_some() {
        settings.catalog_file = args.catalog;
    }
    if args.assets.is_some() {
        settings.asset_dir = args.assets;
    }

    let result = app::run(AppOptions {
        settings,
        null_audio: args.null_audio,
    });
    if let Err(err) = &result {
        tracing::error!("exiting with error: {err:#}");
    }
    result
}

fn init_logging() -> anyhow::Result<()> {
    let path = config::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "trackdeck=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .context("failed to install log subscriber")?;
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--catalog" => {
                index += 1;
                out.catalog = Some(path_value(&args, index, "--catalog")?);
            }
            "--assets" => {
                index += 1;
                out.assets = Some(path_value(&args, index, "--assets")?);
            }
            "--null-audio" => out.null_audio = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn path_value(args: &[String], index: usize, flag: &str) -> anyhow::Result<PathBuf> {
    let Some(value) = args.get(index) else {
        anyhow::bail!("{flag} requires a path");
    };
    if value.trim().is_empty() {
        anyhow::bail!("{flag} cannot be empty");
    }
    Ok(PathBuf::from(value.trim()))
}

fn print_help() {
    println!("trackdeck");
    println!("  --catalog <file>  JSON track catalog (default: built-in list)");
    println!("  --assets <dir>    Directory audio and cover files are resolved against");
    println!("  --null-audio      Use the silent clock engine instead of an audio device");
}
