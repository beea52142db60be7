use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use version_engine::config::{Config, VersioningCfg};
use version_engine::lock::{LockResolver, Package};
use version_engine::version::filter_newer_versions;

#[derive(Parser)]
#[command(name = "version-engine")]
#[command(version, about = "Installed version resolution and newer version filtering")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve installed versions from lock files and print the packages as JSON
    Installed {
        #[arg(long)]
        config: PathBuf,
        /// JSON array of packages
        #[arg(long)]
        packages: PathBuf,
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// Print the candidates newer than the current version, one per line
    Newer {
        #[arg(long)]
        current: String,
        /// semver, numeric, regex or ordered
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        regex: Option<String>,
        /// desc or asc
        #[arg(long)]
        sort: Option<String>,
        candidates: Vec<String>,
    },
}

fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

async fn run_installed(config: &Path, packages: &Path, base_dir: Option<&Path>) -> anyhow::Result<()> {
    let cfg: Config = read_json(config)?;
    let mut packages: Vec<Package> = read_json(packages)?;

    LockResolver::default()
        .apply_installed_versions(&mut packages, Some(&cfg), base_dir)
        .await
        .context("failed to apply installed versions")?;

    println!("{}", serde_json::to_string_pretty(&packages)?);
    Ok(())
}

fn run_newer(current: &str, cfg: &VersioningCfg, candidates: &[String]) -> anyhow::Result<()> {
    let newer = filter_newer_versions(current, candidates, Some(cfg)).context("failed to filter versions")?;
    for version in newer {
        println!("{version}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Command::Installed {
            config,
            packages,
            base_dir,
        } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run_installed(&config, &packages, base_dir.as_deref())),
        Command::Newer {
            current,
            format,
            regex,
            sort,
            candidates,
        } => run_newer(&current, &VersioningCfg { format, regex, sort }, &candidates),
    }
}
