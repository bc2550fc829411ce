//! Redis Backup - Main entry point.
//!
//! One-shot verified backup of a running Redis server's persistence files,
//! meant to be invoked periodically by an external scheduler. Exit code 0
//! means the backup completed; anything else means the run aborted.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use redis_backup::config::Config;
use redis_backup::executor::{self, RunOptions};
use redis_backup::store::client::RedisStore;
use redis_backup::utils::clock::SystemClock;
use redis_backup::utils::logger;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to log file (stdout if omitted)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Backup directory
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// strftime template for backup filenames
    #[arg(long)]
    backup_filename: Option<String>,

    /// Redis host (name or IP address)
    #[arg(long)]
    redis_host: Option<String>,

    /// Redis port
    #[arg(long)]
    redis_port: Option<u16>,

    /// Maximum number of backups to keep
    #[arg(long)]
    max_backups: Option<usize>,

    /// Background save timeout in seconds
    #[arg(long)]
    bgsave_timeout: Option<u64>,

    /// Also back up the append-only file
    #[arg(long)]
    with_aof: bool,

    /// AOF filename
    #[arg(long)]
    aof_filename: Option<String>,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    // The guard keeps the log-file writer alive until the process exits.
    let _log_guard = match logger::init(&config.log.level, config.log.file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e:#}");
            std::process::exit(1);
        }
    };

    let started = Instant::now();

    info!("backup begin");
    info!(dir = %config.backup.dir.display(), "backup dir");
    info!(template = %config.backup.filename_template, "backup file");
    info!(max_backups = config.backup.max_backups, "max backups");
    info!(host = %config.redis.host, port = config.redis.port, "redis server");
    info!(timeout_secs = config.backup.bgsave_timeout_secs, "bgsave timeout");
    if config.backup.with_aof {
        info!(aof_filename = %config.backup.aof_filename, "aof backup enabled");
    }

    match execute(&config) {
        Ok(report) => {
            info!(
                rdb = %report.rdb.path.display(),
                aof_copied = report.aof.is_some(),
                pruned = report.pruned_rdb + report.pruned_aof,
                elapsed_secs = started.elapsed().as_secs(),
                "backup successful"
            );
        }
        Err(e) => {
            error!(error = %e, elapsed_secs = started.elapsed().as_secs(), "backup failed");
            std::process::exit(1);
        }
    }
}

fn execute(config: &Config) -> redis_backup::Result<executor::RunReport> {
    let mut store = RedisStore::connect(&config.redis.host, config.redis.port)?;
    info!(host = %config.redis.host, port = config.redis.port, "connected to redis server");

    let options = RunOptions {
        backup_dir: config.backup.dir.clone(),
        filename_template: config.backup.filename_template.clone(),
        max_backups: config.backup.max_backups,
        bgsave_timeout: Duration::from_secs(config.backup.bgsave_timeout_secs),
        port: config.redis.port,
        with_aof: config.backup.with_aof,
        aof_filename: config.backup.aof_filename.clone(),
    };

    executor::run(&mut store, &SystemClock, &options)
}

/// Start from the config file (or defaults) and let command-line flags win.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }
    if let Some(file) = &args.log_file {
        config.log.file = Some(file.clone());
    }
    if let Some(dir) = &args.backup_dir {
        config.backup.dir = dir.clone();
    }
    if let Some(template) = &args.backup_filename {
        config.backup.filename_template = template.clone();
    }
    if let Some(host) = &args.redis_host {
        config.redis.host = host.clone();
    }
    if let Some(port) = args.redis_port {
        config.redis.port = port;
    }
    if let Some(max) = args.max_backups {
        config.backup.max_backups = max;
    }
    if let Some(timeout) = args.bgsave_timeout {
        config.backup.bgsave_timeout_secs = timeout;
    }
    if args.with_aof {
        config.backup.with_aof = true;
    }
    if let Some(name) = &args.aof_filename {
        config.backup.aof_filename = name.clone();
    }

    config.backup.dir = std::path::absolute(&config.backup.dir)?;

    Ok(config)
}
