//! Safeupdate - verify WordPress plugins against upstream before updating.
//!
//! Installed plugins are compared byte for byte with their published
//! releases. Only unmodified plugins are updated.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use safeupdate::core::{Config, PluginId, RunLogger};
use safeupdate::registry::{is_wordpress_installation, WpCliRegistry};
use safeupdate::upstream::HttpArtifactSource;
use safeupdate::{Engine, EngineOptions, APP_NAME, VERSION};

/// Update WordPress plugins only when they match their upstream release
#[derive(Parser)]
#[command(name = "safeupdate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Plugin slugs to verify and update
    #[arg(value_name = "PLUGIN", required_unless_present = "all")]
    plugins: Vec<String>,

    /// Process every installed plugin
    #[arg(long, conflicts_with = "plugins")]
    all: bool,

    /// WordPress installation root
    #[arg(long, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Show what would be updated without modifying anything
    #[arg(long)]
    dry_run: bool,

    /// Do not write a log file
    #[arg(long)]
    no_log: bool,

    /// Log file location
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Bypass caches between here and the plugin registry
    #[arg(long)]
    flush_cache: bool,

    /// Only write reports of modified plugins to the log
    #[arg(long)]
    save_diffs_only: bool,

    /// Keep the previous log under a timestamped name
    #[arg(long)]
    save_old_logs: bool,

    /// Base URL of published plugin archives
    #[arg(long, value_name = "URL")]
    registry_url: Option<String>,

    /// Directory for unpacked upstream releases
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,

    /// wp-cli command (e.g. "php wp-cli.phar")
    #[arg(long, value_name = "CMD", env = "SAFEUPDATE_WP_CLI")]
    wp_cli: Option<String>,

    /// Configuration file (defaults to .safeupdate.toml or the user config)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply command-line flags on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        let run = &mut config.run;
        run.dry_run |= self.dry_run;
        run.no_log |= self.no_log;
        run.flush_cache |= self.flush_cache;
        run.save_diffs_only |= self.save_diffs_only;
        run.save_old_logs |= self.save_old_logs;

        if let Some(file) = &self.log_file {
            run.log_file = Some(file.clone());
        }
        if let Some(dir) = &self.scratch_dir {
            run.scratch_dir = Some(dir.clone());
        }
        if let Some(url) = &self.registry_url {
            config.upstream.registry_url.clone_from(url);
        }
        if let Some(path) = &self.path {
            config.wordpress.path.clone_from(path);
        }
        if let Some(wp) = &self.wp_cli {
            config.wordpress.wp_binary.clone_from(wp);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    cli.apply(&mut config);

    let install = &config.wordpress.path;
    if !is_wordpress_installation(install) {
        bail!("No WordPress installation found at {}", install.display());
    }

    println!("{APP_NAME} {VERSION} - verifying plugins in {}", install.display());
    if config.run.dry_run {
        println!("Dry run: nothing will be modified");
    }

    let logger = RunLogger::from_config(&config.run)
        .with_context(|| format!("Failed to open log file {}", config.run.log_path().display()))?
        .with_echo(true);

    // Held until the run ends; dropping it removes the scratch directory.
    let mut scratch_guard = None;
    let scratch_dir = match &config.run.scratch_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create scratch directory {}", dir.display()))?;
            dir.clone()
        }
        None => {
            let dir = tempfile::Builder::new().prefix("safeupdate-").tempdir()?;
            scratch_guard.insert(dir).path().to_path_buf()
        }
    };

    let registry = WpCliRegistry::new(&config.wordpress.wp_binary, install);
    let source = HttpArtifactSource::new(&config.upstream.registry_url, config.upstream.timeout())?;
    let options = EngineOptions::from_config(&config.run, scratch_dir);
    let mut engine = Engine::new(registry, source, options, logger);

    if cli.all {
        engine.process_all()?;
    } else {
        let plugins: Vec<PluginId> = cli.plugins.iter().map(PluginId::new).collect();
        engine.process_many(&plugins);
    }

    let summary = engine.conclude();
    println!();
    println!("{summary}");
    if let Some(path) = engine.logger().path() {
        println!("Log written to {}", path.display());
    }

    drop(scratch_guard);
    Ok(())
}
