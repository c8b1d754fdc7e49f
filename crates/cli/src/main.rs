//! svn-revert build-step command.
//!
//! `svn-revert run` reads the JSON report of a finished build, decides
//! whether the build became unstable because of its own commits and, if so,
//! reverts them in Subversion. The process exit code tells the build system
//! whether the step passed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use svnrevert_core::config::AppConfig;
use svnrevert_core::notify::{Claimer, RevertMailSender};
use svnrevert_core::{
    Bouncer, Build, BuildLog, ChangedRevisions, ModuleFinder, RevertPolicy, SvnClientFactory,
    SvnReverter,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Revert the Subversion commits that made a build unstable.
#[derive(Parser, Debug)]
#[command(
    name = "svn-revert",
    version,
    about = "Revert the Subversion commits that made a build unstable"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./svn-revert.toml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a finished build and revert its changes if it became unstable.
    Run {
        /// JSON build report of the finished build.
        #[arg(short, long)]
        build: PathBuf,

        /// Append notices to this file instead of stdout.
        #[arg(long)]
        build_log: Option<PathBuf>,
    },

    /// Validate a configuration file.
    Validate,

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./svn-revert.toml")]
        output: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            ref build,
            ref build_log,
        } => load_config(&cli.config).and_then(|config| {
            init_logging(cli.log_level.as_deref().unwrap_or(&config.log.level));
            cmd_run(&config, build, build_log.as_deref())
        }),
        Commands::Validate => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_validate(&cli.config).map(|()| true)
        }
        Commands::Init { ref output } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(output).map(|()| true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr; stdout carries the build-log notices.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

fn read_build_report(path: &Path) -> Result<Build> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read build report {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid build report {}", path.display()))
}

fn open_build_log(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open build log {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

/// Returns the gate's verdict: `false` fails the build step.
fn cmd_run(config: &AppConfig, build_path: &Path, build_log: Option<&Path>) -> Result<bool> {
    let build = read_build_report(build_path)?;
    info!(project = %build.project, build = build.number, result = %build.result, "evaluating build");

    let messenger = BuildLog::new(open_build_log(build_log)?);
    let factory = SvnClientFactory::new(&config.svn);
    let modules = ModuleFinder::new(build.workspace.clone());
    let changes = ChangedRevisions;
    let reverter = SvnReverter::new(&factory, &modules, &changes);

    let claimer = config.claim.enabled.then(|| Claimer::new(&config.claim));
    let mailer = RevertMailSender::from_config(&config.mail);

    let mut bouncer = Bouncer::new(
        &messenger,
        &reverter,
        &changes,
        RevertPolicy::from(&config.revert),
    );
    if let Some(ref claimer) = claimer {
        bouncer = bouncer.with_claimer(claimer);
    }
    if let Some(ref mailer) = mailer {
        bouncer = bouncer.with_mailer(mailer);
    }

    let passed = bouncer
        .evaluate(&build)
        .context("build change set cannot be reverted")?;
    info!(passed, "build step finished");
    Ok(passed)
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!(
        "  SVN user        : {}",
        config.svn.username.as_deref().unwrap_or("NOT SET")
    );
    println!(
        "  SVN password    : {}",
        if config.svn.password.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!(
        "  Multi-commit    : {}",
        if config.revert.revert_multiple_commits {
            "revert"
        } else {
            "skip"
        }
    );
    println!(
        "  Claims          : {}",
        if config.claim.enabled {
            config.claim.directory.display().to_string()
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Revert mail     : {}",
        if config.mail.is_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, AppConfig::default_toml()).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your SVN user and revert policy");
    println!("  2. Set the referenced environment variable (SVN_PASSWORD)");
    println!(
        "  3. Validate with: svn-revert validate --config {}",
        output.display()
    );
    println!(
        "  4. Add a post-build step: svn-revert run --config {} --build build.json",
        output.display()
    );

    Ok(())
}
