use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use tabular::{Row, Table};
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hrmake::batch::{main_make, MakeReport};
use hrmake::configuration::MakeSettings;
use hrmake::formatter::{ExternalFormatter, NoopFormatter};
use hrmake::maker::Maker;
use hrmake::project::MarkerRootResolver;

/// Convert YAML/JSON HttpRunner testcases into pytest files.
#[derive(Parser)]
#[clap(author, version = clap::crate_version!(), max_term_width = 100, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Increase logging level (-v: info, -vv: debug, -vvv: trace)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Path to a settings file (default: ./hrmake.toml)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate pytest files from testcase files or folders
    Make {
        /// Testcase files or folders
        #[clap(required = true)]
        paths: Vec<PathBuf>,

        /// Write generated files into this directory (wiped first)
        #[clap(short, long)]
        output_dir: Option<PathBuf>,

        /// Do not run the formatter on generated files
        #[clap(long)]
        no_format: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let log_level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn print_report(report: &MakeReport) {
    let mut table = Table::new("{:<} {:<}");
    for path in &report.run_set {
        table.add_row(Row::new().with_cell("run").with_cell(path.display()));
    }
    for (path, reason) in &report.skipped {
        table.add_row(
            Row::new()
                .with_cell("skip")
                .with_cell(format!("{} ({})", path.display(), reason.lines().next().unwrap_or(""))),
        );
    }
    print!("{}", table);

    let summary = format!(
        "generated {} files, {} to run, {} skipped",
        report.generated.len(),
        report.run_set.len(),
        report.skipped.len()
    );
    if report.skipped.is_empty() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}

async fn make_command(
    settings: MakeSettings,
    paths: &[PathBuf],
    output_dir: Option<&Path>,
    no_format: bool,
) -> anyhow::Result<MakeReport> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let output_dir = output_dir.map(|dir| cwd.join(dir));
    let resolver = MarkerRootResolver::new(settings.root_marker.clone(), cwd);

    let formatter = ExternalFormatter::from_settings(&settings)?;
    let mut maker = Maker::new(Box::new(resolver), settings)?;

    let report = if no_format {
        main_make(&mut maker, paths, output_dir.as_deref(), &NoopFormatter).await?
    } else {
        main_make(&mut maker, paths, output_dir.as_deref(), &formatter).await?
    };
    Ok(report)
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "hrmake", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(cli.verbose)?;
    debug!("Argument parsing complete.");

    let settings =
        MakeSettings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match &cli.command {
        Commands::Make {
            paths,
            output_dir,
            no_format,
        } => {
            let report = make_command(settings, paths, output_dir.as_deref(), *no_format).await?;
            print_report(&report);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {:#}", "error:".red(), err);
        std::process::exit(1);
    }
}
